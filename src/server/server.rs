use crate::application_impl::*;
use crate::application_port::*;
use crate::domain_port::*;
use crate::infra_memory::*;
use crate::infra_redis::*;
use crate::logger::*;
use crate::settings::Settings;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub struct Server {
    pub credential_service: Arc<dyn CredentialService>,
    /// Resolves the role for `POST /issue`.
    pub role_directory: Arc<dyn RoleDirectory>,
    /// Shared key the identity-resolution caller presents on `POST /issue`.
    /// `None` closes the route.
    pub issue_key: Option<String>,
    sweeper_handle: Mutex<Option<JoinHandle<()>>>,
    cancel: CancellationToken,
}

impl Server {
    pub fn new(
        credential_service: Arc<dyn CredentialService>,
        role_directory: Arc<dyn RoleDirectory>,
        issue_key: Option<String>,
    ) -> Self {
        Self {
            credential_service,
            role_directory,
            issue_key,
            sweeper_handle: Mutex::new(None),
            cancel: CancellationToken::new(),
        }
    }

    pub async fn try_new(settings: &Settings) -> anyhow::Result<Self> {
        let jwt_config = settings.jwt.load_config()?;
        info!(?jwt_config);

        let role_directory: Arc<dyn RoleDirectory> = match settings.staff.path.as_deref() {
            Some(path) => {
                let directory = JsonStaffDirectory::load(path)?;
                info!(staff = directory.len(), "staff directory loaded");
                Arc::new(directory)
            }
            None => Arc::new(JsonStaffDirectory::empty()),
        };

        let issue_key = settings.issue.load_key();
        if issue_key.is_none() {
            warn!("no issue key configured, POST /issue is closed");
        }

        let cancel = CancellationToken::new();
        let (session_store, sweeper_handle) = Self::session_store(settings, cancel.clone()).await?;
        let signer: Arc<dyn TokenSigner> = Arc::new(JwtHs256Signer::new(jwt_config));
        let credential_service: Arc<dyn CredentialService> =
            Arc::new(RealCredentialService::new(signer, session_store));

        info!("server started");

        Ok(Self {
            credential_service,
            role_directory,
            issue_key,
            sweeper_handle: Mutex::new(sweeper_handle),
            cancel,
        })
    }

    async fn session_store(
        settings: &Settings,
        cancel: CancellationToken,
    ) -> anyhow::Result<(Arc<dyn SessionStore>, Option<JoinHandle<()>>)> {
        match settings.store.backend.as_str() {
            "memory" => {
                warn!("using in-process session store, sessions are lost on restart");
                let store = Arc::new(MemorySessionStore::new());
                let period = Duration::from_secs(settings.store.sweep_interval_secs.max(1));
                let handle = store.spawn_sweeper(period, cancel);
                Ok((store, Some(handle)))
            }
            "redis" => {
                let dsn = settings
                    .store
                    .redis_url
                    .as_deref()
                    .ok_or_else(|| anyhow::anyhow!("store.redis_url is required for redis"))?;
                let redis_client = redis::Client::open(dsn)?;
                let redis_manager = redis_client.get_connection_manager().await?;
                Ok((Arc::new(RedisSessionStore::new(redis_manager)), None))
            }
            other => Err(anyhow::anyhow!("Unknown store backend: {}", other)),
        }
    }

    pub async fn shutdown(&self) {
        info!("server shutting down...");

        self.cancel.cancel();

        let sweeper = self.sweeper_handle.lock().ok().and_then(|mut lock| lock.take());
        if let Some(handle) = sweeper {
            let r = handle.await;
            info!("sweeper handle dropped: {:?}", r);
        }
    }
}
