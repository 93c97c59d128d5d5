use crate::application_port::JwtConfig;
use anyhow::{Result, anyhow};
use config::{Config, File};
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub http: Http,
    #[serde(default)]
    pub issue: Issue,
    pub jwt: Jwt,
    pub log: Log,
    #[serde(default)]
    pub staff: Staff,
    pub store: Store,
}

/// Access to `POST /issue`, reserved for the identity-resolution caller.
#[derive(Debug, Default, Deserialize)]
pub struct Issue {
    /// Name of the environment variable holding the shared service key.
    /// Without it the issue route rejects every request.
    pub key_env: Option<String>,
}

impl Issue {
    pub fn load_key(&self) -> Option<String> {
        let name = self.key_env.as_deref()?;
        std::env::var(name).ok().filter(|k| !k.is_empty())
    }
}

#[derive(Debug, Deserialize)]
pub struct Http {
    pub cert_path: String,
    pub key_path: String,
    pub address: String,
}

#[derive(Debug, Deserialize)]
pub struct Jwt {
    pub issuer: String,
    pub access_ttl_secs: u64,
    pub refresh_ttl_secs: u64,
    /// Name of the environment variable holding the HMAC secret.
    pub secret_env: String,
}

#[derive(Debug, Deserialize)]
pub struct Log {
    pub filter: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct Staff {
    pub path: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Store {
    pub backend: String, // "memory" or "redis"
    pub redis_url: Option<String>,
    /// How often the memory backend drops expired keys.
    #[serde(default = "Store::default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

impl Store {
    fn default_sweep_interval_secs() -> u64 {
        60
    }
}

impl Jwt {
    pub fn to_config(&self, secret: Option<String>) -> Result<JwtConfig> {
        let secret = secret
            .filter(|s| !s.is_empty())
            .ok_or_else(|| anyhow!("signing secret ${} is not set", self.secret_env))?;
        let cfg = JwtConfig::new(
            self.issuer.clone(),
            Duration::from_secs(self.access_ttl_secs),
            Duration::from_secs(self.refresh_ttl_secs),
            secret.into_bytes(),
        )?;
        Ok(cfg)
    }

    /// Build the token configuration, reading the secret from the environment.
    pub fn load_config(&self) -> Result<JwtConfig> {
        self.to_config(std::env::var(&self.secret_env).ok())
    }
}

#[cfg(debug_assertions)]
const SETTINGS_PATH: &str = "settings/dev.toml";
#[cfg(not(debug_assertions))]
const SETTINGS_PATH: &str = "settings/release.toml";

pub fn parse_settings(path: Option<&str>) -> Result<Settings> {
    let path = path.unwrap_or(SETTINGS_PATH);

    let settings: Settings = Config::builder()
        .add_source(File::with_name(path))
        .build()
        .map_err(|e| anyhow!(e))?
        .try_deserialize()
        .map_err(|e| anyhow!(e))?;

    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"
[http]
cert_path = "certs/cert.pem"
key_path = "certs/key.pem"
address = "127.0.0.1:8443"

[jwt]
issuer = "tokenward"
access_ttl_secs = 900
refresh_ttl_secs = 86400
secret_env = "TOKENWARD_JWT_SECRET"

[log]
filter = "info"

[store]
backend = "memory"
"#;

    fn write_sample(body: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(body.as_bytes()).unwrap();
        file
    }

    #[test]
    fn parses_sample_file() {
        let file = write_sample(SAMPLE);
        let settings = parse_settings(file.path().to_str()).unwrap();
        assert_eq!(settings.store.backend, "memory");
        assert!(settings.store.redis_url.is_none());
        assert_eq!(settings.store.sweep_interval_secs, 60);
        assert!(settings.staff.path.is_none());
        assert!(settings.issue.key_env.is_none());
        assert!(settings.issue.load_key().is_none());
        assert_eq!(settings.jwt.access_ttl_secs, 900);
    }

    #[test]
    fn issue_key_is_read_from_named_variable() {
        let body = format!(
            "{}\n[issue]\nkey_env = \"TOKENWARD_TEST_ISSUE_KEY_UNSET\"\n",
            SAMPLE
        );
        let file = write_sample(&body);
        let settings = parse_settings(file.path().to_str()).unwrap();
        assert_eq!(
            settings.issue.key_env.as_deref(),
            Some("TOKENWARD_TEST_ISSUE_KEY_UNSET")
        );
        assert!(settings.issue.load_key().is_none());
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(parse_settings(Some("")).is_err());
    }

    #[test]
    fn jwt_config_requires_secret() {
        let file = write_sample(SAMPLE);
        let settings = parse_settings(file.path().to_str()).unwrap();
        assert!(settings.jwt.to_config(None).is_err());
        assert!(settings.jwt.to_config(Some(String::new())).is_err());

        let cfg = settings.jwt.to_config(Some("s3cret".to_string())).unwrap();
        assert_eq!(cfg.issuer(), "tokenward");
        assert_eq!(cfg.refresh_ttl(), Duration::from_secs(86_400));
    }

    #[test]
    fn refresh_ttl_below_access_ttl_is_rejected() {
        let body = SAMPLE.replace("refresh_ttl_secs = 86400", "refresh_ttl_secs = 60");
        let file = write_sample(&body);
        let settings = parse_settings(file.path().to_str()).unwrap();
        assert!(settings.jwt.to_config(Some("s3cret".to_string())).is_err());
    }
}
