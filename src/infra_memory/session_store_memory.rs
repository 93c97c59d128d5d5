use crate::domain_port::*;
use crate::logger::*;
use dashmap::DashMap;
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

struct Slot {
    value: String,
    expires_at: Instant,
}

/// In-process stand-in for the shared cache. Expired keys are dropped lazily
/// on access and in bulk by [`MemorySessionStore::cleanup_expired`], which the
/// sweeper task runs periodically.
#[derive(Default)]
pub struct MemorySessionStore {
    slots: DashMap<String, Slot>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys that have not yet expired.
    pub fn live_keys(&self) -> usize {
        let now = Instant::now();
        self.slots.iter().filter(|s| s.expires_at > now).count()
    }

    /// Number of keys held, expired or not.
    pub fn stored_keys(&self) -> usize {
        self.slots.len()
    }

    /// Drops every expired key and returns how many were removed.
    pub fn cleanup_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.slots.len();
        self.slots.retain(|_, slot| slot.expires_at > now);
        before.saturating_sub(self.slots.len())
    }

    /// Runs `cleanup_expired` every `period` until `cancel` fires or the
    /// store is dropped.
    pub fn spawn_sweeper(
        self: &Arc<Self>,
        period: Duration,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        let store: Weak<Self> = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        let Some(store) = store.upgrade() else { break };
                        let removed = store.cleanup_expired();
                        if removed > 0 {
                            debug!(removed, remaining = store.stored_keys(), "expired keys swept");
                        }
                    }
                }
            }
            debug!("memory store sweeper stopped");
        })
    }
}

#[async_trait::async_trait]
impl SessionStore for MemorySessionStore {
    async fn get(&self, key: &str) -> Result<CacheEntry<String>, SessionStoreError> {
        let now = Instant::now();
        if let Some(slot) = self.slots.get(key) {
            if slot.expires_at > now {
                return Ok(CacheEntry::Found(slot.value.clone()));
            }
        }
        self.slots.remove_if(key, |_, slot| slot.expires_at <= now);
        Ok(CacheEntry::Absent)
    }

    async fn set(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), SessionStoreError> {
        let slot = Slot {
            value: value.to_string(),
            expires_at: Instant::now() + Duration::from_secs(ttl_secs.max(1)),
        };
        self.slots.insert(key.to_string(), slot);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), SessionStoreError> {
        self.slots.remove(key);
        Ok(())
    }

    async fn take(&self, key: &str) -> Result<CacheEntry<String>, SessionStoreError> {
        let now = Instant::now();
        match self.slots.remove(key) {
            Some((_, slot)) if slot.expires_at > now => Ok(CacheEntry::Found(slot.value)),
            _ => Ok(CacheEntry::Absent),
        }
    }
}
