/// Result of a single-key read. Absence is an ordinary outcome, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheEntry<T> {
    Found(T),
    Absent,
}

impl<T> From<Option<T>> for CacheEntry<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => CacheEntry::Found(v),
            None => CacheEntry::Absent,
        }
    }
}

/// Key-value cache with per-key TTL. Every call is atomic for its single key;
/// nothing is atomic across keys.
#[async_trait::async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<CacheEntry<String>, SessionStoreError>;
    async fn set(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), SessionStoreError>;
    /// Succeeds even if the key is absent.
    async fn delete(&self, key: &str) -> Result<(), SessionStoreError>;
    /// Get and delete in one step. Of several concurrent callers on the same
    /// key, at most one observes `Found`.
    async fn take(&self, key: &str) -> Result<CacheEntry<String>, SessionStoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum SessionStoreError {
    #[error("infra error: {0}")]
    Store(String),
}
