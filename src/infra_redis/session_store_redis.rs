use crate::domain_port::*;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;

pub struct RedisSessionStore {
    conn: ConnectionManager,
}

impl RedisSessionStore {
    pub fn new(conn: ConnectionManager) -> Self {
        RedisSessionStore { conn }
    }
}

fn store_err(e: redis::RedisError) -> SessionStoreError {
    SessionStoreError::Store(e.to_string())
}

#[async_trait::async_trait]
impl SessionStore for RedisSessionStore {
    async fn get(&self, key: &str) -> Result<CacheEntry<String>, SessionStoreError> {
        let mut conn = self.conn.clone();
        let val: Option<String> = conn.get(key).await.map_err(store_err)?;
        Ok(val.into())
    }

    async fn set(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), SessionStoreError> {
        let mut conn = self.conn.clone();
        // SETEX rejects a zero expiry.
        let _: () = conn
            .set_ex(key, value, ttl_secs.max(1))
            .await
            .map_err(store_err)?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), SessionStoreError> {
        let mut conn = self.conn.clone();
        let _: () = conn.del(key).await.map_err(store_err)?;
        Ok(())
    }

    async fn take(&self, key: &str) -> Result<CacheEntry<String>, SessionStoreError> {
        let mut conn = self.conn.clone();
        let val: Option<String> = redis::cmd("GETDEL")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(store_err)?;
        Ok(val.into())
    }
}
