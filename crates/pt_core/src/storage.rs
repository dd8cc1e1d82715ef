use async_trait::async_trait;
use crate::Result;

/// String key-value persistence, the local-storage analogue the store and caches sit on.
#[async_trait]
pub trait StateBackend: Send + Sync {
    async fn load(&self, key: &str) -> Result<Option<String>>;

    async fn save(&self, key: &str, value: &str) -> Result<()>;

    async fn remove(&self, key: &str) -> Result<()>;
}
