use async_trait::async_trait;
use pt_core::{Result, StateBackend};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Process-local backend; state is lost on exit.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl StateBackend for MemoryBackend {
    async fn load(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn save(&self, key: &str, value: &str) -> Result<()> {
        self.entries
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_backend() {
        let backend = MemoryBackend::new();
        assert!(backend.load("news-store").await.unwrap().is_none());

        backend.save("news-store", "{}").await.unwrap();
        assert_eq!(backend.load("news-store").await.unwrap().as_deref(), Some("{}"));
        assert_eq!(backend.len().await, 1);

        backend.remove("news-store").await.unwrap();
        assert!(backend.is_empty().await);
    }
}
