use pt_core::{Error, Result, StateBackend};
use std::path::Path;
use std::sync::Arc;

pub mod backends;
pub mod cache;
pub mod store;

pub use backends::*;
pub use cache::TtlCache;
pub use store::{NewsStore, StoreState};

/// Build a backend by name: `memory`, `file`, or `sqlite` when compiled in.
/// `location` is a directory for `file` and a database path for `sqlite`.
pub async fn create_backend(kind: &str, location: Option<&Path>) -> Result<Arc<dyn StateBackend>> {
    let backend: Arc<dyn StateBackend> = match kind {
        "memory" => Arc::new(MemoryBackend::new()),
        "file" => {
            let dir = match location {
                Some(dir) => dir.to_path_buf(),
                None => FileBackend::default_dir()?,
            };
            Arc::new(FileBackend::new(dir).await?)
        }
        #[cfg(feature = "sqlite")]
        "sqlite" => {
            let path = match location {
                Some(path) => path.to_path_buf(),
                None => FileBackend::default_dir()?.join("state.db"),
            };
            Arc::new(SqliteBackend::new_with_path(&path).await?)
        }
        other => {
            return Err(Error::Config(format!("Unknown storage backend: {}", other)));
        }
    };
    tracing::info!("💾 Storage backend initialized (using {})", kind);
    Ok(backend)
}

pub mod prelude {
    pub use super::backends::*;
    pub use super::{create_backend, NewsStore, TtlCache};
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_create_backend_by_name() {
        let memory = create_backend("memory", None).await.unwrap();
        memory.save("k", "v").await.unwrap();
        assert_eq!(memory.load("k").await.unwrap().as_deref(), Some("v"));

        let temp_dir = tempdir().unwrap();
        let file = create_backend("file", Some(temp_dir.path())).await.unwrap();
        file.save("k", "v").await.unwrap();
        assert!(temp_dir.path().join("k.json").exists());

        assert!(matches!(create_backend("redis", None).await, Err(Error::Config(_))));
    }
}
