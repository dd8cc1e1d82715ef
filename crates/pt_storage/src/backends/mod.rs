pub mod file;
pub mod memory;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use file::FileBackend;
pub use memory::MemoryBackend;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteBackend;
