//! Local state storage for RAG Master.
//!
//! State that must survive a restart is kept as small JSON documents:
//! - [`FileStorage`] writes one file per key under a directory
//! - [`MemoryStorage`] keeps everything in process, for tests
//!
//! [`StateManager`] layers typed JSON access on top of either.

mod file;
mod keys;
mod memory;
mod state;
mod traits;

pub use file::FileStorage;
pub use keys::StorageKeys;
pub use memory::MemoryStorage;
pub use state::StateManager;
pub use traits::StateStorage;

use std::path::Path;
use thiserror::Error;

/// Error type for storage operations.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Key cannot be mapped to a storage location
    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    /// Encoding/decoding error
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Create the default file-backed storage rooted at `dir`.
pub fn create_storage(dir: &Path) -> StorageResult<Box<dyn StateStorage>> {
    Ok(Box::new(FileStorage::new(dir)?))
}
