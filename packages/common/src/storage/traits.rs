use async_trait::async_trait;
use tokio::io::AsyncRead;

use super::error::StorageError;
use crate::upload::UploadSession;

/// Type alias for a boxed async reader.
pub type BoxReader = Box<dyn AsyncRead + Unpin + Send>;

/// Key-value store for upload session metadata, keyed by upload id.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Load a session, `None` if it does not exist.
    async fn get(&self, upload_id: &str) -> Result<Option<UploadSession>, StorageError>;

    /// Create or overwrite a session.
    async fn put(&self, session: &UploadSession) -> Result<(), StorageError>;

    /// Delete a session.
    ///
    /// Returns `true` if the session was deleted, `false` if it did not exist.
    async fn delete(&self, upload_id: &str) -> Result<bool, StorageError>;

    /// All sessions currently stored.
    async fn list(&self) -> Result<Vec<UploadSession>, StorageError>;
}

/// Durable storage for the raw bytes of upload chunks.
#[async_trait]
pub trait ChunkStore: Send + Sync {
    /// Store the bytes of one chunk. An existing chunk at the same index is replaced.
    async fn put_chunk(&self, upload_id: &str, index: u32, data: &[u8])
    -> Result<(), StorageError>;

    /// Open a chunk for reading.
    async fn open_chunk(&self, upload_id: &str, index: u32) -> Result<BoxReader, StorageError>;

    /// Remove every chunk stored for an upload. Missing uploads are not an error.
    async fn delete_chunks(&self, upload_id: &str) -> Result<(), StorageError>;
}
