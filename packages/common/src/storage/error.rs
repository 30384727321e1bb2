use thiserror::Error;

/// Errors raised by the upload session and chunk stores.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The requested chunk does not exist.
    #[error("chunk {index} of upload {upload_id} not found")]
    ChunkNotFound { upload_id: String, index: u32 },

    /// The upload id cannot be used as a storage key.
    #[error("invalid upload id: {0}")]
    InvalidKey(String),

    /// Session metadata on disk could not be decoded.
    #[error("corrupt session metadata: {0}")]
    Corrupt(#[from] serde_json::Error),

    #[error("storage IO error: {0}")]
    Io(#[from] std::io::Error),
}
