use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs;
use tokio::io::BufReader;

use super::error::StorageError;
use super::traits::{BoxReader, ChunkStore, SessionStore};
use crate::upload::UploadSession;

const SESSION_FILE: &str = "session.json";
const CHUNK_EXTENSION: &str = "part";

/// Filesystem-backed store for chunked uploads.
///
/// Each upload owns one directory:
/// `{base_path}/{upload_id}/session.json` for the metadata and
/// `{base_path}/{upload_id}/{index}.part` for every chunk. Writes go to
/// `{base_path}/.tmp` first and are renamed into place, so concurrent writers
/// of the same chunk resolve to last-writer-wins and a reader never sees a
/// partially written file.
pub struct FilesystemUploadStore {
    base_path: PathBuf,
}

impl FilesystemUploadStore {
    /// Create a new store, creating its directories if needed.
    pub async fn new(base_path: PathBuf) -> Result<Self, StorageError> {
        fs::create_dir_all(&base_path).await?;
        fs::create_dir_all(base_path.join(".tmp")).await?;
        Ok(Self { base_path })
    }

    fn upload_dir(&self, upload_id: &str) -> Result<PathBuf, StorageError> {
        validate_key(upload_id)?;
        Ok(self.base_path.join(upload_id))
    }

    fn chunk_path(&self, upload_id: &str, index: u32) -> Result<PathBuf, StorageError> {
        Ok(self
            .upload_dir(upload_id)?
            .join(format!("{index}.{CHUNK_EXTENSION}")))
    }

    fn temp_path(&self) -> PathBuf {
        self.base_path
            .join(".tmp")
            .join(uuid::Uuid::new_v4().to_string())
    }

    /// Write `data` to `target` through a temp file and an atomic rename.
    async fn write_atomic(&self, target: PathBuf, data: &[u8]) -> Result<(), StorageError> {
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).await?;
        }

        let temp_path = self.temp_path();
        if let Err(e) = fs::write(&temp_path, data).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        if let Err(e) = fs::rename(&temp_path, &target).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        Ok(())
    }

    async fn read_session(&self, dir: PathBuf) -> Result<Option<UploadSession>, StorageError> {
        match fs::read(dir.join(SESSION_FILE)).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// Upload ids become directory names, so only `[A-Za-z0-9-]` is allowed.
fn validate_key(upload_id: &str) -> Result<(), StorageError> {
    let valid = !upload_id.is_empty()
        && upload_id.len() <= 64
        && upload_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-');
    if valid {
        Ok(())
    } else {
        Err(StorageError::InvalidKey(upload_id.to_string()))
    }
}

#[async_trait]
impl SessionStore for FilesystemUploadStore {
    async fn get(&self, upload_id: &str) -> Result<Option<UploadSession>, StorageError> {
        let dir = self.upload_dir(upload_id)?;
        self.read_session(dir).await
    }

    async fn put(&self, session: &UploadSession) -> Result<(), StorageError> {
        let target = self.upload_dir(&session.upload_id)?.join(SESSION_FILE);
        let data = serde_json::to_vec_pretty(session)?;
        self.write_atomic(target, &data).await
    }

    async fn delete(&self, upload_id: &str) -> Result<bool, StorageError> {
        let dir = self.upload_dir(upload_id)?;
        let deleted = match fs::remove_file(dir.join(SESSION_FILE)).await {
            Ok(()) => true,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
            Err(e) => return Err(e.into()),
        };

        // Only succeeds once the chunks are gone too.
        let _ = fs::remove_dir(&dir).await;

        Ok(deleted)
    }

    async fn list(&self) -> Result<Vec<UploadSession>, StorageError> {
        let mut sessions = Vec::new();
        let mut entries = fs::read_dir(&self.base_path).await?;

        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if validate_key(name).is_err() || !entry.file_type().await?.is_dir() {
                continue;
            }

            match self.read_session(entry.path()).await {
                Ok(Some(session)) => sessions.push(session),
                Ok(None) => {}
                Err(e) => tracing::warn!(upload_id = name, error = %e, "Skipping unreadable upload session"),
            }
        }

        Ok(sessions)
    }
}

#[async_trait]
impl ChunkStore for FilesystemUploadStore {
    async fn put_chunk(
        &self,
        upload_id: &str,
        index: u32,
        data: &[u8],
    ) -> Result<(), StorageError> {
        let target = self.chunk_path(upload_id, index)?;
        self.write_atomic(target, data).await
    }

    async fn open_chunk(&self, upload_id: &str, index: u32) -> Result<BoxReader, StorageError> {
        let path = self.chunk_path(upload_id, index)?;
        match fs::File::open(&path).await {
            Ok(file) => Ok(Box::new(BufReader::new(file))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(StorageError::ChunkNotFound {
                upload_id: upload_id.to_string(),
                index,
            }),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete_chunks(&self, upload_id: &str) -> Result<(), StorageError> {
        let dir = self.upload_dir(upload_id)?;
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e.into()),
        };

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some(CHUNK_EXTENSION) {
                match fs::remove_file(&path).await {
                    Ok(()) => {}
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                    Err(e) => return Err(e.into()),
                }
            }
        }

        let _ = fs::remove_dir(&dir).await;

        Ok(())
    }
}
