use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use common::storage::{ChunkStore, SessionStore};
use common::{ReleaseMetadata, UploadSession};
use dashmap::DashMap;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::UploadConfig;
use crate::entity::app_version;
use crate::error::AppError;
use crate::models::upload::InitUploadRequest;
use crate::utils::filename::validate_apk_filename;
use crate::version::{VersionService, remove_best_effort};

/// Receives an APK in chunks and turns the finished upload into a version.
///
/// Session state lives in a [`SessionStore`] and chunk bytes in a
/// [`ChunkStore`], so progress survives restarts. Every read-modify-write of
/// a session happens under a per-upload lock.
pub struct UploadAssembler {
    sessions: Arc<dyn SessionStore>,
    chunks: Arc<dyn ChunkStore>,
    locks: DashMap<String, Arc<Mutex<()>>>,
    limits: UploadConfig,
    assembly_dir: PathBuf,
}

impl UploadAssembler {
    pub fn new(
        sessions: Arc<dyn SessionStore>,
        chunks: Arc<dyn ChunkStore>,
        limits: UploadConfig,
        assembly_dir: PathBuf,
    ) -> Self {
        Self {
            sessions,
            chunks,
            locks: DashMap::new(),
            limits,
            assembly_dir,
        }
    }

    pub fn limits(&self) -> &UploadConfig {
        &self.limits
    }

    fn lock_for(&self, upload_id: &str) -> Arc<Mutex<()>> {
        self.locks
            .entry(upload_id.to_string())
            .or_default()
            .value()
            .clone()
    }

    /// Drop the lock entry of an upload that turned out not to exist, unless
    /// another caller is still holding or waiting on it.
    fn release_lock(&self, upload_id: &str, lock: Arc<Mutex<()>>) {
        drop(lock);
        self.locks
            .remove_if(upload_id, |_, l| Arc::strong_count(l) == 1);
    }

    fn completion_timeout(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.limits.completion_timeout_secs as i64)
    }

    async fn load(&self, upload_id: &str) -> Result<UploadSession, AppError> {
        self.sessions
            .get(upload_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Upload session '{upload_id}' not found")))
    }

    /// Open a new upload session. Nothing touches the database yet.
    pub async fn initiate(&self, req: InitUploadRequest) -> Result<UploadSession, AppError> {
        let file_name = validate_apk_filename(&req.file_name)
            .map_err(|e| AppError::Validation(e.message().into()))?
            .to_string();
        if req.file_size <= 0 {
            return Err(AppError::Validation(
                "File size must be a positive integer".into(),
            ));
        }
        if req.total_chunks <= 0 {
            return Err(AppError::Validation(
                "Total chunks must be a positive integer".into(),
            ));
        }
        if req.total_chunks > i64::from(self.limits.max_total_chunks) {
            return Err(AppError::Validation(format!(
                "Total chunks must not exceed {}",
                self.limits.max_total_chunks
            )));
        }
        if req.version_code <= 0 {
            return Err(AppError::Validation(
                "Version code must be a positive integer".into(),
            ));
        }
        if req.version_name.trim().is_empty() {
            return Err(AppError::Validation("Version name is required".into()));
        }

        let session = UploadSession::new(
            Uuid::new_v4().to_string(),
            file_name,
            req.file_size as u64,
            req.total_chunks as u32,
            ReleaseMetadata {
                version_code: req.version_code,
                version_name: req.version_name.trim().to_string(),
                release_notes: req.release_notes.unwrap_or_default(),
                is_mandatory: req.is_mandatory.unwrap_or(false),
            },
        );
        self.sessions.put(&session).await?;

        info!(
            upload_id = %session.upload_id,
            file_name = %session.file_name,
            total_chunks = session.total_chunks,
            version_code = session.release.version_code,
            "Upload session opened"
        );
        Ok(session)
    }

    /// Store one chunk. Re-sending an index replaces its bytes and does not
    /// change the received count.
    pub async fn upload_chunk(
        &self,
        upload_id: &str,
        index: u32,
        data: &[u8],
    ) -> Result<UploadSession, AppError> {
        if data.is_empty() {
            return Err(AppError::Validation("Chunk data is required".into()));
        }
        if data.len() as u64 > self.limits.max_chunk_size {
            return Err(AppError::Validation(format!(
                "Chunk exceeds maximum size of {} bytes",
                self.limits.max_chunk_size
            )));
        }

        let lock = self.lock_for(upload_id);
        let guard = lock.lock().await;

        let mut session = match self.load(upload_id).await {
            Ok(session) => session,
            Err(e) => {
                drop(guard);
                self.release_lock(upload_id, lock);
                return Err(e);
            }
        };
        if session.is_completing(Utc::now(), self.completion_timeout()) {
            return Err(AppError::InvalidState(
                "Upload is being completed and no longer accepts chunks".into(),
            ));
        }
        if index >= session.total_chunks {
            return Err(AppError::Validation(format!(
                "Chunk index {index} out of range (total chunks: {})",
                session.total_chunks
            )));
        }

        self.chunks.put_chunk(upload_id, index, data).await?;

        // A stale completion (crashed mid-assembly) is abandoned here.
        if session.completion_started_at.is_some() {
            session.reopen();
        }
        session.record_chunk(index);
        self.sessions.put(&session).await?;

        Ok(session)
    }

    pub async fn status(&self, upload_id: &str) -> Result<UploadSession, AppError> {
        self.load(upload_id).await
    }

    /// Assemble every chunk in index order and register the result as a
    /// new version.
    ///
    /// On success the chunks and the session are removed. On failure the
    /// assembled file is removed and the session reopened with its chunks,
    /// so completion can be retried.
    pub async fn complete(
        &self,
        upload_id: &str,
        versions: &VersionService<'_>,
        uploaded_by: Option<i32>,
    ) -> Result<app_version::Model, AppError> {
        let lock = self.lock_for(upload_id);

        let mut session = {
            let guard = lock.lock().await;
            let mut session = match self.load(upload_id).await {
                Ok(session) => session,
                Err(e) => {
                    drop(guard);
                    self.release_lock(upload_id, lock);
                    return Err(e);
                }
            };
            if session.is_completing(Utc::now(), self.completion_timeout()) {
                return Err(AppError::InvalidState(
                    "Upload is already being completed".into(),
                ));
            }
            if !session.is_complete() {
                return Err(AppError::IncompleteUpload {
                    expected: session.total_chunks,
                    received: session.received_count(),
                });
            }
            session.begin_completion();
            self.sessions.put(&session).await?;
            session
        };

        let assembled = self
            .assembly_dir
            .join(format!("assembled_{}.apk", session.upload_id));

        let result = async {
            let size = self.assemble(&session, &assembled).await?;
            info!(upload_id, size, "Chunks assembled");
            versions
                .register(&assembled, &session.release, uploaded_by)
                .await
        }
        .await;

        match result {
            Ok(version) => {
                if let Err(e) = self.chunks.delete_chunks(upload_id).await {
                    warn!(upload_id, error = %e, "Failed to delete chunks of completed upload");
                }
                if let Err(e) = self.sessions.delete(upload_id).await {
                    warn!(upload_id, error = %e, "Failed to delete completed upload session");
                }
                self.locks.remove(upload_id);
                Ok(version)
            }
            Err(e) => {
                warn!(upload_id, error = %e, "Upload completion failed, reopening session");
                remove_best_effort(&assembled).await;

                let _guard = lock.lock().await;
                session.reopen();
                if let Err(put_err) = self.sessions.put(&session).await {
                    warn!(upload_id, error = %put_err, "Failed to reopen upload session");
                }
                Err(e)
            }
        }
    }

    /// Concatenate chunks `0..total_chunks` into `target`, returning the byte length.
    async fn assemble(&self, session: &UploadSession, target: &Path) -> Result<u64, AppError> {
        fs::create_dir_all(&self.assembly_dir).await?;
        let mut out = fs::File::create(target).await?;

        let mut size = 0u64;
        for index in 0..session.total_chunks {
            let mut reader = self.chunks.open_chunk(&session.upload_id, index).await?;
            size += tokio::io::copy(&mut reader, &mut out).await?;
        }
        out.flush().await?;
        out.sync_all().await?;

        Ok(size)
    }

    /// Discard an upload and all of its chunks.
    pub async fn abort(&self, upload_id: &str) -> Result<(), AppError> {
        let lock = self.lock_for(upload_id);
        let guard = lock.lock().await;

        let session = match self.load(upload_id).await {
            Ok(session) => session,
            Err(e) => {
                drop(guard);
                self.release_lock(upload_id, lock);
                return Err(e);
            }
        };
        if session.is_completing(Utc::now(), self.completion_timeout()) {
            return Err(AppError::InvalidState(
                "Upload is being completed and cannot be aborted".into(),
            ));
        }

        self.chunks.delete_chunks(upload_id).await?;
        self.sessions.delete(upload_id).await?;
        self.locks.remove(upload_id);

        info!(upload_id, "Upload session aborted");
        Ok(())
    }

    /// Remove sessions untouched for longer than `ttl`, together with their
    /// chunks. Sessions with a running completion are left alone.
    pub async fn sweep_expired(&self, ttl: chrono::Duration) -> Result<usize, AppError> {
        let cutoff = Utc::now() - ttl;
        let mut removed = 0;

        for candidate in self.sessions.list().await? {
            if candidate.updated_at >= cutoff {
                continue;
            }

            let upload_id = candidate.upload_id.as_str();
            let lock = self.lock_for(upload_id);
            let guard = lock.lock().await;

            // Re-check under the lock; a chunk may have arrived meanwhile.
            let Some(session) = self.sessions.get(upload_id).await? else {
                drop(guard);
                self.release_lock(upload_id, lock);
                continue;
            };
            if session.updated_at >= cutoff
                || session.is_completing(Utc::now(), self.completion_timeout())
            {
                continue;
            }

            self.chunks.delete_chunks(upload_id).await?;
            self.sessions.delete(upload_id).await?;
            self.locks.remove(upload_id);
            removed += 1;
        }

        Ok(removed)
    }
}
