use std::collections::BTreeSet;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::release::ReleaseMetadata;

/// Lifecycle phase of a chunked upload session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Accepting chunks.
    Open,
    /// Assembly and registration in progress.
    Completing,
}

/// Durable bookkeeping for one in-flight chunked upload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadSession {
    pub upload_id: String,
    pub file_name: String,
    /// Advisory only. The assembled artifact is measured on completion.
    pub declared_file_size: u64,
    pub total_chunks: u32,
    pub release: ReleaseMetadata,
    pub received_chunks: BTreeSet<u32>,
    pub status: SessionStatus,
    #[serde(default)]
    pub completion_started_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UploadSession {
    pub fn new(
        upload_id: String,
        file_name: String,
        declared_file_size: u64,
        total_chunks: u32,
        release: ReleaseMetadata,
    ) -> Self {
        let now = Utc::now();
        Self {
            upload_id,
            file_name,
            declared_file_size,
            total_chunks,
            release,
            received_chunks: BTreeSet::new(),
            status: SessionStatus::Open,
            completion_started_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Mark a chunk index as received. Returns `false` if it already was.
    pub fn record_chunk(&mut self, index: u32) -> bool {
        self.updated_at = Utc::now();
        self.received_chunks.insert(index)
    }

    pub fn received_count(&self) -> u32 {
        self.received_chunks.len() as u32
    }

    /// Every index in `0..total_chunks` has arrived.
    pub fn is_complete(&self) -> bool {
        self.received_count() == self.total_chunks
            && self
                .received_chunks
                .last()
                .is_none_or(|&last| last < self.total_chunks)
    }

    /// Indexes not received yet, ascending.
    pub fn missing_chunks(&self) -> Vec<u32> {
        (0..self.total_chunks)
            .filter(|i| !self.received_chunks.contains(i))
            .collect()
    }

    /// Whether a completion is currently running for this session.
    ///
    /// A completion that started longer than `timeout` ago is considered
    /// dead (the process crashed mid-assembly) and no longer blocks the
    /// session.
    pub fn is_completing(&self, now: DateTime<Utc>, timeout: Duration) -> bool {
        match (self.status, self.completion_started_at) {
            (SessionStatus::Completing, Some(started)) => now - started < timeout,
            (SessionStatus::Completing, None) => true,
            (SessionStatus::Open, _) => false,
        }
    }

    pub fn begin_completion(&mut self) {
        let now = Utc::now();
        self.status = SessionStatus::Completing;
        self.completion_started_at = Some(now);
        self.updated_at = now;
    }

    /// Return to `Open` after a failed completion so it can be retried.
    pub fn reopen(&mut self) {
        self.status = SessionStatus::Open;
        self.completion_started_at = None;
        self.updated_at = Utc::now();
    }
}
