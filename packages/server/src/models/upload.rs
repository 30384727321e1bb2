use chrono::{DateTime, Utc};
use common::{SessionStatus, UploadSession};
use serde::{Deserialize, Serialize};

/// Request body for starting a chunked upload.
#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct InitUploadRequest {
    /// Original file name; must end in `.apk`.
    #[schema(example = "app-release.apk")]
    pub file_name: String,
    /// Declared total size in bytes. Advisory only.
    #[schema(example = 18874368)]
    pub file_size: i64,
    #[schema(example = 4)]
    pub total_chunks: i64,
    #[schema(example = 42)]
    pub version_code: i32,
    #[schema(example = "2.4.0")]
    pub version_name: String,
    #[serde(default)]
    pub release_notes: Option<String>,
    #[serde(default)]
    pub is_mandatory: Option<bool>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct InitUploadResponse {
    #[schema(example = "0b7f4f0e-4a4d-4a8e-9a57-0b8d3f7f3c11")]
    pub upload_id: String,
    #[schema(example = 4)]
    pub total_chunks: u32,
    /// Largest chunk the server accepts, in bytes.
    #[schema(example = 10485760)]
    pub max_chunk_size: u64,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ChunkUploadResponse {
    pub upload_id: String,
    #[schema(example = 2)]
    pub chunk_index: u32,
    /// Distinct chunks received so far.
    #[schema(example = 3)]
    pub received_count: u32,
    #[schema(example = 4)]
    pub total_chunks: u32,
}

/// Progress of an in-flight chunked upload.
#[derive(Serialize, utoipa::ToSchema)]
pub struct UploadStatusResponse {
    pub upload_id: String,
    pub file_name: String,
    pub file_size: u64,
    pub total_chunks: u32,
    pub received_count: u32,
    pub received_chunks: Vec<u32>,
    pub missing_chunks: Vec<u32>,
    pub status: SessionStatus,
    pub version_code: i32,
    pub version_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<UploadSession> for UploadStatusResponse {
    fn from(s: UploadSession) -> Self {
        Self {
            received_count: s.received_count(),
            missing_chunks: s.missing_chunks(),
            received_chunks: s.received_chunks.iter().copied().collect(),
            upload_id: s.upload_id,
            file_name: s.file_name,
            file_size: s.declared_file_size,
            total_chunks: s.total_chunks,
            status: s.status,
            version_code: s.release.version_code,
            version_name: s.release.version_name,
            created_at: s.created_at,
            updated_at: s.updated_at,
        }
    }
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct CompleteUploadRequest {
    #[schema(example = "0b7f4f0e-4a4d-4a8e-9a57-0b8d3f7f3c11")]
    pub upload_id: String,
}

/// The version registered from a completed upload.
#[derive(Serialize, utoipa::ToSchema)]
pub struct CompleteUploadResponse {
    #[schema(example = 3)]
    pub id: i32,
    #[schema(example = "cmo_app_v2.4.0_1735689600000.apk")]
    pub file_name: String,
    #[schema(example = "/uploads/apk/cmo_app_v2.4.0_1735689600000.apk")]
    pub file_path: String,
    /// Measured size of the assembled file.
    #[schema(example = 18874368)]
    pub file_size: i64,
    #[schema(example = "18 MB")]
    pub file_size_formatted: String,
    #[schema(example = 42)]
    pub version_code: i32,
    #[schema(example = "2.4.0")]
    pub version_name: String,
}
