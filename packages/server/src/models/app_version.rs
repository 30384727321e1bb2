use chrono::{DateTime, Utc};
use common::size::format_file_size;
use serde::{Deserialize, Serialize};

use crate::entity::app_version;

/// Query parameters for listing versions.
#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct VersionListQuery {
    /// Include deactivated versions.
    #[param(example = false)]
    pub all: Option<bool>,
}

/// Query parameters for the update check.
#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct CheckUpdateQuery {
    /// Version code currently installed on the device.
    #[param(value_type = i32, example = 41)]
    pub version_code: Option<String>,
}

/// A published app version.
#[derive(Serialize, utoipa::ToSchema)]
pub struct VersionResponse {
    #[schema(example = 3)]
    pub id: i32,
    #[schema(example = 42)]
    pub version_code: i32,
    #[schema(example = "2.4.0")]
    pub version_name: String,
    #[schema(example = "cmo_app_v2.4.0_1735689600000.apk")]
    pub file_name: String,
    /// Public download path.
    #[schema(example = "/uploads/apk/cmo_app_v2.4.0_1735689600000.apk")]
    pub file_path: String,
    #[schema(example = 18874368)]
    pub file_size: i64,
    #[schema(example = "18 MB")]
    pub file_size_formatted: String,
    #[schema(example = "Offline sync fixes")]
    pub release_notes: String,
    pub is_mandatory: bool,
    pub is_active: bool,
    #[schema(example = 12)]
    pub download_count: i32,
    pub uploaded_by: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<app_version::Model> for VersionResponse {
    fn from(m: app_version::Model) -> Self {
        Self {
            id: m.id,
            version_code: m.version_code,
            version_name: m.version_name,
            file_size_formatted: format_file_size(m.file_size.max(0) as u64),
            file_name: m.file_name,
            file_path: m.file_path,
            file_size: m.file_size,
            release_notes: m.release_notes,
            is_mandatory: m.is_mandatory,
            is_active: m.is_active,
            download_count: m.download_count,
            uploaded_by: m.uploaded_by,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct VersionListResponse {
    pub data: Vec<VersionResponse>,
}

/// Details of the newer version offered to a device.
#[derive(Serialize, utoipa::ToSchema)]
pub struct LatestVersionInfo {
    #[schema(example = 42)]
    pub version_code: i32,
    #[schema(example = "2.4.0")]
    pub version_name: String,
    pub release_notes: String,
    pub is_mandatory: bool,
    #[schema(example = "/uploads/apk/cmo_app_v2.4.0_1735689600000.apk")]
    pub download_url: String,
    #[schema(example = 18874368)]
    pub file_size: i64,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct CheckUpdateResponse {
    pub update_available: bool,
    #[schema(example = 41)]
    pub current_version: i32,
    /// Present only when an update is available.
    pub latest_version: Option<LatestVersionInfo>,
}

/// Partial update of a version's metadata.
#[derive(Debug, Default, Deserialize, utoipa::ToSchema)]
pub struct UpdateVersionRequest {
    pub release_notes: Option<String>,
    pub is_mandatory: Option<bool>,
    /// `false` hides the version from clients without deleting it.
    pub is_active: Option<bool>,
}
