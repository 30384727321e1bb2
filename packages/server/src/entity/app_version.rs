use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One published build of the Android field app.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "app_version")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Monotonic build number. Unique across all rows, active or not.
    #[sea_orm(unique)]
    pub version_code: i32,
    pub version_name: String,

    /// File name inside the APK directory.
    pub file_name: String,
    /// Public download path, `{public_prefix}/{file_name}`.
    pub file_path: String,
    pub file_size: i64,

    #[sea_orm(column_type = "Text")]
    pub release_notes: String,
    pub is_mandatory: bool,
    pub is_active: bool,
    pub download_count: i32,

    pub uploaded_by: Option<i32>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
