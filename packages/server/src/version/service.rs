use std::path::Path;

use chrono::Utc;
use common::ReleaseMetadata;
use sea_orm::sea_query::{Expr, ExprTrait};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, QueryOrder, Set, SqlErr, TransactionTrait,
};
use tokio::fs;
use tracing::{info, warn};

use crate::config::StorageConfig;
use crate::entity::app_version;
use crate::error::AppError;
use crate::models::app_version::{CheckUpdateResponse, LatestVersionInfo, UpdateVersionRequest};
use crate::utils::filename::apk_storage_name;

/// The active version with the highest code, if any.
pub async fn latest_active<C: ConnectionTrait>(
    conn: &C,
) -> Result<Option<app_version::Model>, DbErr> {
    app_version::Entity::find()
        .filter(app_version::Column::IsActive.eq(true))
        .order_by_desc(app_version::Column::VersionCode)
        .one(conn)
        .await
}

/// Move a file, falling back to copy + remove when `rename` fails
/// (for example across filesystems).
pub async fn move_file(from: &Path, to: &Path) -> std::io::Result<()> {
    if fs::rename(from, to).await.is_ok() {
        return Ok(());
    }

    if let Err(e) = fs::copy(from, to).await {
        remove_best_effort(to).await;
        return Err(e);
    }
    remove_best_effort(from).await;
    Ok(())
}

/// Remove a file, logging instead of failing.
pub async fn remove_best_effort(path: &Path) {
    match fs::remove_file(path).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove file"),
    }
}

/// Registration and distribution of app versions.
pub struct VersionService<'a> {
    db: &'a DatabaseConnection,
    storage: &'a StorageConfig,
}

impl<'a> VersionService<'a> {
    pub fn new(db: &'a DatabaseConnection, storage: &'a StorageConfig) -> Self {
        Self { db, storage }
    }

    /// Publish the APK at `artifact` as a new version.
    ///
    /// The artifact is moved into the APK directory. If anything fails after
    /// the move, the moved file is removed again; the caller keeps ownership
    /// of `artifact` when the move itself never happened.
    pub async fn register(
        &self,
        artifact: &Path,
        release: &ReleaseMetadata,
        uploaded_by: Option<i32>,
    ) -> Result<app_version::Model, AppError> {
        validate_release(release)?;

        let txn = self.db.begin().await?;

        if let Some(latest) = latest_active(&txn).await?
            && release.version_code <= latest.version_code
        {
            return Err(AppError::VersionConflict {
                required_min: latest.version_code + 1,
            });
        }

        fs::create_dir_all(&self.storage.apk_dir).await?;
        let file_name = apk_storage_name(&release.version_name, Utc::now().timestamp_millis());
        let target = self.storage.apk_dir.join(&file_name);
        move_file(artifact, &target).await?;

        let result = async {
            let file_size = fs::metadata(&target).await?.len() as i64;
            let now = Utc::now();
            let model = app_version::ActiveModel {
                version_code: Set(release.version_code),
                version_name: Set(release.version_name.trim().to_string()),
                file_path: Set(format!(
                    "{}/{}",
                    self.storage.public_prefix.trim_end_matches('/'),
                    file_name
                )),
                file_name: Set(file_name.clone()),
                file_size: Set(file_size),
                release_notes: Set(release.release_notes.clone()),
                is_mandatory: Set(release.is_mandatory),
                is_active: Set(true),
                download_count: Set(0),
                uploaded_by: Set(uploaded_by),
                created_at: Set(now),
                updated_at: Set(now),
                ..Default::default()
            }
            .insert(&txn)
            .await
            .map_err(|e| match e.sql_err() {
                Some(SqlErr::UniqueConstraintViolation(_)) => AppError::VersionConflict {
                    required_min: release.version_code + 1,
                },
                _ => AppError::from(e),
            })?;
            txn.commit().await?;
            Ok::<_, AppError>(model)
        }
        .await;

        match result {
            Ok(model) => {
                info!(
                    id = model.id,
                    version_code = model.version_code,
                    file_size = model.file_size,
                    "Registered app version"
                );
                Ok(model)
            }
            Err(e) => {
                remove_best_effort(&target).await;
                Err(e)
            }
        }
    }

    pub async fn list(&self, include_inactive: bool) -> Result<Vec<app_version::Model>, DbErr> {
        let mut query = app_version::Entity::find();
        if !include_inactive {
            query = query.filter(app_version::Column::IsActive.eq(true));
        }
        query
            .order_by_desc(app_version::Column::VersionCode)
            .all(self.db)
            .await
    }

    pub async fn latest(&self) -> Result<app_version::Model, AppError> {
        latest_active(self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("No version available".into()))
    }

    pub async fn find(&self, id: i32) -> Result<app_version::Model, AppError> {
        app_version::Entity::find_by_id(id)
            .one(self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Version not found".into()))
    }

    /// Compare a device's version code with the latest active release.
    pub async fn check_for_update(
        &self,
        current_version_code: i32,
    ) -> Result<CheckUpdateResponse, DbErr> {
        let latest = latest_active(self.db)
            .await?
            .filter(|v| v.version_code > current_version_code);

        Ok(CheckUpdateResponse {
            update_available: latest.is_some(),
            current_version: current_version_code,
            latest_version: latest.map(|v| LatestVersionInfo {
                version_code: v.version_code,
                version_name: v.version_name,
                release_notes: v.release_notes,
                is_mandatory: v.is_mandatory,
                download_url: v.file_path,
                file_size: v.file_size,
            }),
        })
    }

    /// Atomically bump the download counter of a version, active or not.
    pub async fn increment_download_count(&self, id: i32) -> Result<(), AppError> {
        let result = app_version::Entity::update_many()
            .col_expr(
                app_version::Column::DownloadCount,
                Expr::col(app_version::Column::DownloadCount).add(1),
            )
            .filter(app_version::Column::Id.eq(id))
            .exec(self.db)
            .await?;

        if result.rows_affected == 0 {
            return Err(AppError::NotFound("Version not found".into()));
        }
        Ok(())
    }

    pub async fn update(
        &self,
        id: i32,
        changes: UpdateVersionRequest,
    ) -> Result<app_version::Model, AppError> {
        let existing = self.find(id).await?;
        let mut active: app_version::ActiveModel = existing.into();

        if let Some(notes) = changes.release_notes {
            active.release_notes = Set(notes);
        }
        if let Some(mandatory) = changes.is_mandatory {
            active.is_mandatory = Set(mandatory);
        }
        if let Some(is_active) = changes.is_active {
            active.is_active = Set(is_active);
        }
        active.updated_at = Set(Utc::now());

        Ok(active.update(self.db).await?)
    }

    /// Delete a version row and, best effort, its file.
    pub async fn delete(&self, id: i32) -> Result<(), AppError> {
        let existing = self.find(id).await?;
        remove_best_effort(&self.storage.apk_dir.join(&existing.file_name)).await;
        app_version::Entity::delete_by_id(existing.id)
            .exec(self.db)
            .await?;
        info!(id, version_code = existing.version_code, "Deleted app version");
        Ok(())
    }

    /// Local path of a version's APK.
    pub fn file_on_disk(&self, version: &app_version::Model) -> std::path::PathBuf {
        self.storage.apk_dir.join(&version.file_name)
    }
}

pub(crate) fn validate_release(release: &ReleaseMetadata) -> Result<(), AppError> {
    if release.version_code <= 0 {
        return Err(AppError::Validation(
            "Version code must be a positive integer".into(),
        ));
    }
    if release.version_name.trim().is_empty() {
        return Err(AppError::Validation("Version name is required".into()));
    }
    Ok(())
}
