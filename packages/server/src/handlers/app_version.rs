use std::path::{Path as FsPath, PathBuf};

use axum::body::Body;
use axum::extract::multipart::Field;
use axum::extract::{DefaultBodyLimit, Multipart, Path, Query, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::Json;
use common::ReleaseMetadata;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;
use tracing::instrument;
use uuid::Uuid;

use crate::entity::app_version;
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::app_version::*;
use crate::state::AppState;
use crate::utils::filename::validate_apk_filename;
use crate::version::{VersionService, remove_best_effort};

#[utoipa::path(
    get,
    path = "/versions",
    tag = "App Versions",
    operation_id = "listVersions",
    summary = "List app versions",
    description = "Returns active versions ordered by version code, newest first. Pass `all=true` to include deactivated versions.",
    params(VersionListQuery),
    responses(
        (status = 200, description = "Versions", body = VersionListResponse),
    ),
)]
#[instrument(skip(state))]
pub async fn list_versions(
    State(state): State<AppState>,
    Query(query): Query<VersionListQuery>,
) -> Result<Json<VersionListResponse>, AppError> {
    let versions = VersionService::new(&state.db, &state.config.storage)
        .list(query.all.unwrap_or(false))
        .await?;

    Ok(Json(VersionListResponse {
        data: versions.into_iter().map(VersionResponse::from).collect(),
    }))
}

#[utoipa::path(
    get,
    path = "/latest",
    tag = "App Versions",
    operation_id = "getLatestVersion",
    summary = "Latest active version",
    responses(
        (status = 200, description = "Latest version", body = VersionResponse),
        (status = 404, description = "No version published (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn get_latest_version(
    State(state): State<AppState>,
) -> Result<Json<VersionResponse>, AppError> {
    let version = VersionService::new(&state.db, &state.config.storage)
        .latest()
        .await?;
    Ok(Json(version.into()))
}

#[utoipa::path(
    get,
    path = "/check-update",
    tag = "App Versions",
    operation_id = "checkForUpdate",
    summary = "Check for a newer version",
    description = "Compares the device's `version_code` with the latest active version. `latest_version` is present only when an update is available.",
    params(CheckUpdateQuery),
    responses(
        (status = 200, description = "Update check result", body = CheckUpdateResponse),
        (status = 400, description = "Missing or invalid version code (VALIDATION_ERROR)", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn check_for_update(
    State(state): State<AppState>,
    Query(query): Query<CheckUpdateQuery>,
) -> Result<Json<CheckUpdateResponse>, AppError> {
    let current = query
        .version_code
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::Validation("Current version code is required".into()))?
        .parse::<i32>()
        .map_err(|_| AppError::Validation("Version code must be an integer".into()))?;

    let result = VersionService::new(&state.db, &state.config.storage)
        .check_for_update(current)
        .await?;
    Ok(Json(result))
}

#[utoipa::path(
    get,
    path = "/download/latest",
    tag = "App Versions",
    operation_id = "downloadLatest",
    summary = "Download the latest APK",
    responses(
        (status = 200, description = "APK file", content_type = "application/vnd.android.package-archive"),
        (status = 404, description = "No version or file missing (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn download_latest(State(state): State<AppState>) -> Result<Response, AppError> {
    let versions = VersionService::new(&state.db, &state.config.storage);
    let version = versions.latest().await?;
    versions.increment_download_count(version.id).await?;
    stream_apk(&versions, &version).await
}

#[utoipa::path(
    get,
    path = "/download/{id}",
    tag = "App Versions",
    operation_id = "downloadVersion",
    summary = "Download a specific APK",
    description = "Streams the APK of any version, active or not, and counts the download.",
    params(("id" = i32, Path, description = "Version ID")),
    responses(
        (status = 200, description = "APK file", content_type = "application/vnd.android.package-archive"),
        (status = 404, description = "Version or file not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn download_version(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Response, AppError> {
    let versions = VersionService::new(&state.db, &state.config.storage);
    versions.increment_download_count(id).await?;
    let version = versions.find(id).await?;
    stream_apk(&versions, &version).await
}

async fn stream_apk(
    versions: &VersionService<'_>,
    version: &app_version::Model,
) -> Result<Response, AppError> {
    let path = versions.file_on_disk(version);
    let file = match fs::File::open(&path).await {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(AppError::NotFound("File not found".into()));
        }
        Err(e) => return Err(e.into()),
    };
    let len = file.metadata().await?.len();

    let content_type = mime_guess::from_path(&version.file_name).first_or_octet_stream();

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type.as_ref())
        .header(header::CONTENT_LENGTH, len)
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", version.file_name),
        )
        .body(Body::from_stream(ReaderStream::new(file)))
        .map_err(|e| AppError::Internal(format!("Failed to build response: {e}")))
}

/// Body limit layer for the direct upload route: the APK cap plus room for the form fields.
pub fn apk_upload_body_limit(max_apk_size: u64) -> DefaultBodyLimit {
    DefaultBodyLimit::max(max_apk_size as usize + 64 * 1024)
}

/// Text fields of the direct upload form.
#[derive(Default)]
struct UploadForm {
    version_code: Option<String>,
    version_name: Option<String>,
    release_notes: Option<String>,
    is_mandatory: Option<String>,
}

impl UploadForm {
    fn into_release(self) -> Result<ReleaseMetadata, AppError> {
        let (Some(code), Some(name)) = (
            self.version_code.filter(|c| !c.trim().is_empty()),
            self.version_name.filter(|n| !n.trim().is_empty()),
        ) else {
            return Err(AppError::Validation(
                "Version code and version name are required".into(),
            ));
        };

        let version_code = code
            .trim()
            .parse::<i32>()
            .map_err(|_| AppError::Validation("Version code must be an integer".into()))?;

        Ok(ReleaseMetadata {
            version_code,
            version_name: name.trim().to_string(),
            release_notes: self.release_notes.unwrap_or_default(),
            is_mandatory: matches!(
                self.is_mandatory.as_deref().map(str::trim),
                Some("true" | "1")
            ),
        })
    }
}

async fn field_text(field: Field<'_>) -> Result<String, AppError> {
    field
        .text()
        .await
        .map_err(|e| AppError::Validation(format!("Failed to read form field: {e}")))
}

/// Stream a multipart field into `path`, enforcing `max_size`.
async fn save_field_to_file(
    mut field: Field<'_>,
    path: &FsPath,
    max_size: u64,
) -> Result<u64, AppError> {
    let mut file = fs::File::create(path).await?;
    let mut written = 0u64;

    while let Some(chunk) = field
        .chunk()
        .await
        .map_err(|e| AppError::Validation(format!("Failed to read upload: {e}")))?
    {
        written += chunk.len() as u64;
        if written > max_size {
            return Err(AppError::Validation(format!(
                "APK exceeds maximum size of {max_size} bytes"
            )));
        }
        file.write_all(&chunk).await?;
    }
    file.flush().await?;

    Ok(written)
}

#[utoipa::path(
    post,
    path = "/upload",
    tag = "App Versions",
    operation_id = "uploadVersion",
    summary = "Upload a new version in one request",
    description = "Multipart form with an `apk` file plus `version_code`, `version_name`, optional `release_notes` and `is_mandatory` (`true`/`1`). \
        The version code must exceed the latest active version. Requires `app:manage`.",
    request_body(content_type = "multipart/form-data", description = "APK and release metadata"),
    responses(
        (status = 201, description = "Version created", body = VersionResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 409, description = "Version code too low (VERSION_CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, multipart), fields(user_id = auth_user.user_id))]
pub async fn upload_version(
    auth_user: AuthUser,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_permission("app:manage")?;

    let incoming_dir = state.config.storage.upload_dir.join(".incoming");
    fs::create_dir_all(&incoming_dir).await?;

    let mut temp: Option<PathBuf> = None;
    let result = async {
        let mut form = UploadForm::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::Validation(format!("Multipart error: {e}")))?
        {
            match field.name() {
                Some("apk") => {
                    if temp.is_some() {
                        return Err(AppError::Validation(
                            "Only one APK file may be uploaded".into(),
                        ));
                    }
                    let file_name = field.file_name().unwrap_or_default().to_string();
                    validate_apk_filename(&file_name)
                        .map_err(|e| AppError::Validation(e.message().into()))?;

                    let path = incoming_dir.join(format!("{}.apk", Uuid::new_v4()));
                    temp = Some(path.clone());
                    save_field_to_file(field, &path, state.config.upload.max_apk_size).await?;
                }
                Some("version_code") => form.version_code = Some(field_text(field).await?),
                Some("version_name") => form.version_name = Some(field_text(field).await?),
                Some("release_notes") => form.release_notes = Some(field_text(field).await?),
                Some("is_mandatory") => form.is_mandatory = Some(field_text(field).await?),
                _ => {} // Ignore unknown fields.
            }
        }

        let artifact = temp
            .clone()
            .ok_or_else(|| AppError::Validation("APK file is required".into()))?;
        let release = form.into_release()?;

        VersionService::new(&state.db, &state.config.storage)
            .register(&artifact, &release, Some(auth_user.user_id))
            .await
    }
    .await;

    match result {
        Ok(version) => Ok((StatusCode::CREATED, Json(VersionResponse::from(version)))),
        Err(e) => {
            if let Some(path) = &temp {
                remove_best_effort(path).await;
            }
            Err(e)
        }
    }
}

#[utoipa::path(
    put,
    path = "/versions/{id}",
    tag = "App Versions",
    operation_id = "updateVersion",
    summary = "Update version metadata",
    description = "Changes release notes, the mandatory flag or the active flag. Omitted fields are left unchanged. Requires `app:manage`.",
    params(("id" = i32, Path, description = "Version ID")),
    request_body = UpdateVersionRequest,
    responses(
        (status = 200, description = "Version updated", body = VersionResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Version not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = auth_user.user_id))]
pub async fn update_version(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<UpdateVersionRequest>,
) -> Result<Json<VersionResponse>, AppError> {
    auth_user.require_permission("app:manage")?;

    let version = VersionService::new(&state.db, &state.config.storage)
        .update(id, payload)
        .await?;
    Ok(Json(version.into()))
}

#[utoipa::path(
    delete,
    path = "/versions/{id}",
    tag = "App Versions",
    operation_id = "deleteVersion",
    summary = "Delete a version",
    description = "Removes the version record and its APK file. Requires `app:manage`.",
    params(("id" = i32, Path, description = "Version ID")),
    responses(
        (status = 204, description = "Version deleted"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Version not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn delete_version(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<StatusCode, AppError> {
    auth_user.require_permission("app:manage")?;

    VersionService::new(&state.db, &state.config.storage)
        .delete(id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
