use axum::extract::{DefaultBodyLimit, Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use common::size::format_file_size;
use tracing::instrument;

use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::upload::*;
use crate::state::AppState;
use crate::version::VersionService;

#[utoipa::path(
    post,
    path = "/upload/init",
    tag = "Chunked Upload",
    operation_id = "initUpload",
    summary = "Start a chunked upload",
    description = "Opens an upload session for an APK sent in `total_chunks` pieces. Requires `app:manage`.",
    request_body = InitUploadRequest,
    responses(
        (status = 201, description = "Session opened", body = InitUploadResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = auth_user.user_id))]
pub async fn init_upload(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<InitUploadRequest>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_permission("app:manage")?;

    let session = state.assembler.initiate(payload).await?;

    Ok((
        StatusCode::CREATED,
        Json(InitUploadResponse {
            upload_id: session.upload_id,
            total_chunks: session.total_chunks,
            max_chunk_size: state.assembler.limits().max_chunk_size,
        }),
    ))
}

/// Body limit layer for the chunk route.
pub fn chunk_body_limit(max_chunk_size: u64) -> DefaultBodyLimit {
    DefaultBodyLimit::max(max_chunk_size as usize + 4096)
}

#[utoipa::path(
    post,
    path = "/upload/chunk",
    tag = "Chunked Upload",
    operation_id = "uploadChunk",
    summary = "Upload one chunk",
    description = "Multipart form with `upload_id`, `chunk_index` (0-based) and the `chunk` bytes. \
        Re-sending an index replaces the stored bytes. Requires `app:manage`.",
    request_body(content_type = "multipart/form-data", description = "Chunk and its position"),
    responses(
        (status = 200, description = "Chunk stored", body = ChunkUploadResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Upload session not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Upload is being completed (INVALID_STATE)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, multipart), fields(user_id = auth_user.user_id))]
pub async fn upload_chunk(
    auth_user: AuthUser,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ChunkUploadResponse>, AppError> {
    auth_user.require_permission("app:manage")?;

    let mut upload_id: Option<String> = None;
    let mut chunk_index: Option<String> = None;
    let mut chunk: Option<Vec<u8>> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Multipart error: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "upload_id" | "chunk_index" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::Validation(format!("Failed to read {name}: {e}")))?;
                if name == "upload_id" {
                    upload_id = Some(text);
                } else {
                    chunk_index = Some(text);
                }
            }
            "chunk" => {
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(format!("Failed to read chunk: {e}")))?;
                chunk = Some(data.to_vec());
            }
            _ => {}
        }
    }

    let (Some(upload_id), Some(chunk_index), Some(chunk)) = (upload_id, chunk_index, chunk) else {
        return Err(AppError::Validation(
            "Upload ID, chunk index and chunk data are required".into(),
        ));
    };
    let upload_id = upload_id.trim().to_string();
    let chunk_index = chunk_index
        .trim()
        .parse::<u32>()
        .map_err(|_| AppError::Validation("Chunk index must be a non-negative integer".into()))?;

    let session = state
        .assembler
        .upload_chunk(&upload_id, chunk_index, &chunk)
        .await?;

    Ok(Json(ChunkUploadResponse {
        received_count: session.received_count(),
        total_chunks: session.total_chunks,
        upload_id: session.upload_id,
        chunk_index,
    }))
}

#[utoipa::path(
    get,
    path = "/upload/{upload_id}",
    tag = "Chunked Upload",
    operation_id = "getUploadStatus",
    summary = "Upload progress",
    description = "Lists received and missing chunk indices so an interrupted client can resume. Requires `app:manage`.",
    params(("upload_id" = String, Path, description = "Upload session ID")),
    responses(
        (status = 200, description = "Session progress", body = UploadStatusResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Upload session not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn get_upload_status(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(upload_id): Path<String>,
) -> Result<Json<UploadStatusResponse>, AppError> {
    auth_user.require_permission("app:manage")?;

    let session = state.assembler.status(&upload_id).await?;
    Ok(Json(session.into()))
}

#[utoipa::path(
    delete,
    path = "/upload/{upload_id}",
    tag = "Chunked Upload",
    operation_id = "abortUpload",
    summary = "Abort an upload",
    description = "Discards the session and every stored chunk. Requires `app:manage`.",
    params(("upload_id" = String, Path, description = "Upload session ID")),
    responses(
        (status = 204, description = "Upload aborted"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Upload session not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Upload is being completed (INVALID_STATE)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn abort_upload(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(upload_id): Path<String>,
) -> Result<StatusCode, AppError> {
    auth_user.require_permission("app:manage")?;

    state.assembler.abort(&upload_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/upload/complete",
    tag = "Chunked Upload",
    operation_id = "completeUpload",
    summary = "Finish a chunked upload",
    description = "Assembles the chunks in index order and registers the result as a new version. \
        Fails without side effects if a chunk is missing or the version code is not newer than the latest active version. \
        Requires `app:manage`.",
    request_body = CompleteUploadRequest,
    responses(
        (status = 201, description = "Version created", body = CompleteUploadResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Upload session not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Missing chunks, completion in progress or version conflict (INCOMPLETE_UPLOAD, INVALID_STATE, VERSION_CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = auth_user.user_id, upload_id = %payload.upload_id))]
pub async fn complete_upload(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CompleteUploadRequest>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_permission("app:manage")?;

    let upload_id = payload.upload_id.trim();
    if upload_id.is_empty() {
        return Err(AppError::Validation("Upload ID is required".into()));
    }

    let versions = VersionService::new(&state.db, &state.config.storage);
    let version = state
        .assembler
        .complete(upload_id, &versions, Some(auth_user.user_id))
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(CompleteUploadResponse {
            id: version.id,
            file_size_formatted: format_file_size(version.file_size.max(0) as u64),
            file_name: version.file_name,
            file_path: version.file_path,
            file_size: version.file_size,
            version_code: version.version_code,
            version_name: version.version_name,
        }),
    ))
}
