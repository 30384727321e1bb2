use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use common::datetime::now_formatted;
use sea_orm::sea_query::{Expr, ExprTrait, Func, LikeExpr};
use sea_orm::*;
use tracing::{info, instrument};

use crate::entity::meter_info;
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::cmo::*;
use crate::models::shared::{Pagination, escape_like, page_params};
use crate::state::AppState;
use crate::sync::BulkSyncService;

#[utoipa::path(
    post,
    path = "/bulk-sync",
    tag = "Field Records",
    operation_id = "bulkSync",
    summary = "Sync a batch of field records",
    description = "Upserts every record by `customer_id` (or `old_consumer_id`) in one transaction. \
        Records that fail are listed in `failed` and do not stop the batch; if none succeed nothing is written. \
        Requires `cmo:sync`.",
    request_body = BulkSyncRequest,
    responses(
        (status = 200, description = "Per-record sync manifest", body = BulkSyncResponse),
        (status = 400, description = "Empty or oversized batch (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = auth_user.user_id, records = payload.cmos.len()))]
pub async fn bulk_sync(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<BulkSyncRequest>,
) -> Result<Json<BulkSyncResponse>, AppError> {
    auth_user.require_permission("cmo:sync")?;

    let manifest = BulkSyncService::new(&state.db, state.config.sync.max_batch_size)
        .sync(auth_user.user_id, payload)
        .await?;
    Ok(Json(manifest))
}

#[utoipa::path(
    get,
    path = "/bulk-stats",
    tag = "Field Records",
    operation_id = "bulkSyncStats",
    summary = "Field record counters",
    description = "Counts active records, overall and created today. Requires `cmo:read`.",
    responses(
        (status = 200, description = "Counters", body = BulkStatsResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn bulk_sync_stats(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<BulkStatsResponse>, AppError> {
    auth_user.require_permission("cmo:read")?;

    let stats = BulkSyncService::new(&state.db, state.config.sync.max_batch_size)
        .stats()
        .await?;
    Ok(Json(stats))
}

#[utoipa::path(
    get,
    path = "/",
    tag = "Field Records",
    operation_id = "listFieldRecords",
    summary = "List field records",
    description = "Active records, newest first. Requires `cmo:read`.",
    params(CmoListQuery),
    responses(
        (status = 200, description = "Paginated records", body = CmoListResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn list_field_records(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<CmoListQuery>,
) -> Result<Json<CmoListResponse>, AppError> {
    auth_user.require_permission("cmo:read")?;

    let (page, per_page) = page_params(query.page, query.per_page);

    let mut select = meter_info::Entity::find().filter(meter_info::Column::IsActive.eq(1));

    if let Some(ref search) = query.search {
        let term = escape_like(search.trim());
        if !term.is_empty() {
            let pattern = format!("%{}%", term.to_lowercase());
            let matches = |col: meter_info::Column| {
                Expr::expr(Func::lower(Expr::col(col)))
                    .like(LikeExpr::new(pattern.clone()).escape('\\'))
            };
            select = select.filter(
                Condition::any()
                    .add(matches(meter_info::Column::CustomerId))
                    .add(matches(meter_info::Column::OldConsumerId)),
            );
        }
    }

    let total = select.clone().count(&state.db).await?;
    let data = select
        .order_by_desc(meter_info::Column::Id)
        .offset((page - 1) * per_page)
        .limit(per_page)
        .all(&state.db)
        .await?;

    Ok(Json(CmoListResponse {
        data,
        pagination: Pagination::new(page, per_page, total),
    }))
}

async fn find_active(db: &DatabaseConnection, id: i32) -> Result<meter_info::Model, AppError> {
    meter_info::Entity::find_by_id(id)
        .filter(meter_info::Column::IsActive.eq(1))
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Field record not found".into()))
}

#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Field Records",
    operation_id = "getFieldRecord",
    summary = "Get a field record",
    description = "Requires `cmo:read`. Deactivated records are not returned.",
    params(("id" = i32, Path, description = "Field record ID")),
    responses(
        (status = 200, description = "Field record (all `meter_info` columns)"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Record not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn get_field_record(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<meter_info::Model>, AppError> {
    auth_user.require_permission("cmo:read")?;

    Ok(Json(find_active(&state.db, id).await?))
}

#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Field Records",
    operation_id = "deactivateFieldRecord",
    summary = "Deactivate a field record",
    description = "Soft delete: the row stays but is excluded from reads and counters. Requires `cmo:manage`.",
    params(("id" = i32, Path, description = "Field record ID")),
    responses(
        (status = 204, description = "Record deactivated"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Record not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn deactivate_field_record(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<StatusCode, AppError> {
    auth_user.require_permission("cmo:manage")?;

    let record = find_active(&state.db, id).await?;

    let mut active: meter_info::ActiveModel = record.into();
    active.is_active = Set(0);
    active.update_by = Set(Some(auth_user.user_id));
    active.update_date = Set(Some(now_formatted()));
    active.update(&state.db).await?;

    info!(record_id = id, "Field record deactivated");
    Ok(StatusCode::NO_CONTENT)
}
