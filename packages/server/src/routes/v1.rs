use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

use crate::config::AppConfig;
use crate::handlers;
use crate::state::AppState;

pub fn routes(config: &AppConfig) -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .nest("/auth", auth_routes())
        .nest("/app", app_routes(config))
        .nest("/cmo", cmo_routes())
}

fn auth_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::auth::login))
        .routes(routes!(handlers::auth::me))
}

fn app_routes(config: &AppConfig) -> OpenApiRouter<AppState> {
    let versions = OpenApiRouter::new()
        .routes(routes!(handlers::app_version::list_versions))
        .routes(routes!(handlers::app_version::get_latest_version))
        .routes(routes!(handlers::app_version::check_for_update))
        .routes(routes!(handlers::app_version::download_latest))
        .routes(routes!(handlers::app_version::download_version))
        .routes(routes!(
            handlers::app_version::update_version,
            handlers::app_version::delete_version
        ))
        .routes(routes!(handlers::upload::init_upload))
        .routes(routes!(
            handlers::upload::get_upload_status,
            handlers::upload::abort_upload
        ))
        .routes(routes!(handlers::upload::complete_upload));

    let direct_upload = OpenApiRouter::new()
        .routes(routes!(handlers::app_version::upload_version))
        .layer(handlers::app_version::apk_upload_body_limit(
            config.upload.max_apk_size,
        ));

    let chunks = OpenApiRouter::new()
        .routes(routes!(handlers::upload::upload_chunk))
        .layer(handlers::upload::chunk_body_limit(config.upload.max_chunk_size));

    versions.merge(direct_upload).merge(chunks)
}

fn cmo_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::cmo::bulk_sync))
        .routes(routes!(handlers::cmo::bulk_sync_stats))
        .routes(routes!(handlers::cmo::list_field_records))
        .routes(routes!(
            handlers::cmo::get_field_record,
            handlers::cmo::deactivate_field_record
        ))
}
