use sea_orm::*;
use tracing::{info, warn};

use crate::config::AuthConfig;
use crate::entity::app_user;
use crate::utils::hash;

/// Create the bootstrap admin account from configuration.
///
/// Does nothing when no credentials are configured or the username already
/// exists. An existing account is never modified, so rotating the configured
/// password does not reset a password changed afterwards.
pub async fn seed_admin(db: &DatabaseConnection, auth: &AuthConfig) -> Result<(), DbErr> {
    let (Some(username), Some(password)) = (
        auth.admin_username.as_deref().map(str::trim).filter(|u| !u.is_empty()),
        auth.admin_password.as_deref().filter(|p| !p.is_empty()),
    ) else {
        warn!("No bootstrap admin configured; set auth.admin_username and auth.admin_password");
        return Ok(());
    };

    let exists = app_user::Entity::find()
        .filter(app_user::Column::Username.eq(username))
        .count(db)
        .await?
        > 0;
    if exists {
        return Ok(());
    }

    let password_hash =
        hash::hash_password(password).map_err(|e| DbErr::Custom(format!("Password hash error: {e}")))?;

    let model = app_user::ActiveModel {
        username: Set(username.to_string()),
        password: Set(password_hash),
        full_name: Set(Some("Administrator".into())),
        role: Set(app_user::ROLE_ADMIN.into()),
        is_active: Set(true),
        last_login: Set(None),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };

    let result = app_user::Entity::insert(model)
        .on_conflict(
            sea_orm::sea_query::OnConflict::column(app_user::Column::Username)
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(db)
        .await;

    match result {
        Ok(_) => info!(username, "Seeded bootstrap admin account"),
        Err(DbErr::RecordNotInserted) => {}
        Err(e) => return Err(e),
    }

    Ok(())
}
