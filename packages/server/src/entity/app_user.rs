use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_FIELD_AGENT: &str = "field_agent";

/// Permissions granted to each role. Roles not listed here get none.
const ROLE_PERMISSIONS: &[(&str, &[&str])] = &[
    (
        ROLE_ADMIN,
        &["app:manage", "cmo:sync", "cmo:read", "cmo:manage"],
    ),
    (ROLE_FIELD_AGENT, &["cmo:sync", "cmo:read"]),
];

/// Resolve the permission list of a role.
pub fn permissions_for(role: &str) -> Vec<String> {
    ROLE_PERMISSIONS
        .iter()
        .find(|(name, _)| *name == role)
        .map(|(_, perms)| perms.iter().map(|p| (*p).to_owned()).collect())
        .unwrap_or_default()
}

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "app_user")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(unique)]
    pub username: String,
    pub password: String,
    pub full_name: Option<String>,
    pub role: String,
    pub is_active: bool,

    pub last_login: Option<DateTimeUtc>,
    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
