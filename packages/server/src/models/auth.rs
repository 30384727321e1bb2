use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Request body for user login.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct LoginRequest {
    /// Username of the account to log into.
    #[schema(example = "agent_rahim")]
    pub username: String,
    /// Account password.
    #[schema(example = "s3cure_P@ss!")]
    pub password: String,
}

pub fn validate_login_request(payload: &LoginRequest) -> Result<(), AppError> {
    if payload.username.trim().is_empty() {
        return Err(AppError::Validation("Username must not be empty".into()));
    }
    if payload.password.is_empty() {
        return Err(AppError::Validation("Password must not be empty".into()));
    }
    Ok(())
}

/// Successful login response.
#[derive(Serialize, utoipa::ToSchema)]
pub struct LoginResponse {
    /// JWT bearer token valid for 7 days.
    #[schema(example = "eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9...")]
    pub token: String,
    #[schema(example = 7)]
    pub id: i32,
    #[schema(example = "agent_rahim")]
    pub username: String,
    #[schema(example = "Rahim Uddin")]
    pub full_name: Option<String>,
    #[schema(example = "field_agent")]
    pub role: String,
    /// Permissions granted to the user.
    #[schema(example = json!(["cmo:sync", "cmo:read"]))]
    pub permissions: Vec<String>,
    pub last_login: Option<DateTime<Utc>>,
}

/// Current authenticated user's profile.
#[derive(Serialize, utoipa::ToSchema)]
pub struct MeResponse {
    #[schema(example = 7)]
    pub id: i32,
    #[schema(example = "agent_rahim")]
    pub username: String,
    #[schema(example = "field_agent")]
    pub role: String,
    #[schema(example = json!(["cmo:sync", "cmo:read"]))]
    pub permissions: Vec<String>,
}
