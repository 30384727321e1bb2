pub mod app_version;
pub mod auth;
pub mod cmo;
pub mod shared;
pub mod upload;
