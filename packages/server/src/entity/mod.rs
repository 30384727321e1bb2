pub mod app_user;
pub mod app_version;
pub mod meter_info;
