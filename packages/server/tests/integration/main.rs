mod app_version;
mod cmo;
mod upload;
