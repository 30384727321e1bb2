mod service;

pub use service::{VersionService, latest_active, move_file, remove_best_effort};
