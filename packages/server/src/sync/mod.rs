mod service;

pub use service::BulkSyncService;
