pub mod datetime;
pub mod release;
pub mod size;
pub mod storage;
pub mod upload;

pub use release::ReleaseMetadata;
pub use upload::{SessionStatus, UploadSession};
