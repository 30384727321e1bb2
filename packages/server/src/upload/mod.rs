mod assembler;
mod sweeper;

pub use assembler::UploadAssembler;
pub use sweeper::run_session_sweeper;
