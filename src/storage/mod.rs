//! Storage module for the resumable-upload backend
//!
//! The backend is treated as a protocol peer: a session is opened once,
//! then the body is written to the returned capability URL in one or more
//! range-addressed PUTs.

mod backend;
mod drive_client;
mod types;

pub use backend::UploadBackend;
pub use drive_client::DriveClient;
pub use types::*;
