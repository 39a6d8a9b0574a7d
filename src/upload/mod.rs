//! Relayed Upload Module
//!
//! Brokers the backend's resumable-upload protocol for browser clients:
//! - Session Initiator opens a backend session and hands out an opaque id
//! - Chunk Relay forwards ordered byte ranges and tracks progress
//! - Single-Shot Relay forwards small files in one write
//! - Session Store keeps per-session state and sweeps stale entries
//!
//! Protocol Flow:
//! 1. Client creates a session (single-shot or chunked)
//! 2. Client PUTs the body once, or each chunk in index order
//! 3. The final acknowledgment returns the created file id
//! 4. The session is removed on completion or by the sweeper

pub mod initiator;
pub mod plan;
pub mod relay;
pub mod session;
pub mod types;

#[cfg(test)]
pub(crate) mod mocks;

pub use initiator::{SessionInitiator, UploadRequest};
pub use plan::ChunkPlan;
pub use relay::{session_status, ChunkRelay, SingleShotRelay};
pub use session::{InMemorySessionStore, SessionStore};
pub use types::*;
