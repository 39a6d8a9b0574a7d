//! Drive Relay Server Library
//!
//! Exposes the server's building blocks for integration tests.
//! The server binary is in main.rs.
//!
//! # Modules
//!
//! - `upload`: Session creation, chunk and single-shot relays, session store
//! - `storage`: Backend trait and the Google Drive resumable-upload client
//! - `credentials`: Access-token providers for the backend
//! - `routes`: HTTP surface

pub mod config;
pub mod credentials;
pub mod error;
pub mod routes;
pub mod state;
pub mod storage;
pub mod upload;
