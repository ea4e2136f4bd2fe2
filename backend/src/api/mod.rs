//! HTTP API module.
//!
//! Axum server, request/response types and the SSE log channel.

pub mod logs;
pub mod server;
pub mod types;

pub use logs::*;
pub use server::{router, start_server, AppState};
pub use types::*;
