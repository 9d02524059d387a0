//! HTTP API module.
//!
//! This module provides the HTTP server, request/response types and the
//! log broadcaster.

pub mod logs;
pub mod server;
pub mod types;

pub use server::{build_router, start_server, ServerConfig};
pub use types::*;
pub use logs::*;
