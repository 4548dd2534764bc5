//! Dockhand Web Dashboard
//!
//! HTTP API and embedded page for browsing container filesystems.

pub mod error;
pub mod files;
pub mod server;
pub mod sessions;
pub mod static_files;

pub use error::{ApiError, ApiResult};
pub use server::{AppState, WebServer, WebServerConfig};
pub use sessions::SessionStore;
