//! Dockhand Common Library
//!
//! Container file navigation shared by the web dashboard and the CLI:
//! path navigation, archive transfer and the two-step delete flow, all on
//! top of a [`ContainerRuntime`].

pub mod archive;
pub mod config;
pub mod delete;
pub mod error;
#[cfg(any(test, feature = "test-util"))]
pub mod memory;
pub mod navigator;
pub mod runtime;
pub mod session;
pub mod types;

// Re-export commonly used types
pub use config::DashboardConfig;
pub use delete::{DeleteFlow, DeleteState, PendingDelete};
pub use error::{Error, Result};
#[cfg(any(test, feature = "test-util"))]
pub use memory::MemoryRuntime;
pub use navigator::NavAction;
pub use runtime::{ContainerRuntime, DockerRuntime};
pub use session::{FileNavigator, Session, SessionAction, SessionView, TransferView};
pub use types::*;

/// Dockhand version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default store path
pub fn default_store_path() -> std::path::PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join(".dockhand")
}

/// Home directory helper
mod dirs {
    pub fn home_dir() -> Option<std::path::PathBuf> {
        std::env::var_os("HOME").map(std::path::PathBuf::from)
    }
}
