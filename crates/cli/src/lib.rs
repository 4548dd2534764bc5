//! Dockhand CLI
//!
//! Command-line client for browsing and editing container filesystems
//! through a running Dockhand dashboard.

pub mod client;
pub mod commands;
pub mod output;
