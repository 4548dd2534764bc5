//! CLI Commands

pub mod containers;
pub mod fs;
pub mod serve;
