//! CLI commands

pub mod cache;
pub mod request;
pub mod session;
