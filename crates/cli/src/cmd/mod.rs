//! CLI command implementations

pub mod changes;
pub mod config;
pub mod follow;
pub mod gc;
pub mod get;
pub mod init;
pub mod put;
pub mod rebuild;
pub mod search;
pub mod status;
pub mod sync;
