//! CLI command implementations.

pub mod common;
pub mod info;
pub mod init;
pub mod resolve;
pub mod tile;
