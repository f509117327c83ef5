//! CLI command implementations

pub mod utils;

pub mod asset;
pub mod category;
pub mod completions;
pub mod config;
pub mod id;
pub mod init;
pub mod permit;
pub mod reqf;
pub mod request;
pub mod sync;
pub mod validate;
