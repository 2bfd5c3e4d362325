//! CLI command modules.

pub mod bind;
pub mod http;
pub mod sessions;
pub mod status;
