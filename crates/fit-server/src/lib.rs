//! TCP daemon for fit.
//!
//! Serves one repository: clients push packs into it and fetch branch
//! histories out of it using the `fit-protocol` request headers.

pub mod config;
pub mod error;
pub mod handler;
pub mod server;

pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use handler::{RepoService, Served, LEGACY_BRANCH};
pub use server::Daemon;
