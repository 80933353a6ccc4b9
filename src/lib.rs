pub mod archive;
pub mod auth;
pub mod config;
pub mod error;
pub mod notify;
pub mod progress;
pub mod services;
pub mod store;
pub mod types;

pub use error::{ArchiveError, Result};
