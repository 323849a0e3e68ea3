//! Shared types for the videosplit client crates
//!
//! `Secret` keeps session tokens out of logs; `Error` covers configuration
//! loading for the CLI and any crate that reads settings from disk.

mod error;
mod secret;

pub use error::{Error, Result};
pub use secret::Secret;
