//! # Archetype Library
//!
//! This library exposes the archetype application modules for testing and
//! integration.
//!
//! The main binary uses these modules through the `main.rs` entry point.

pub mod api;
pub mod cli;
pub mod config;
pub mod response;

// Re-export archetype_core for convenience
pub use archetype_core;

use archetype_core::{DataError, LookupError, OverrideError};
use std::path::PathBuf;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

/// Errors surfaced by commands and the server.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Data(#[from] DataError),

    #[error(transparent)]
    Override(#[from] OverrideError),

    #[error(transparent)]
    Lookup(#[from] LookupError),

    #[error("JSON output error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0} data issues with warnings")]
    Validation(usize),

    #[error("server error: {0}")]
    Server(std::io::Error),
}

/// Initialize logging to stderr.
///
/// `filter` uses `EnvFilter` syntax; an invalid filter falls back to `info`.
pub fn init_logging(filter: &str) {
    let filter = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("info"));
    // A subscriber may already be installed (tests).
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
