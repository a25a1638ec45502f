//! Common types and utilities shared across followcheck crates.
//!
//! This crate holds the observability helpers and the shared error type used
//! throughout the workspace. It stays lightweight so every crate can depend on
//! it without pulling in the HTTP or configuration stacks.
//!
//! # Overview
//!
//! - [`observability`]: Centralised tracing/logging initialisation
//! - [`FollowcheckError`] and [`Result`]: Shared error handling
//!
//! # Examples
//!
//! ```rust
//! use followcheck_common::FollowcheckError;
//!
//! let err = FollowcheckError::MissingCredential("IG_USERNAME");
//! assert_eq!(err.to_string(), "IG_USERNAME not found in environment or config");
//! ```

pub mod observability;

/// Name used for log files, data directories and the default config file stem.
pub const APP_NAME: &str = "followcheck";

/// Error types used across the followcheck workspace.
#[derive(thiserror::Error, Debug)]
pub enum FollowcheckError {
    /// A required credential was neither in the environment nor in the config.
    #[error("{0} not found in environment or config")]
    MissingCredential(&'static str),

    /// Reading or writing a local file failed.
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl FollowcheckError {
    pub fn io(path: impl Into<std::path::PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Convenient alias for results that use [`FollowcheckError`].
pub type Result<T> = std::result::Result<T, FollowcheckError>;
