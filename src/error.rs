//! # Error Handling
//!
//! This module defines the centralized error type for `social-cr`. It uses
//! `thiserror` to describe every failure the cache mediator can report, so
//! that callers always receive a typed failure instead of a logged message
//! followed by a silent return.
//!
//! ## Key Components
//!
//! - **`Error`**: The enum of all failure modes. The first four variants map
//!   one-to-one onto the failures a caller of the resolver must be prepared
//!   to handle:
//!   - `MalformedRemote`: the remote string cannot be decomposed into
//!     host, username and repository name.
//!   - `Configuration`: no usable cache root could be obtained.
//!   - `CloneFailed`: the version-control driver failed to clone.
//!   - `Open`: a cache entry exists on disk but is not a usable repository.
//!
//!   The remaining variants cover inspection commands, lock poisoning,
//!   logger installation and wrapped library errors.
//!
//! - **`Result<T>`**: A type alias for `std::result::Result<T, Error>`.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for social-cr operations
#[derive(Error, Debug)]
pub enum Error {
    /// The remote URL could not be split into host, username and repository.
    #[error("Malformed remote '{remote}': {message}")]
    MalformedRemote { remote: String, message: String },

    /// The configuration source could not supply a usable cache root.
    ///
    /// Includes an optional hint about how to fix the configuration.
    #[error("Configuration error: {message}{}", hint.as_ref().map(|h| format!("\n  hint: {}", h)).unwrap_or_default())]
    Configuration {
        message: String,
        /// Optional hint for how to fix the configuration issue
        hint: Option<String>,
    },

    /// Cloning a remote into the cache failed.
    ///
    /// The underlying cause reported by the driver is preserved in `message`.
    #[error("Git clone error for {url} into {}: {message}{}", destination.display(), hint.as_ref().map(|h| format!("\n  hint: {}", h)).unwrap_or_default())]
    CloneFailed {
        url: String,
        destination: PathBuf,
        message: String,
        /// Optional hint for how to resolve the clone issue
        hint: Option<String>,
    },

    /// A cache entry exists but could not be opened as a repository.
    #[error("Cannot open repository at {}: {message}", path.display())]
    Open { path: PathBuf, message: String },

    /// A read-only git command (status, diff) failed.
    #[error("Git command failed in {}: {command} - {stderr}", path.display())]
    GitCommand {
        command: String,
        path: PathBuf,
        stderr: String,
    },

    /// A mutex guarding clone exclusion has been poisoned.
    #[error("Lock poisoned: {context}")]
    LockPoisoned { context: String },

    /// The logger could not be installed.
    #[error("Logging setup error: {message}")]
    Logging { message: String },

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
