//! # Social CR Repository Cache
//!
//! This library mediates access to local clones of remote repositories for
//! Social CR. Given a remote URL it derives a stable, content-addressed
//! location under a configured cache root, and either reuses the clone
//! already there or creates one.
//!
//! ## Quick Example
//!
//! ```no_run
//! use social_cr::config::FileConfigSource;
//! use social_cr::repository::{GitDriver, RepositoryResolver};
//!
//! let resolver = RepositoryResolver::new(
//!     Box::new(FileConfigSource::default()),
//!     Box::new(GitDriver),
//! );
//!
//! let handle = resolver
//!     .resolve_and_materialize("git@github.com:tcstang/social-cr.git")
//!     .unwrap();
//! let status = resolver.status(&handle).unwrap();
//! println!("{} is on branch {}", handle.path().display(), status.branch);
//! ```
//!
//! ## Core Concepts
//!
//! - **Locators (`locator`)**: split a remote such as
//!   `https://github.com/tcstang/social-cr.git` or
//!   `git@github.com:tcstang/social-cr.git` into host, username and
//!   repository name.
//! - **Cache keys (`cache`)**: the uppercase hex SHA-256 of the concatenated
//!   locator fields. The key is the directory name of the clone, so the same
//!   remote always lands in the same place.
//! - **Resolution (`repository`)**: combines the cache root from
//!   configuration with the key, probes the filesystem, and opens or clones
//!   through an injected `VcsDriver`. Clones are serialized per key.
//! - **Git (`git`)**: the system `git` backed driver operations and
//!   working-tree status parsing.
//! - **Configuration (`config`)** and **logging (`logging`)**: the YAML
//!   configuration source and `env_logger` setup.

pub mod cache;
pub mod config;
pub mod error;
pub mod git;
pub mod locator;
pub mod logging;
pub mod repository;

#[cfg(test)]
mod locator_proptest;

pub use cache::{derive_key, CacheKey};
pub use config::{Config, ConfigSource, FileConfigSource};
pub use error::{Error, Result};
pub use git::{Branch, Diff, WorkingTreeStatus};
pub use locator::RemoteLocator;
pub use repository::{CacheEntry, GitDriver, RepositoryHandle, RepositoryResolver, VcsDriver};
