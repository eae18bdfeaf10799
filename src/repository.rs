//! # Repository Cache Resolver
//!
//! This module provides the `RepositoryResolver`, which turns a remote URL
//! into a usable local clone. Every remote maps to exactly one directory
//! under the configured cache root, named by the remote's `CacheKey`, so
//! repeated requests for the same remote converge on the same clone without
//! any persisted mapping table.
//!
//! ## Design
//!
//! The resolver separates the decision logic from the concrete side effects
//! through two traits:
//!
//! - **`VcsDriver`**: open an existing clone, clone a remote, and inspect a
//!   clone's status and diff. `GitDriver` wraps the system `git` command.
//!
//! - **`FilesystemOperations`**: the existence probe and directory creation
//!   the resolver needs. `DefaultFilesystemOperations` uses `std::fs`.
//!
//! Both are injected at construction, so a driver is built once by the
//! process owner and reused, and tests can count clone calls without
//! touching the network.
//!
//! ## Concurrency
//!
//! The existence probe and the clone form a check-then-act sequence.
//! Materialization therefore runs under two guards for its cache key: a
//! mutex from the process-wide `KeyLocks` registry (threads) and an exclusive
//! advisory lock on `<cache_root>/.<KEY>.lock` (processes). The existence
//! probe is repeated once both guards are held; callers that lost the race
//! open the clone made by the winner.

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use file_guard::Lock;
use log::{debug, info};

use crate::cache::{CacheKey, KeyLocks};
use crate::config::ConfigSource;
use crate::error::{Error, Result};
use crate::git::{Diff, WorkingTreeStatus};
use crate::locator::RemoteLocator;

/// A local clone that has been opened or freshly materialized
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryHandle {
    path: PathBuf,
}

impl RepositoryHandle {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Root of the working tree
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Resolved on-disk location for a remote
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub cache_key: CacheKey,
    pub local_path: PathBuf,
    /// Whether `local_path` existed when the entry was resolved
    pub exists: bool,
}

/// Trait for version-control operations - allows mocking in tests
pub trait VcsDriver: Send + Sync {
    /// Open an existing clone, failing with `Error::Open` if `path` is not
    /// a usable repository.
    fn open_existing(&self, path: &Path) -> Result<RepositoryHandle>;

    /// Clone `url` into `destination`, failing with `Error::CloneFailed`.
    ///
    /// The parent of `destination` exists when this is called.
    fn clone_remote(&self, url: &str, destination: &Path) -> Result<RepositoryHandle>;

    /// Report branch, staged and untracked files of a clone
    fn status(&self, handle: &RepositoryHandle) -> Result<WorkingTreeStatus>;

    /// Raw textual diff of a clone's working tree
    fn diff(&self, handle: &RepositoryHandle) -> Result<Diff>;
}

/// The filesystem primitives the resolver relies on.
pub trait FilesystemOperations: Send + Sync {
    /// Check if something exists at `path`
    fn exists(&self, path: &Path) -> bool;

    /// Create `path` and all missing parents
    fn create_dir_all(&self, path: &Path) -> Result<()>;

    /// Open (creating if needed) the file used as a cross-process clone lock
    fn open_lock_file(&self, path: &Path) -> Result<File>;
}

/// The default implementation of `VcsDriver`, which uses the system's
/// `git` command to perform real Git operations.
#[derive(Debug, Default, Clone, Copy)]
pub struct GitDriver;

impl VcsDriver for GitDriver {
    fn open_existing(&self, path: &Path) -> Result<RepositoryHandle> {
        crate::git::verify_repository(path)?;
        Ok(RepositoryHandle::new(path))
    }

    fn clone_remote(&self, url: &str, destination: &Path) -> Result<RepositoryHandle> {
        crate::git::clone_into(url, destination)?;
        Ok(RepositoryHandle::new(destination))
    }

    fn status(&self, handle: &RepositoryHandle) -> Result<WorkingTreeStatus> {
        crate::git::status(handle.path())
    }

    fn diff(&self, handle: &RepositoryHandle) -> Result<Diff> {
        crate::git::diff(handle.path())
    }
}

/// The default implementation of `FilesystemOperations`, backed by the host
/// filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultFilesystemOperations;

impl FilesystemOperations for DefaultFilesystemOperations {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        fs::create_dir_all(path)?;
        Ok(())
    }

    fn open_lock_file(&self, path: &Path) -> Result<File> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;
        Ok(file)
    }
}

/// Maps remotes to cache entries and materializes clones on demand.
pub struct RepositoryResolver {
    config: Box<dyn ConfigSource>,
    driver: Box<dyn VcsDriver>,
    fs_ops: Box<dyn FilesystemOperations>,
    key_locks: KeyLocks,
}

impl RepositoryResolver {
    /// Creates a resolver over the host filesystem.
    pub fn new(config: Box<dyn ConfigSource>, driver: Box<dyn VcsDriver>) -> Self {
        Self::with_operations(config, driver, Box::new(DefaultFilesystemOperations))
    }

    /// Creates a resolver with a custom `FilesystemOperations` implementation.
    pub fn with_operations(
        config: Box<dyn ConfigSource>,
        driver: Box<dyn VcsDriver>,
        fs_ops: Box<dyn FilesystemOperations>,
    ) -> Self {
        Self {
            config,
            driver,
            fs_ops,
            key_locks: process_key_locks(),
        }
    }

    /// Compute where `remote` lives in the cache and whether it is there.
    ///
    /// Touches the filesystem only to probe for existence.
    pub fn resolve(&self, remote: &str) -> Result<CacheEntry> {
        let locator = RemoteLocator::parse(remote)?;
        let cache_key = locator.cache_key();
        let cache_root = self.config.get_config()?.repo_path;
        let local_path = cache_root.join(cache_key.as_str());
        let exists = self.fs_ops.exists(&local_path);

        debug!(
            "Resolved {} ({}) to {} (exists: {})",
            remote,
            locator,
            local_path.display(),
            exists
        );

        Ok(CacheEntry {
            cache_key,
            local_path,
            exists,
        })
    }

    /// Ensure a usable clone of `remote` exists in the cache and return it.
    ///
    /// Opens the cached clone when present, otherwise clones `remote` into
    /// the cache. At most one clone per cache key runs at a time; concurrent
    /// callers for the same remote wait and then open the finished clone.
    pub fn resolve_and_materialize(&self, remote: &str) -> Result<RepositoryHandle> {
        let entry = self.resolve(remote)?;
        let cache_root = entry
            .local_path
            .parent()
            .map(Path::to_path_buf)
            .ok_or_else(|| Error::Configuration {
                message: format!(
                    "cache entry {} has no parent directory",
                    entry.local_path.display()
                ),
                hint: None,
            })?;
        if !entry.exists {
            self.ensure_cache_root(&cache_root)?;
        }

        // Held even for existing entries so a clone in progress is never
        // mistaken for a finished one.
        self.key_locks.run_exclusive(&entry.cache_key, || {
            let lock_path = cache_root.join(format!(".{}.lock", entry.cache_key));
            let lock_file = self.fs_ops.open_lock_file(&lock_path)?;
            let _process_guard = file_guard::lock(&lock_file, Lock::Exclusive, 0, 1)?;

            if self.fs_ops.exists(&entry.local_path) {
                debug!("Found existing repository at {}", entry.local_path.display());
                return self.driver.open_existing(&entry.local_path);
            }

            info!("Cloning {} into {}", remote, entry.local_path.display());
            self.driver.clone_remote(remote, &entry.local_path)
        })
    }

    /// Working-tree status of a materialized clone
    pub fn status(&self, handle: &RepositoryHandle) -> Result<WorkingTreeStatus> {
        self.driver.status(handle)
    }

    /// Raw diff of a materialized clone
    pub fn diff(&self, handle: &RepositoryHandle) -> Result<Diff> {
        self.driver.diff(handle)
    }

    fn ensure_cache_root(&self, cache_root: &Path) -> Result<()> {
        if self.fs_ops.exists(cache_root) {
            return Ok(());
        }
        self.fs_ops
            .create_dir_all(cache_root)
            .map_err(|e| Error::Configuration {
                message: format!(
                    "cannot create cache root {}: {}",
                    cache_root.display(),
                    e
                ),
                hint: Some("Point 'repo_path' at a writable directory".to_string()),
            })
    }
}

/// Registry shared by every resolver in the process
fn process_key_locks() -> KeyLocks {
    static LOCKS: OnceLock<KeyLocks> = OnceLock::new();
    LOCKS.get_or_init(KeyLocks::new).clone()
}
