//! Content-addressed cache keys and per-key clone exclusion

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use sha2::{Digest, Sha256};

use crate::error::{Error, Result};
use crate::locator::RemoteLocator;

/// Number of hex characters in a rendered SHA-256 digest
pub const CACHE_KEY_LEN: usize = 64;

/// Uppercase hex SHA-256 digest identifying a remote locator.
///
/// Used verbatim as the directory name of the cache entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Derive the cache key for a locator.
///
/// The digest input is `host`, `username` and `repository_name` concatenated
/// without separators, so triples that concatenate to the same string share
/// a key.
///
/// ```
/// use social_cr::cache::derive_key;
/// use social_cr::locator::parse;
///
/// let locator = parse("https://github.com/tcstang/social-cr.git").unwrap();
/// assert_eq!(
///     derive_key(&locator).as_str(),
///     "B4FC1249EE249A31331827A1E90584A85681D647AD657E8305428B9413618E63"
/// );
/// ```
pub fn derive_key(locator: &RemoteLocator) -> CacheKey {
    let mut hasher = Sha256::new();
    hasher.update(locator.host().as_bytes());
    hasher.update(locator.username().as_bytes());
    hasher.update(locator.repository_name().as_bytes());
    CacheKey(hex::encode_upper(hasher.finalize()))
}

/// Process-wide registry of one mutex per cache key.
///
/// Clones for the same key serialize on the same mutex; distinct keys never
/// contend beyond the brief registry lookup. An entry lives only while some
/// caller holds or waits for it, so the map holds at most one mutex per key
/// with a materialization in flight.
#[derive(Debug, Clone, Default)]
pub struct KeyLocks {
    locks: Arc<Mutex<HashMap<CacheKey, Arc<Mutex<()>>>>>,
}

impl KeyLocks {
    /// Create an empty lock registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the mutex guarding `key`, creating it on first use
    pub fn lock_for(&self, key: &CacheKey) -> Result<Arc<Mutex<()>>> {
        let mut locks = self.registry()?;
        Ok(Arc::clone(locks.entry(key.clone()).or_default()))
    }

    /// Run `f` while holding the mutex for `key`.
    ///
    /// The registry entry is dropped afterwards unless another caller still
    /// holds or waits on it.
    pub fn run_exclusive<T>(&self, key: &CacheKey, f: impl FnOnce() -> Result<T>) -> Result<T> {
        let key_lock = self.lock_for(key)?;
        let result = {
            let _guard = key_lock.lock().map_err(|_| Error::LockPoisoned {
                context: format!("clone lock for {}", key),
            })?;
            f()
        };
        drop(key_lock);
        self.prune(key)?;
        result
    }

    /// Check if `key` currently has a registered mutex
    pub fn contains(&self, key: &CacheKey) -> Result<bool> {
        Ok(self.registry()?.contains_key(key))
    }

    /// Number of keys with a registered mutex
    pub fn len(&self) -> Result<usize> {
        Ok(self.registry()?.len())
    }

    /// Check if no key has a registered mutex
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    fn prune(&self, key: &CacheKey) -> Result<()> {
        let mut locks = self.registry()?;
        // Only the registry's own reference left: nobody holds or waits
        if locks.get(key).is_some_and(|lock| Arc::strong_count(lock) == 1) {
            locks.remove(key);
        }
        Ok(())
    }

    fn registry(&self) -> Result<MutexGuard<'_, HashMap<CacheKey, Arc<Mutex<()>>>>> {
        self.locks.lock().map_err(|_| Error::LockPoisoned {
            context: "cache key lock registry".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locator::parse;

    const SOCIAL_CR_KEY: &str = "B4FC1249EE249A31331827A1E90584A85681D647AD657E8305428B9413618E63";

    fn key_of(remote: &str) -> CacheKey {
        derive_key(&parse(remote).unwrap())
    }

    #[test]
    fn test_golden_key() {
        assert_eq!(
            key_of("https://github.com/tcstang/social-cr.git").as_str(),
            SOCIAL_CR_KEY
        );
    }

    #[test]
    fn test_ssh_and_https_share_key() {
        assert_eq!(
            key_of("git@github.com:tcstang/social-cr.git"),
            key_of("https://github.com/tcstang/social-cr.git")
        );
    }

    #[test]
    fn test_key_shape() {
        let key = key_of("https://bitbucket.org/tortoisehg/hgtk");
        assert_eq!(key.as_str().len(), CACHE_KEY_LEN);
        assert_eq!(
            key.as_str(),
            "93FAAA5F035BA8BA96DA5BB0F1AB304DCEA4D7E01E1F383E069DA2DDE7D5AFD1"
        );
        assert!(key
            .as_str()
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
    }

    #[test]
    fn test_distinct_fields_give_distinct_keys() {
        let base = key_of("https://github.com/alice/project");
        assert_ne!(base, key_of("https://gitlab.com/alice/project"));
        assert_ne!(base, key_of("https://github.com/bob/project"));
        assert_ne!(base, key_of("https://github.com/alice/other"));
    }

    #[test]
    fn test_concatenation_collision_is_preserved() {
        // "ab" + "c" + "d" and "a" + "bc" + "d" hash the same bytes
        let left = key_of("https://ab/c/d");
        let right = key_of("https://a/bc/d");
        assert_eq!(left, right);
        assert_eq!(
            left.as_str(),
            "88D4266FD4E6338D13B845FCF289579D209C897823B9217DA3E161936F031589"
        );
    }

    #[test]
    fn test_key_locks_share_mutex_per_key() {
        let locks = KeyLocks::new();
        assert!(locks.is_empty().unwrap());

        let key = key_of("https://github.com/tcstang/social-cr.git");
        let first = locks.lock_for(&key).unwrap();
        let second = locks.lock_for(&key).unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        let other = locks
            .lock_for(&key_of("https://bitbucket.org/tortoisehg/hgtk"))
            .unwrap();
        assert!(!Arc::ptr_eq(&first, &other));
        assert_eq!(locks.len().unwrap(), 2);
    }

    #[test]
    fn test_key_locks_clones_share_registry() {
        let locks = KeyLocks::new();
        let cloned = locks.clone();
        let key = key_of("https://github.com/tcstang/social-cr.git");

        let held = locks.lock_for(&key).unwrap();
        let _guard = held.lock().unwrap();

        let contender = cloned.lock_for(&key).unwrap();
        assert!(contender.try_lock().is_err());
    }

    #[test]
    fn test_run_exclusive_prunes_released_key() {
        let locks = KeyLocks::new();
        let key = key_of("https://github.com/tcstang/social-cr.git");

        let value = locks
            .run_exclusive(&key, || {
                assert!(locks.contains(&key)?);
                Ok(7)
            })
            .unwrap();
        assert_eq!(value, 7);
        assert!(locks.is_empty().unwrap());
    }

    #[test]
    fn test_run_exclusive_keeps_key_while_held_elsewhere() {
        let locks = KeyLocks::new();
        let key = key_of("https://github.com/tcstang/social-cr.git");
        let other = key_of("https://bitbucket.org/tortoisehg/hgtk");
        let held = locks.lock_for(&key).unwrap();

        locks.run_exclusive(&other, || Ok(())).unwrap();
        assert!(locks.contains(&key).unwrap());
        assert!(!locks.contains(&other).unwrap());

        drop(held);
        locks.run_exclusive(&key, || Ok(())).unwrap();
        assert!(locks.is_empty().unwrap());
    }

    #[test]
    fn test_run_exclusive_returns_error_and_prunes() {
        let locks = KeyLocks::new();
        let key = key_of("https://github.com/tcstang/social-cr.git");

        let err = locks
            .run_exclusive(&key, || -> Result<()> {
                Err(Error::LockPoisoned {
                    context: "inner".to_string(),
                })
            })
            .unwrap_err();
        assert!(matches!(err, Error::LockPoisoned { .. }));
        assert!(!locks.contains(&key).unwrap());
    }

    #[test]
    fn test_run_exclusive_serializes_same_key() {
        let locks = KeyLocks::new();
        let key = key_of("https://github.com/tcstang/social-cr.git");
        let active = std::sync::atomic::AtomicUsize::new(0);

        std::thread::scope(|scope| {
            for _ in 0..4 {
                scope.spawn(|| {
                    locks
                        .run_exclusive(&key, || {
                            let inside = active.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                            assert_eq!(inside, 0);
                            std::thread::sleep(std::time::Duration::from_millis(10));
                            active.fetch_sub(1, std::sync::atomic::Ordering::SeqCst);
                            Ok(())
                        })
                        .unwrap();
                });
            }
        });
        assert!(locks.is_empty().unwrap());
    }
}
