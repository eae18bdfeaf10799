//! Remote URL parsing
//!
//! A remote is decomposed positionally: after splitting on `/` and `:`, the
//! last token is the repository name, the one before it the username, and
//! the one before that the host. The same rule covers both
//! `https://host/user/repo.git` and the SSH shorthand `git@host:user/repo.git`.

use std::fmt;
use std::str::FromStr;

use crate::cache::{derive_key, CacheKey};
use crate::error::{Error, Result};

const DELIMITERS: [char; 2] = ['/', ':'];
const VCS_SUFFIX: &str = ".git";

/// Host, username and repository name extracted from a remote
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RemoteLocator {
    host: String,
    username: String,
    repository_name: String,
}

impl RemoteLocator {
    /// Parse a remote URL into its locator.
    ///
    /// ```
    /// use social_cr::locator::RemoteLocator;
    ///
    /// let locator = RemoteLocator::parse("git@github.com:tcstang/social-cr.git").unwrap();
    /// assert_eq!(locator.host(), "github.com");
    /// assert_eq!(locator.username(), "tcstang");
    /// assert_eq!(locator.repository_name(), "social-cr");
    /// ```
    pub fn parse(remote: &str) -> Result<Self> {
        let trimmed = remote.trim().trim_end_matches('/');
        let tokens: Vec<&str> = trimmed.split(DELIMITERS).collect();

        let [.., host, username, repository] = tokens[..] else {
            return Err(malformed(
                remote,
                format!(
                    "expected at least 3 segments separated by '/' or ':', found {}",
                    tokens.len()
                ),
            ));
        };

        // Drop an authentication prefix such as `git@` or `user:token@`
        let host = host.rsplit('@').next().unwrap_or(host);
        let repository_name = repository.strip_suffix(VCS_SUFFIX).unwrap_or(repository);

        for (field, value) in [
            ("host", host),
            ("username", username),
            ("repository name", repository_name),
        ] {
            if value.is_empty() {
                return Err(malformed(remote, format!("{} is empty", field)));
            }
        }

        Ok(Self {
            host: host.to_string(),
            username: username.to_string(),
            repository_name: repository_name.to_string(),
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn repository_name(&self) -> &str {
        &self.repository_name
    }

    /// Derive the content-addressed cache key for this locator
    pub fn cache_key(&self) -> CacheKey {
        derive_key(self)
    }
}

impl FromStr for RemoteLocator {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for RemoteLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.host, self.username, self.repository_name)
    }
}

/// Parse a remote URL into its locator
pub fn parse(remote: &str) -> Result<RemoteLocator> {
    RemoteLocator::parse(remote)
}

fn malformed(remote: &str, message: String) -> Error {
    Error::MalformedRemote {
        remote: remote.to_string(),
        message,
    }
}
