//! Property-based tests for remote parsing and cache key derivation.
//!
//! These tests use proptest to generate random remotes and verify that
//! invariants hold for all of them.

#[cfg(test)]
mod proptest_tests {
    use crate::cache::{derive_key, CACHE_KEY_LEN};
    use crate::error::Error;
    use crate::locator::parse;
    use proptest::prelude::*;

    /// Segment that contains no delimiter and no `@`
    fn segment() -> impl Strategy<Value = String> {
        "[a-zA-Z0-9_-][a-zA-Z0-9._-]{0,15}".prop_filter("no .git suffix", |s| !s.ends_with(".git"))
    }

    fn host() -> impl Strategy<Value = String> {
        "[a-z0-9-]{1,12}\\.(com|org|io|net)"
    }

    // ============================================================================
    // parse property tests
    // ============================================================================

    proptest! {
        /// Property: URL form recovers the exact triple
        #[test]
        fn parse_url_form_recovers_fields(
            host in host(),
            user in segment(),
            repo in segment(),
            suffix in prop::bool::ANY,
        ) {
            let remote = format!(
                "https://{}/{}/{}{}",
                host, user, repo, if suffix { ".git" } else { "" }
            );
            let locator = parse(&remote).unwrap();
            prop_assert_eq!(locator.host(), host.as_str());
            prop_assert_eq!(locator.username(), user.as_str());
            prop_assert_eq!(locator.repository_name(), repo.as_str());
        }

        /// Property: SSH shorthand and URL form agree
        #[test]
        fn parse_ssh_and_url_forms_agree(host in host(), user in segment(), repo in segment()) {
            let url = parse(&format!("https://{}/{}/{}.git", host, user, repo)).unwrap();
            let ssh = parse(&format!("git@{}:{}/{}.git", host, user, repo)).unwrap();
            prop_assert_eq!(url, ssh);
        }

        /// Property: input without any delimiter is always rejected
        #[test]
        fn parse_rejects_undelimited_input(input in "[^/:]*") {
            let is_malformed = matches!(parse(&input), Err(Error::MalformedRemote { .. }));
            prop_assert!(is_malformed);
        }

        /// Property: parse never panics
        #[test]
        fn parse_never_panics(input in ".*") {
            let _ = parse(&input);
        }
    }

    // ============================================================================
    // derive_key property tests
    // ============================================================================

    proptest! {
        /// Property: keys are 64 uppercase hex characters
        #[test]
        fn derive_key_shape(host in host(), user in segment(), repo in segment()) {
            let key = derive_key(&parse(&format!("https://{}/{}/{}", host, user, repo)).unwrap());
            prop_assert_eq!(key.as_str().len(), CACHE_KEY_LEN);
            prop_assert!(key.as_str().bytes().all(|b| b.is_ascii_digit() || (b'A'..=b'F').contains(&b)));
        }

        /// Property: derivation is deterministic
        #[test]
        fn derive_key_is_deterministic(host in host(), user in segment(), repo in segment()) {
            let remote = format!("https://{}/{}/{}", host, user, repo);
            let first = derive_key(&parse(&remote).unwrap());
            let second = derive_key(&parse(&remote).unwrap());
            prop_assert_eq!(first, second);
        }

        /// Property: different concatenations give different keys
        #[test]
        fn derive_key_separates_distinct_concatenations(
            a in (host(), segment(), segment()),
            b in (host(), segment(), segment()),
        ) {
            prop_assume!(format!("{}{}{}", a.0, a.1, a.2) != format!("{}{}{}", b.0, b.1, b.2));
            let key_a = derive_key(&parse(&format!("https://{}/{}/{}", a.0, a.1, a.2)).unwrap());
            let key_b = derive_key(&parse(&format!("https://{}/{}/{}", b.0, b.1, b.2)).unwrap());
            prop_assert_ne!(key_a, key_b);
        }
    }
}
