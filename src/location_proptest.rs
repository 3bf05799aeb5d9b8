//! Property-based tests for mirror location rewriting.
//!
//! These tests use proptest to generate random URLs and settings and verify
//! that the rewriting invariants hold for all of them.

#[cfg(test)]
mod proptest_tests {
    use crate::location::{redact_credentials, rewrite};
    use proptest::prelude::*;

    fn scheme() -> impl Strategy<Value = &'static str> {
        prop_oneof![Just("http://"), Just("https://")]
    }

    // ============================================================================
    // pass-through property tests
    // ============================================================================

    proptest! {
        /// Property: anything that is not an http(s) URL comes back unchanged
        #[test]
        fn non_http_urls_pass_through(
            url in "[a-z/._:@-]{0,40}",
            credential in proptest::option::of("[a-z]{1,8}:[a-z0-9]{1,8}"),
            base in proptest::option::of("/[a-z]{1,10}"),
        ) {
            prop_assume!(!url.starts_with("http://") && !url.starts_with("https://"));
            let location = rewrite(&url, credential.as_deref(), base.as_deref());
            prop_assert_eq!(&location.clone_url, &url);
            prop_assert_eq!(&location.local_path, &url);
            prop_assert!(!location.relocated);
        }

        /// Property: without a base directory the mirror path is the URL itself
        #[test]
        fn http_urls_without_base_keep_path(
            scheme in scheme(),
            host in "[a-z]{1,12}(\\.[a-z]{2,4})?",
            path in "[a-z0-9_/-]{0,30}",
        ) {
            let url = format!("{}{}/{}", scheme, host, path);
            let location = rewrite(&url, None, None);
            prop_assert_eq!(&location.clone_url, &url);
            prop_assert_eq!(&location.local_path, &url);
            prop_assert!(!location.relocated);
        }
    }

    // ============================================================================
    // relocation and credential property tests
    // ============================================================================

    proptest! {
        /// Property: with a base directory the mirror lands at base + "/" + path
        #[test]
        fn http_urls_relocate_under_base(
            scheme in scheme(),
            host in "[a-z]{1,12}(:[0-9]{2,5})?",
            path in "[a-z0-9_./-]{0,30}",
            base in "/[a-z]{1,10}(/[a-z]{1,10})?",
        ) {
            let url = format!("{}{}/{}", scheme, host, path);
            let location = rewrite(&url, None, Some(&base));
            prop_assert_eq!(location.local_path, format!("{}/{}", base, path));
            prop_assert!(location.relocated);
        }

        /// Property: the credential appears exactly once, right after the scheme
        #[test]
        fn credential_injected_after_scheme(
            scheme in scheme(),
            host in "[a-z]{1,12}",
            path in "[a-z0-9_/-]{0,30}",
            credential in "[a-z]{1,8}:[a-zA-Z0-9]{1,16}",
        ) {
            let url = format!("{}{}/{}", scheme, host, path);
            let location = rewrite(&url, Some(&credential), None);
            prop_assert_eq!(
                location.clone_url,
                format!("{}{}@{}/{}", scheme, credential, host, path)
            );
        }

        /// Property: rewriting is deterministic
        #[test]
        fn rewrite_is_deterministic(
            url in ".{0,40}",
            credential in proptest::option::of(".{0,10}"),
            base in proptest::option::of(".{0,10}"),
        ) {
            let first = rewrite(&url, credential.as_deref(), base.as_deref());
            let second = rewrite(&url, credential.as_deref(), base.as_deref());
            prop_assert_eq!(first, second);
        }

        /// Property: redacting an injected URL never leaks the secret
        #[test]
        fn redaction_hides_injected_secret(
            scheme in scheme(),
            host in "[a-z]{1,12}",
            path in "[a-z0-9_/-]{0,30}",
            secret in "S[A-Za-z0-9]{11,23}",
        ) {
            let url = format!("{}{}/{}", scheme, host, path);
            let location = rewrite(&url, Some(&format!("bot:{}", secret)), None);
            let redacted = redact_credentials(&location.clone_url);
            prop_assert!(!redacted.contains(&secret));
            prop_assert!(redacted.starts_with(scheme));
        }
    }
}
