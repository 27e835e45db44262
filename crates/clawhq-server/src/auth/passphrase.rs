//! Shared registration passphrase check.

use subtle::ConstantTimeEq;

/// Compare a supplied passphrase to the configured one in constant time.
///
/// An empty configured passphrase never matches.
pub fn passphrase_matches(supplied: &str, configured: &str) -> bool {
    if configured.is_empty() {
        return false;
    }
    supplied.as_bytes().ct_eq(configured.as_bytes()).into()
}
