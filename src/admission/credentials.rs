//! API Key Authentication
//!
//! Extracts the presented key from an authorization header, checks it
//! against the configured allow-list and derives the identity used as the
//! quota key.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use subtle::ConstantTimeEq;

/// Number of hex characters kept from the credential digest
pub const IDENTITY_LEN: usize = 16;

/// Opaque, deterministic identity derived from a credential
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(String);

impl Identity {
    /// Derive the identity for a raw token
    pub fn from_token(token: &str) -> Self {
        let digest = Sha256::digest(token.as_bytes());
        let mut hex = hex::encode(digest);
        hex.truncate(IDENTITY_LEN);
        Self(hex)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Allow-list backed API key validator
pub struct Authenticator {
    allowed: Vec<String>,
}

impl Authenticator {
    /// Create an authenticator for the given keys; blank entries are ignored
    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut allowed: Vec<String> = Vec::new();
        for key in keys {
            let key: String = key.into();
            let key = key.trim().to_string();
            if !key.is_empty() && !allowed.contains(&key) {
                allowed.push(key);
            }
        }
        Self { allowed }
    }

    /// Pull the token out of an authorization header value
    ///
    /// Accepts `Bearer <token>` or a bare token. Anything containing
    /// whitespace that is not a bearer header is rejected.
    pub fn extract_credential(header: Option<&str>) -> Option<&str> {
        let value = header?.trim();
        if value.is_empty() {
            return None;
        }

        let token = match value.split_once(char::is_whitespace) {
            Some((scheme, rest)) if scheme.eq_ignore_ascii_case("bearer") => rest.trim(),
            Some(_) => return None,
            None if value.eq_ignore_ascii_case("bearer") => return None,
            None => value,
        };

        if token.is_empty() || token.contains(char::is_whitespace) {
            None
        } else {
            Some(token)
        }
    }

    /// Check membership in the allow-list without early exit on a match
    pub fn validate(&self, token: &str) -> bool {
        let candidate = token.as_bytes();
        self.allowed.iter().fold(false, |found, key| {
            let matched: bool = key.as_bytes().ct_eq(candidate).into();
            found | matched
        })
    }

    /// Identity for a token; same token, same identity
    pub fn identity_for(&self, token: &str) -> Identity {
        Identity::from_token(token)
    }

    /// Number of configured keys
    pub fn len(&self) -> usize {
        self.allowed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.allowed.is_empty()
    }
}

impl fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Authenticator")
            .field("allowed", &format_args!("[{} keys]", self.allowed.len()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn authenticator() -> Authenticator {
        Authenticator::new(["sk-test-key-1", "sk-test-key-2"])
    }

    #[test]
    fn test_extract_bearer_format() {
        assert_eq!(
            Authenticator::extract_credential(Some("Bearer sk-test-key-123")),
            Some("sk-test-key-123")
        );
        assert_eq!(
            Authenticator::extract_credential(Some("bearer   sk-test-key-123 ")),
            Some("sk-test-key-123")
        );
    }

    #[test]
    fn test_extract_bare_token() {
        assert_eq!(
            Authenticator::extract_credential(Some("sk-test-key-123")),
            Some("sk-test-key-123")
        );
    }

    #[test]
    fn test_extract_rejects_malformed() {
        assert_eq!(Authenticator::extract_credential(None), None);
        assert_eq!(Authenticator::extract_credential(Some("")), None);
        assert_eq!(Authenticator::extract_credential(Some("Invalid format")), None);
        assert_eq!(Authenticator::extract_credential(Some("Bearer")), None);
        assert_eq!(Authenticator::extract_credential(Some("Bearer ")), None);
        assert_eq!(Authenticator::extract_credential(Some("Basic dXNlcjpwYXNz")), None);
        assert_eq!(Authenticator::extract_credential(Some("Bearer a b")), None);
    }

    #[test]
    fn test_validate() {
        let auth = authenticator();
        assert!(auth.validate("sk-test-key-1"));
        assert!(auth.validate("sk-test-key-2"));
        assert!(!auth.validate("sk-invalid-key"));
        assert!(!auth.validate("sk-test-key-"));
        assert!(!auth.validate(""));
    }

    #[test]
    fn test_new_drops_blank_and_duplicate_keys() {
        let auth = Authenticator::new(["a", " ", "a", "b "]);
        assert_eq!(auth.len(), 2);
        assert!(auth.validate("b"));
        assert!(Authenticator::new(Vec::<String>::new()).is_empty());
    }

    #[test]
    fn test_identity_is_stable_and_truncated() {
        let auth = authenticator();
        let id = auth.identity_for("sk-test-key-123");

        assert_eq!(id.as_str().len(), IDENTITY_LEN);
        assert!(id.as_str().chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(id, auth.identity_for("sk-test-key-123"));
        assert_ne!(id, auth.identity_for("sk-test-key-124"));
        assert!(!id.as_str().contains("sk-test"));
    }

    #[test]
    fn test_identity_matches_sha256_prefix() {
        // sha256("abc") = ba7816bf8f01cfea...
        assert_eq!(Identity::from_token("abc").as_str(), "ba7816bf8f01cfea");
    }

    #[test]
    fn test_debug_hides_keys() {
        let rendered = format!("{:?}", authenticator());
        assert!(!rendered.contains("sk-test"));
    }
}
