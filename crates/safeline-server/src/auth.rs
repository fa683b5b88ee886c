//! Request authentication
//!
//! Resolves the `Authorization` header to a [`UserId`]. Session issuance
//! lives outside this service; the shipped authenticator checks bearer
//! credentials against a table from configuration.

use async_trait::async_trait;
use safeline_core::UserId;
use std::collections::{BTreeMap, HashMap};

/// Maps a request credential to the authenticated user
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// `None` when the header is missing or not recognised
    async fn authenticate(&self, authorization: Option<&str>) -> Option<UserId>;
}

/// Static bearer-credential table
#[derive(Debug, Clone, Default)]
pub struct StaticAuthenticator {
    sessions: HashMap<String, UserId>,
}

impl StaticAuthenticator {
    /// Create from `credential -> user` pairs
    pub fn new(sessions: impl IntoIterator<Item = (String, UserId)>) -> Self {
        Self {
            sessions: sessions.into_iter().collect(),
        }
    }

    /// Create from the `[http.sessions]` table
    #[must_use]
    pub fn from_config(sessions: &BTreeMap<String, UserId>) -> Self {
        Self::new(sessions.iter().map(|(k, v)| (k.clone(), v.clone())))
    }

    /// Number of known credentials
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

/// Credential part of a `Bearer <credential>` header; scheme is case-insensitive
#[must_use]
pub fn bearer_credential(header: &str) -> Option<&str> {
    let (scheme, credential) = header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let credential = credential.trim();
    (!credential.is_empty()).then_some(credential)
}

#[async_trait]
impl Authenticator for StaticAuthenticator {
    async fn authenticate(&self, authorization: Option<&str>) -> Option<UserId> {
        let credential = bearer_credential(authorization?)?;
        self.sessions.get(credential).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> StaticAuthenticator {
        StaticAuthenticator::new([("alice-token".to_string(), UserId::from("alice"))])
    }

    #[test]
    fn bearer_parsing() {
        assert_eq!(bearer_credential("Bearer abc"), Some("abc"));
        assert_eq!(bearer_credential("bearer   abc "), Some("abc"));
        assert_eq!(bearer_credential("Basic abc"), None);
        assert_eq!(bearer_credential("Bearer"), None);
        assert_eq!(bearer_credential("Bearer  "), None);
    }

    #[tokio::test]
    async fn known_credential_resolves() {
        let auth = table();
        assert_eq!(
            auth.authenticate(Some("Bearer alice-token")).await,
            Some(UserId::from("alice"))
        );
        assert_eq!(auth.authenticate(Some("Bearer bob-token")).await, None);
        assert_eq!(auth.authenticate(None).await, None);
    }
}
