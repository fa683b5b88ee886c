//! Video access tokens
//!
//! Short-lived, signed, single-purpose credentials that stand in for a
//! session on the unauthenticated video fetch path.
//!
//! Wire form: `<hex(claims json)>.<hex(ed25519 signature)>`, lowercase only.
//!
//! Verification checks, in order:
//! - Canonical encoding of both parts
//! - Ed25519 signature over the exact claim bytes
//! - Expiry, with zero clock-skew tolerance (`now >= exp` is expired)

use crate::config::TokenConfig;
use crate::error::TokenError;
use crate::types::UserId;
use chrono::{DateTime, TimeZone, Utc};
use ed25519_dalek::{Signature, Signer, SigningKey, VerifyingKey};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::time::Duration;

/// Claims carried by an access token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessClaims {
    /// Subject the token authorizes
    pub user_id: UserId,
    /// Expiry, milliseconds since the Unix epoch
    pub exp: i64,
}

/// A freshly issued token and its expiry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Stateless issuer/verifier for video access tokens
pub struct TokenService {
    signing_key: SigningKey,
    verifying_key: VerifyingKey,
    ttl: Duration,
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl TokenService {
    /// Create a service around an existing key
    #[must_use]
    pub fn new(signing_key: SigningKey, ttl: Duration) -> Self {
        let verifying_key = signing_key.verifying_key();
        Self {
            signing_key,
            verifying_key,
            ttl,
        }
    }

    /// Derive the signing key from a shared secret
    #[must_use]
    pub fn from_secret(secret: &str, ttl: Duration) -> Self {
        let seed: [u8; 32] = Sha256::digest(secret.as_bytes()).into();
        Self::new(SigningKey::from_bytes(&seed), ttl)
    }

    /// Random per-process key; tokens die with the process
    #[must_use]
    pub fn ephemeral(ttl: Duration) -> Self {
        let mut csprng = OsRng;
        Self::new(SigningKey::generate(&mut csprng), ttl)
    }

    /// Build from configuration
    #[must_use]
    pub fn from_config(config: &TokenConfig) -> Self {
        match config.secret.as_deref() {
            Some(secret) => Self::from_secret(secret, config.ttl()),
            None => {
                tracing::warn!("No token secret configured, video tokens will not survive a restart");
                Self::ephemeral(config.ttl())
            }
        }
    }

    /// Token lifetime
    #[inline]
    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issue a token for `user_id` expiring one TTL from now
    #[must_use]
    pub fn issue(&self, user_id: &UserId) -> IssuedToken {
        self.issue_at(user_id, Utc::now())
    }

    /// Issue a token as if the clock read `now`
    #[must_use]
    pub fn issue_at(&self, user_id: &UserId, now: DateTime<Utc>) -> IssuedToken {
        let ttl_ms = i64::try_from(self.ttl.as_millis()).unwrap_or(i64::MAX);
        let exp = now.timestamp_millis().saturating_add(ttl_ms);
        let claims = AccessClaims {
            user_id: user_id.clone(),
            exp,
        };

        let payload =
            serde_json::to_vec(&claims).expect("claims of a string id and an integer expiry always serialize");
        let signature: Signature = self.signing_key.sign(&payload);

        IssuedToken {
            token: format!("{}.{}", hex::encode(&payload), hex::encode(signature.to_bytes())),
            expires_at: Utc
                .timestamp_millis_opt(exp)
                .single()
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
        }
    }

    /// Verify a token and resolve it to its subject
    ///
    /// # Errors
    /// - `TokenError::Invalid` for malformed tokens or signature mismatch
    /// - `TokenError::Expired` once the embedded expiry has passed
    pub fn verify(&self, token: &str) -> Result<UserId, TokenError> {
        self.verify_at(token, Utc::now())
    }

    /// Verify as if the clock read `now`
    ///
    /// # Errors
    /// See [`TokenService::verify`].
    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<UserId, TokenError> {
        let claims = self.verify_signature(token)?;
        if now.timestamp_millis() >= claims.exp {
            return Err(TokenError::Expired);
        }
        Ok(claims.user_id)
    }

    fn verify_signature(&self, token: &str) -> Result<AccessClaims, TokenError> {
        let (payload_hex, signature_hex) = token.split_once('.').ok_or(TokenError::Invalid)?;
        let payload = decode_canonical(payload_hex)?;
        let signature_bytes = decode_canonical(signature_hex)?;

        let signature = Signature::from_slice(&signature_bytes).map_err(|_| TokenError::Invalid)?;
        self.verifying_key
            .verify_strict(&payload, &signature)
            .map_err(|_| TokenError::Invalid)?;

        serde_json::from_slice(&payload).map_err(|_| TokenError::Invalid)
    }
}

// `hex::decode` accepts both cases; only the lowercase spelling we emit is valid.
fn decode_canonical(part: &str) -> Result<Vec<u8>, TokenError> {
    let bytes = hex::decode(part).map_err(|_| TokenError::Invalid)?;
    if hex::encode(&bytes) != part {
        return Err(TokenError::Invalid);
    }
    Ok(bytes)
}
