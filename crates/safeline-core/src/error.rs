//! Error types for SafeLine Core
//!
//! Each collaborator has its own error enum; all of them converge on
//! [`IncidentError`], which is what the lifecycle manager hands back to the
//! HTTP surface:
//! - Client-correctable failures (validation, ownership, tokens, not found)
//! - Upstream failures (geocoding, persistence, video storage)
//!
//! A failed SMS is deliberately absent from this module: it is a recorded
//! business outcome (see [`crate::notify::DeliveryResult`]), not an error.

/// Main lifecycle error type
#[derive(Debug, thiserror::Error)]
pub enum IncidentError {
    /// Malformed or incomplete input
    #[error("{0}")]
    Validation(String),

    /// Caller is not the owner of the resource (fail-fast or after lookup)
    #[error("{0}")]
    Unauthorized(String),

    /// Caller is not allowed to touch the resource it looked up
    #[error("{0}")]
    Forbidden(String),

    /// Referenced incident, share or file does not exist
    #[error("{0}")]
    NotFound(String),

    /// Video access token rejected
    #[error(transparent)]
    Token(#[from] TokenError),

    /// Geocoding, persistence or storage outage
    #[error("upstream failure: {0}")]
    Upstream(String),
}

impl IncidentError {
    /// Check if the caller can fix the request and retry
    #[inline]
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        !matches!(self, Self::Upstream(_))
    }

    /// Build a validation error
    #[inline]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

/// Access token verification failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    /// Malformed token, bad signature or undecodable claims
    #[error("access token is invalid")]
    Invalid,

    /// Signature is valid but the expiry has passed
    #[error("access token has expired")]
    Expired,
}

/// Persistence and video storage errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Record or file not found
    #[error("{0} not found")]
    NotFound(String),

    /// Record rejected by the store
    #[error("invalid record: {0}")]
    Validation(String),

    /// Backend unavailable or inconsistent
    #[error("store backend error: {0}")]
    Backend(String),

    /// Filesystem error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<StoreError> for IncidentError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::NotFound(what) => Self::NotFound(format!("{what} not found")),
            StoreError::Validation(message) => Self::Validation(message),
            other => Self::Upstream(other.to_string()),
        }
    }
}

/// Reverse geocoding errors
#[derive(Debug, thiserror::Error)]
pub enum GeocodeError {
    /// Network or HTTP failure
    #[error("geocoding transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Provider answered with a non-OK status (quota, denied key, ...)
    #[error("geocoding status {status}: {message}")]
    Status {
        /// Provider status code
        status: String,
        /// Provider error message, if any
        message: String,
    },

    /// Provider had no address for the coordinates
    #[error("no address found for coordinates")]
    NoResults,
}

impl From<GeocodeError> for IncidentError {
    fn from(value: GeocodeError) -> Self {
        Self::Upstream(value.to_string())
    }
}

/// SMS transport errors
#[derive(Debug, thiserror::Error)]
pub enum SmsError {
    /// Network or HTTP failure
    #[error("sms transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Provider accepted the request but refused the message
    #[error("sms rejected with status {status}: {message}")]
    Rejected {
        /// Provider status code
        status: String,
        /// Provider error text
        message: String,
    },

    /// Provider response could not be interpreted
    #[error("malformed sms provider response: {0}")]
    Malformed(String),
}

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("cannot read config: {0}")]
    Io(#[from] std::io::Error),

    /// Config file is not valid TOML for [`crate::config::ServiceConfig`]
    #[error("cannot parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Config parsed but is unusable
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_map_to_lifecycle_errors() {
        let not_found: IncidentError = StoreError::NotFound("incident".to_string()).into();
        assert!(matches!(not_found, IncidentError::NotFound(ref m) if m == "incident not found"));

        let backend: IncidentError = StoreError::Backend("down".to_string()).into();
        assert!(matches!(backend, IncidentError::Upstream(_)));
        assert!(!backend.is_client_error());
    }

    #[test]
    fn token_errors_are_client_errors() {
        let err: IncidentError = TokenError::Expired.into();
        assert!(err.is_client_error());
        assert_eq!(err.to_string(), "access token has expired");
    }
}
