//! Ownership-based authorization
//!
//! Every ownership-scoped operation goes through [`AccessGate`]. Two denial
//! paths exist:
//! - fail-fast, before anything is fetched ([`AccessGate::ensure`])
//! - after fetching the authoritative record ([`AccessGate::load_owned`]),
//!   which costs one extra lookup
//!
//! Ownership is always read from the stored record, never from the request body.

use crate::error::IncidentError;
use crate::types::{Incident, UserId, VideoShare};
use std::future::Future;

/// How a denial is reported
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denial {
    /// Reported as 401
    Unauthorized(&'static str),
    /// Reported as 403
    Forbidden(&'static str),
}

impl Denial {
    /// Lifecycle error for this denial
    #[must_use]
    pub fn into_error(self) -> IncidentError {
        match self {
            Self::Unauthorized(message) => IncidentError::Unauthorized(message.to_string()),
            Self::Forbidden(message) => IncidentError::Forbidden(message.to_string()),
        }
    }
}

/// Central allow/deny decisions
#[derive(Debug, Clone, Copy, Default)]
pub struct AccessGate;

impl AccessGate {
    /// Create gate
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Core policy: the caller owns the resource
    #[inline]
    #[must_use]
    pub fn can_access(&self, caller: &UserId, owner: &UserId) -> bool {
        caller == owner
    }

    /// Owner, or recipient of a share of this incident
    #[must_use]
    pub fn can_view_video(&self, caller: &UserId, incident: &Incident, shares: &[VideoShare]) -> bool {
        self.can_access(caller, &incident.user)
            || shares
                .iter()
                .any(|share| share.incident == incident.id && &share.share_to == caller)
    }

    /// Fail-fast check against an owner id taken from the request path
    ///
    /// # Errors
    /// - The error described by `denial` when `caller` is not `owner`
    pub fn ensure(&self, caller: &UserId, owner: &UserId, denial: Denial) -> Result<(), IncidentError> {
        if self.can_access(caller, owner) {
            Ok(())
        } else {
            tracing::debug!("Denied {} access to resources of {}", caller, owner);
            Err(denial.into_error())
        }
    }

    /// Fetch a resource, then check its owner
    ///
    /// # Arguments
    /// * `caller` - Authenticated identity
    /// * `label` - Resource name used in the not-found message
    /// * `load` - Lookup of the authoritative record
    /// * `owner` - Selects the owning user from the record
    /// * `denial` - How to report a mismatch
    ///
    /// # Errors
    /// - `IncidentError::NotFound` when the loader finds nothing
    /// - The error described by `denial` when `caller` is not the owner
    /// - Any error from the loader
    pub async fn load_owned<T, Fut, S>(
        &self,
        caller: &UserId,
        label: &str,
        load: Fut,
        owner: S,
        denial: Denial,
    ) -> Result<T, IncidentError>
    where
        Fut: Future<Output = Result<Option<T>, IncidentError>>,
        S: Fn(&T) -> &UserId,
    {
        let resource = load
            .await?
            .ok_or_else(|| IncidentError::NotFound(format!("{label} not found")))?;
        self.ensure(caller, owner(&resource), denial)?;
        Ok(resource)
    }
}
