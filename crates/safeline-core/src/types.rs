//! Core types for SafeLine
//!
//! Defines the persisted records and the inbound payloads:
//! - Identifiers (users, incidents, shares)
//! - Incidents with their contact, location and delivery outcome
//! - Video shares
//! - The incident creation payload and its schema rules

use crate::error::IncidentError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use ulid::Ulid;
use validator::Validate;

/// Identity of an authenticated reporter or share recipient
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    /// Wrap a user identifier
    #[inline]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw identifier
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for UserId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Unique incident identifier (ULID for sortability)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct IncidentId(pub Ulid);

impl IncidentId {
    /// Generate new incident ID
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for IncidentId {
    fn default() -> Self {
        Self::new()
    }
}

impl FromStr for IncidentId {
    type Err = IncidentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ulid::from_string(s)
            .map(Self)
            .map_err(|_| IncidentError::validation(format!("invalid incident id: {s}")))
    }
}

impl std::fmt::Display for IncidentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique video share identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ShareId(pub Ulid);

impl ShareId {
    /// Generate new share ID
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for ShareId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ShareId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Notification channel used for an incident
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum IncidentType {
    /// Text message to the trusted contact
    Sms,
}

/// The notified party
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    pub display_name: String,
    pub phone: String,
}

/// Where the incident happened; `name` always comes from reverse geocoding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    pub name: String,
}

/// A registered app user, as returned by the user directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub full_name: String,
    pub phone: String,
}

/// A persisted incident
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Incident {
    pub id: IncidentId,
    pub user: UserId,
    pub contact: Contact,
    pub location: Location,
    #[serde(rename = "type")]
    pub kind: IncidentType,
    pub send_success: bool,
    pub video_file: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Fields handed to the store when creating an incident
#[derive(Debug, Clone, PartialEq)]
pub struct NewIncident {
    pub user: UserId,
    pub contact: Contact,
    pub location: Location,
    pub kind: IncidentType,
    pub send_success: bool,
}

/// A grant letting `share_to` view the video of `incident`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoShare {
    pub id: ShareId,
    pub incident: IncidentId,
    pub user: UserId,
    pub share_to: UserId,
    pub created_at: DateTime<Utc>,
}

/// Fields handed to the store when creating a share
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewShare {
    pub incident: IncidentId,
    pub user: UserId,
    pub share_to: UserId,
}

/// Body of a share creation request
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareRequest {
    pub share_to: Option<UserId>,
}

/// Inbound contact payload
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ContactDraft {
    #[validate(length(min = 1, message = "contact.displayName is required"))]
    pub display_name: String,
    #[validate(length(min = 1, message = "contact.phone is required"))]
    pub phone: String,
}

/// Inbound coordinates; any client-supplied `name` is dropped on parse
#[derive(Debug, Clone, Copy, Deserialize, Validate)]
pub struct LocationDraft {
    #[validate(range(min = -90.0, max = 90.0, message = "location.latitude must be within [-90, 90]"))]
    pub latitude: f64,
    #[validate(range(min = -180.0, max = 180.0, message = "location.longitude must be within [-180, 180]"))]
    pub longitude: f64,
}

/// Incident creation payload as submitted by the reporter
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct IncidentDraft {
    #[validate(length(min = 1, message = "user is required"))]
    pub user: String,
    #[validate(nested)]
    pub contact: ContactDraft,
    #[validate(nested)]
    pub location: LocationDraft,
}

impl IncidentDraft {
    /// Parse a raw JSON body; missing or mistyped fields are validation errors
    ///
    /// # Errors
    /// - `IncidentError::Validation` if the body does not match the payload shape
    pub fn from_json(value: serde_json::Value) -> Result<Self, IncidentError> {
        serde_json::from_value(value)
            .map_err(|e| IncidentError::validation(format!("invalid incident payload: {e}")))
    }

    /// Apply the schema rules
    ///
    /// # Errors
    /// - `IncidentError::Validation` naming the first offending field
    pub fn check(&self) -> Result<(), IncidentError> {
        self.validate()
            .map_err(|errors| IncidentError::validation(first_message(&errors)))
    }

    /// Owning user claimed by the payload
    #[inline]
    #[must_use]
    pub fn owner(&self) -> UserId {
        UserId::new(self.user.clone())
    }
}

// Payload order; `validator` keeps field errors in a `HashMap`.
const FIELD_ORDER: &[&str] = &[
    "user",
    "contact",
    "display_name",
    "displayName",
    "phone",
    "location",
    "latitude",
    "longitude",
];

fn field_rank(field: &str) -> usize {
    FIELD_ORDER
        .iter()
        .position(|known| *known == field)
        .unwrap_or(FIELD_ORDER.len())
}

fn first_message(errors: &validator::ValidationErrors) -> String {
    fn walk(errors: &validator::ValidationErrors) -> Option<String> {
        let mut fields: Vec<_> = errors.errors().iter().collect();
        fields.sort_by(|(a, _), (b, _)| field_rank(a).cmp(&field_rank(b)).then_with(|| a.cmp(b)));

        for (_, kind) in fields {
            match kind {
                validator::ValidationErrorsKind::Field(list) => {
                    if let Some(message) = list.iter().find_map(|e| e.message.as_ref()) {
                        return Some(message.to_string());
                    }
                }
                validator::ValidationErrorsKind::Struct(inner) => {
                    if let Some(message) = walk(inner) {
                        return Some(message);
                    }
                }
                validator::ValidationErrorsKind::List(items) => {
                    if let Some(message) = items.values().find_map(|inner| walk(inner)) {
                        return Some(message);
                    }
                }
            }
        }
        None
    }

    walk(errors).unwrap_or_else(|| errors.to_string())
}
