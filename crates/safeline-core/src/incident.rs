//! Incident lifecycle manager
//!
//! Orchestrates incident creation and every ownership-scoped operation on
//! incidents, shares and their videos.
//!
//! # Creation workflow
//! 1. Validate the payload schema
//! 2. Authorize: caller must be the submitted owner
//! 3. Enrich: reverse geocode, resolve the owner in the user directory
//! 4. Notify the contact (outcome is a value)
//! 5. Persist exactly one incident tagged with the outcome
//! 6. Report a three-way [`CreateOutcome`]
//!
//! Phases run strictly in sequence. Dispatch and persistence are not
//! transactional: a crash between them loses the record of a sent SMS.

use crate::access::{AccessGate, Denial};
use crate::error::{IncidentError, TokenError};
use crate::geocode::Geocoder;
use crate::notify::{Coordinates, DeliveryResult, Notification, NotificationDispatcher};
use crate::store::video::is_plain_filename;
use crate::store::{IncidentStore, UserDirectory, VideoStore};
use crate::token::{IssuedToken, TokenService};
use crate::types::{
    Contact, Incident, IncidentDraft, IncidentId, IncidentType, Location, NewIncident, NewShare,
    ShareRequest, UserId, VideoShare,
};
use serde_json::Value;
use std::sync::Arc;

const LIST_DENIED: &str = "unauthorized access";
const SHARES_DENIED: &str = "Unauthorized access.";
const OPERATION_DENIED: &str = "Unauthorized operation.";
const VIDEO_DENIED: &str = "Video not shared with caller.";

/// Message returned when the owner is not a registered app user
pub const NOT_REGISTERED_MESSAGE: &str = "Operation allowed for app users only.";

/// Result of a creation request that passed validation and authorization
#[derive(Debug, Clone, PartialEq)]
pub enum CreateOutcome {
    /// Contact reached; incident stored with `send_success = true`
    Delivered {
        /// Stored incident
        incident: Incident,
        /// Raw SMS provider response
        provider_response: Value,
    },
    /// Contact not reached; incident stored with `send_success = false`
    Undelivered {
        /// Stored incident
        incident: Incident,
    },
    /// Owner is not a registered app user; nothing sent or stored
    NotRegistered,
}

impl CreateOutcome {
    /// Stored incident, if any
    #[must_use]
    pub fn incident(&self) -> Option<&Incident> {
        match self {
            Self::Delivered { incident, .. } | Self::Undelivered { incident } => Some(incident),
            Self::NotRegistered => None,
        }
    }
}

/// Provider response with the incident fields laid over it
#[must_use]
pub fn merge_provider_response(provider_response: &Value, incident: &Incident) -> Value {
    let mut merged = match provider_response {
        Value::Object(map) => map.clone(),
        Value::Null => serde_json::Map::new(),
        other => {
            let mut map = serde_json::Map::new();
            map.insert("providerResponse".to_string(), other.clone());
            map
        }
    };
    if let Ok(Value::Object(fields)) = serde_json::to_value(incident) {
        merged.extend(fields);
    }
    Value::Object(merged)
}

/// A recording ready to stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoPayload {
    pub filename: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

/// Content type from the file extension
#[must_use]
pub fn video_content_type(filename: &str) -> &'static str {
    let extension = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "mp4" | "m4v" => "video/mp4",
        "webm" => "video/webm",
        "mov" => "video/quicktime",
        "3gp" => "video/3gpp",
        _ => "application/octet-stream",
    }
}

/// Injected collaborators; constructed once by the composition root
#[derive(Clone)]
pub struct Collaborators {
    pub store: Arc<dyn IncidentStore>,
    pub users: Arc<dyn UserDirectory>,
    pub geocoder: Arc<dyn Geocoder>,
    pub dispatcher: NotificationDispatcher,
    pub videos: Arc<dyn VideoStore>,
}

/// The incident lifecycle manager
pub struct IncidentService {
    store: Arc<dyn IncidentStore>,
    users: Arc<dyn UserDirectory>,
    geocoder: Arc<dyn Geocoder>,
    dispatcher: NotificationDispatcher,
    videos: Arc<dyn VideoStore>,
    tokens: TokenService,
    gate: AccessGate,
}

impl std::fmt::Debug for IncidentService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IncidentService")
            .field("dispatcher", &self.dispatcher)
            .field("tokens", &self.tokens)
            .finish_non_exhaustive()
    }
}

impl IncidentService {
    /// Create the manager
    #[must_use]
    pub fn new(collaborators: Collaborators, tokens: TokenService) -> Self {
        Self {
            store: collaborators.store,
            users: collaborators.users,
            geocoder: collaborators.geocoder,
            dispatcher: collaborators.dispatcher,
            videos: collaborators.videos,
            tokens,
            gate: AccessGate::new(),
        }
    }

    /// Token service used for video links
    #[inline]
    #[must_use]
    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    /// Create an incident and notify its contact
    ///
    /// # Errors
    /// - `IncidentError::Validation` for schema violations
    /// - `IncidentError::Unauthorized` if `draft.user` is not `caller`
    /// - `IncidentError::Upstream` if geocoding, the user directory or the store fail
    pub async fn create(&self, caller: &UserId, draft: IncidentDraft) -> Result<CreateOutcome, IncidentError> {
        // 1. Validate
        draft.check()?;

        // 2. Authorize
        let owner = draft.owner();
        self.gate
            .ensure(caller, &owner, Denial::Unauthorized(OPERATION_DENIED))?;

        // 3. Enrich
        let coordinates = Coordinates {
            lat: draft.location.latitude,
            lng: draft.location.longitude,
        };
        let location_name = self
            .geocoder
            .reverse_geocode(coordinates.lat, coordinates.lng)
            .await
            .map_err(|e| {
                tracing::error!("Reverse geocoding failed: {}", e);
                IncidentError::from(e)
            })?;

        let Some(user) = self.users.find_user(&owner).await? else {
            tracing::info!("Incident from unregistered user {} not recorded", owner);
            return Ok(CreateOutcome::NotRegistered);
        };

        // 4. Notify
        let notification = Notification {
            recipient_name: draft.contact.display_name.clone(),
            recipient_phone: draft.contact.phone.clone(),
            sender_name: user.full_name,
            sender_phone: user.phone,
            location_name: location_name.clone(),
            coordinates,
        };
        let delivery = self.dispatcher.send(&notification).await;

        // 5. Persist, once for both branches
        let incident = self
            .store
            .create_incident(NewIncident {
                user: owner,
                contact: Contact {
                    display_name: draft.contact.display_name,
                    phone: draft.contact.phone,
                },
                location: Location {
                    latitude: coordinates.lat,
                    longitude: coordinates.lng,
                    name: location_name,
                },
                kind: IncidentType::Sms,
                send_success: delivery.is_success(),
            })
            .await?;
        tracing::info!(
            "Incident {} recorded for {} (send_success={})",
            incident.id,
            incident.user,
            incident.send_success
        );

        // 6. Respond
        Ok(match delivery {
            DeliveryResult::Delivered { provider_response } => CreateOutcome::Delivered {
                incident,
                provider_response,
            },
            DeliveryResult::Failed { .. } => CreateOutcome::Undelivered { incident },
        })
    }

    /// All incidents of `user_id`
    ///
    /// # Errors
    /// - `IncidentError::Unauthorized` before any lookup if `caller` is not `user_id`
    pub async fn list_incidents(&self, caller: &UserId, user_id: &UserId) -> Result<Vec<Incident>, IncidentError> {
        self.gate.ensure(caller, user_id, Denial::Unauthorized(LIST_DENIED))?;
        Ok(self.store.list_incidents_by_user(user_id).await?)
    }

    /// One incident of `user_id`
    ///
    /// # Errors
    /// - `IncidentError::Unauthorized` if `caller` is not `user_id` or not the stored owner
    /// - `IncidentError::NotFound` for an unknown incident
    pub async fn get_incident(
        &self,
        caller: &UserId,
        user_id: &UserId,
        incident_id: &IncidentId,
    ) -> Result<Incident, IncidentError> {
        self.gate.ensure(caller, user_id, Denial::Unauthorized(LIST_DENIED))?;
        self.load_incident(caller, incident_id, Denial::Unauthorized(LIST_DENIED))
            .await
    }

    /// Delete the recording of an incident; the incident itself is kept
    ///
    /// # Errors
    /// - `IncidentError::NotFound` for an unknown incident
    /// - `IncidentError::Forbidden` if `caller` does not own it
    /// - `IncidentError::Upstream` if the file or record cannot be updated
    pub async fn delete_video(&self, caller: &UserId, incident_id: &IncidentId) -> Result<Incident, IncidentError> {
        let incident = self
            .load_incident(caller, incident_id, Denial::Forbidden(OPERATION_DENIED))
            .await?;

        let Some(filename) = incident.video_file.as_deref() else {
            return Ok(incident);
        };

        match self.videos.remove(filename).await {
            Ok(()) => tracing::info!("Removed video {} of incident {}", filename, incident.id),
            Err(crate::error::StoreError::NotFound(_)) => {
                tracing::warn!("Video {} of incident {} was already gone", filename, incident.id);
            }
            Err(e) => return Err(e.into()),
        }

        Ok(self.store.clear_video(&incident.id).await?)
    }

    /// Share an incident's video with another user
    ///
    /// # Errors
    /// - `IncidentError::Validation` if `shareTo` is missing
    /// - `IncidentError::NotFound` for an unknown incident
    /// - `IncidentError::Unauthorized` if `caller` does not own it
    pub async fn create_share(
        &self,
        caller: &UserId,
        incident_id: &IncidentId,
        request: ShareRequest,
    ) -> Result<VideoShare, IncidentError> {
        let share_to = request
            .share_to
            .filter(|id| !id.as_str().is_empty())
            .ok_or_else(|| IncidentError::validation("'shareTo' is required."))?;

        let incident = self
            .load_incident(caller, incident_id, Denial::Unauthorized(OPERATION_DENIED))
            .await?;

        let share = self
            .store
            .create_share(NewShare {
                incident: incident.id,
                user: caller.clone(),
                share_to,
            })
            .await?;
        tracing::info!("Incident {} shared with {}", incident.id, share.share_to);
        Ok(share)
    }

    /// Shares created by or addressed to `user_id`
    ///
    /// # Errors
    /// - `IncidentError::Unauthorized` before any lookup if `caller` is not `user_id`
    pub async fn list_shares(&self, caller: &UserId, user_id: &UserId) -> Result<Vec<VideoShare>, IncidentError> {
        self.gate.ensure(caller, user_id, Denial::Unauthorized(SHARES_DENIED))?;
        Ok(self.store.find_shares_by_user(user_id).await?)
    }

    /// Mint a video access token for the authenticated caller
    #[must_use]
    pub fn issue_video_token(&self, caller: &UserId) -> IssuedToken {
        self.tokens.issue(caller)
    }

    /// Resolve a token and load a recording the token's subject may view
    ///
    /// The token is checked before anything else is looked up.
    ///
    /// # Errors
    /// - `IncidentError::Token` for a missing, invalid or expired token
    /// - `IncidentError::Validation` for a filename that is not a single path component
    /// - `IncidentError::NotFound` if no incident references the file, or the file is gone
    /// - `IncidentError::Forbidden` if the subject neither owns nor was shared the video
    pub async fn open_video(&self, token: Option<&str>, filename: &str) -> Result<VideoPayload, IncidentError> {
        let token = token.filter(|t| !t.is_empty()).ok_or(TokenError::Invalid)?;
        let caller = self.tokens.verify(token).map_err(|e| {
            tracing::debug!("Rejected video token: {}", e);
            e
        })?;

        if !is_plain_filename(filename) {
            return Err(IncidentError::validation("invalid video filename"));
        }

        let incident = self
            .store
            .find_incident_by_video(filename)
            .await?
            .ok_or_else(|| IncidentError::NotFound("video not found".to_string()))?;
        let shares = self.store.find_shares_for_incident(&incident.id).await?;
        if !self.gate.can_view_video(&caller, &incident, &shares) {
            return Err(IncidentError::Forbidden(VIDEO_DENIED.to_string()));
        }

        let bytes = self.videos.read(filename).await?;
        tracing::debug!("Streaming video {} to {}", filename, caller);
        Ok(VideoPayload {
            filename: filename.to_string(),
            content_type: video_content_type(filename),
            bytes,
        })
    }

    async fn load_incident(
        &self,
        caller: &UserId,
        incident_id: &IncidentId,
        denial: Denial,
    ) -> Result<Incident, IncidentError> {
        let load = async {
            self.store
                .find_incident(incident_id)
                .await
                .map_err(IncidentError::from)
        };
        self.gate
            .load_owned(caller, "incident", load, |incident: &Incident| &incident.user, denial)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geocode::MockGeocoder;
    use crate::sms::MockSmsTransport;
    use crate::store::{FsVideoStore, MemoryStore, MemoryUserDirectory};
    use crate::types::{Contact, User};
    use chrono::Utc;
    use serde_json::json;
    use std::time::Duration;

    fn service(geocoder: MockGeocoder, sms: MockSmsTransport) -> (IncidentService, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let users = MemoryUserDirectory::new();
        users.insert(User {
            id: UserId::from("alice"),
            full_name: "Alice Liddell".to_string(),
            phone: "+15550101".to_string(),
        });
        let collaborators = Collaborators {
            store: store.clone(),
            users: Arc::new(users),
            geocoder: Arc::new(geocoder),
            dispatcher: NotificationDispatcher::new(Arc::new(sms), Some("SafeLine".to_string())),
            videos: Arc::new(FsVideoStore::new(std::env::temp_dir())),
        };
        let tokens = TokenService::from_secret("unit-secret", Duration::from_secs(300));
        (IncidentService::new(collaborators, tokens), store)
    }

    fn draft(user: &str) -> IncidentDraft {
        IncidentDraft::from_json(json!({
            "user": user,
            "contact": { "displayName": "Sam", "phone": "+15550100" },
            "location": { "latitude": 10.5, "longitude": -20.25, "name": "ignored" }
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn unauthorized_create_touches_no_collaborator() {
        let mut geocoder = MockGeocoder::new();
        geocoder.expect_reverse_geocode().never();
        let mut sms = MockSmsTransport::new();
        sms.expect_send_message().never();
        let (service, store) = service(geocoder, sms);

        let err = service.create(&UserId::from("mallory"), draft("alice")).await.unwrap_err();

        assert!(matches!(err, IncidentError::Unauthorized(_)));
        assert_eq!(store.incident_count(), 0);
    }

    #[tokio::test]
    async fn location_name_comes_from_geocoder() {
        let mut geocoder = MockGeocoder::new();
        geocoder
            .expect_reverse_geocode()
            .withf(|lat, lng| (*lat - 10.5).abs() < f64::EPSILON && (*lng + 20.25).abs() < f64::EPSILON)
            .times(1)
            .returning(|_, _| Ok("Harbour Road".to_string()));
        let mut sms = MockSmsTransport::new();
        sms.expect_send_message()
            .withf(|to, from, body| to == "+15550100" && from == "SafeLine" && body.contains("Harbour Road"))
            .times(1)
            .returning(|_, _, _| Ok(json!({ "message-count": "1" })));
        let (service, store) = service(geocoder, sms);

        let outcome = service.create(&UserId::from("alice"), draft("alice")).await.unwrap();

        let stored = outcome.incident().unwrap();
        assert_eq!(stored.location.name, "Harbour Road");
        assert!(stored.send_success);
        assert_eq!(store.incident_count(), 1);
    }

    #[tokio::test]
    async fn unregistered_owner_is_not_notified() {
        let mut geocoder = MockGeocoder::new();
        geocoder
            .expect_reverse_geocode()
            .returning(|_, _| Ok("Harbour Road".to_string()));
        let mut sms = MockSmsTransport::new();
        sms.expect_send_message().never();
        let (service, store) = service(geocoder, sms);

        let outcome = service.create(&UserId::from("ghost"), draft("ghost")).await.unwrap();

        assert_eq!(outcome, CreateOutcome::NotRegistered);
        assert_eq!(store.incident_count(), 0);
    }

    fn incident() -> Incident {
        Incident {
            id: IncidentId::new(),
            user: UserId::from("alice"),
            contact: Contact {
                display_name: "Sam".to_string(),
                phone: "+15550100".to_string(),
            },
            location: Location {
                latitude: 1.0,
                longitude: 2.0,
                name: "Somewhere".to_string(),
            },
            kind: IncidentType::Sms,
            send_success: true,
            video_file: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn merge_lets_incident_fields_win() {
        let record = incident();
        let provider = json!({ "message-count": "1", "user": "spoofed" });

        let merged = merge_provider_response(&provider, &record);

        assert_eq!(merged["message-count"], "1");
        assert_eq!(merged["user"], "alice");
        assert_eq!(merged["sendSuccess"], true);
    }

    #[test]
    fn merge_wraps_non_object_responses() {
        let merged = merge_provider_response(&json!("queued"), &incident());
        assert_eq!(merged["providerResponse"], "queued");
        assert_eq!(merged["type"], "SMS");
    }

    #[test]
    fn content_types_by_extension() {
        assert_eq!(video_content_type("a.MP4"), "video/mp4");
        assert_eq!(video_content_type("a.webm"), "video/webm");
        assert_eq!(video_content_type("a.mov"), "video/quicktime");
        assert_eq!(video_content_type("noext"), "application/octet-stream");
    }

    #[test]
    fn outcome_exposes_stored_incident() {
        let record = incident();
        assert_eq!(
            CreateOutcome::Undelivered { incident: record.clone() }.incident(),
            Some(&record)
        );
        assert!(CreateOutcome::NotRegistered.incident().is_none());
    }
}
