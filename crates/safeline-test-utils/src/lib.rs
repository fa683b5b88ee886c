//! Testing utilities for SafeLine workspace
//!
//! Shared fakes, fixtures and a wired-up service harness.

#![allow(missing_docs)]

use async_trait::async_trait;
use parking_lot::Mutex;
use safeline_core::{
    Collaborators, FsVideoStore, GeocodeError, Geocoder, Incident, IncidentDraft, IncidentService,
    IncidentStore, MemoryStore, MemoryUserDirectory, NotificationDispatcher, SmsError, SmsTransport,
    TokenService, User, UserId,
};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

pub const TEST_SECRET: &str = "safeline-test-secret";
pub const TEST_PLACE: &str = "221B Baker St, London NW1 6XE, UK";

/// One message handed to [`RecordingSms`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub to: String,
    pub from: String,
    pub body: String,
}

/// SMS transport that records every attempt
#[derive(Debug)]
pub struct RecordingSms {
    fail: bool,
    sent: Mutex<Vec<SentMessage>>,
}

impl RecordingSms {
    pub fn succeeding() -> Self {
        Self {
            fail: false,
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().clone()
    }
}

#[async_trait]
impl SmsTransport for RecordingSms {
    async fn send_message(&self, to: &str, from: &str, body: &str) -> Result<Value, SmsError> {
        self.sent.lock().push(SentMessage {
            to: to.to_string(),
            from: from.to_string(),
            body: body.to_string(),
        });
        if self.fail {
            return Err(SmsError::Rejected {
                status: "9".to_string(),
                message: "Partner quota exceeded".to_string(),
            });
        }
        Ok(json!({
            "message-count": "1",
            "messages": [{ "to": to, "status": "0", "message-id": "0A0000001" }]
        }))
    }
}

/// Geocoder with a canned answer
#[derive(Debug, Clone)]
pub struct FixedGeocoder(pub String);

#[async_trait]
impl Geocoder for FixedGeocoder {
    async fn reverse_geocode(&self, _latitude: f64, _longitude: f64) -> Result<String, GeocodeError> {
        Ok(self.0.clone())
    }
}

/// Geocoder that never resolves
#[derive(Debug, Clone, Copy)]
pub struct FailingGeocoder;

#[async_trait]
impl Geocoder for FailingGeocoder {
    async fn reverse_geocode(&self, _latitude: f64, _longitude: f64) -> Result<String, GeocodeError> {
        Err(GeocodeError::Status {
            status: "OVER_QUERY_LIMIT".to_string(),
            message: "quota exhausted".to_string(),
        })
    }
}

pub fn alice() -> User {
    User {
        id: UserId::from("alice"),
        full_name: "Alice Liddell".to_string(),
        phone: "+15550101".to_string(),
    }
}

pub fn bob() -> User {
    User {
        id: UserId::from("bob"),
        full_name: "Bob Dobbs".to_string(),
        phone: "+15550102".to_string(),
    }
}

/// Raw creation body for `user`
pub fn draft_json(user: &str) -> Value {
    json!({
        "user": user,
        "contact": { "displayName": "Sam Vimes", "phone": "+15550100" },
        "location": { "latitude": 51.5237, "longitude": -0.1585 }
    })
}

pub fn draft(user: &str) -> IncidentDraft {
    IncidentDraft::from_json(draft_json(user)).unwrap()
}

/// Service wired to in-memory stores and a temporary video directory
pub struct Harness {
    pub service: Arc<IncidentService>,
    pub store: Arc<MemoryStore>,
    pub users: Arc<MemoryUserDirectory>,
    pub sms: Arc<RecordingSms>,
    pub video_dir: TempDir,
}

impl Harness {
    /// Delivering SMS, fixed geocoder, alice and bob registered
    pub fn new() -> Self {
        Self::with(RecordingSms::succeeding(), Arc::new(FixedGeocoder(TEST_PLACE.to_string())))
    }

    pub fn with(sms: RecordingSms, geocoder: Arc<dyn Geocoder>) -> Self {
        let store = Arc::new(MemoryStore::new());
        let users = Arc::new(MemoryUserDirectory::new());
        users.insert(alice());
        users.insert(bob());
        let sms = Arc::new(sms);
        let video_dir = tempfile::tempdir().unwrap();

        let collaborators = Collaborators {
            store: store.clone(),
            users: users.clone(),
            geocoder,
            dispatcher: NotificationDispatcher::new(sms.clone(), None),
            videos: Arc::new(FsVideoStore::new(video_dir.path())),
        };
        let tokens = TokenService::from_secret(TEST_SECRET, Duration::from_secs(300));

        Self {
            service: Arc::new(IncidentService::new(collaborators, tokens)),
            store,
            users,
            sms,
            video_dir,
        }
    }

    /// Store an incident for `owner` directly, skipping notification
    pub async fn seed_incident(&self, owner: &str) -> Incident {
        self.store
            .create_incident(safeline_core::types::NewIncident {
                user: UserId::from(owner),
                contact: safeline_core::Contact {
                    display_name: "Sam Vimes".to_string(),
                    phone: "+15550100".to_string(),
                },
                location: safeline_core::Location {
                    latitude: 51.5237,
                    longitude: -0.1585,
                    name: TEST_PLACE.to_string(),
                },
                kind: safeline_core::IncidentType::Sms,
                send_success: true,
            })
            .await
            .unwrap()
    }

    /// Write a recording to disk and attach it to `incident`
    pub async fn attach_video(&self, incident: &Incident, filename: &str, bytes: &[u8]) -> Incident {
        std::fs::write(self.video_dir.path().join(filename), bytes).unwrap();
        self.store.attach_video(&incident.id, filename).await.unwrap()
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}
