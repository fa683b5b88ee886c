//! SafeLine Core - personal-safety incident reporting
//!
//! The domain layer behind the SafeLine HTTP API:
//! - Validates and records incidents reported by app users
//! - Notifies the user's emergency contact by SMS with a map link
//! - Enforces ownership on every read, share and delete
//! - Issues short-lived signed tokens for video playback
//!
//! Storage, geocoding and SMS delivery sit behind traits so the lifecycle
//! can be exercised without network or disk.
//!
//! # Example
//!
//! ```rust,ignore
//! use safeline_core::prelude::*;
//!
//! # async fn example(service: IncidentService) -> Result<(), IncidentError> {
//! let caller = UserId::from("alice");
//! let draft = IncidentDraft::from_json(serde_json::json!({
//!     "user": "alice",
//!     "contact": { "displayName": "Sam", "phone": "+15550100" },
//!     "location": { "latitude": 51.5, "longitude": -0.12 }
//! }))?;
//!
//! match service.create(&caller, draft).await? {
//!     CreateOutcome::Delivered { incident, .. } => println!("sent {}", incident.id),
//!     CreateOutcome::Undelivered { incident } => println!("stored {}", incident.id),
//!     CreateOutcome::NotRegistered => println!("not an app user"),
//! }
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod access;
pub mod config;
pub mod error;
pub mod geocode;
pub mod incident;
pub mod notify;
pub mod sms;
pub mod store;
pub mod token;
pub mod types;

// Re-exports for convenience
pub use access::{AccessGate, Denial};
pub use config::{GeocodingConfig, HttpConfig, ServiceConfig, SmsConfig, TokenConfig, UserRecord};
pub use error::{ConfigError, GeocodeError, IncidentError, SmsError, StoreError, TokenError};
pub use geocode::{Geocoder, GoogleGeocoder};
pub use incident::{
    merge_provider_response, video_content_type, Collaborators, CreateOutcome, IncidentService,
    VideoPayload, NOT_REGISTERED_MESSAGE,
};
pub use notify::{Coordinates, DeliveryResult, Notification, NotificationDispatcher};
pub use sms::{NexmoTransport, SmsTransport};
pub use store::{
    FsVideoStore, IncidentStore, MemoryStore, MemoryUserDirectory, UserDirectory, VideoStore,
};
pub use token::{AccessClaims, IssuedToken, TokenService};
pub use types::{
    Contact, Incident, IncidentDraft, IncidentId, IncidentType, Location, ShareId, ShareRequest,
    User, UserId, VideoShare,
};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with SafeLine Core
    pub use crate::{
        CreateOutcome, Incident, IncidentDraft, IncidentError, IncidentId, IncidentService,
        ServiceConfig, ShareRequest, TokenService, UserId, VideoShare,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
