//! Persistence collaborators
//!
//! - [`IncidentStore`]: incidents and their video shares
//! - [`UserDirectory`]: registered app users
//! - [`VideoStore`]: recorded video files
//!
//! The core never locks around these; each implementation provides its own
//! consistency guarantees.

pub mod memory;
pub mod video;

pub use memory::{MemoryStore, MemoryUserDirectory};
pub use video::FsVideoStore;

use crate::error::StoreError;
use crate::types::{Incident, IncidentId, NewIncident, NewShare, User, UserId, VideoShare};
use async_trait::async_trait;

/// Incident and share persistence
#[async_trait]
pub trait IncidentStore: Send + Sync {
    /// Persist a new incident, assigning its id and creation time
    async fn create_incident(&self, fields: NewIncident) -> Result<Incident, StoreError>;

    /// Look up an incident by id
    async fn find_incident(&self, id: &IncidentId) -> Result<Option<Incident>, StoreError>;

    /// Look up the incident whose recording is `filename`
    async fn find_incident_by_video(&self, filename: &str) -> Result<Option<Incident>, StoreError>;

    /// All incidents owned by `user`, oldest first
    async fn list_incidents_by_user(&self, user: &UserId) -> Result<Vec<Incident>, StoreError>;

    /// Associate a recording with an incident
    async fn attach_video(&self, id: &IncidentId, filename: &str) -> Result<Incident, StoreError>;

    /// Drop the recording reference, keeping the incident
    async fn clear_video(&self, id: &IncidentId) -> Result<Incident, StoreError>;

    /// Persist a new share
    async fn create_share(&self, fields: NewShare) -> Result<VideoShare, StoreError>;

    /// Shares created by or addressed to `user`, oldest first
    async fn find_shares_by_user(&self, user: &UserId) -> Result<Vec<VideoShare>, StoreError>;

    /// Shares of one incident
    async fn find_shares_for_incident(&self, id: &IncidentId) -> Result<Vec<VideoShare>, StoreError>;
}

/// Registered app users
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// `None` when the id does not belong to a registered user
    async fn find_user(&self, id: &UserId) -> Result<Option<User>, StoreError>;
}

/// Recorded video files
#[async_trait]
pub trait VideoStore: Send + Sync {
    /// Full contents of a recording
    async fn read(&self, filename: &str) -> Result<Vec<u8>, StoreError>;

    /// Delete a recording
    async fn remove(&self, filename: &str) -> Result<(), StoreError>;
}
