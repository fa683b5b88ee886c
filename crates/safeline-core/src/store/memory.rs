//! In-memory stores backed by `DashMap`

use super::{IncidentStore, UserDirectory};
use crate::config::UserRecord;
use crate::error::StoreError;
use crate::types::{Incident, IncidentId, NewIncident, NewShare, ShareId, User, UserId, VideoShare};
use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;

/// Process-local incident store
///
/// Starts empty and lives as long as the process. Uploads are handled
/// outside this service, so `video_file` is only ever set through
/// [`IncidentStore::attach_video`] by whatever ingests recordings. Until
/// then every video fetch answers not found and video deletion has no file
/// to remove.
#[derive(Debug, Default)]
pub struct MemoryStore {
    incidents: DashMap<IncidentId, Incident>,
    shares: DashMap<ShareId, VideoShare>,
}

impl MemoryStore {
    /// Create an empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored incidents
    #[inline]
    #[must_use]
    pub fn incident_count(&self) -> usize {
        self.incidents.len()
    }

    /// Number of stored shares
    #[inline]
    #[must_use]
    pub fn share_count(&self) -> usize {
        self.shares.len()
    }

    fn update_video(&self, id: &IncidentId, video: Option<String>) -> Result<Incident, StoreError> {
        let mut entry = self
            .incidents
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound("incident".to_string()))?;
        entry.video_file = video;
        Ok(entry.value().clone())
    }
}

#[async_trait]
impl IncidentStore for MemoryStore {
    async fn create_incident(&self, fields: NewIncident) -> Result<Incident, StoreError> {
        let incident = Incident {
            id: IncidentId::new(),
            user: fields.user,
            contact: fields.contact,
            location: fields.location,
            kind: fields.kind,
            send_success: fields.send_success,
            video_file: None,
            created_at: Utc::now(),
        };
        self.incidents.insert(incident.id, incident.clone());
        Ok(incident)
    }

    async fn find_incident(&self, id: &IncidentId) -> Result<Option<Incident>, StoreError> {
        Ok(self.incidents.get(id).map(|entry| entry.value().clone()))
    }

    async fn find_incident_by_video(&self, filename: &str) -> Result<Option<Incident>, StoreError> {
        Ok(self
            .incidents
            .iter()
            .find(|entry| entry.video_file.as_deref() == Some(filename))
            .map(|entry| entry.value().clone()))
    }

    async fn list_incidents_by_user(&self, user: &UserId) -> Result<Vec<Incident>, StoreError> {
        let mut incidents: Vec<Incident> = self
            .incidents
            .iter()
            .filter(|entry| &entry.user == user)
            .map(|entry| entry.value().clone())
            .collect();
        incidents.sort_by_key(|incident| (incident.created_at, incident.id));
        Ok(incidents)
    }

    async fn attach_video(&self, id: &IncidentId, filename: &str) -> Result<Incident, StoreError> {
        if filename.is_empty() {
            return Err(StoreError::Validation("video filename is empty".to_string()));
        }
        self.update_video(id, Some(filename.to_string()))
    }

    async fn clear_video(&self, id: &IncidentId) -> Result<Incident, StoreError> {
        self.update_video(id, None)
    }

    async fn create_share(&self, fields: NewShare) -> Result<VideoShare, StoreError> {
        if !self.incidents.contains_key(&fields.incident) {
            return Err(StoreError::NotFound("incident".to_string()));
        }
        let share = VideoShare {
            id: ShareId::new(),
            incident: fields.incident,
            user: fields.user,
            share_to: fields.share_to,
            created_at: Utc::now(),
        };
        self.shares.insert(share.id, share.clone());
        Ok(share)
    }

    async fn find_shares_by_user(&self, user: &UserId) -> Result<Vec<VideoShare>, StoreError> {
        let mut shares: Vec<VideoShare> = self
            .shares
            .iter()
            .filter(|entry| &entry.user == user || &entry.share_to == user)
            .map(|entry| entry.value().clone())
            .collect();
        shares.sort_by_key(|share| (share.created_at, share.id));
        Ok(shares)
    }

    async fn find_shares_for_incident(&self, id: &IncidentId) -> Result<Vec<VideoShare>, StoreError> {
        let mut shares: Vec<VideoShare> = self
            .shares
            .iter()
            .filter(|entry| &entry.incident == id)
            .map(|entry| entry.value().clone())
            .collect();
        shares.sort_by_key(|share| (share.created_at, share.id));
        Ok(shares)
    }
}

/// Process-local user directory
#[derive(Debug, Default)]
pub struct MemoryUserDirectory {
    users: DashMap<UserId, User>,
}

impl MemoryUserDirectory {
    /// Create an empty directory
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed from configured user records
    #[must_use]
    pub fn from_records(records: &[UserRecord]) -> Self {
        let directory = Self::new();
        for record in records {
            directory.insert(User {
                id: record.id.clone(),
                full_name: record.full_name.clone(),
                phone: record.phone.clone(),
            });
        }
        directory
    }

    /// Register or replace a user
    pub fn insert(&self, user: User) {
        self.users.insert(user.id.clone(), user);
    }
}

#[async_trait]
impl UserDirectory for MemoryUserDirectory {
    async fn find_user(&self, id: &UserId) -> Result<Option<User>, StoreError> {
        Ok(self.users.get(id).map(|entry| entry.value().clone()))
    }
}
