//! Composition root
//!
//! Builds every collaborator once from [`ServiceConfig`] and hands them to
//! the lifecycle manager. Handlers only ever see [`AppState`].

use crate::auth::{Authenticator, StaticAuthenticator};
use safeline_core::{
    Collaborators, ConfigError, FsVideoStore, GoogleGeocoder, IncidentService, MemoryStore,
    MemoryUserDirectory, NexmoTransport, NotificationDispatcher, ServiceConfig, TokenService,
};
use std::sync::Arc;

/// Shared request state
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<IncidentService>,
    pub auth: Arc<dyn Authenticator>,
    pub max_body_bytes: u64,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("service", &self.service)
            .field("max_body_bytes", &self.max_body_bytes)
            .finish_non_exhaustive()
    }
}

impl AppState {
    /// Create state
    #[must_use]
    pub fn new(service: Arc<IncidentService>, auth: Arc<dyn Authenticator>, max_body_bytes: u64) -> Self {
        Self {
            service,
            auth,
            max_body_bytes,
        }
    }

    /// Wire the shipped collaborators from configuration
    ///
    /// # Errors
    /// - `ConfigError::Invalid` if provider credentials are missing or a client cannot be built
    pub fn compose(config: &ServiceConfig) -> Result<Self, ConfigError> {
        let collaborators = Collaborators {
            store: Arc::new(MemoryStore::new()),
            users: Arc::new(MemoryUserDirectory::from_records(&config.users)),
            geocoder: Arc::new(GoogleGeocoder::new(&config.geocoding)?),
            dispatcher: NotificationDispatcher::new(
                Arc::new(NexmoTransport::new(&config.sms)?),
                config.sms.sender_id.clone(),
            ),
            videos: Arc::new(FsVideoStore::new(config.video_dir.clone())),
        };
        let tokens = TokenService::from_config(&config.token);
        let auth = StaticAuthenticator::from_config(&config.http.sessions);
        if auth.is_empty() {
            tracing::warn!("No bearer sessions configured; every authenticated route will answer 401");
        }
        tracing::info!(
            "Composed service: {} users, {} sessions, videos in {}",
            config.users.len(),
            auth.len(),
            config.video_dir.display()
        );

        Ok(Self::new(
            Arc::new(IncidentService::new(collaborators, tokens)),
            Arc::new(auth),
            config.http.max_body_bytes,
        ))
    }
}
