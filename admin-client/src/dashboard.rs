use std::sync::Arc;

use shared::{Result, ServiceError, WorkflowConfig};
use tokio::sync::broadcast;
use tracing::info;
use url::Url;

use crate::gateway::AdminBackend;
use crate::workflow::{RegistrationController, RosterController, UploadController};

const ROSTER_EVENT_CAPACITY: usize = 64;

/// Who is looking at the dashboard. Only decides what is shown; the backend
/// must enforce authorization on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AccessMode {
    #[default]
    Operator,
    Admin,
}

impl AccessMode {
    /// Reads the `isAdmin=true` flag from a query string (leading `?` optional).
    pub fn from_query(query: &str) -> Self {
        let query = query.trim_start_matches('?');
        let is_admin = url::form_urlencoded::parse(query.as_bytes())
            .any(|(key, value)| key == "isAdmin" && value == "true");

        if is_admin {
            AccessMode::Admin
        } else {
            AccessMode::Operator
        }
    }

    pub fn from_link(link: &str) -> Result<Self> {
        let url = Url::parse(link)
            .map_err(|e| ServiceError::ValidationFailed(format!("Invalid dashboard link: {}", e)))?;
        Ok(Self::from_query(url.query().unwrap_or_default()))
    }

    pub fn is_admin(self) -> bool {
        self == AccessMode::Admin
    }
}

/// The three workflows over one backend, with registrations flowing one way
/// into the roster.
pub struct Dashboard<B> {
    registration: RegistrationController<B>,
    roster: RosterController<B>,
    upload: UploadController<B>,
    access: AccessMode,
}

impl<B: AdminBackend> Dashboard<B> {
    pub fn new(backend: B, config: &WorkflowConfig, access: AccessMode) -> Self {
        Self::from_shared(Arc::new(backend), config, access)
    }

    pub fn from_shared(backend: Arc<B>, config: &WorkflowConfig, access: AccessMode) -> Self {
        let (events, roster_events) = broadcast::channel(ROSTER_EVENT_CAPACITY);

        info!(
            access = ?access,
            cooldown_ms = config.registration_cooldown.as_millis() as u64,
            "Dashboard ready"
        );

        Self {
            registration: RegistrationController::new(
                Arc::clone(&backend),
                config.registration_cooldown,
                events,
            ),
            roster: RosterController::new(Arc::clone(&backend), roster_events),
            upload: UploadController::new(backend),
            access,
        }
    }

    pub fn access(&self) -> AccessMode {
        self.access
    }

    pub fn registration(&self) -> &RegistrationController<B> {
        &self.registration
    }

    pub fn upload(&self) -> &UploadController<B> {
        &self.upload
    }

    pub fn roster(&self) -> Result<&RosterController<B>> {
        if self.access.is_admin() {
            Ok(&self.roster)
        } else {
            Err(ServiceError::AccessDenied)
        }
    }

    /// Cancels everything in flight. Call when the dashboard goes away.
    pub fn shutdown(&self) {
        self.registration.shutdown();
        self.roster.shutdown();
        self.upload.shutdown();
        info!("Dashboard shut down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_flag_from_query() {
        assert_eq!(AccessMode::from_query("isAdmin=true"), AccessMode::Admin);
        assert_eq!(AccessMode::from_query("?tab=users&isAdmin=true"), AccessMode::Admin);
        assert_eq!(AccessMode::from_query("isAdmin=false"), AccessMode::Operator);
        assert_eq!(AccessMode::from_query("isAdmin=TRUE"), AccessMode::Operator);
        assert_eq!(AccessMode::from_query(""), AccessMode::Operator);
    }

    #[test]
    fn test_admin_flag_from_link() {
        assert_eq!(
            AccessMode::from_link("http://dashboard.local/?isAdmin=true").unwrap(),
            AccessMode::Admin
        );
        assert_eq!(
            AccessMode::from_link("http://dashboard.local/announcement").unwrap(),
            AccessMode::Operator
        );
        assert!(AccessMode::from_link("not a link").is_err());
    }
}
