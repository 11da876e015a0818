use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use shared::{record_counter, record_gauge, Result, ServiceError, UserRecord, Username};
use tokio::sync::broadcast::{self, error::TryRecvError};
use tracing::{debug, info, warn};

use crate::gateway::AdminBackend;
use crate::workflow::abort::{abortable, AbortHandle};
use crate::workflow::state::{lock, InFlight, RosterEvent, WorkflowState};

#[derive(Debug, Default)]
struct RosterInner {
    users: Vec<UserRecord>,
    editing: bool,
    busy: bool,
    state: WorkflowState,
    last_loaded: Option<DateTime<Utc>>,
}

fn abandon(inner: &mut RosterInner) {
    inner.busy = false;
    inner.state = WorkflowState::Failed("Request cancelled".to_string());
}

/// The admin panel's view of registered users.
///
/// Local entries only change after the backend acknowledges a change.
pub struct RosterController<B> {
    backend: Arc<B>,
    inner: Mutex<RosterInner>,
    events: Mutex<broadcast::Receiver<RosterEvent>>,
    abort: AbortHandle,
}

impl<B: AdminBackend> RosterController<B> {
    pub fn new(backend: Arc<B>, events: broadcast::Receiver<RosterEvent>) -> Self {
        Self {
            backend,
            inner: Mutex::new(RosterInner::default()),
            events: Mutex::new(events),
            abort: AbortHandle::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, RosterInner> {
        lock(&self.inner)
    }

    pub fn users(&self) -> Vec<UserRecord> {
        self.lock().users.clone()
    }

    pub fn state(&self) -> WorkflowState {
        self.lock().state.clone()
    }

    pub fn is_editing(&self) -> bool {
        self.lock().editing
    }

    pub fn last_loaded(&self) -> Option<DateTime<Utc>> {
        self.lock().last_loaded
    }

    /// Flips edit mode for the whole list and returns the new mode.
    pub fn toggle_edit(&self) -> bool {
        let mut inner = self.lock();
        inner.editing = !inner.editing;
        inner.editing
    }

    fn begin(&self) -> Result<InFlight<'_, RosterInner>> {
        let mut inner = self.lock();
        if inner.busy {
            return Err(ServiceError::Busy);
        }
        inner.busy = true;
        inner.state = WorkflowState::Submitting;
        Ok(InFlight::new(&self.inner, abandon))
    }

    /// Fetches the current user list and replaces the local view.
    pub async fn load(&self) -> Result<Vec<UserRecord>> {
        let flight = self.begin()?;

        let result = abortable(self.abort.signal(), self.backend.list_users()).await;

        let mut inner = flight.complete();
        inner.busy = false;
        match result {
            Ok(users) => {
                debug!(count = users.len(), "Roster loaded");
                record_gauge("roster_size", users.len() as f64);
                inner.users = users.clone();
                inner.last_loaded = Some(Utc::now());
                inner.state = WorkflowState::Succeeded(format!("Loaded {} users", users.len()));
                Ok(users)
            }
            Err(e) => {
                warn!(error = %e, "Failed to fetch leaderboard");
                inner.state = WorkflowState::Failed(format!("Error fetching leaderboard: {}", e));
                Err(e)
            }
        }
    }

    /// Reloads if registrations were published since the last call.
    pub async fn sync(&self) -> Result<Option<Vec<UserRecord>>> {
        let changed = {
            let mut events = lock(&self.events);
            let mut changed = false;
            loop {
                match events.try_recv() {
                    Ok(RosterEvent::Registered(user)) => {
                        debug!(username = %user.username, "Registration observed");
                        changed = true;
                    }
                    Err(TryRecvError::Lagged(skipped)) => {
                        debug!(skipped, "Roster lagged behind registrations");
                        changed = true;
                    }
                    Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
                }
            }
            changed
        };

        if changed {
            self.load().await.map(Some)
        } else {
            Ok(None)
        }
    }

    /// Deletes a user; the local entry goes away only if the backend agrees.
    pub async fn delete(&self, username: &str) -> Result<()> {
        let flight = self.begin()?;

        let result = abortable(self.abort.signal(), self.backend.delete_user(username)).await;

        let mut inner = flight.complete();
        inner.busy = false;
        match result {
            Ok(()) => {
                inner.users.retain(|user| user.username != username);
                info!(username, "User deleted");
                record_counter("roster_deletes_total", 1);
                inner.state = WorkflowState::Succeeded(format!(
                    "User '{}' has been deleted successfully.",
                    username
                ));
                Ok(())
            }
            Err(e) => {
                warn!(username, error = %e, "Delete failed");
                inner.state = WorkflowState::Failed(format!("Error deleting user: {}", e.detail()));
                Err(e)
            }
        }
    }

    /// Renames `old_username` to `new_username`. Requires edit mode.
    pub async fn update(&self, old_username: &str, new_username: &str) -> Result<UserRecord> {
        let flight = self.begin()?;

        let checked = {
            let inner = self.lock();
            check_rename(&inner, old_username, new_username)
        };
        let new_username = match checked {
            Ok(username) => username,
            Err(e) => {
                let mut inner = flight.complete();
                inner.busy = false;
                inner.state = WorkflowState::Failed(format!("Error: {}", e));
                return Err(e);
            }
        };

        let result = abortable(
            self.abort.signal(),
            self.backend.update_username(old_username, new_username.as_str()),
        )
        .await;

        let mut inner = flight.complete();
        inner.busy = false;
        match result {
            Ok(()) => {
                let position = inner.users.iter().position(|u| u.username == old_username);
                let Some(index) = position else {
                    inner.state = WorkflowState::Failed(format!("User {} is no longer listed", old_username));
                    return Err(ServiceError::UserNotFound(old_username.to_string()));
                };
                inner.users[index].username = new_username.to_string();
                let updated = inner.users[index].clone();

                info!(old_username, new_username = %new_username, "Username updated");
                inner.state = WorkflowState::Succeeded(format!(
                    "Renamed {} to {}",
                    old_username, new_username
                ));
                Ok(updated)
            }
            Err(e) => {
                warn!(old_username, error = %e, "Rename failed");
                inner.state = WorkflowState::Failed(format!("Error: {}", e.detail()));
                Err(e)
            }
        }
    }

    /// Cancels any in-flight roster request; later requests fail immediately.
    pub fn shutdown(&self) {
        self.abort.abort();
    }
}

fn check_rename(inner: &RosterInner, old_username: &str, new_username: &str) -> Result<Username> {
    if !inner.editing {
        return Err(ServiceError::ValidationFailed("Edit mode is not active".to_string()));
    }

    let new_username = Username::new(new_username)?;

    if new_username.as_str() == old_username {
        return Err(ServiceError::InvalidUsername(
            "New username matches the current one".to_string(),
        ));
    }

    if !inner.users.iter().any(|u| u.username == old_username) {
        return Err(ServiceError::UserNotFound(old_username.to_string()));
    }

    if inner.users.iter().any(|u| u.username == new_username.as_str()) {
        return Err(ServiceError::Conflict(format!("User {} already exists", new_username)));
    }

    Ok(new_username)
}
