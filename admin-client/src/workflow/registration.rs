use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use shared::{record_counter, Result, ServiceError, UserRecord, Username};
use tokio::sync::broadcast;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::gateway::{AdminBackend, RegisterRequest};
use crate::workflow::abort::{abortable, AbortHandle};
use crate::workflow::state::{lock, InFlight, RosterEvent, WorkflowState};

pub const USERNAME_MISMATCH_MESSAGE: &str = "Usernames do not match. Please try again.";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistrationForm {
    pub username: String,
    pub confirm_username: String,
    pub first_name: String,
    pub last_name: String,
}

impl RegistrationForm {
    pub fn new(
        username: impl Into<String>,
        confirm_username: impl Into<String>,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            confirm_username: confirm_username.into(),
            first_name: first_name.into(),
            last_name: last_name.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    fn clear(&mut self) {
        *self = Self::default();
    }

    fn to_request(&self) -> Result<RegisterRequest> {
        if self.username != self.confirm_username {
            return Err(ServiceError::UsernameMismatch);
        }

        let username = Username::new(self.username.as_str())?;

        Ok(RegisterRequest {
            username: username.as_str().to_string(),
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
        })
    }
}

#[derive(Debug, Default)]
struct RegistrationInner {
    form: RegistrationForm,
    state: WorkflowState,
    locked_until: Option<Instant>,
}

impl RegistrationInner {
    fn is_locked(&self, now: Instant) -> bool {
        self.locked_until.is_some_and(|until| now < until)
    }
}

/// Owns the register-user form: confirmation check, submission, messaging and cooldown.
pub struct RegistrationController<B> {
    backend: Arc<B>,
    cooldown: Duration,
    inner: Mutex<RegistrationInner>,
    events: broadcast::Sender<RosterEvent>,
    abort: AbortHandle,
}

impl<B: AdminBackend> RegistrationController<B> {
    pub fn new(backend: Arc<B>, cooldown: Duration, events: broadcast::Sender<RosterEvent>) -> Self {
        Self {
            backend,
            cooldown,
            inner: Mutex::new(RegistrationInner::default()),
            events,
            abort: AbortHandle::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, RegistrationInner> {
        lock(&self.inner)
    }

    /// Outcome of the most recent submission.
    pub fn state(&self) -> WorkflowState {
        self.lock().state.clone()
    }

    /// Like [`state`](Self::state), but reports `Locked` during the cooldown.
    pub fn status(&self) -> WorkflowState {
        let inner = self.lock();
        if inner.state != WorkflowState::Submitting && inner.is_locked(Instant::now()) {
            WorkflowState::Locked
        } else {
            inner.state.clone()
        }
    }

    pub fn form(&self) -> RegistrationForm {
        self.lock().form.clone()
    }

    pub fn is_locked(&self) -> bool {
        self.lock().is_locked(Instant::now())
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    /// Submits the form. Returns `Submitting` or `Locked` without doing
    /// anything if a submission is in flight or the cooldown is running.
    pub async fn submit(&self, form: RegistrationForm) -> WorkflowState {
        let (request, flight) = {
            let mut inner = self.lock();
            if inner.state == WorkflowState::Submitting {
                return WorkflowState::Submitting;
            }
            if inner.is_locked(Instant::now()) {
                return WorkflowState::Locked;
            }

            inner.form = form;
            let request = match inner.form.to_request() {
                Ok(request) => request,
                Err(e) => {
                    inner.state = WorkflowState::Failed(failure_message(&e));
                    return inner.state.clone();
                }
            };

            inner.state = WorkflowState::Submitting;
            (
                request,
                InFlight::new(&self.inner, |inner: &mut RegistrationInner| {
                    inner.state = WorkflowState::Failed(failure_message(&ServiceError::Cancelled));
                }),
            )
        };

        record_counter("registration_attempts_total", 1);

        let result = abortable(self.abort.signal(), self.backend.register_user(&request)).await;

        let mut inner = flight.complete();
        inner.locked_until = Some(Instant::now() + self.cooldown);
        let state = match result {
            Ok(user) => {
                info!(username = %user.username, "User registered");
                inner.form.clear();
                self.publish(user.clone());
                WorkflowState::Succeeded(format!("User {} registered successfully!", user.username))
            }
            Err(e @ ServiceError::Conflict(_)) => {
                warn!(username = %request.username, error = %e, "Registration conflict");
                inner.form.clear();
                WorkflowState::Failed(failure_message(&e))
            }
            Err(e) => {
                warn!(username = %request.username, error = %e, "Registration failed");
                WorkflowState::Failed(failure_message(&e))
            }
        };

        inner.state = state.clone();
        state
    }

    /// Cancels an in-flight submission; later submissions fail immediately.
    pub fn shutdown(&self) {
        self.abort.abort();
    }

    fn publish(&self, user: UserRecord) {
        if self.events.send(RosterEvent::Registered(user)).is_err() {
            debug!("No roster listening for registrations");
        }
    }
}

fn failure_message(error: &ServiceError) -> String {
    match error {
        ServiceError::UsernameMismatch => USERNAME_MISMATCH_MESSAGE.to_string(),
        ServiceError::InvalidUsername(reason) => format!("Error: {}", reason),
        ServiceError::Transport(_) => "Error: could not reach the server".to_string(),
        ServiceError::Cancelled => "Error: request cancelled".to_string(),
        other => format!("Error: {}", other.detail()),
    }
}
