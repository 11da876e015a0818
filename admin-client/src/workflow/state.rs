use std::sync::{Mutex, MutexGuard, PoisonError};

use shared::UserRecord;

/// Status of a form-backed workflow.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum WorkflowState {
    #[default]
    Idle,
    Submitting,
    Locked,
    Succeeded(String),
    Failed(String),
}

impl WorkflowState {
    pub fn message(&self) -> Option<&str> {
        match self {
            WorkflowState::Succeeded(message) | WorkflowState::Failed(message) => Some(message),
            _ => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, WorkflowState::Failed(_))
    }
}

impl std::fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WorkflowState::Idle => write!(f, "idle"),
            WorkflowState::Submitting => write!(f, "submitting"),
            WorkflowState::Locked => write!(f, "locked"),
            WorkflowState::Succeeded(message) => write!(f, "{}", message),
            WorkflowState::Failed(message) => write!(f, "{}", message),
        }
    }
}

/// Upload progress, from selection to a terminal result.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum UploadPhase {
    #[default]
    Idle,
    Selecting,
    Validating,
    Ready,
    Uploading,
    Succeeded,
    Failed(String),
}

impl UploadPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, UploadPhase::Succeeded | UploadPhase::Failed(_))
    }
}

impl std::fmt::Display for UploadPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UploadPhase::Idle => write!(f, "idle"),
            UploadPhase::Selecting => write!(f, "selecting"),
            UploadPhase::Validating => write!(f, "validating"),
            UploadPhase::Ready => write!(f, "ready"),
            UploadPhase::Uploading => write!(f, "uploading"),
            UploadPhase::Succeeded => write!(f, "succeeded"),
            UploadPhase::Failed(reason) => write!(f, "failed: {}", reason),
        }
    }
}

/// Notifications flowing from registration to the roster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RosterEvent {
    Registered(UserRecord),
}

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Marks a request as in flight until `complete` is called.
///
/// If the owning future is dropped first, `on_abandon` runs so the workflow
/// never stays stuck in its in-flight state.
pub(crate) struct InFlight<'a, T> {
    inner: &'a Mutex<T>,
    on_abandon: fn(&mut T),
    armed: bool,
}

impl<'a, T> InFlight<'a, T> {
    pub(crate) fn new(inner: &'a Mutex<T>, on_abandon: fn(&mut T)) -> Self {
        Self {
            inner,
            on_abandon,
            armed: true,
        }
    }

    pub(crate) fn complete(mut self) -> MutexGuard<'a, T> {
        self.armed = false;
        lock(self.inner)
    }
}

impl<T> Drop for InFlight<'_, T> {
    fn drop(&mut self) {
        if self.armed {
            (self.on_abandon)(&mut lock(self.inner));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_flight_abandon_runs_hook() {
        let flag = Mutex::new(true);
        {
            let _flight = InFlight::new(&flag, |busy: &mut bool| *busy = false);
        }
        assert!(!*lock(&flag));
    }

    #[test]
    fn test_in_flight_complete_skips_hook() {
        let flag = Mutex::new(true);
        let flight = InFlight::new(&flag, |busy: &mut bool| *busy = false);
        let guard = flight.complete();
        assert!(*guard);
    }

    #[test]
    fn test_state_messages() {
        assert_eq!(WorkflowState::Idle.message(), None);
        assert_eq!(
            WorkflowState::Failed("nope".to_string()).message(),
            Some("nope")
        );
        assert!(UploadPhase::Succeeded.is_terminal());
        assert!(!UploadPhase::Uploading.is_terminal());
    }
}
