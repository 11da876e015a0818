pub mod abort;
pub mod registration;
pub mod roster;
pub mod state;
pub mod upload;
pub mod watch;

pub use abort::{abortable, AbortHandle, AbortSignal};
pub use registration::{RegistrationController, RegistrationForm, USERNAME_MISMATCH_MESSAGE};
pub use roster::RosterController;
pub use state::{RosterEvent, UploadPhase, WorkflowState};
pub use upload::{MediaSelection, UploadController};
pub use watch::{watch_roster, RosterDiff, MIN_REFRESH_INTERVAL};
