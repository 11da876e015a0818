pub mod dashboard;
pub mod gateway;
pub mod media;
pub mod messages;
pub mod workflow;

pub use dashboard::{AccessMode, Dashboard};
pub use gateway::{AdminBackend, HttpBackend};
pub use media::{MediaFile, MediaValidator, Validation};
pub use workflow::{
    RegistrationController, RegistrationForm, RosterController, UploadController, UploadPhase,
    WorkflowState,
};
