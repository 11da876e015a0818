pub mod file;
pub mod preview;
pub mod validator;

pub use file::{mime_for_extension, MediaFile, MediaKind};
pub use preview::{PreviewHandle, PreviewStore};
pub use validator::{MediaValidator, Validation, NOT_SQUARE_REASON, UNSUPPORTED_REASON};
