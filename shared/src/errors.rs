use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Configuration missing: {0}")]
    ConfigurationMissing(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("Usernames do not match")]
    UsernameMismatch,

    #[error("Invalid username: {0}")]
    InvalidUsername(String),

    #[error("{0}")]
    Conflict(String),

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Server error ({status}): {detail}")]
    Server { status: u16, detail: String },

    #[error("Unknown server error ({status}): {status_text}")]
    UnknownServerError { status: u16, status_text: String },

    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    #[error("Request cancelled")]
    Cancelled,

    #[error("Another request is already in progress")]
    Busy,

    #[error("Admin access required")]
    AccessDenied,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    /// HTTP status reported by the backend, if the error came from a response.
    pub fn status(&self) -> Option<u16> {
        match self {
            ServiceError::Server { status, .. } | ServiceError::UnknownServerError { status, .. } => {
                Some(*status)
            }
            _ => None,
        }
    }

    /// Server-provided detail, or the status text when the body could not be read.
    pub fn detail(&self) -> String {
        match self {
            ServiceError::Server { detail, .. } => detail.clone(),
            ServiceError::UnknownServerError { status_text, .. } => status_text.clone(),
            ServiceError::Conflict(detail) | ServiceError::UserNotFound(detail) => detail.clone(),
            other => other.to_string(),
        }
    }
}

impl From<serde_json::Error> for ServiceError {
    fn from(err: serde_json::Error) -> Self {
        ServiceError::UnexpectedResponse(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detail_prefers_server_body() {
        let error = ServiceError::Server {
            status: 422,
            detail: "Couldn't get the correct url".to_string(),
        };
        assert_eq!(error.detail(), "Couldn't get the correct url");
        assert_eq!(error.status(), Some(422));
    }

    #[test]
    fn test_detail_falls_back_to_status_text() {
        let error = ServiceError::UnknownServerError {
            status: 502,
            status_text: "Bad Gateway".to_string(),
        };
        assert_eq!(error.detail(), "Bad Gateway");
        assert_eq!(error.status(), Some(502));
    }

    #[test]
    fn test_transport_has_no_status() {
        let error = ServiceError::Transport("connection refused".to_string());
        assert_eq!(error.status(), None);
    }

    #[test]
    fn test_not_found_detail_is_bare() {
        let error = ServiceError::UserNotFound("User not found".to_string());
        assert_eq!(error.detail(), "User not found");
        assert_eq!(error.to_string(), "User not found: User not found");
    }

    #[test]
    fn test_conflict_displays_detail_verbatim() {
        let error = ServiceError::Conflict("User already exists".to_string());
        assert_eq!(error.to_string(), "User already exists");
    }
}
