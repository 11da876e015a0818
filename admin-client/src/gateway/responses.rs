use serde::{Deserialize, Serialize};
use serde_json::Value;
use shared::{Result, ServiceError, UserRecord};

/// Detail the backend sends when a registration collides with an existing user.
pub const USER_EXISTS_DETAIL: &str = "User already exists";

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RosterPayload {
    Bare(Vec<UserRecord>),
    Wrapped { users: Vec<UserRecord> },
}

impl From<RosterPayload> for Vec<UserRecord> {
    fn from(payload: RosterPayload) -> Self {
        match payload {
            RosterPayload::Bare(users) | RosterPayload::Wrapped { users } => users,
        }
    }
}

/// Accepts either `{ "users": [...] }` or a bare list and returns the list.
pub fn parse_roster(body: &[u8]) -> Result<Vec<UserRecord>> {
    serde_json::from_slice::<RosterPayload>(body)
        .map(Vec::from)
        .map_err(|_| {
            ServiceError::UnexpectedResponse(
                "leaderboard response is neither a user list nor {\"users\": [...]}".to_string(),
            )
        })
}

#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Deserialize)]
pub struct RegisterResponse {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(rename = "userInfo")]
    pub user_info: UserRecord,
}

pub fn parse_register(body: &[u8]) -> Result<UserRecord> {
    let response: RegisterResponse = serde_json::from_slice(body)?;
    Ok(response.user_info)
}

#[derive(Debug, Serialize)]
pub(crate) struct DeleteRequest<'a> {
    pub username: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct UpdateUsernameRequest<'a> {
    #[serde(rename = "oldUser")]
    pub old_user: &'a str,
    #[serde(rename = "newUser")]
    pub new_user: &'a str,
}

/// Upload replies are logged, not interpreted; non-JSON bodies are kept as text.
pub fn parse_payload(body: &[u8]) -> Value {
    if body.is_empty() {
        return Value::Null;
    }

    serde_json::from_slice(body)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(body).into_owned()))
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: Value,
}

/// Classifies a non-success response by status and `{ "detail": ... }` body.
pub fn error_from_response(status: u16, status_text: Option<&str>, body: &[u8]) -> ServiceError {
    let detail = serde_json::from_slice::<ErrorBody>(body)
        .ok()
        .map(|body| match body.detail {
            Value::String(text) => text,
            other => other.to_string(),
        });

    match detail {
        Some(detail) => ServiceError::Server { status, detail },
        None => ServiceError::UnknownServerError {
            status,
            status_text: status_text.unwrap_or("Unknown status").to_string(),
        },
    }
}

/// Narrows a rejection from a user endpoint into `Conflict` or `UserNotFound`.
///
/// Only register, delete and rename responses mean "user" by 404/409; other
/// endpoints keep the raw status.
pub fn user_error(error: ServiceError) -> ServiceError {
    match error {
        ServiceError::Server { status, detail } if status == 409 || detail == USER_EXISTS_DETAIL => {
            ServiceError::Conflict(detail)
        }
        ServiceError::Server { status: 404, detail } => ServiceError::UserNotFound(detail),
        other => other,
    }
}
