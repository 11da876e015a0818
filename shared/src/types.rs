use serde::{Deserialize, Deserializer, Serialize};

use crate::errors::{Result, ServiceError};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Username(String);

impl Username {
    const MAX_LENGTH: usize = 64;

    pub fn new(username: impl Into<String>) -> Result<Self> {
        let username = username.into().trim().to_string();
        Self::validate(&username)?;
        Ok(Self(username))
    }

    fn validate(username: &str) -> Result<()> {
        if username.is_empty() {
            return Err(ServiceError::InvalidUsername(
                "Username must not be empty".to_string(),
            ));
        }

        if username.chars().count() > Self::MAX_LENGTH {
            return Err(ServiceError::InvalidUsername(format!(
                "Username must be at most {} characters",
                Self::MAX_LENGTH
            )));
        }

        if username.chars().any(char::is_whitespace) {
            return Err(ServiceError::InvalidUsername(
                "Username must not contain whitespace".to_string(),
            ));
        }

        Ok(())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Username {
    type Error = ServiceError;

    fn try_from(value: String) -> Result<Self> {
        Username::new(value)
    }
}

impl From<Username> for String {
    fn from(username: Username) -> Self {
        username.0
    }
}

impl std::fmt::Display for Username {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// A registered user as the backend reports it.
///
/// Leaderboard rows also carry scoring columns; only the ones worth showing are kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub username: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub first_name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub last_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub points: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_solved: Option<i64>,
}

impl UserRecord {
    pub fn new(
        username: impl Into<String>,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            first_name: first_name.into(),
            last_name: last_name.into(),
            points: None,
            total_solved: None,
        }
    }

    pub fn display_name(&self) -> String {
        let full = format!("{} {}", self.first_name, self.last_name);
        let full = full.trim();
        if full.is_empty() {
            self.username.clone()
        } else {
            full.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_username_validation_rejects_invalid() {
        assert!(Username::new("").is_err(), "Empty");
        assert!(Username::new("   ").is_err(), "Blank");
        assert!(Username::new("user name").is_err(), "Inner space");
        assert!(Username::new("a".repeat(65)).is_err(), "Too long");
    }

    #[test]
    fn test_username_validation_accepts_valid() {
        assert!(Username::new("a").is_ok(), "Single character");
        assert!(Username::new("a".repeat(64)).is_ok(), "Maximum length");
        assert!(Username::new("leet_coder-99").is_ok(), "Mixed");
    }

    #[test]
    fn test_username_is_trimmed() {
        let username = Username::new("  alice ").unwrap();
        assert_eq!(username.as_str(), "alice");
    }

    #[test]
    fn test_username_error_type() {
        let error = Username::new("").unwrap_err();
        assert!(matches!(error, ServiceError::InvalidUsername(_)));
    }

    #[test]
    fn test_user_record_tolerates_null_names_and_extra_columns() {
        let json = r#"{
            "username": "alice",
            "first_name": null,
            "last_name": "Liddell",
            "total_solved": 42,
            "points": 97,
            "easy_solved": 20
        }"#;

        let record: UserRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.username, "alice");
        assert_eq!(record.first_name, "");
        assert_eq!(record.last_name, "Liddell");
        assert_eq!(record.points, Some(97));
        assert_eq!(record.total_solved, Some(42));
    }

    #[test]
    fn test_display_name_falls_back_to_username() {
        assert_eq!(UserRecord::new("alice", "", "").display_name(), "alice");
        assert_eq!(UserRecord::new("alice", "Alice", "L").display_name(), "Alice L");
    }
}
