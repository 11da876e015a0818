use async_trait::async_trait;
use serde_json::Value;
use shared::{Result, UserRecord};

use crate::gateway::responses::RegisterRequest;
use crate::media::MediaFile;

/// Everything the console asks of the display backend.
///
/// [`HttpBackend`](crate::gateway::HttpBackend) is the production implementation;
/// workflow controllers only see this trait.
#[async_trait]
pub trait AdminBackend: Send + Sync {
    /// Registers a user and returns the record the server confirmed.
    async fn register_user(&self, request: &RegisterRequest) -> Result<UserRecord>;

    async fn list_users(&self) -> Result<Vec<UserRecord>>;

    async fn delete_user(&self, username: &str) -> Result<()>;

    async fn update_username(&self, old_username: &str, new_username: &str) -> Result<()>;

    /// Sends an announcement image or video to the matrix and returns the server payload.
    async fn upload_media(&self, file: &MediaFile) -> Result<Value>;
}
