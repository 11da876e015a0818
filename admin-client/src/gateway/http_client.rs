use std::time::Instant;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method, RequestBuilder};
use serde_json::Value;
use shared::{record_counter, record_timing, BackendConfig, Result, ServiceError, UserRecord};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::gateway::backend::AdminBackend;
use crate::gateway::responses::{
    error_from_response, parse_payload, parse_register, parse_roster, user_error, DeleteRequest,
    RegisterRequest, UpdateUsernameRequest,
};
use crate::media::MediaFile;

const API_KEY_HEADER: &str = "x-api-key";
const REQUEST_ID_HEADER: &str = "x-request-id";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Credential {
    None,
    ApiKey,
}

/// The only component that talks to the backend over HTTP.
#[derive(Clone)]
pub struct HttpBackend {
    client: Client,
    config: BackendConfig,
}

impl HttpBackend {
    pub fn new(config: BackendConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ServiceError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        info!(base_url = %config.base_url, "Backend gateway ready");

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    fn request(
        &self,
        method: Method,
        path: &str,
        credential: Credential,
    ) -> Result<(RequestBuilder, String)> {
        let url = self.config.endpoint(path)?;
        let request_id = Uuid::new_v4().to_string();

        let mut builder = self
            .client
            .request(method, url)
            .header(REQUEST_ID_HEADER, &request_id);

        if credential == Credential::ApiKey {
            builder = builder.header(API_KEY_HEADER, &self.config.api_key);
        }

        Ok((builder, request_id))
    }

    async fn execute(
        &self,
        endpoint: &'static str,
        builder: RequestBuilder,
        request_id: &str,
    ) -> Result<Vec<u8>> {
        let started = Instant::now();

        let response = builder.send().await.map_err(|e| {
            warn!(endpoint, request_id, error = %e, "Request failed before a response arrived");
            record_counter("gateway_transport_errors_total", 1);
            ServiceError::Transport(e.to_string())
        })?;

        let status = response.status();
        let body = response.bytes().await.map_err(|e| {
            warn!(endpoint, request_id, error = %e, "Failed to read response body");
            ServiceError::Transport(e.to_string())
        })?;

        let elapsed = started.elapsed();
        record_timing("gateway_request_duration_seconds", elapsed.as_secs_f64());

        if !status.is_success() {
            let error = error_from_response(status.as_u16(), status.canonical_reason(), &body);
            warn!(
                endpoint,
                request_id,
                status = status.as_u16(),
                elapsed_ms = elapsed.as_millis() as u64,
                error = %error,
                "Backend rejected request"
            );
            record_counter("gateway_http_errors_total", 1);
            return Err(error);
        }

        debug!(
            endpoint,
            request_id,
            status = status.as_u16(),
            bytes = body.len(),
            elapsed_ms = elapsed.as_millis() as u64,
            "Backend request completed"
        );

        Ok(body.to_vec())
    }
}

#[async_trait]
impl AdminBackend for HttpBackend {
    async fn register_user(&self, request: &RegisterRequest) -> Result<UserRecord> {
        let (builder, request_id) = self.request(Method::POST, "/register", Credential::ApiKey)?;
        let body = self
            .execute("register", builder.json(request), &request_id)
            .await
            .map_err(user_error)?;

        parse_register(&body)
    }

    async fn list_users(&self) -> Result<Vec<UserRecord>> {
        let (builder, request_id) = self.request(Method::GET, "/leaderboard", Credential::None)?;
        let body = self.execute("leaderboard", builder, &request_id).await?;

        parse_roster(&body)
    }

    async fn delete_user(&self, username: &str) -> Result<()> {
        let (builder, request_id) = self.request(Method::POST, "/deleteUser", Credential::None)?;
        self.execute(
            "deleteUser",
            builder.json(&DeleteRequest { username }),
            &request_id,
        )
        .await
        .map_err(user_error)?;

        Ok(())
    }

    async fn update_username(&self, old_username: &str, new_username: &str) -> Result<()> {
        let (builder, request_id) =
            self.request(Method::POST, "/updateUsername", Credential::ApiKey)?;
        let payload = UpdateUsernameRequest {
            old_user: old_username,
            new_user: new_username,
        };
        self.execute("updateUsername", builder.json(&payload), &request_id)
            .await
            .map_err(user_error)?;

        Ok(())
    }

    async fn upload_media(&self, file: &MediaFile) -> Result<Value> {
        let part = Part::bytes(file.bytes().to_vec())
            .file_name(file.file_name().to_string())
            .mime_str(file.mime_type())
            .map_err(|e| {
                ServiceError::ValidationFailed(format!(
                    "Invalid MIME type {}: {}",
                    file.mime_type(),
                    e
                ))
            })?;
        let form = Form::new().part("file", part);

        let (builder, request_id) = self.request(Method::POST, "/uploadImage", Credential::ApiKey)?;

        info!(
            request_id = %request_id,
            file = file.file_name(),
            bytes = file.len(),
            "Uploading media"
        );

        let body = self
            .execute("uploadImage", builder.multipart(form), &request_id)
            .await?;

        Ok(parse_payload(&body))
    }
}
