#![allow(dead_code)]

use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use admin_client::gateway::RegisterRequest;
use admin_client::{AdminBackend, MediaFile};
use async_trait::async_trait;
use image::{ImageBuffer, ImageFormat, Rgb};
use serde_json::{json, Value};
use shared::{Result, ServiceError, UserRecord};

/// How a fake endpoint should fail.
#[derive(Debug, Clone)]
pub enum FakeFailure {
    Conflict,
    NotFound,
    Server(u16, &'static str),
    Unknown(u16),
    Transport,
}

impl FakeFailure {
    fn to_error(&self) -> ServiceError {
        match self {
            FakeFailure::Conflict => ServiceError::Conflict("User already exists".to_string()),
            FakeFailure::NotFound => ServiceError::UserNotFound("User not found".to_string()),
            FakeFailure::Server(status, detail) => ServiceError::Server {
                status: *status,
                detail: detail.to_string(),
            },
            FakeFailure::Unknown(status) => ServiceError::UnknownServerError {
                status: *status,
                status_text: "Internal Server Error".to_string(),
            },
            FakeFailure::Transport => ServiceError::Transport("connection refused".to_string()),
        }
    }
}

#[derive(Default)]
struct Failures {
    register: Option<FakeFailure>,
    list: Option<FakeFailure>,
    delete: Option<FakeFailure>,
    update: Option<FakeFailure>,
    upload: Option<FakeFailure>,
}

/// In-memory backend that counts calls and fails on request.
#[derive(Default)]
pub struct FakeBackend {
    users: Mutex<Vec<UserRecord>>,
    failures: Mutex<Failures>,
    latency: Mutex<Duration>,
    pub register_calls: AtomicUsize,
    pub list_calls: AtomicUsize,
    pub delete_calls: AtomicUsize,
    pub update_calls: AtomicUsize,
    pub upload_calls: AtomicUsize,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_users(names: &[&str]) -> Self {
        let backend = Self::default();
        *backend.users.lock().unwrap() = names
            .iter()
            .map(|name| UserRecord::new(*name, "", ""))
            .collect();
        backend
    }

    pub fn with_latency(self, latency: Duration) -> Self {
        *self.latency.lock().unwrap() = latency;
        self
    }

    pub fn fail_register(&self, failure: FakeFailure) {
        self.failures.lock().unwrap().register = Some(failure);
    }

    pub fn fail_list(&self, failure: FakeFailure) {
        self.failures.lock().unwrap().list = Some(failure);
    }

    pub fn fail_delete(&self, failure: FakeFailure) {
        self.failures.lock().unwrap().delete = Some(failure);
    }

    pub fn fail_update(&self, failure: FakeFailure) {
        self.failures.lock().unwrap().update = Some(failure);
    }

    pub fn fail_upload(&self, failure: FakeFailure) {
        self.failures.lock().unwrap().upload = Some(failure);
    }

    pub fn clear_failures(&self) {
        *self.failures.lock().unwrap() = Failures::default();
    }

    pub fn usernames(&self) -> Vec<String> {
        self.users
            .lock()
            .unwrap()
            .iter()
            .map(|u| u.username.clone())
            .collect()
    }

    pub fn calls(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }

    async fn pause(&self) {
        let latency = *self.latency.lock().unwrap();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
    }

    fn failure(&self, pick: impl Fn(&Failures) -> Option<FakeFailure>) -> Result<()> {
        let failures = self.failures.lock().unwrap();
        match pick(&*failures) {
            Some(failure) => Err(failure.to_error()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl AdminBackend for FakeBackend {
    async fn register_user(&self, request: &RegisterRequest) -> Result<UserRecord> {
        self.register_calls.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        self.failure(|f| f.register.clone())?;

        let mut users = self.users.lock().unwrap();
        if users.iter().any(|u| u.username == request.username) {
            return Err(FakeFailure::Conflict.to_error());
        }
        let user = UserRecord::new(
            request.username.clone(),
            request.first_name.clone(),
            request.last_name.clone(),
        );
        users.push(user.clone());
        Ok(user)
    }

    async fn list_users(&self) -> Result<Vec<UserRecord>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        self.failure(|f| f.list.clone())?;

        Ok(self.users.lock().unwrap().clone())
    }

    async fn delete_user(&self, username: &str) -> Result<()> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        self.failure(|f| f.delete.clone())?;

        let mut users = self.users.lock().unwrap();
        let before = users.len();
        users.retain(|u| u.username != username);
        if users.len() == before {
            return Err(FakeFailure::NotFound.to_error());
        }
        Ok(())
    }

    async fn update_username(&self, old_username: &str, new_username: &str) -> Result<()> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        self.failure(|f| f.update.clone())?;

        let mut users = self.users.lock().unwrap();
        match users.iter_mut().find(|u| u.username == old_username) {
            Some(user) => {
                user.username = new_username.to_string();
                Ok(())
            }
            None => Err(FakeFailure::NotFound.to_error()),
        }
    }

    async fn upload_media(&self, file: &MediaFile) -> Result<Value> {
        self.upload_calls.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        self.failure(|f| f.upload.clone())?;

        Ok(json!({ "message": "File uploaded", "file": file.file_name() }))
    }
}

pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let image = ImageBuffer::from_pixel(width, height, Rgb([255u8, 0, 0]));
    let mut bytes = Cursor::new(Vec::new());
    image
        .write_to(&mut bytes, ImageFormat::Png)
        .expect("Failed to encode test PNG");
    bytes.into_inner()
}

pub fn png_file(name: &str, width: u32, height: u32) -> MediaFile {
    MediaFile::new(name, "image/png", png_bytes(width, height))
}

pub fn video_file(name: &str) -> MediaFile {
    MediaFile::new(name, "video/mp4", vec![0u8, 0, 0, 24, b'f', b't', b'y', b'p'])
}
