use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use serde_json::Value;
use shared::{record_counter, ServiceError};
use tracing::{debug, info, warn};

use crate::gateway::AdminBackend;
use crate::media::{MediaFile, MediaValidator, PreviewHandle, PreviewStore, Validation};
use crate::workflow::abort::{abortable, AbortHandle};
use crate::workflow::state::{lock, InFlight, UploadPhase};

const CANCELLED_MESSAGE: &str = "Request cancelled";

/// The file currently picked for upload, with its preview and validation result.
#[derive(Debug)]
pub struct MediaSelection {
    file: MediaFile,
    preview: Option<PreviewHandle>,
    validation: Option<Validation>,
}

impl MediaSelection {
    fn new(file: MediaFile) -> Self {
        Self {
            file,
            preview: None,
            validation: None,
        }
    }

    fn is_valid(&self) -> bool {
        self.validation.as_ref().is_some_and(|v| v.valid)
    }
}

#[derive(Debug, Default)]
struct UploadInner {
    phase: UploadPhase,
    selection: Option<MediaSelection>,
    generation: u64,
    last_payload: Option<Value>,
}

/// Drives select → validate → upload → reset for announcement media.
pub struct UploadController<B> {
    backend: Arc<B>,
    validator: MediaValidator,
    previews: PreviewStore,
    inner: Mutex<UploadInner>,
    abort: AbortHandle,
}

impl<B: AdminBackend> UploadController<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self::with_previews(backend, PreviewStore::new())
    }

    pub fn with_previews(backend: Arc<B>, previews: PreviewStore) -> Self {
        Self {
            backend,
            validator: MediaValidator::new(),
            previews,
            inner: Mutex::new(UploadInner::default()),
            abort: AbortHandle::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, UploadInner> {
        lock(&self.inner)
    }

    pub fn phase(&self) -> UploadPhase {
        self.lock().phase.clone()
    }

    pub fn validation(&self) -> Option<Validation> {
        self.lock()
            .selection
            .as_ref()
            .and_then(|selection| selection.validation.clone())
    }

    pub fn preview_path(&self) -> Option<PathBuf> {
        self.lock()
            .selection
            .as_ref()
            .and_then(|selection| selection.preview.as_ref())
            .map(|preview| preview.path().to_path_buf())
    }

    /// Whether the upload control would be enabled right now.
    pub fn can_upload(&self) -> bool {
        let inner = self.lock();
        inner.phase != UploadPhase::Uploading
            && inner.selection.as_ref().is_some_and(MediaSelection::is_valid)
    }

    pub fn last_payload(&self) -> Option<Value> {
        self.lock().last_payload.clone()
    }

    pub fn previews(&self) -> &PreviewStore {
        &self.previews
    }

    /// Replaces the current selection, prepares a preview and validates the file.
    ///
    /// Ignored while an upload is in flight.
    pub async fn select_file(&self, file: MediaFile) -> UploadPhase {
        let generation = {
            let mut inner = self.lock();
            if inner.phase == UploadPhase::Uploading {
                warn!(file = file.file_name(), "Ignoring selection while an upload is in flight");
                return inner.phase.clone();
            }

            inner.generation += 1;
            inner.selection = Some(MediaSelection::new(file.clone()));
            inner.phase = UploadPhase::Selecting;
            inner.generation
        };

        let store = self.previews.clone();
        let preview_source = file.clone();
        let preview = match tokio::task::spawn_blocking(move || store.create(&preview_source)).await {
            Ok(Ok(preview)) => Some(preview),
            Ok(Err(e)) => {
                warn!(file = file.file_name(), error = %e, "Continuing without preview");
                None
            }
            Err(e) => {
                warn!(file = file.file_name(), error = %e, "Preview task failed");
                None
            }
        };

        {
            let mut inner = self.lock();
            if inner.generation != generation {
                debug!(file = file.file_name(), "Selection superseded before validation");
                return inner.phase.clone();
            }
            if let Some(selection) = inner.selection.as_mut() {
                selection.preview = preview;
            }
            inner.phase = UploadPhase::Validating;
        }

        let validation = self.validator.validate(&file).await;

        let mut inner = self.lock();
        if inner.generation != generation {
            debug!(file = file.file_name(), "Discarding validation for superseded selection");
            return inner.phase.clone();
        }

        inner.phase = if validation.valid {
            UploadPhase::Ready
        } else {
            UploadPhase::Failed(
                validation
                    .reason
                    .clone()
                    .unwrap_or_else(|| "Invalid file".to_string()),
            )
        };
        if let Some(selection) = inner.selection.as_mut() {
            selection.validation = Some(validation);
        }

        info!(file = file.file_name(), phase = %inner.phase, "File selected");
        inner.phase.clone()
    }

    /// Uploads the current selection. A no-op unless a valid selection exists
    /// and no upload is already in flight.
    pub async fn upload(&self) -> UploadPhase {
        let (file, flight) = {
            let mut inner = self.lock();
            if inner.phase == UploadPhase::Uploading {
                debug!("Upload already in flight");
                return UploadPhase::Uploading;
            }

            let file = match inner.selection.as_ref() {
                Some(selection) if selection.is_valid() => selection.file.clone(),
                _ => {
                    debug!(phase = %inner.phase, "Nothing valid to upload");
                    return inner.phase.clone();
                }
            };

            inner.phase = UploadPhase::Uploading;
            (
                file,
                InFlight::new(&self.inner, |inner: &mut UploadInner| {
                    inner.phase = UploadPhase::Failed(CANCELLED_MESSAGE.to_string());
                }),
            )
        };

        record_counter("upload_requests_total", 1);

        let result = abortable(self.abort.signal(), self.backend.upload_media(&file)).await;

        let mut inner = flight.complete();
        match result {
            Ok(payload) => {
                info!(file = file.file_name(), payload = %payload, "Upload succeeded");
                inner.selection = None;
                inner.last_payload = Some(payload);
                inner.phase = UploadPhase::Succeeded;
            }
            Err(e) => {
                warn!(file = file.file_name(), error = %e, "Upload failed");
                record_counter("upload_failures_total", 1);
                inner.phase = UploadPhase::Failed(upload_failure_message(&e));
            }
        }

        inner.phase.clone()
    }

    /// Drops the selection and its preview. Refused while uploading.
    pub fn reset(&self) -> bool {
        let mut inner = self.lock();
        if inner.phase == UploadPhase::Uploading {
            warn!("Cannot reset while an upload is in flight");
            return false;
        }

        inner.generation += 1;
        inner.selection = None;
        inner.phase = UploadPhase::Idle;
        true
    }

    /// Cancels any in-flight upload; later uploads fail immediately.
    pub fn shutdown(&self) {
        self.abort.abort();
    }
}

fn upload_failure_message(error: &ServiceError) -> String {
    match error {
        ServiceError::Cancelled => CANCELLED_MESSAGE.to_string(),
        ServiceError::Transport(_) => "Upload failed: could not reach the server".to_string(),
        other => match other.status() {
            Some(status) => format!("Upload failed with status {}", status),
            None => format!("Upload failed: {}", other),
        },
    }
}
