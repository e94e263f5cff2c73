//! Operations exposed to the presentation layer.
//!
//! [`VitalsService`] pairs one connector with one sync pipeline. It holds no
//! state between calls.

use crate::connector::{HealthConnector, PermissionOutcome, ReadOutcome};
use crate::sample::{ConnectorStatus, ReadWindow};
use crate::sync::{IngestBackend, StorageMode, SyncError, SyncPipeline, SyncResult, UploadRequest};

/// Outcome of a combined read + upload.
#[derive(Debug)]
pub struct WindowSync {
    pub read: ReadOutcome,
    /// `None` when the read was unavailable and nothing was uploaded
    pub upload: Option<Result<SyncResult, SyncError>>,
}

pub struct VitalsService<T> {
    connector: Box<dyn HealthConnector>,
    pipeline: SyncPipeline<T>,
}

impl<T: IngestBackend> VitalsService<T> {
    pub fn new(connector: Box<dyn HealthConnector>, backend: T) -> Self {
        Self {
            connector,
            pipeline: SyncPipeline::new(backend),
        }
    }

    pub fn connector(&self) -> &dyn HealthConnector {
        self.connector.as_ref()
    }

    pub fn pipeline(&self) -> &SyncPipeline<T> {
        &self.pipeline
    }

    pub async fn connector_status(&self) -> ConnectorStatus {
        self.connector.check_availability().await
    }

    pub async fn request_permissions(&self) -> PermissionOutcome {
        self.connector.request_permissions().await
    }

    pub async fn read_last_24h(&self, window: &ReadWindow) -> ReadOutcome {
        self.connector.read_window(window).await
    }

    pub async fn upload_to_backend(&self, request: &UploadRequest) -> Result<SyncResult, SyncError> {
        self.pipeline.upload_request(request).await
    }

    /// Read `window` and upload the result. Unavailable reads are never uploaded.
    pub async fn sync_window(
        &self,
        user_id: &str,
        storage_mode: StorageMode,
        window: &ReadWindow,
    ) -> WindowSync {
        let read = self.connector.read_window(window).await;
        if let Some(reason) = &read.unavailable {
            tracing::info!(%reason, "health data unavailable, skipping upload");
            return WindowSync { read, upload: None };
        }

        let upload = self.pipeline.upload(user_id, storage_mode, &read.samples).await;
        WindowSync {
            read,
            upload: Some(upload),
        }
    }
}
