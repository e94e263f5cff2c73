//! End-to-end tests: fixture bridge → connector → sync pipeline.

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use vital_sync::{
    connector::{for_platform, FixtureBridge, NoopBridge, PlatformKind},
    sample::{CanonicalSample, Category, ConnectorStatus, GlucoseSource, ReadWindow},
    service::VitalsService,
    sync::{IngestBackend, IngestRequest, IngestResponse, StorageMode, SyncError, SyncResult, UploadRequest},
};

/// Backend double answering with a fixed `inserted` count.
struct CountingBackend {
    inserted: u64,
    calls: AtomicUsize,
    last: Mutex<Option<IngestRequest>>,
}

impl CountingBackend {
    fn new(inserted: u64) -> Self {
        Self {
            inserted,
            calls: AtomicUsize::new(0),
            last: Mutex::new(None),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IngestBackend for CountingBackend {
    async fn post_samples(&self, request: &IngestRequest) -> Result<IngestResponse, SyncError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last.lock().unwrap() = Some(request.clone());
        Ok(IngestResponse {
            inserted: self.inserted,
        })
    }
}

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap()
}

fn window() -> ReadWindow {
    ReadWindow::new(t0(), t0() + Duration::hours(24)).unwrap()
}

fn healthkit_fixture() -> FixtureBridge {
    let mut records = HashMap::new();
    records.insert(
        Category::BloodGlucose,
        vec![json!({"value": 7.8, "unit": "mmol/L", "startDate": "2024-01-15T01:00:00Z"})],
    );
    records.insert(
        Category::HeartRate,
        vec![
            json!({"value": 62, "startDate": "2024-01-15T02:00:00Z"}),
            json!({"value": 75, "startDate": "2024-01-15T03:00:00Z"}),
        ],
    );
    records.insert(
        Category::Steps,
        vec![json!({
            "value": 900,
            "startDate": "2024-01-15T04:00:00Z",
            "endDate": "2024-01-15T04:10:00Z"
        })],
    );
    records.insert(
        Category::ExerciseMinutes,
        vec![json!({
            "startDate": "2024-01-15T05:00:00Z",
            "endDate": "2024-01-15T05:30:00Z"
        })],
    );
    FixtureBridge::with_records(records)
}

#[tokio::test]
async fn test_mmol_glucose_read_through_healthkit() {
    let connector = for_platform(PlatformKind::HealthKit, healthkit_fixture());
    let outcome = connector.read_window(&window()).await;

    assert!(outcome.is_available());
    let glucose: Vec<&CanonicalSample> = outcome
        .samples
        .iter()
        .filter(|s| s.category() == Category::BloodGlucose)
        .collect();
    assert_eq!(
        glucose,
        vec![&CanonicalSample::BloodGlucose {
            timestamp: t0() + Duration::hours(1),
            mg_dl: 140.54,
            source: GlucoseSource::Cgm,
        }]
    );
    assert_eq!(outcome.samples.len(), 5);
}

#[tokio::test]
async fn test_health_connect_read_normalizes_vendor_shapes() {
    let mut records = HashMap::new();
    records.insert(
        Category::BloodGlucose,
        vec![json!({
            "time": "2024-01-15T01:00:00Z",
            "level": {"inMillimolesPerLiter": 7.8},
            "metadata": {"recordingMethod": 2}
        })],
    );
    records.insert(
        Category::Steps,
        vec![json!({
            "count": 600,
            "startTime": "2024-01-15T04:00:00Z",
            "endTime": "2024-01-15T04:10:00Z"
        })],
    );
    let connector = for_platform(PlatformKind::HealthConnect, FixtureBridge::with_records(records));

    let outcome = connector.read_window(&window()).await;
    assert_eq!(
        outcome.samples,
        vec![
            CanonicalSample::BloodGlucose {
                timestamp: t0() + Duration::hours(1),
                mg_dl: 140.54,
                source: GlucoseSource::Cgm,
            },
            CanonicalSample::Steps {
                timestamp: t0() + Duration::hours(4),
                spm: 60.0,
                interval_minutes: 10,
            },
        ]
    );
}

#[tokio::test]
async fn test_partial_acceptance_is_reported_as_skipped() {
    let connector = for_platform(PlatformKind::HealthKit, healthkit_fixture());
    let service = VitalsService::new(connector, CountingBackend::new(3));

    let synced = service.sync_window("u_123", StorageMode::Raw, &window()).await;
    assert_eq!(synced.read.samples.len(), 5);

    let result = synced.upload.unwrap().unwrap();
    assert_eq!(result, SyncResult { uploaded: 3, skipped: 2 });
    assert_eq!(service.pipeline().backend().calls(), 1);

    let sent = service.pipeline().backend().last.lock().unwrap().clone().unwrap();
    assert_eq!(sent.user_id, "u_123");
    assert_eq!(sent.samples.len(), 5);
    assert_eq!(sent.samples[0].sample_type, Category::BloodGlucose);
    assert_eq!(sent.samples[0].data["mg_dl"], 140.54);
}

#[tokio::test]
async fn test_missing_module_reads_nothing_and_never_uploads() {
    let connector = for_platform(PlatformKind::HealthKit, FixtureBridge::unavailable("no module"));
    let service = VitalsService::new(connector, CountingBackend::new(0));

    assert_eq!(
        service.connector_status().await,
        ConnectorStatus::Unavailable {
            reason: "no module".to_string()
        }
    );

    let synced = service.sync_window("u_123", StorageMode::Raw, &window()).await;
    assert!(synced.read.samples.is_empty());
    assert_eq!(synced.read.unavailable.as_deref(), Some("no module"));
    assert!(synced.upload.is_none());
    assert_eq!(service.pipeline().backend().calls(), 0);
}

#[tokio::test]
async fn test_noop_bridge_denies_permissions() {
    let service = VitalsService::new(
        for_platform(PlatformKind::HealthConnect, NoopBridge),
        CountingBackend::new(0),
    );

    let outcome = service.request_permissions().await;
    assert!(!outcome.granted);
    assert!(outcome.reason.is_some());
    assert!(outcome.granted_categories.is_empty());
}

#[tokio::test]
async fn test_local_only_upload_request() {
    let service = VitalsService::new(
        for_platform(PlatformKind::HealthKit, healthkit_fixture()),
        CountingBackend::new(10),
    );

    let read = service.read_last_24h(&window()).await;
    let request = UploadRequest {
        user_id: "u_123".to_string(),
        storage_mode: StorageMode::LocalOnly,
        samples: read.samples,
    };
    let result = service.upload_to_backend(&request).await.unwrap();

    assert_eq!(result, SyncResult { uploaded: 0, skipped: 5 });
    assert_eq!(service.pipeline().backend().calls(), 0);
}

fn demo_fixture(name: &str) -> FixtureBridge {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("demos")
        .join(name);
    FixtureBridge::from_path(&path).unwrap()
}

#[tokio::test]
async fn test_demo_fixtures_read_every_category() {
    let healthkit = for_platform(PlatformKind::HealthKit, demo_fixture("healthkit_fixture.json"));
    let outcome = healthkit.read_window(&window()).await;
    assert_eq!(outcome.samples.len(), 8);
    for category in Category::ALL {
        assert!(outcome.samples.iter().any(|s| s.category() == category));
    }

    let health_connect = for_platform(
        PlatformKind::HealthConnect,
        demo_fixture("health_connect_fixture.json"),
    );
    let permissions = health_connect.request_permissions().await;
    assert!(!permissions.granted);
    assert_eq!(
        permissions.granted_categories,
        vec![Category::BloodGlucose, Category::HeartRate, Category::Steps]
    );

    // The failing ECG query contributes nothing; the rest still arrive.
    let outcome = health_connect.read_window(&window()).await;
    assert!(outcome.is_available());
    assert_eq!(outcome.samples.len(), 3);
}
