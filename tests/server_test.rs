//! Integration tests for the HTTP backend client against the dev ingest server

#[cfg(feature = "server")]
mod server_tests {
    use chrono::{Duration, Utc};
    use std::net::SocketAddr;
    use std::sync::Arc;
    use vital_sync::backend::{BackendConfig, HttpBackend};
    use vital_sync::sample::CanonicalSample;
    use vital_sync::server::{run, SampleStore, ServerConfig};
    use vital_sync::sync::{StorageMode, SyncError, SyncPipeline, SyncResult};

    async fn start() -> (SocketAddr, tokio::sync::oneshot::Sender<()>, Arc<SampleStore>) {
        let store = Arc::new(SampleStore::new());
        let (addr, shutdown_tx) = run(ServerConfig::new(0), store.clone())
            .await
            .expect("Failed to start server");

        // Give server time to start
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        (addr, shutdown_tx, store)
    }

    fn backend_for(addr: SocketAddr) -> HttpBackend {
        HttpBackend::new(BackendConfig::new(format!("http://{addr}/api"))).unwrap()
    }

    fn heart_rates(n: usize, offset: Duration) -> Vec<CanonicalSample> {
        let base = Utc::now() - Duration::hours(2) + offset;
        (0..n)
            .map(|i| CanonicalSample::HeartRate {
                timestamp: base + Duration::minutes(i as i64),
                bpm: 70.0,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let (addr, shutdown_tx, _) = start().await;

        let client = reqwest::Client::new();
        let response = client
            .get(format!("http://{}/health", addr))
            .send()
            .await
            .expect("Failed to send request");

        assert!(response.status().is_success());

        let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
        assert_eq!(body["status"], "ok");
        assert!(body["version"].is_string());

        assert!(backend_for(addr).test_connection().await.unwrap());

        let _ = shutdown_tx.send(());
    }

    #[tokio::test]
    async fn test_upload_stores_samples() {
        let (addr, shutdown_tx, store) = start().await;
        let pipeline = SyncPipeline::new(backend_for(addr));

        let result = pipeline
            .upload("u_server", StorageMode::Raw, &heart_rates(4, Duration::zero()))
            .await
            .unwrap();

        assert_eq!(result, SyncResult { uploaded: 4, skipped: 0 });
        let stored = store.for_user("u_server").await;
        assert_eq!(stored.len(), 4);
        assert_eq!(stored[0].storage_mode, StorageMode::Raw);

        let _ = shutdown_tx.send(());
    }

    #[tokio::test]
    async fn test_local_only_reaches_nothing() {
        let (addr, shutdown_tx, store) = start().await;
        let pipeline = SyncPipeline::new(backend_for(addr));

        let result = pipeline
            .upload("u_local", StorageMode::LocalOnly, &heart_rates(3, Duration::zero()))
            .await
            .unwrap();

        assert_eq!(result, SyncResult { uploaded: 0, skipped: 3 });
        assert!(store.is_empty().await);

        let _ = shutdown_tx.send(());
    }

    #[tokio::test]
    async fn test_future_timestamp_rejected() {
        let (addr, shutdown_tx, store) = start().await;
        let pipeline = SyncPipeline::new(backend_for(addr));

        let err = pipeline
            .upload("u_future", StorageMode::Raw, &heart_rates(1, Duration::hours(3)))
            .await
            .unwrap_err();

        match err {
            SyncError::Server { status, message } => {
                assert_eq!(status, 400);
                assert!(message.contains("FUTURE_TIMESTAMP"));
            }
            other => panic!("expected server error, got {other:?}"),
        }
        assert!(store.is_empty().await);

        let _ = shutdown_tx.send(());
    }

    #[tokio::test]
    async fn test_connection_refused_is_network_error() {
        let (addr, shutdown_tx, _) = start().await;
        let _ = shutdown_tx.send(());
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;

        let pipeline = SyncPipeline::new(backend_for(addr));
        let err = pipeline
            .upload("u_down", StorageMode::Raw, &heart_rates(1, Duration::zero()))
            .await
            .unwrap_err();

        assert!(matches!(err, SyncError::Network(_)));
    }
}
