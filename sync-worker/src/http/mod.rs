//! HTTP endpoints for the sync worker.
//!
//! Provides health checks and metrics.

pub mod health;
mod metrics;

use crate::service::SyncService;
use axum::{routing::get, Extension, Router};
use std::sync::Arc;

pub use health::HealthStatus;

/// Build the HTTP router with all endpoints.
pub fn build_router(service: Arc<SyncService>) -> Router {
    let metrics_enabled = service.config().http.metrics_enabled;

    let mut router = Router::new().route("/health", get(health::health_handler));
    if metrics_enabled {
        router = router.route("/metrics", get(metrics::metrics_handler));
    }
    router.layer(Extension(service))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::engine::{EngineSettings, SyncEngine};
    use crate::storage::SqliteStorage;
    use crate::walker::tests::FakeSource;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use chrono::Utc;
    use sync_core::Partition;
    use tower::util::ServiceExt;

    async fn test_service(config: Config) -> Arc<SyncService> {
        let storage = Arc::new(SqliteStorage::in_memory().await.unwrap());
        let engine = SyncEngine::new(
            Arc::new(FakeSource::with_pages(&[&["a", "b", "c"]])),
            storage.clone(),
            EngineSettings::new(Partition::new("2024").unwrap()),
        );
        Arc::new(SyncService::new(config, storage, engine))
    }

    async fn body_string(response: axum::response::Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn health_endpoint_returns_ok() {
        let service = test_service(Config::default()).await;
        let app = build_router(service);

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_string(response).await;
        assert!(body.contains("\"status\":\"ok\""));
        assert!(body.contains("\"partition\":\"2024\""));
        assert!(body.contains("\"last_run\":null"));
    }

    #[tokio::test]
    async fn health_reports_last_run() {
        let service = test_service(Config::default()).await;
        service.run_scheduled(Utc::now()).await.unwrap();
        let app = build_router(service);

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        let body = body_string(response).await;
        assert!(body.contains("\"status\":\"completed\""));
        assert!(body.contains("\"inserted\":3"));
    }

    #[tokio::test]
    async fn metrics_endpoint_reports_counters() {
        let service = test_service(Config::default()).await;
        service.run_scheduled(Utc::now()).await.unwrap();
        let app = build_router(service);

        let response = app
            .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_string(response).await;
        assert!(body.contains("ticketsync_runs_total 1"));
        assert!(body.contains("ticketsync_tickets_inserted_total 3"));
        assert!(body.contains("ticketsync_tickets_stored 3"));
    }

    #[tokio::test]
    async fn metrics_endpoint_can_be_disabled() {
        let mut config = Config::default();
        config.http.metrics_enabled = false;
        let app = build_router(test_service(config).await);

        let response = app
            .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
