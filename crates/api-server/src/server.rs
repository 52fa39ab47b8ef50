//! API server — mounts the REST routes and the metrics exporter.

use std::net::SocketAddr;

use axum::routing::get;
use axum::Router;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use nurture_core::config::AppConfig;

use crate::rest::{self, AppState};

pub struct ApiServer {
    config: AppConfig,
    state: AppState,
}

impl ApiServer {
    pub fn new(config: AppConfig, state: AppState) -> Self {
        Self { config, state }
    }

    /// Build the router. Split out so tests can drive it with tower.
    pub fn router(state: AppState) -> Router {
        Router::new()
            // Scheduler entry point
            .route(
                "/api/v1/cron/recovery",
                get(rest::run_recovery).post(rest::run_recovery),
            )
            // Milestones
            .route("/api/v1/milestones/:trigger", get(rest::get_milestone))
            // Catalog reads
            .route("/api/v1/sequences", get(rest::list_sequences))
            .route("/api/v1/sequences/:slug", get(rest::get_sequence))
            .route("/api/v1/sequences/:slug/stats", get(rest::sequence_stats))
            .route(
                "/api/v1/learners/:id/enrollments",
                get(rest::learner_enrollments),
            )
            // Operational endpoints
            .route("/health", get(rest::health_check))
            .route("/ready", get(rest::readiness))
            .route("/live", get(rest::liveness))
            // Middleware
            .layer(CompressionLayer::new())
            .layer(CorsLayer::permissive())
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }

    /// Start the HTTP server.
    pub async fn start_http(&self) -> anyhow::Result<()> {
        if self.state.cron_secret.is_none() {
            warn!("no cron secret configured, recovery endpoint runs unauthenticated");
        }

        let app = Self::router(self.state.clone());

        let addr = SocketAddr::new(self.config.api.host.parse()?, self.config.api.http_port);

        info!(addr = %addr, "Starting HTTP server");

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app).await?;

        Ok(())
    }

    /// Start the metrics exporter on a separate port.
    pub async fn start_metrics(&self) -> anyhow::Result<()> {
        let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
        builder
            .with_http_listener(SocketAddr::new(
                self.config.api.host.parse()?,
                self.config.metrics.port,
            ))
            .install()?;

        info!(port = self.config.metrics.port, "Metrics exporter started");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Instant;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use nurture_core::config::RecoveryConfig;
    use nurture_engine::{EnrollmentManager, ExitEvaluator, TriggerEvaluator};
    use nurture_milestones::MessageLibrary;
    use nurture_store::{ActivityStore, EnrollmentStore, SequenceCatalog};

    fn test_state(cron_secret: Option<&str>) -> AppState {
        let activity = Arc::new(ActivityStore::new());
        let catalog = Arc::new(SequenceCatalog::new());
        catalog.seed_recovery_sequences();
        let enrollments = Arc::new(EnrollmentStore::new());
        let manager = Arc::new(EnrollmentManager::new(
            catalog.clone(),
            enrollments.clone(),
            activity.clone(),
            &RecoveryConfig::default(),
        ));
        let trigger = Arc::new(TriggerEvaluator::new(
            activity.clone(),
            catalog.clone(),
            manager.clone(),
            RecoveryConfig::default(),
        ));
        let exit = Arc::new(ExitEvaluator::new(
            activity.clone(),
            catalog.clone(),
            enrollments.clone(),
            manager,
            RecoveryConfig::default(),
        ));
        AppState {
            activity,
            catalog,
            enrollments,
            trigger,
            exit,
            milestones: Arc::new(MessageLibrary::builtin()),
            cron_secret: cron_secret.map(str::to_string),
            node_id: "test".to_string(),
            start_time: Instant::now(),
        }
    }

    #[tokio::test]
    async fn test_cron_requires_matching_secret() {
        let app = ApiServer::router(test_state(Some("s3cret")));

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/api/v1/cron/recovery")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/api/v1/cron/recovery")
                    .header("authorization", "Bearer wrong")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/cron/recovery")
                    .header("authorization", "Bearer s3cret")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_cron_permissive_without_secret() {
        let app = ApiServer::router(test_state(None));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/cron/recovery")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        // Empty learner base: zero counts, zero errors.
        let bytes = axum::body::to_bytes(response.into_body(), 64 * 1024)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["success"], true);
        assert_eq!(body["errors"], 0);
        assert_eq!(body["conditions"]["never_logged_in"]["enrolled"], 0);
    }

    #[tokio::test]
    async fn test_milestone_lookup_and_miss() {
        let app = ApiServer::router(test_state(None));

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/api/v1/milestones/lesson_complete?lesson=5&first_name=Ana")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(response.into_body(), 64 * 1024)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert!(body["coach_text"].as_str().unwrap().contains("Ana"));

        // No bundle for lesson 4: expected miss.
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/milestones/lesson_complete?lesson=4")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_health_and_sequences() {
        let app = ApiServer::router(test_state(None));

        let response = app
            .clone()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/sequences/abandoned/stats")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
