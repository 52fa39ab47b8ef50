//! Axum REST handlers for the recovery run and read endpoints.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use chrono::Utc;
use serde_json::json;
use tracing::{error, warn};
use uuid::Uuid;

use nurture_core::types::{Enrollment, Sequence};
use nurture_engine::{ExitEvaluator, TriggerEvaluator};
use nurture_milestones::{MessageLibrary, MilestoneTrigger, RenderedBundle};
use nurture_store::{ActivityStore, EnrollmentStore, SequenceCatalog};

use crate::auth;
use crate::models::{ErrorResponse, MilestoneQuery, RecoveryRunResponse, SequenceStats};

/// Shared application state for REST handlers.
#[derive(Clone)]
pub struct AppState {
    pub activity: Arc<ActivityStore>,
    pub catalog: Arc<SequenceCatalog>,
    pub enrollments: Arc<EnrollmentStore>,
    pub trigger: Arc<TriggerEvaluator>,
    pub exit: Arc<ExitEvaluator>,
    pub milestones: Arc<MessageLibrary>,
    pub cron_secret: Option<String>,
    pub node_id: String,
    pub start_time: Instant,
}

// ─── Cron ──────────────────────────────────────────────────────────────────

/// GET|POST /api/v1/cron/recovery — scheduler entry point.
///
/// Runs the trigger evaluator, then the exit evaluator. Authorization is a
/// pre-shared bearer secret; an unset secret means the endpoint is open.
pub async fn run_recovery(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<RecoveryRunResponse>, (StatusCode, Json<ErrorResponse>)> {
    if !auth::authorize(&headers, state.cron_secret.as_deref()) {
        warn!("unauthorized recovery run attempt");
        metrics::counter!("api.unauthorized").increment(1);
        return Err((
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse {
                error: "unauthorized".to_string(),
                message: "Authorization header with Bearer token required".to_string(),
            }),
        ));
    }

    // Batch runs may take minutes on a large learner base; keep them off the
    // async worker threads.
    let trigger = state.trigger.clone();
    let exit = state.exit.clone();
    let run = tokio::task::spawn_blocking(move || {
        let trigger_report = trigger.run();
        let exit_report = exit.run();
        (trigger_report, exit_report)
    })
    .await;

    match run {
        Ok((trigger_report, exit_report)) => {
            let errors = trigger_report.errors + exit_report.errors;
            metrics::counter!("recovery.runs").increment(1);
            Ok(Json(RecoveryRunResponse {
                success: true,
                timestamp: Utc::now(),
                conditions: trigger_report.conditions,
                exited: exit_report.exited,
                errors,
            }))
        }
        Err(e) => {
            error!(error = %e, "recovery run failed");
            metrics::counter!("api.errors").increment(1);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "internal_error".to_string(),
                    message: "Recovery run failed".to_string(),
                }),
            ))
        }
    }
}

// ─── Milestones ────────────────────────────────────────────────────────────

/// GET /api/v1/milestones/:trigger — rendered bundle lookup.
///
/// Absence of a bundle is the common case and maps to 404; the caller
/// treats the milestone as a no-op.
pub async fn get_milestone(
    State(state): State<AppState>,
    Path(trigger): Path<String>,
    Query(query): Query<MilestoneQuery>,
) -> Result<Json<RenderedBundle>, StatusCode> {
    let trigger: MilestoneTrigger = trigger.parse().map_err(|_| StatusCode::NOT_FOUND)?;
    let bundle = state
        .milestones
        .get(trigger, query.lesson)
        .ok_or(StatusCode::NOT_FOUND)?;

    metrics::counter!("milestones.served", "trigger" => trigger.as_str()).increment(1);
    Ok(Json(bundle.render(query.first_name.as_deref())))
}

// ─── Sequences & enrollments ───────────────────────────────────────────────

pub async fn list_sequences(State(state): State<AppState>) -> Json<Vec<Sequence>> {
    Json(state.catalog.list())
}

pub async fn get_sequence(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<Sequence>, StatusCode> {
    state
        .catalog
        .get_by_slug(&slug)
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

pub async fn sequence_stats(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<SequenceStats>, StatusCode> {
    let sequence = state
        .catalog
        .get_by_slug(&slug)
        .ok_or(StatusCode::NOT_FOUND)?;
    let active = state.enrollments.active_for_sequence(&sequence.id).len() as u64;
    Ok(Json(SequenceStats {
        slug: sequence.slug,
        total_enrolled: sequence.total_enrolled,
        total_exited: sequence.total_exited,
        active_enrollments: active,
    }))
}

pub async fn learner_enrollments(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Enrollment>>, StatusCode> {
    if state.activity.get_learner(&id).is_none() {
        return Err(StatusCode::NOT_FOUND);
    }
    Ok(Json(state.enrollments.for_user(&id)))
}

// ─── Operational endpoints ─────────────────────────────────────────────────

pub async fn health_check(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "node_id": state.node_id,
        "uptime_secs": state.start_time.elapsed().as_secs(),
        "sequences": state.catalog.list().len(),
        "enrollments": state.enrollments.count(),
    }))
}

pub async fn readiness() -> StatusCode {
    StatusCode::OK
}

pub async fn liveness() -> StatusCode {
    StatusCode::OK
}
