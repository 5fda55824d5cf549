//! REST API server for the advisory chat engine
//!
//! Exposes session creation, chat turns, and the widget callbacks
//! (allocation save, plan choice) over HTTP. One request per session at a
//! time: the store's claim/release cycle rejects a second request while a
//! model call is in flight.

use axum::extract::Path;
use axum::{extract::State, http::StatusCode, routing::get, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::catalog::Bucket;
use crate::error::AdvisorError;
use crate::models::{Session, SessionSettings};
use crate::orchestrator::{Orchestrator, SessionEvent, StepOutcome};
use crate::state::SessionStore;
use crate::transcript::ChatMessage;

/// =============================
/// Request Models
/// =============================

#[derive(Debug, Deserialize)]
pub struct SettingsRequest {
    #[serde(flatten)]
    pub settings: SessionSettings,
    /// Client-supplied key; hashed to a stable id when not a UUID
    pub session_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MessageRequest {
    pub session_id: String,
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct AllocationRequest {
    pub session_id: String,
    /// Bucket label → amount, as the allocation widget returns it
    pub amounts: BTreeMap<String, u64>,
}

#[derive(Debug, Deserialize)]
pub struct PlanRequest {
    pub session_id: String,
    pub plan: String,
}

/// =============================
/// Response Wrapper
/// =============================

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse {
    pub success: bool,
    pub data: Option<serde_json::Value>,
    pub error: Option<String>,
    pub timestamp: String,
}

impl ApiResponse {
    pub fn success<T: Serialize>(data: T) -> Self {
        Self {
            success: true,
            data: serde_json::to_value(data).ok(),
            error: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize)]
struct StepResponse<'a> {
    session_id: uuid::Uuid,
    stage: crate::models::Stage,
    finalized: bool,
    messages: &'a [ChatMessage],
}

/// =============================
/// API State
/// =============================

#[derive(Clone)]
pub struct ApiState {
    pub orchestrator: Arc<Orchestrator>,
    pub store: Arc<dyn SessionStore>,
}

/// =============================
/// Helpers
/// =============================

fn stable_uuid_from_string(input: &str) -> uuid::Uuid {
    use sha2::{Digest, Sha256};

    let hash = Sha256::digest(input.as_bytes());
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&hash[..16]);

    // Set UUID version (4) and variant (RFC4122) bits.
    bytes[6] = (bytes[6] & 0x0f) | 0x40;
    bytes[8] = (bytes[8] & 0x3f) | 0x80;

    uuid::Uuid::from_bytes(bytes)
}

fn parse_or_stable_uuid(value: &str) -> uuid::Uuid {
    uuid::Uuid::parse_str(value).unwrap_or_else(|_| stable_uuid_from_string(value))
}

fn error_status(error: &AdvisorError) -> StatusCode {
    match error {
        AdvisorError::SessionNotFound(_) => StatusCode::NOT_FOUND,
        AdvisorError::SessionBusy => StatusCode::CONFLICT,
        AdvisorError::SessionFinalized | AdvisorError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn step_payload(outcome: &StepOutcome) -> ApiResponse {
    ApiResponse::success(StepResponse {
        session_id: outcome.session.session_id,
        stage: outcome.session.stage,
        finalized: outcome.session.is_finalized,
        messages: &outcome.replies,
    })
}

/// Claim the session, run one orchestration step, release, respond
async fn run_step(
    state: &ApiState,
    session_id: &str,
    event: SessionEvent,
) -> (StatusCode, Json<ApiResponse>) {
    let session_id = parse_or_stable_uuid(session_id);

    let session = match state.store.claim(session_id).await {
        Ok(session) => session,
        Err(e) => return (error_status(&e), Json(ApiResponse::error(e.to_string()))),
    };

    if session.is_finalized {
        // Put it back untouched; finalized sessions accept no input
        let _ = state.store.release(session).await;
        let e = AdvisorError::SessionFinalized;
        return (error_status(&e), Json(ApiResponse::error(e.to_string())));
    }

    let outcome = state.orchestrator.handle_event(session, event).await;
    let payload = step_payload(&outcome);

    if let Err(e) = state.store.release(outcome.session).await {
        return (error_status(&e), Json(ApiResponse::error(e.to_string())));
    }

    (StatusCode::OK, Json(payload))
}

/// =============================
/// Handlers
/// =============================

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// Create (or reset) a session from submitted settings
async fn create_session(
    State(state): State<ApiState>,
    Json(req): Json<SettingsRequest>,
) -> (StatusCode, Json<ApiResponse>) {
    let session_id = match req.session_id.as_deref() {
        Some(value) if !value.trim().is_empty() => parse_or_stable_uuid(value),
        _ => uuid::Uuid::new_v4(),
    };

    info!(
        session_id = %session_id,
        vertical = %req.settings.vertical,
        persona = %req.settings.persona,
        "Settings submitted"
    );

    let outcome = state.orchestrator.start_session(session_id, req.settings);
    let payload = step_payload(&outcome);

    if let Err(e) = state.store.put(outcome.session).await {
        return (error_status(&e), Json(ApiResponse::error(e.to_string())));
    }

    (StatusCode::OK, Json(payload))
}

async fn post_message(
    State(state): State<ApiState>,
    Json(req): Json<MessageRequest>,
) -> (StatusCode, Json<ApiResponse>) {
    if req.text.trim().is_empty() {
        let e = AdvisorError::InvalidInput("empty message".into());
        return (error_status(&e), Json(ApiResponse::error(e.to_string())));
    }

    run_step(
        &state,
        &req.session_id,
        SessionEvent::UserMessage { text: req.text },
    )
    .await
}

async fn post_allocation(
    State(state): State<ApiState>,
    Json(req): Json<AllocationRequest>,
) -> (StatusCode, Json<ApiResponse>) {
    // Unknown labels are a widget-contract violation and block the save;
    // missing buckets are reported conversationally by the validator
    let mut amounts: BTreeMap<Bucket, u64> = BTreeMap::new();
    for (label, amount) in &req.amounts {
        let Some(bucket) = Bucket::from_label(label) else {
            let e = AdvisorError::InvalidInput(format!("unknown bucket: {}", label));
            return (error_status(&e), Json(ApiResponse::error(e.to_string())));
        };
        amounts.insert(bucket, *amount);
    }

    run_step(
        &state,
        &req.session_id,
        SessionEvent::AllocationSubmitted { amounts },
    )
    .await
}

async fn post_plan(
    State(state): State<ApiState>,
    Json(req): Json<PlanRequest>,
) -> (StatusCode, Json<ApiResponse>) {
    run_step(
        &state,
        &req.session_id,
        SessionEvent::PlanSelected { plan: req.plan },
    )
    .await
}

/// Full session snapshot, including the transcript and the pre-seed for
/// the final allocation form
async fn get_session(
    State(state): State<ApiState>,
    Path(session_id): Path<String>,
) -> (StatusCode, Json<ApiResponse>) {
    let session_id = parse_or_stable_uuid(&session_id);

    match state.store.get(session_id).await {
        Ok(Some(session)) => {
            let snapshot = session_snapshot(&session);
            (StatusCode::OK, Json(ApiResponse::success(snapshot)))
        }
        Ok(None) => {
            let e = AdvisorError::SessionNotFound(session_id);
            (error_status(&e), Json(ApiResponse::error(e.to_string())))
        }
        Err(e) => (error_status(&e), Json(ApiResponse::error(e.to_string()))),
    }
}

fn session_snapshot(session: &Session) -> serde_json::Value {
    serde_json::json!({
        "session_id": session.session_id,
        "vertical": session.vertical,
        "persona": session.persona,
        "stage": session.stage,
        "finalized": session.is_finalized,
        "risk_score": session.risk_score,
        "tier": session.tier,
        "allocation": session.allocation,
        "recommended_delta": session.recommended_delta,
        "final_preseed": session.seeded_final_allocation(),
        "chosen_plan": session.chosen_plan,
        "messages": session.log.iter().collect::<Vec<_>>(),
    })
}

/// =============================
/// Router
/// =============================

pub fn create_router(orchestrator: Arc<Orchestrator>, store: Arc<dyn SessionStore>) -> Router {
    let state = ApiState {
        orchestrator,
        store,
    };

    Router::new()
        .route("/health", get(health))
        .route("/api/session", post(create_session))
        .route("/api/session/message", post(post_message))
        .route("/api/session/allocation", post(post_allocation))
        .route("/api/session/plan", post(post_plan))
        .route("/api/session/:session_id", get(get_session))
        .with_state(state)
        .layer(CorsLayer::permissive())
}

/// =============================
/// Server Startup
/// =============================

pub async fn start_server(
    orchestrator: Arc<Orchestrator>,
    store: Arc<dyn SessionStore>,
    port: u16,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let router = create_router(orchestrator, store);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    info!("API Server listening on http://0.0.0.0:{}", port);
    info!("Local: http://127.0.0.1:{}", port);

    axum::serve(listener, router).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stable_uuid_is_deterministic() {
        let a = stable_uuid_from_string("browser-tab-1");
        let b = stable_uuid_from_string("browser-tab-1");
        let c = stable_uuid_from_string("browser-tab-2");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_parse_or_stable_uuid_accepts_real_uuids() {
        let id = uuid::Uuid::new_v4();
        assert_eq!(parse_or_stable_uuid(&id.to_string()), id);
    }

    #[test]
    fn test_settings_request_shape() {
        let req: SettingsRequest = serde_json::from_str(
            r#"{"vertical": "investment", "persona": "introverted", "session_id": "tab-9"}"#,
        )
        .unwrap();
        assert_eq!(
            req.settings.vertical,
            crate::models::Vertical::Investment
        );
        assert_eq!(req.session_id.as_deref(), Some("tab-9"));
    }

    #[test]
    fn test_allocation_request_shape() {
        let req: AllocationRequest = serde_json::from_str(
            r#"{"session_id": "s", "amounts": {"RR1": 700000, "RR2": 300000}}"#,
        )
        .unwrap();
        assert_eq!(req.amounts["RR1"], 700_000);
    }
}
