// gait-service/src/server.rs
// ============================================================================
// Module: HTTP Transport
// Description: Axum routing for the decision service's three evaluate
// surfaces: plain JSON, SSE, and ndjson streaming.
// Purpose: Implement spec.md §4.12's `/v1/evaluate`, `/v1/evaluate/sse`, and
// `/v1/evaluate/stream` endpoints.
// Dependencies: axum, tokio, tokio-stream
// ============================================================================

//! ## Overview
//! Adapted from the teacher's `serve_http`/`serve_sse`/`ServerState`
//! pattern: one `Arc<ServiceState>` built once, a `Router` bound to it, and
//! one handler per transport reading the same request body. Unlike the
//! teacher, this service never binds TLS (no non-loopback deployment is in
//! scope per `spec.md` §4.12's hardening requirements) and carries no rate
//! limiter, since `spec.md` bounds only request size and non-loopback auth,
//! not request rate. The service's one contract, enforced at every route:
//! it returns a decision and never dispatches the underlying tool call.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::body::Bytes;
use axum::extract::ConnectInfo;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::http::StatusCode;
use axum::http::header::AUTHORIZATION;
use axum::response::IntoResponse;
use axum::response::Sse;
use axum::response::sse::Event;
use axum::routing::post;
use gait_core::Timestamp;
use thiserror::Error;
use tokio_stream::wrappers::ReceiverStream;

use crate::auth::AuthError;
use crate::auth::RequestContext;
use crate::auth::authorize;
use crate::evaluate::EvaluateRequest;
use crate::evaluate::evaluate_request;
use crate::evaluate::evaluate_request_with_stages;
use crate::evaluate::verdict_status;
use crate::state::ServiceState;

/// Runs `evaluate_request_with_stages`, returning the stage sequence crossed
/// alongside the final result, so callers can emit one event per stage
/// (`spec.md` §6's `decision_started`/`rule_matched`/`constraint_evaluated`/
/// `decision_completed`).
fn evaluate_collecting_stages(
    state: &ServiceState,
    request: &EvaluateRequest,
    trace_id: String,
) -> (Vec<gait_policy::DecisionStage>, Result<crate::evaluate::EvaluateResponse, crate::ServiceError>) {
    let mut stages = Vec::new();
    let result = evaluate_request_with_stages(state, request, trace_id, |stage| stages.push(stage));
    (stages, result)
}

/// Errors raised serving the HTTP transport.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The configured bind address failed to parse.
    #[error("invalid bind address: {0}")]
    InvalidBindAddr(String),
    /// Binding the TCP listener failed.
    #[error("failed to bind: {0}")]
    Bind(String),
    /// Serving accepted connections failed.
    #[error("server failed: {0}")]
    Serve(String),
}

/// Builds the evaluate router for `state`.
#[must_use]
pub fn router(state: Arc<ServiceState>) -> Router {
    Router::new()
        .route("/v1/evaluate", post(handle_evaluate))
        .route("/v1/evaluate/sse", post(handle_evaluate_sse))
        .route("/v1/evaluate/stream", post(handle_evaluate_stream))
        .with_state(state)
}

/// Binds `state.config.bind_addr` and serves the evaluate router until the
/// process is terminated.
///
/// # Errors
///
/// Returns [`ServerError::InvalidBindAddr`] if the configured bind address
/// does not parse, or [`ServerError::Bind`]/[`ServerError::Serve`] if the
/// listener cannot be established or fails while serving.
pub async fn serve(state: Arc<ServiceState>) -> Result<(), ServerError> {
    let addr: SocketAddr = state.config.bind_addr.parse().map_err(|_err| ServerError::InvalidBindAddr(state.config.bind_addr.clone()))?;
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await.map_err(|err| ServerError::Bind(err.to_string()))?;
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .await
        .map_err(|err| ServerError::Serve(err.to_string()))
}

fn request_context(peer: SocketAddr, headers: &HeaderMap) -> RequestContext {
    let auth_header = headers.get(AUTHORIZATION).and_then(|value| value.to_str().ok()).map(str::to_string);
    RequestContext::new(Some(peer.ip()), auth_header)
}

fn trace_id(peer: SocketAddr) -> String {
    format!("svc_{}_{}", peer.port(), Timestamp::now().as_unix_millis())
}

/// Authenticates, size-checks, and parses one raw request body into an
/// [`EvaluateRequest`], or the HTTP response to return instead.
fn admit(state: &ServiceState, ctx: &RequestContext, bytes: &Bytes) -> Result<EvaluateRequest, (StatusCode, String)> {
    authorize(ctx, state.config.auth_mode, &state.config.bearer_tokens).map_err(|err| match err {
        AuthError::NonLoopbackPeer | AuthError::InvalidToken => (StatusCode::UNAUTHORIZED, err.to_string()),
    })?;

    let limit = state.config.effective_max_request_bytes();
    let received = u64::try_from(bytes.len()).unwrap_or(u64::MAX);
    if received > limit {
        return Err((StatusCode::PAYLOAD_TOO_LARGE, format!("request exceeds {limit} bytes")));
    }

    serde_json::from_slice::<EvaluateRequest>(bytes).map_err(|err| (StatusCode::BAD_REQUEST, err.to_string()))
}

async fn handle_evaluate(
    State(state): State<Arc<ServiceState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    bytes: Bytes,
) -> impl IntoResponse {
    let ctx = request_context(peer, &headers);
    let request = match admit(&state, &ctx, &bytes) {
        Ok(request) => request,
        Err((status, message)) => return (status, axum::Json(serde_json::json!({"error": message}))).into_response(),
    };

    match evaluate_request(&state, &request, trace_id(peer)) {
        Ok(response) => {
            let status = StatusCode::from_u16(verdict_status(state.config.http_verdict_status, response.verdict)).unwrap_or(StatusCode::OK);
            (status, axum::Json(response)).into_response()
        }
        Err(err) => (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(serde_json::json!({"error": err.to_string()}))).into_response(),
    }
}

async fn handle_evaluate_sse(
    State(state): State<Arc<ServiceState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    bytes: Bytes,
) -> impl IntoResponse {
    let ctx = request_context(peer, &headers);
    let request = match admit(&state, &ctx, &bytes) {
        Ok(request) => request,
        Err((status, message)) => return (status, axum::Json(serde_json::json!({"error": message}))).into_response(),
    };

    let (stages, result) = evaluate_collecting_stages(&state, &request, trace_id(peer));
    let events = stage_events(&stages, &result);

    let (tx, rx) = tokio::sync::mpsc::channel::<Result<Event, std::convert::Infallible>>(events.len().max(1));
    for (name, payload) in events {
        let _ = tx.send(Ok(Event::default().event(name).data(payload))).await;
    }
    Sse::new(ReceiverStream::new(rx)).into_response()
}

/// Renders the collected stage sequence as `(event_name, json_payload)`
/// pairs: every non-terminal stage carries `{"stage": "<name>"}`, and the
/// final stage carries the full evaluation result (or error) alongside its
/// name, matching `spec.md` §6's "NDJSON emits the same as individual
/// lines" note for the SSE surface too.
fn stage_events(
    stages: &[gait_policy::DecisionStage],
    result: &Result<crate::evaluate::EvaluateResponse, crate::ServiceError>,
) -> Vec<(&'static str, String)> {
    let mut events = Vec::with_capacity(stages.len().max(1));
    let last_index = stages.len().saturating_sub(1);
    for (index, stage) in stages.iter().enumerate() {
        let name = stage.event_name();
        let payload = if index == last_index {
            match result {
                Ok(response) => serde_json::to_string(response).unwrap_or_else(|_| "{\"error\":\"encode_failed\"}".to_string()),
                Err(err) => serde_json::json!({"error": err.to_string()}).to_string(),
            }
        } else {
            serde_json::json!({"stage": name}).to_string()
        };
        events.push((name, payload));
    }
    if events.is_empty() {
        let payload = match result {
            Ok(response) => serde_json::to_string(response).unwrap_or_else(|_| "{\"error\":\"encode_failed\"}".to_string()),
            Err(err) => serde_json::json!({"error": err.to_string()}).to_string(),
        };
        events.push((gait_policy::DecisionStage::Completed.event_name(), payload));
    }
    events
}

async fn handle_evaluate_stream(
    State(state): State<Arc<ServiceState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    bytes: Bytes,
) -> impl IntoResponse {
    let ctx = request_context(peer, &headers);
    let request = match admit(&state, &ctx, &bytes) {
        Ok(request) => request,
        Err((status, message)) => return (status, axum::Json(serde_json::json!({"error": message}))).into_response(),
    };

    let (stages, result) = evaluate_collecting_stages(&state, &request, trace_id(peer));
    let mut body = String::new();
    for (name, payload) in stage_events(&stages, &result) {
        body.push_str(&serde_json::json!({"event": name, "data": serde_json::from_str::<serde_json::Value>(&payload).unwrap_or(serde_json::Value::Null)}).to_string());
        body.push('\n');
    }
    ([(axum::http::header::CONTENT_TYPE, "application/x-ndjson")], body).into_response()
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use gait_schema::config::ServiceConfig;
    use gait_schema::policy::Policy;
    use serde_json::json;

    use super::evaluate_collecting_stages;
    use super::router;
    use super::stage_events;
    use crate::evaluate::EvaluateRequest;
    use crate::state::ServiceState;

    #[test]
    fn router_builds_without_panicking() {
        let state = ServiceState::new(
            ServiceConfig::default(),
            Policy::parse_yaml(b"default_verdict: allow\nrules: []\n").expect("parse"),
            None,
            PathBuf::from("/tmp/gait-service-router-test"),
        );
        let _app = router(state.shared());
    }

    #[test]
    fn staged_evaluation_yields_one_event_per_decision_stage_ending_in_decision_completed() {
        let state = ServiceState::new(
            ServiceConfig::default(),
            Policy::parse_yaml(b"default_verdict: allow\nrules: []\n").expect("parse"),
            None,
            PathBuf::from("/tmp/gait-service-stage-events-test"),
        );
        let request = EvaluateRequest {
            intent: gait_schema::IntentRequest {
                tool_name: "tool.read".to_string(),
                args: json!({}),
                targets: vec![],
                arg_provenance: vec![],
                context: json!({}),
                delegation: None,
                skill_provenance: None,
            },
            tokens: Default::default(),
        };
        let (stages, result) = evaluate_collecting_stages(&state, &request, "trace-stage-events".to_string());
        assert!(result.is_ok());
        let events = stage_events(&stages, &result);
        assert_eq!(events.first().map(|(name, _)| *name), Some(gait_policy::DecisionStage::Started.event_name()));
        assert_eq!(events.last().map(|(name, _)| *name), Some(gait_policy::DecisionStage::Completed.event_name()));
        let (_, final_payload) = events.last().expect("at least one event");
        assert!(final_payload.contains("\"verdict\""));
    }
}
