use axum::{body::Bytes, extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::de::DeserializeOwned;

use crate::models::{LogInteractionRequest, RestartSessionRequest};
use crate::service::{self, ServiceError};
use crate::state::AppState;

pub async fn root() -> &'static str {
    "Kiosk API is running"
}

pub async fn healthz() -> StatusCode {
    StatusCode::OK
}

pub async fn readyz(State(state): State<AppState>) -> impl IntoResponse {
    match service::readiness(&state).await {
        Ok(()) => StatusCode::OK.into_response(),
        Err(err) => (err.status, Json(err.body)).into_response(),
    }
}

pub async fn log_interaction(
    State(state): State<AppState>,
    body: Bytes,
) -> impl IntoResponse {
    let payload = match parse_body::<LogInteractionRequest>(&body) {
        Ok(payload) => payload,
        Err(err) => return err.into_response(),
    };
    match service::log_interaction(&state, payload).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(err) => (err.status, Json(err.body)).into_response(),
    }
}

pub async fn list_interactions(State(state): State<AppState>) -> impl IntoResponse {
    match service::recent_interactions(&state).await {
        Ok(records) => (StatusCode::OK, Json(records)).into_response(),
        Err(err) => (err.status, Json(err.body)).into_response(),
    }
}

pub async fn restart_session(
    State(state): State<AppState>,
    body: Bytes,
) -> impl IntoResponse {
    let payload = match parse_body::<RestartSessionRequest>(&body) {
        Ok(payload) => payload,
        Err(err) => return err.into_response(),
    };
    match service::restart_session(&state, payload).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(err) => (err.status, Json(err.body)).into_response(),
    }
}

pub async fn restart_click(
    State(state): State<AppState>,
    body: Bytes,
) -> impl IntoResponse {
    let payload = match parse_body::<RestartSessionRequest>(&body) {
        Ok(payload) => payload,
        Err(err) => return err.into_response(),
    };
    match service::restart_click(&state, payload).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(err) => (err.status, Json(err.body)).into_response(),
    }
}

/// Decodes a JSON request body. An empty body, or a literal `null`, means every field
/// is absent and is left to field validation; only undecodable JSON is rejected here.
fn parse_body<T: DeserializeOwned + Default>(body: &[u8]) -> Result<T, ErrorReply> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    match serde_json::from_slice::<Option<T>>(body) {
        Ok(payload) => Ok(payload.unwrap_or_default()),
        Err(err) => {
            tracing::debug!(error = %err, "request body rejected");
            Err(ErrorReply(ServiceError::bad_request("Invalid request body")))
        }
    }
}

struct ErrorReply(ServiceError);

impl IntoResponse for ErrorReply {
    fn into_response(self) -> axum::response::Response {
        (self.0.status, Json(self.0.body)).into_response()
    }
}
