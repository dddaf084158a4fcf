use axum::http::StatusCode;

use crate::db;
use crate::models::{
    ErrorResponse, InteractionRecord, LogInteractionRequest, LogInteractionResponse,
    RestartClickResponse, RestartSessionRequest, RestartSessionResponse,
};
use crate::state::AppState;

const SESSION_ID_LEN: usize = 32;

pub struct ServiceError {
    pub status: StatusCode,
    pub body: ErrorResponse,
}

impl ServiceError {
    pub fn new(status: StatusCode, error: &'static str) -> Self {
        Self {
            status,
            body: ErrorResponse { error },
        }
    }

    pub fn bad_request(error: &'static str) -> Self {
        Self::new(StatusCode::BAD_REQUEST, error)
    }

    pub fn database(error: &'static str) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, error)
    }
}

pub async fn log_interaction(
    state: &AppState,
    payload: LogInteractionRequest,
) -> Result<LogInteractionResponse, ServiceError> {
    let interaction = payload
        .validate()
        .map_err(|_| ServiceError::bad_request("Missing required fields"))?;

    if let Err(err) = db::insert_interaction(state.storage.as_ref(), &interaction).await {
        tracing::error!(
            error = %err,
            kiosk_id = interaction.kiosk_id.as_str(),
            screen = interaction.screen.as_str(),
            "insert interaction failed"
        );
        return Err(ServiceError::database("Database error"));
    }

    tracing::debug!(
        kiosk_id = interaction.kiosk_id.as_str(),
        screen = interaction.screen.as_str(),
        action = interaction.action.as_str(),
        "interaction logged"
    );
    Ok(LogInteractionResponse {
        message: "Interaction logged",
    })
}

pub async fn recent_interactions(state: &AppState) -> Result<Vec<InteractionRecord>, ServiceError> {
    db::fetch_recent_interactions(state.storage.as_ref())
        .await
        .map_err(|err| {
            tracing::error!(error = %err, "fetch recent interactions failed");
            ServiceError::database("Failed to fetch logs")
        })
}

pub async fn readiness(state: &AppState) -> Result<(), ServiceError> {
    state.storage.ping().await.map_err(|err| {
        tracing::warn!(error = %err, "readiness check failed");
        ServiceError::new(StatusCode::SERVICE_UNAVAILABLE, "Database unavailable")
    })
}

pub async fn restart_session(
    state: &AppState,
    payload: RestartSessionRequest,
) -> Result<RestartSessionResponse, ServiceError> {
    let session_id = payload
        .session_id
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ServiceError::bad_request("session_id required"))?;

    let restart_clicks = db::restart_session(state.storage.as_ref(), &session_id)
        .await
        .map_err(|err| {
            tracing::error!(error = %err, session_id = session_id.as_str(), "restart session failed");
            ServiceError::database("Database error")
        })?
        .ok_or_else(|| ServiceError::new(StatusCode::NOT_FOUND, "session_id not found"))?;

    tracing::info!(session_id = session_id.as_str(), restart_clicks, "session restarted");
    Ok(RestartSessionResponse {
        ok: true,
        session_id,
        restart_clicks,
    })
}

pub async fn restart_click(
    state: &AppState,
    payload: RestartSessionRequest,
) -> Result<RestartClickResponse, ServiceError> {
    let session_id = payload
        .session_id
        .as_deref()
        .and_then(normalize_session_id)
        .ok_or_else(|| ServiceError::bad_request("session_id required"))?;

    let restart_clicks = db::restart_session_normalized(state.storage.as_ref(), &session_id)
        .await
        .map_err(|err| {
            tracing::error!(error = %err, session_id = session_id.as_str(), "restart click failed");
            ServiceError::database("Database error")
        })?
        .ok_or_else(|| ServiceError::new(StatusCode::NOT_FOUND, "session not found"))?;

    tracing::info!(session_id = session_id.as_str(), restart_clicks, "restart click recorded");
    Ok(RestartClickResponse {
        ok: true,
        restart_clicks,
    })
}

/// Canonical session id: 32 hex digits, upper-case, no dashes.
pub fn normalize_session_id(raw: &str) -> Option<String> {
    let normalized: String = raw
        .trim()
        .chars()
        .filter(|c| *c != '-')
        .map(|c| c.to_ascii_uppercase())
        .collect();
    let valid = normalized.len() == SESSION_ID_LEN && normalized.chars().all(|c| c.is_ascii_hexdigit());
    valid.then_some(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::testing::{FailingStorage, MemoryStorage};

    #[test]
    fn normalizes_uuid_forms() {
        let expected = Some("3F2504E04F8941D39A0C0305E82C3301".to_string());
        assert_eq!(
            normalize_session_id("3f2504e0-4f89-41d3-9a0c-0305e82c3301"),
            expected
        );
        assert_eq!(normalize_session_id(" 3F2504E04F8941D39A0C0305E82C3301 "), expected);
    }

    #[test]
    fn rejects_malformed_session_ids() {
        assert_eq!(normalize_session_id(""), None);
        assert_eq!(normalize_session_id("----"), None);
        assert_eq!(normalize_session_id("not-a-session"), None);
        assert_eq!(normalize_session_id("ZZ2504E04F8941D39A0C0305E82C3301"), None);
    }

    #[tokio::test]
    async fn storage_failure_on_ingest_maps_to_server_error() {
        let state = AppState::new(Arc::new(FailingStorage));
        let payload = LogInteractionRequest {
            screen: Some("home".to_string()),
            action: Some("tap".to_string()),
            timestamp: Some(crate::models::ClientTimestamp::Text("t".to_string())),
            kiosk_id: Some("k1".to_string()),
        };
        let err = log_interaction(&state, payload).await.err().expect("error");
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.body.error, "Database error");
    }

    #[tokio::test]
    async fn missing_fields_skip_storage() {
        let storage = Arc::new(MemoryStorage::default());
        let state = AppState::new(storage.clone());
        let err = log_interaction(&state, LogInteractionRequest::default())
            .await
            .err()
            .expect("error");
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(storage.calls(), 0);
    }
}
