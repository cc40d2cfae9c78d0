//! Health check endpoints for orchestrators.
//!
//! - `/health/live` - Liveness check (restart if fails)
//! - `/health/ready` - Readiness check (remove from LB if fails)
//! - `/health` - Same as `/health/ready`

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::AppState;

/// Health status response.
#[derive(Debug, Serialize)]
pub struct HealthStatus {
    /// Overall status: "healthy" or "unhealthy"
    pub status: &'static str,
    /// Server version
    pub version: &'static str,
    /// Host protocol version spoken on `/ws`
    pub protocol_version: u32,
    /// Open editor sessions
    pub sessions: usize,
    /// Individual component checks
    pub checks: HealthChecks,
}

/// Individual health checks.
#[derive(Debug, Serialize)]
pub struct HealthChecks {
    /// Session configuration is usable
    pub config: bool,
    /// WebSocket handler ready
    pub websocket: bool,
}

/// Liveness check - is the server running?
#[tracing::instrument(name = "liveness_check")]
pub async fn liveness() -> StatusCode {
    StatusCode::OK
}

/// Readiness check - can the server open editor sessions?
#[tracing::instrument(name = "readiness_check", skip(state))]
pub async fn readiness(State(state): State<AppState>) -> (StatusCode, Json<HealthStatus>) {
    let config = &state.config;
    let config_ok = config.min_zoom > 0.0
        && config.min_zoom <= config.max_zoom
        && config.pending_command_capacity > 0;
    let ws_ok = true;
    let all_ok = config_ok && ws_ok;

    let status = HealthStatus {
        status: if all_ok { "healthy" } else { "unhealthy" },
        version: env!("CARGO_PKG_VERSION"),
        protocol_version: editor_core::PROTOCOL_VERSION,
        sessions: state.active_sessions(),
        checks: HealthChecks {
            config: config_ok,
            websocket: ws_ok,
        },
    };

    let code = if all_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (code, Json(status))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build_router;
    use axum::body::Body;
    use axum::http::Request;
    use editor_core::EditorConfig;
    use std::time::Duration;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_liveness_ok() {
        let response = build_router(AppState::default())
            .oneshot(
                Request::get("/health/live")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_readiness_reports_bad_config() {
        let state = AppState::new(
            EditorConfig {
                min_zoom: 3.0,
                max_zoom: 2.0,
                ..EditorConfig::default()
            },
            Duration::from_millis(20),
        );
        let (code, Json(status)) = readiness(State(state)).await;
        assert_eq!(code, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(status.status, "unhealthy");
        assert!(!status.checks.config);
    }

    #[tokio::test]
    async fn test_readiness_healthy() {
        let (code, Json(status)) = readiness(State(AppState::default())).await;
        assert_eq!(code, StatusCode::OK);
        assert_eq!(status.protocol_version, 1);
        assert_eq!(status.sessions, 0);

        let json = serde_json::to_string(&status).expect("should serialize");
        assert!(json.contains("healthy"));
        assert!(json.contains("websocket"));
    }
}
