use axum::{Json, extract::State};
use nexus_events::ConnectionState;
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    /// Broker connection state, omitted when no consumer runs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub broker: Option<ConnectionState>,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "UP".to_string(),
            broker: None,
        }
    }
}

/// Liveness only: the gateway stays UP while the broker reconnects.
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse::default())
}

pub async fn health_with_broker(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        broker: state.broker_state(),
        ..HealthResponse::default()
    })
}
