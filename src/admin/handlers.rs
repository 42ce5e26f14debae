use std::collections::BTreeMap;

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;

use crate::error::DispatchError;
use crate::http::response::OverallStatus;
use crate::http::server::AppState;
use crate::sync::IntegrationStatus;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: OverallStatus,
    pub all_connected: bool,
    pub monitoring: bool,
    pub integrations: BTreeMap<String, IntegrationStatus>,
}

pub async fn get_status(State(state): State<AppState>) -> Json<SystemStatus> {
    let integrations: BTreeMap<_, _> = state.manager.status_snapshot().into_iter().collect();
    let all_connected = integrations.values().all(|s| s.connected);

    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: OverallStatus::from_connected(all_connected),
        all_connected,
        monitoring: state.manager.is_monitoring(),
        integrations,
    })
}

pub async fn reset_integration(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<IntegrationStatus>, DispatchError> {
    state.manager.reset_circuit(&name).map(Json)
}
