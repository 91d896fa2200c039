// HTTP request handlers
use crate::application::display::ZoneView;
use crate::domain::zone::Zone;
use crate::presentation::app_state::AppState;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Serialize)]
pub struct ZoneResponse {
    pub zone: Zone,
    #[serde(flatten)]
    pub view: ZoneView,
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

/// List all configured zones
pub async fn list_zones(State(state): State<Arc<AppState>>) -> Json<Vec<Zone>> {
    Json(state.zones.clone())
}

/// Current chart series and watermark text for one zone
pub async fn zone_view(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Response {
    let Some(zone) = state.zone(&id) else {
        return (StatusCode::NOT_FOUND, "unknown zone").into_response();
    };

    match state.display.view(&id) {
        Some(view) => Json(ZoneResponse {
            zone: zone.clone(),
            view,
        })
        .into_response(),
        None => (StatusCode::SERVICE_UNAVAILABLE, "no data yet").into_response(),
    }
}
