use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::http::server::AppState;
use crate::normalizer::{NormalizerStats, PathShape};

#[derive(Debug, Serialize, Deserialize)]
pub struct SystemStatus {
    pub version: String,
    pub status: String,
    pub uptime_secs: u64,
    pub upstream: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ShapeQuery {
    pub path: String,
}

pub async fn get_status(State(state): State<AppState>) -> Json<SystemStatus> {
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION").to_string(),
        status: "operational".to_string(),
        uptime_secs: state.started_at.elapsed().as_secs(),
        upstream: state.config.load().upstream.address.clone(),
    })
}

pub async fn get_normalizer(State(state): State<AppState>) -> Json<NormalizerStats> {
    Json(state.normalizer.stats())
}

/// Classify a path against the learned routes without teaching it.
pub async fn get_shape(
    State(state): State<AppState>,
    Query(query): Query<ShapeQuery>,
) -> Json<PathShape> {
    Json(state.normalizer.inspect(&query.path))
}
