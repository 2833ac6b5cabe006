use crate::{AppState, error::AppError};
use axum::{
    Json,
    extract::{Query, State},
    http::Uri,
};
use core_types::{Action, Signal};
use engine::EngineStatus;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Rows returned when no `limit` is given.
pub const DEFAULT_LIMIT: usize = 25;
/// Upper bound on a single history page.
pub const MAX_LIMIT: usize = 500;
/// Rows shown by `/api/signals/last`.
pub const LAST_SIGNALS: usize = 10;

#[derive(Debug, Deserialize)]
pub struct SignalQuery {
    pub limit: Option<usize>,
}

/// A signal as the dashboard shows it, with the stored local time string.
#[derive(Debug, Serialize)]
pub struct SignalView {
    pub time: String,
    pub action: Action,
    pub symbol: String,
    pub price: f64,
    pub message: String,
    pub timeframe: String,
}

impl From<Signal> for SignalView {
    fn from(signal: Signal) -> Self {
        Self {
            time: signal.local_time_string(),
            action: signal.action,
            symbol: signal.symbol,
            price: signal.price,
            message: signal.message,
            timeframe: signal.timeframe,
        }
    }
}

/// # GET /api/status
pub async fn get_status(State(state): State<Arc<AppState>>) -> Json<EngineStatus> {
    Json(state.engine.status().await)
}

/// # GET /api/signals?limit=N
pub async fn get_signals(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SignalQuery>,
) -> Result<Json<Vec<SignalView>>, AppError> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);
    recent(&state, limit).await
}

/// # GET /api/signals/last
pub async fn get_last_signals(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<SignalView>>, AppError> {
    recent(&state, LAST_SIGNALS).await
}

async fn recent(state: &AppState, limit: usize) -> Result<Json<Vec<SignalView>>, AppError> {
    let signals = state.engine.recent_signals(limit).await?;
    Ok(Json(signals.into_iter().map(SignalView::from).collect()))
}

pub async fn not_found(uri: Uri) -> AppError {
    AppError::NotFound(format!("No route for {}", uri.path()))
}
