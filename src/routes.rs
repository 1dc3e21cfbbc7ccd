use axum::{
    extract::{Query, State},
    response::Json,
    routing::get,
    Router,
};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

use crate::{
    config::Config,
    error::AppError,
    service::{parse_date, SunService},
    upstream::types::AggregatedResult,
};

const ALLOWED_PARAMS: [&str; 3] = ["city", "startDate", "endDate"];

// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub sun_service: Arc<SunService>,
}

/// A `/sun` request that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SunQuery {
    pub city: String,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub version: String,
    pub cached_entries: usize,
}

#[derive(Debug, Serialize)]
pub struct PingResponse {
    pub status: &'static str,
}

/// Rejects unknown parameters, a blank city, malformed dates, reversed
/// ranges and ranges longer than `max_range_days`.
pub fn validate_sun_query(
    params: &HashMap<String, String>,
    max_range_days: u32,
) -> Result<SunQuery, AppError> {
    let mut unexpected: Vec<&str> = params
        .keys()
        .map(String::as_str)
        .filter(|key| !ALLOWED_PARAMS.contains(key))
        .collect();
    if !unexpected.is_empty() {
        unexpected.sort_unstable();
        return Err(AppError::InvalidInput(format!(
            "Unexpected parameters: {}",
            unexpected.join(", ")
        )));
    }

    let city = params
        .get("city")
        .map(|c| c.trim())
        .filter(|c| !c.is_empty())
        .ok_or_else(|| AppError::InvalidInput("The `city` parameter is required.".to_string()))?;

    let start = match params.get("startDate") {
        Some(raw) => Some(parse_date(raw).map_err(|_| {
            AppError::InvalidInput("`startDate` must be in YYYY-MM-DD format.".to_string())
        })?),
        None => None,
    };
    let end = match params.get("endDate") {
        Some(raw) => Some(parse_date(raw).map_err(|_| {
            AppError::InvalidInput("`endDate` must be in YYYY-MM-DD format.".to_string())
        })?),
        None => None,
    };

    if let (Some(start), Some(end)) = (start, end) {
        if start > end {
            return Err(AppError::InvalidInput(
                "`startDate` cannot be after `endDate`.".to_string(),
            ));
        }
        let days = (end - start).num_days() + 1;
        if days > i64::from(max_range_days) {
            return Err(AppError::InvalidInput(format!(
                "Date range spans {} days; at most {} are allowed.",
                days, max_range_days
            )));
        }
    }

    Ok(SunQuery {
        city: city.to_string(),
        start_date: params.get("startDate").cloned(),
        end_date: params.get("endDate").cloned(),
    })
}

// Route handlers
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: chrono::Utc::now(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        cached_entries: state.sun_service.cache().len(),
    })
}

pub async fn ping() -> Json<PingResponse> {
    Json(PingResponse { status: "ok" })
}

pub async fn get_sun(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Arc<AggregatedResult>>, AppError> {
    let query = validate_sun_query(&params, state.config.max_range_days)?;

    let result = state
        .sun_service
        .resolve(
            &query.city,
            query.start_date.as_deref(),
            query.end_date.as_deref(),
        )
        .await?;

    Ok(Json(result))
}

// Create the router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/ping", get(ping))
        .route("/sun", get(get_sun))
        .with_state(state)
}
