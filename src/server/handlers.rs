use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

use super::{ApiError, AppState};
use crate::api::Credentials;
use crate::strategy::StrategyOverrides;

const DEFAULT_SYMBOL: &str = "NIFTY";
const DEFAULT_SIGNAL_LIMIT: usize = 20;
const MAX_SIGNAL_LIMIT: usize = 500;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketDataQuery {
    pub symbol: Option<String>,
    pub volatility_threshold: Option<f64>,
    pub rsi_threshold: Option<f64>,
    pub ema_short: Option<usize>,
    pub ema_long: Option<usize>,
}

impl MarketDataQuery {
    fn overrides(&self) -> Result<StrategyOverrides, ApiError> {
        for (name, value) in [
            ("volatilityThreshold", self.volatility_threshold),
            ("rsiThreshold", self.rsi_threshold),
        ] {
            if value.is_some_and(|v| !v.is_finite()) {
                return Err(ApiError::bad_request(format!("{} must be a finite number", name)));
            }
        }

        Ok(StrategyOverrides {
            volatility_threshold: self.volatility_threshold,
            rsi_threshold: self.rsi_threshold,
            ema_short: self.ema_short,
            ema_long: self.ema_long,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct SymbolQuery {
    pub symbol: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SignalsQuery {
    pub symbol: Option<String>,
    pub limit: Option<usize>,
}

fn ok<T: Serialize>(data: T) -> Response {
    Json(json!({ "success": true, "data": data })).into_response()
}

fn query_param<T>(query: Result<Query<T>, QueryRejection>) -> Result<T, ApiError> {
    query
        .map(|Query(q)| q)
        .map_err(|e| ApiError::bad_request(e.body_text()))
}

/// Bearer token from the request, else the server's configured token
fn credentials(state: &AppState, headers: &HeaderMap) -> Result<Credentials, ApiError> {
    let from_header = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim);

    Ok(Credentials::resolve(
        from_header,
        state.default_token.as_deref(),
    )?)
}

pub async fn health() -> Response {
    ok(json!({ "status": "ok" }))
}

pub async fn market_data(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    query: Result<Query<MarketDataQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
    let query = query_param(query)?;
    let symbol = query
        .symbol
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::bad_request("Missing required query parameter: symbol"))?;
    let overrides = query.overrides()?;

    let credentials = credentials(&state, &headers)?;
    let report = state
        .analyzer
        .analyze(symbol, &overrides, &credentials)
        .await?;

    Ok(ok(report))
}

pub async fn quick_analyze(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    query: Result<Query<SymbolQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
    let query = query_param(query)?;
    let symbol = query.symbol.unwrap_or_else(|| DEFAULT_SYMBOL.to_string());

    let credentials = credentials(&state, &headers)?;
    let report = state.analyzer.quick_analyze(&symbol, &credentials).await?;

    Ok(ok(report))
}

pub async fn session(State(state): State<Arc<AppState>>) -> Response {
    ok(state.analyzer.session())
}

pub async fn signals(
    State(state): State<Arc<AppState>>,
    query: Result<Query<SignalsQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
    let query = query_param(query)?;
    let symbol = query.symbol.unwrap_or_else(|| DEFAULT_SYMBOL.to_string());
    let limit = query
        .limit
        .unwrap_or(DEFAULT_SIGNAL_LIMIT)
        .clamp(1, MAX_SIGNAL_LIMIT);

    // Reject unknown symbols with the same error the analysis endpoints use
    symbol.parse::<crate::models::Instrument>()?;

    let records = state
        .analyzer
        .recent_signals(&symbol, limit)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to load signals: {}", e)))?;

    Ok(ok(records))
}

pub async fn not_found() -> ApiError {
    ApiError::new(StatusCode::NOT_FOUND, "NotFound", "No such endpoint")
}
