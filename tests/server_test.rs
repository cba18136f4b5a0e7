use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use chrono::{Duration as ChronoDuration, TimeZone, Utc};
use indexbot::analysis::MarketAnalyzer;
use indexbot::api::{Credentials, MarketDataProvider};
use indexbot::db::MemorySignalStore;
use indexbot::models::{Candle, Instrument, Timeframe};
use indexbot::server::{build_router, AppState};
use indexbot::AnalysisError;
use serde_json::Value;
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

/// Flat market; remembers the last token it was called with
#[derive(Default)]
struct StubProvider {
    seen_token: Mutex<Option<String>>,
}

impl StubProvider {
    fn remember(&self, credentials: &Credentials) {
        *self.seen_token.lock().unwrap() = Some(credentials.access_token().to_string());
    }
}

#[async_trait]
impl MarketDataProvider for StubProvider {
    async fn candles(
        &self,
        _instrument: Instrument,
        _timeframe: Timeframe,
        credentials: &Credentials,
    ) -> Result<Vec<Candle>, AnalysisError> {
        self.remember(credentials);
        let start = Utc.with_ymd_and_hms(2024, 6, 10, 3, 45, 0).unwrap();
        Ok((0..30)
            .map(|i| Candle {
                timestamp: start + ChronoDuration::minutes(5 * i),
                open: 22000.0,
                high: 22000.0,
                low: 22000.0,
                close: 22000.0,
                volume: 0.0,
            })
            .collect())
    }

    async fn last_price(
        &self,
        _instrument: Instrument,
        credentials: &Credentials,
    ) -> Result<f64, AnalysisError> {
        self.remember(credentials);
        Ok(22010.0)
    }

    async fn volatility_index(&self, credentials: &Credentials) -> Result<f64, AnalysisError> {
        self.remember(credentials);
        Ok(13.5)
    }
}

fn app(provider: Arc<StubProvider>, default_token: Option<&str>) -> Router {
    let analyzer = MarketAnalyzer::new(provider, Arc::new(MemorySignalStore::new()));
    build_router(AppState {
        analyzer: Arc::new(analyzer),
        default_token: default_token.map(str::to_string),
    })
}

async fn get(app: Router, uri: &str, bearer: Option<&str>) -> (StatusCode, Value) {
    let mut request = Request::builder().uri(uri);
    if let Some(token) = bearer {
        request = request.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }

    let response = app
        .oneshot(request.body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_health() {
    let (status, body) = get(app(Arc::default(), None), "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["status"], "ok");
}

#[tokio::test]
async fn test_market_data_requires_symbol() {
    let (status, body) = get(
        app(Arc::default(), Some("server-token")),
        "/api/market/market-data",
        None,
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["kind"], "InvalidRequest");
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .contains("symbol"));
}

#[tokio::test]
async fn test_unknown_symbol_is_bad_request() {
    let (status, body) = get(
        app(Arc::default(), Some("server-token")),
        "/api/market/market-data?symbol=SENSEX",
        None,
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["kind"], "InvalidSymbol");
}

#[tokio::test]
async fn test_missing_token_is_unauthorized() {
    let (status, body) = get(
        app(Arc::default(), None),
        "/api/market/market-data?symbol=NIFTY",
        None,
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["kind"], "NotAuthenticated");
}

#[tokio::test]
async fn test_market_data_report_envelope() {
    let provider = Arc::new(StubProvider::default());
    let (status, body) = get(
        app(provider.clone(), Some("server-token")),
        "/api/market/market-data?symbol=nifty&volatilityThreshold=14&rsiThreshold=65",
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let data = &body["data"];
    assert_eq!(data["symbol"], "NIFTY");
    assert_eq!(data["policy"], "confluence");
    assert_eq!(data["vix"], 13.5);
    assert_eq!(data["environment"], "Moderate");
    // Flat candles classify as sideways everywhere
    assert_eq!(data["finalSignal"], "WAIT");
    assert_eq!(data["timeframes"]["1D"]["trend"], "SIDEWAYS");
    assert!(data["isOpen"].is_boolean());
    assert!(data["timeToEvent"].is_i64());
    assert_eq!(data["riskReward"], "N/A");

    assert_eq!(
        provider.seen_token.lock().unwrap().as_deref(),
        Some("server-token")
    );
}

#[tokio::test]
async fn test_request_token_wins_over_default() {
    let provider = Arc::new(StubProvider::default());
    let (status, body) = get(
        app(provider.clone(), Some("server-token")),
        "/api/analyze",
        Some("caller-token"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["symbol"], "NIFTY");
    assert_eq!(body["data"]["policy"], "simple");
    assert_eq!(body["data"]["finalSignal"], "SELL");
    assert_eq!(
        provider.seen_token.lock().unwrap().as_deref(),
        Some("caller-token")
    );
}

#[tokio::test]
async fn test_bad_query_value_is_bad_request() {
    let (status, body) = get(
        app(Arc::default(), Some("server-token")),
        "/api/market/market-data?symbol=NIFTY&emaShort=abc",
        None,
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_non_finite_thresholds_are_bad_request() {
    for query in ["volatilityThreshold=NaN", "rsiThreshold=inf"] {
        let provider = Arc::new(StubProvider::default());
        let (status, body) = get(
            app(provider.clone(), Some("server-token")),
            &format!("/api/market/market-data?symbol=NIFTY&{}", query),
            None,
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", query);
        assert_eq!(body["error"]["kind"], "InvalidRequest");
        assert!(body["error"]["message"]
            .as_str()
            .unwrap()
            .contains("finite"));
        // Rejected before any market data is requested
        assert!(provider.seen_token.lock().unwrap().is_none());
    }
}

#[tokio::test]
async fn test_session_endpoint() {
    let (status, body) = get(app(Arc::default(), None), "/api/market/session", None).await;

    assert_eq!(status, StatusCode::OK);
    let data = &body["data"];
    assert!(data["isOpen"].is_boolean());
    let label = data["nextEventLabel"].as_str().unwrap();
    assert!(label == "Opens in" || label == "Closes in");
    assert!(data["timeToEvent"].as_i64().unwrap() >= 0);
}

#[tokio::test]
async fn test_signals_lists_recorded_signals() {
    let provider = Arc::new(StubProvider::default());
    let app = app(provider, Some("server-token"));

    let (status, _) = get(app.clone(), "/api/analyze?symbol=BANKNIFTY", None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = get(app, "/api/market/signals?symbol=BANKNIFTY&limit=5", None).await;
    assert_eq!(status, StatusCode::OK);
    let signals = body["data"].as_array().unwrap();
    assert_eq!(signals.len(), 1);
    assert_eq!(signals[0]["symbol"], "BANKNIFTY");
    assert_eq!(signals[0]["signal"], "SELL");
}

#[tokio::test]
async fn test_unknown_route_is_json_not_found() {
    let (status, body) = get(app(Arc::default(), None), "/api/nope", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["kind"], "NotFound");
}
