use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use governor::{Quota, RateLimiter};
use reqwest::{Client, StatusCode, Url};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use super::{Credentials, MarketDataProvider};
use crate::error::AnalysisError;
use crate::models::{Candle, Instrument, Timeframe, VOLATILITY_INDEX_KEY};
use crate::session::clock::IST_OFFSET_SECS;

pub const UPSTOX_API_BASE: &str = "https://api.upstox.com/v2";

type UpstoxRateLimiter = RateLimiter<
    governor::state::direct::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// Upstox connection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstoxConfig {
    pub base_url: String,
    /// Token used when a request brings none of its own
    pub access_token: Option<String>,
    pub timeout_secs: u64,
    pub requests_per_second: u32,
    pub max_retries: u32,
    /// First retry delay; doubles on every further attempt
    pub backoff_ms: u64,
}

impl Default for UpstoxConfig {
    fn default() -> Self {
        Self {
            base_url: UPSTOX_API_BASE.to_string(),
            access_token: None,
            timeout_secs: 30,
            requests_per_second: 25,
            max_retries: 3,
            backoff_ms: 1000,
        }
    }
}

/// Upstox v2 REST client
///
/// Cloneable; all clones share the same rate limiter.
#[derive(Clone)]
pub struct UpstoxClient {
    client: Client,
    base_url: Url,
    rate_limiter: Arc<UpstoxRateLimiter>,
    max_retries: u32,
    backoff: Duration,
}

// ============== Response Types ==============

#[derive(Debug, Deserialize)]
struct UpstoxResponse<T> {
    #[allow(dead_code)]
    status: Option<String>,
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct CandleData {
    #[serde(default)]
    candles: Vec<Vec<serde_json::Value>>,
}

#[derive(Debug, Deserialize)]
struct LtpEntry {
    last_price: f64,
}

// ============== Implementation ==============

impl UpstoxClient {
    pub fn new(config: &UpstoxConfig) -> crate::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        let per_second = NonZeroU32::new(config.requests_per_second).unwrap_or(NonZeroU32::MIN);
        let rate_limiter = Arc::new(RateLimiter::direct(Quota::per_second(per_second)));

        let base_url = Url::parse(config.base_url.trim_end_matches('/'))?;
        if base_url.cannot_be_a_base() {
            return Err(format!("Invalid Upstox base URL: {}", config.base_url).into());
        }

        Ok(Self {
            client,
            base_url,
            rate_limiter,
            max_retries: config.max_retries.max(1),
            backoff: Duration::from_millis(config.backoff_ms),
        })
    }

    /// Endpoint URL below the base path; each segment is percent-encoded
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// Rate-limited GET with retry on 429 and 5xx
    async fn make_request(
        &self,
        url: Url,
        query: &[(&str, &str)],
        credentials: &Credentials,
    ) -> Result<reqwest::Response, AnalysisError> {
        let mut last_error = String::from("no attempt made");

        for attempt in 1..=self.max_retries {
            self.rate_limiter.until_ready().await;

            let result = self
                .client
                .get(url.clone())
                .query(query)
                .bearer_auth(credentials.access_token())
                .header("Accept", "application/json")
                .send()
                .await;

            match result {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        return Ok(response);
                    }

                    if status == StatusCode::UNAUTHORIZED {
                        tracing::warn!("Upstox rejected the access token (401)");
                        return Err(AnalysisError::NotAuthenticated);
                    }

                    if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                        last_error = format!("Upstox returned {}", status);
                        if attempt < self.max_retries {
                            let delay = self.backoff_for(attempt);
                            tracing::warn!(
                                "{}, retrying in {:?} (attempt {}/{})",
                                last_error,
                                delay,
                                attempt,
                                self.max_retries
                            );
                            tokio::time::sleep(delay).await;
                        }
                        continue;
                    }

                    // Other 4xx - don't retry
                    let error_text = response
                        .text()
                        .await
                        .unwrap_or_else(|_| "Unknown error".to_string());
                    return Err(AnalysisError::UpstreamUnavailable(format!(
                        "Upstox API error ({}): {}",
                        status, error_text
                    )));
                }
                Err(e) => {
                    last_error = format!("Network error: {}", e);
                    if attempt < self.max_retries {
                        let delay = self.backoff_for(attempt);
                        tracing::warn!(
                            "{}, retrying in {:?} (attempt {}/{})",
                            last_error,
                            delay,
                            attempt,
                            self.max_retries
                        );
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        Err(AnalysisError::UpstreamUnavailable(format!(
            "{} after {} attempts",
            last_error, self.max_retries
        )))
    }

    fn backoff_for(&self, attempt: u32) -> Duration {
        self.backoff.saturating_mul(2u32.saturating_pow(attempt - 1))
    }

    /// Historical candles for an explicit date range, oldest first
    /// Endpoint: GET /historical-candle/{instrument_key}/{interval}/{to_date}/{from_date}
    pub async fn candles_between(
        &self,
        instrument: Instrument,
        timeframe: Timeframe,
        to: NaiveDate,
        from: NaiveDate,
        credentials: &Credentials,
    ) -> Result<Vec<Candle>, AnalysisError> {
        let to = to.format("%Y-%m-%d").to_string();
        let from = from.format("%Y-%m-%d").to_string();
        let url = self.endpoint(&[
            "historical-candle",
            instrument.instrument_key(),
            timeframe.upstox_interval(),
            &to,
            &from,
        ]);

        tracing::debug!("Fetching {} candles for {}", timeframe, instrument);

        let response = self.make_request(url, &[], credentials).await?;
        let body: UpstoxResponse<CandleData> = response.json().await?;

        let rows = body.data.map(|d| d.candles).unwrap_or_default();
        let candles = parse_candles(rows);

        if candles.is_empty() {
            return Err(AnalysisError::no_data(
                instrument.symbol(),
                format!("{} candles", timeframe),
            ));
        }

        tracing::debug!(
            "Fetched {} {} candles for {}",
            candles.len(),
            timeframe,
            instrument
        );

        Ok(candles)
    }

    /// Last traded price for any instrument key
    /// Endpoint: GET /market-quote/ltp?instrument_key={key}
    pub async fn ltp(&self, instrument_key: &str, credentials: &Credentials) -> Result<f64, AnalysisError> {
        let url = self.endpoint(&["market-quote", "ltp"]);
        let response = self
            .make_request(url, &[("instrument_key", instrument_key)], credentials)
            .await?;
        let body: UpstoxResponse<HashMap<String, LtpEntry>> = response.json().await?;

        // Keyed by a display form of the instrument key; there is only one entry
        body.data
            .and_then(|quotes| quotes.into_values().next())
            .map(|entry| entry.last_price)
            .ok_or_else(|| AnalysisError::no_data(instrument_key, "last traded price"))
    }
}

#[async_trait]
impl MarketDataProvider for UpstoxClient {
    async fn candles(
        &self,
        instrument: Instrument,
        timeframe: Timeframe,
        credentials: &Credentials,
    ) -> Result<Vec<Candle>, AnalysisError> {
        let today = (Utc::now() + chrono::Duration::seconds(IST_OFFSET_SECS as i64)).date_naive();
        let from = today - chrono::Duration::days(timeframe.lookback_days());
        self.candles_between(instrument, timeframe, today, from, credentials)
            .await
    }

    async fn last_price(
        &self,
        instrument: Instrument,
        credentials: &Credentials,
    ) -> Result<f64, AnalysisError> {
        self.ltp(instrument.instrument_key(), credentials).await
    }

    async fn volatility_index(&self, credentials: &Credentials) -> Result<f64, AnalysisError> {
        self.ltp(VOLATILITY_INDEX_KEY, credentials).await
    }
}

/// Turn raw `[timestamp, open, high, low, close, volume, oi]` rows into candles,
/// sorted oldest first with duplicate timestamps removed. Malformed rows are skipped.
fn parse_candles(rows: Vec<Vec<serde_json::Value>>) -> Vec<Candle> {
    let total = rows.len();
    let mut candles: Vec<Candle> = rows.iter().filter_map(|row| parse_candle_row(row)).collect();

    if candles.len() < total {
        tracing::warn!("Skipped {} malformed candle rows", total - candles.len());
    }

    // Upstox returns newest first
    candles.sort_by_key(|c| c.timestamp);
    candles.dedup_by_key(|c| c.timestamp);
    candles
}

fn parse_candle_row(row: &[serde_json::Value]) -> Option<Candle> {
    let timestamp = DateTime::parse_from_rfc3339(row.first()?.as_str()?)
        .ok()?
        .with_timezone(&Utc);
    let num = |i: usize| row.get(i).and_then(|v| v.as_f64());

    Some(Candle {
        timestamp,
        open: num(1)?,
        high: num(2)?,
        low: num(3)?,
        close: num(4)?,
        volume: num(5).unwrap_or(0.0),
    })
}
