pub mod upstox;

pub use upstox::{UpstoxClient, UpstoxConfig};

use async_trait::async_trait;
use std::fmt;

use crate::error::AnalysisError;
use crate::models::{Candle, Instrument, Timeframe};

/// Access token for one analysis call.
///
/// Passed explicitly into every provider call; nothing in the engine keeps a
/// token around between requests.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    access_token: String,
}

impl Credentials {
    pub fn bearer(access_token: impl Into<String>) -> Result<Self, AnalysisError> {
        let access_token = access_token.into();
        if access_token.trim().is_empty() {
            return Err(AnalysisError::NotAuthenticated);
        }
        Ok(Self { access_token })
    }

    /// First non-empty token wins; none at all means not authenticated
    pub fn resolve(request: Option<&str>, fallback: Option<&str>) -> Result<Self, AnalysisError> {
        request
            .filter(|t| !t.trim().is_empty())
            .or(fallback.filter(|t| !t.trim().is_empty()))
            .map(Self::bearer)
            .unwrap_or(Err(AnalysisError::NotAuthenticated))
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_token", &"<redacted>")
            .finish()
    }
}

/// Source of candles, live prices and the volatility index
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Candles for one timeframe, oldest first, unique per timestamp
    async fn candles(
        &self,
        instrument: Instrument,
        timeframe: Timeframe,
        credentials: &Credentials,
    ) -> Result<Vec<Candle>, AnalysisError>;

    /// Last traded price
    async fn last_price(
        &self,
        instrument: Instrument,
        credentials: &Credentials,
    ) -> Result<f64, AnalysisError>;

    /// Current volatility index reading
    async fn volatility_index(&self, credentials: &Credentials) -> Result<f64, AnalysisError>;
}
