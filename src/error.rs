use thiserror::Error;

/// Failures an analysis run can surface to its caller.
///
/// Short indicator history is not in here: the indicator functions absorb it
/// with fallback values.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Invalid symbol: {0}")]
    InvalidSymbol(String),

    #[error("Not authenticated with the market data provider")]
    NotAuthenticated,

    #[error("No market data for {symbol} ({what})")]
    NoMarketData { symbol: String, what: String },

    #[error("Market data provider unavailable: {0}")]
    UpstreamUnavailable(String),
}

impl AnalysisError {
    /// Stable machine-readable category
    pub fn kind(&self) -> &'static str {
        match self {
            AnalysisError::InvalidSymbol(_) => "InvalidSymbol",
            AnalysisError::NotAuthenticated => "NotAuthenticated",
            AnalysisError::NoMarketData { .. } => "NoMarketData",
            AnalysisError::UpstreamUnavailable(_) => "UpstreamUnavailable",
        }
    }

    pub fn no_data(symbol: impl Into<String>, what: impl Into<String>) -> Self {
        AnalysisError::NoMarketData {
            symbol: symbol.into(),
            what: what.into(),
        }
    }
}

impl From<reqwest::Error> for AnalysisError {
    fn from(err: reqwest::Error) -> Self {
        AnalysisError::UpstreamUnavailable(err.to_string())
    }
}
