use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::AnalysisError;

/// Index instruments the engine knows how to analyze
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum Instrument {
    Nifty,
    BankNifty,
    FinNifty,
}

/// Instrument key of the India VIX volatility index
pub const VOLATILITY_INDEX_KEY: &str = "NSE_INDEX|India VIX";

impl Instrument {
    pub const ALL: [Instrument; 3] = [Instrument::Nifty, Instrument::BankNifty, Instrument::FinNifty];

    /// Upstox instrument key
    pub fn instrument_key(&self) -> &'static str {
        match self {
            Instrument::Nifty => "NSE_INDEX|Nifty 50",
            Instrument::BankNifty => "NSE_INDEX|Nifty Bank",
            Instrument::FinNifty => "NSE_INDEX|Nifty Financial Services",
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Instrument::Nifty => "NIFTY",
            Instrument::BankNifty => "BANKNIFTY",
            Instrument::FinNifty => "FINNIFTY",
        }
    }
}

impl fmt::Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for Instrument {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "NIFTY" => Ok(Instrument::Nifty),
            "BANKNIFTY" => Ok(Instrument::BankNifty),
            "FINNIFTY" => Ok(Instrument::FinNifty),
            _ => Err(AnalysisError::InvalidSymbol(s.to_string())),
        }
    }
}

/// Candle granularity used by the analysis
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Timeframe {
    #[serde(rename = "5m")]
    FiveMinute,
    #[serde(rename = "15m")]
    FifteenMinute,
    #[serde(rename = "1H")]
    Hourly,
    #[serde(rename = "1D")]
    Daily,
}

impl Timeframe {
    pub const ALL: [Timeframe; 4] = [
        Timeframe::FiveMinute,
        Timeframe::FifteenMinute,
        Timeframe::Hourly,
        Timeframe::Daily,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Timeframe::FiveMinute => "5m",
            Timeframe::FifteenMinute => "15m",
            Timeframe::Hourly => "1H",
            Timeframe::Daily => "1D",
        }
    }

    /// Name used in human-readable rationales
    pub fn display_name(&self) -> &'static str {
        match self {
            Timeframe::Daily => "Daily",
            other => other.label(),
        }
    }

    /// Upstox v2 historical-candle interval.
    ///
    /// v2 has no hourly interval, so the mid timeframe is built from 30 minute candles.
    pub fn upstox_interval(&self) -> &'static str {
        match self {
            Timeframe::FiveMinute => "5minute",
            Timeframe::FifteenMinute => "15minute",
            Timeframe::Hourly => "30minute",
            Timeframe::Daily => "day",
        }
    }

    /// Days of history requested for this timeframe
    pub fn lookback_days(&self) -> i64 {
        match self {
            Timeframe::FiveMinute => 5,
            Timeframe::FifteenMinute => 10,
            Timeframe::Hourly => 15,
            Timeframe::Daily => 365,
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// OHLCV candlestick data
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Candle {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Extract close prices, oldest first
pub fn closes(candles: &[Candle]) -> Vec<f64> {
    candles.iter().map(|c| c.close).collect()
}

/// Trend state of a single timeframe
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum TrendLabel {
    Bullish,
    Bearish,
    Sideways,
}

impl fmt::Display for TrendLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TrendLabel::Bullish => "BULLISH",
            TrendLabel::Bearish => "BEARISH",
            TrendLabel::Sideways => "SIDEWAYS",
        };
        f.write_str(s)
    }
}

/// Indicator values computed for one timeframe
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct IndicatorSet {
    pub ema: f64,
    pub rsi: f64,
}

/// Which decision policy produced a result
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Policy {
    Confluence,
    Simple,
}

/// Final action of an analysis run.
///
/// The confluence policy yields Trade/Wait/Avoid, the simple policy Buy/Sell.
/// Hold is part of the simple vocabulary but no rule produces it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum Action {
    Trade,
    Wait,
    Avoid,
    Buy,
    Sell,
    Hold,
}

/// Direction of an actionable decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Long,
    Short,
}

impl Action {
    /// Trade is a long entry: it is only reachable when every timeframe is bullish.
    pub fn direction(&self) -> Option<Direction> {
        match self {
            Action::Trade | Action::Buy => Some(Direction::Long),
            Action::Sell => Some(Direction::Short),
            Action::Wait | Action::Avoid | Action::Hold => None,
        }
    }

    pub fn is_directional(&self) -> bool {
        self.direction().is_some()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Trade => "TRADE",
            Action::Wait => "WAIT",
            Action::Avoid => "AVOID",
            Action::Buy => "BUY",
            Action::Sell => "SELL",
            Action::Hold => "HOLD",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl Confidence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::Low => "LOW",
            Confidence::Medium => "MEDIUM",
            Confidence::High => "HIGH",
        }
    }
}

/// Market environment implied by the volatility index
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum VolatilityRegime {
    Calm,
    Moderate,
    #[serde(rename = "High Volatility")]
    HighVolatility,
}

impl VolatilityRegime {
    /// Below 13 is calm, below 20 moderate, anything above is high volatility
    pub fn classify(volatility: f64) -> Self {
        if volatility >= 20.0 {
            VolatilityRegime::HighVolatility
        } else if volatility >= 13.0 {
            VolatilityRegime::Moderate
        } else {
            VolatilityRegime::Calm
        }
    }
}

/// Outcome of a strategy evaluation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Decision {
    pub policy: Policy,
    pub action: Action,
    pub reason: String,
    pub confidence: Confidence,
}

/// Persisted record of a directional signal
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SignalRecord {
    pub id: Uuid,
    pub symbol: String,
    pub timestamp: DateTime<Utc>,
    pub signal: Action,
    pub price: f64,
    pub stop_loss: f64,
    pub target: f64,
    pub risk_reward_ratio: String,
    pub rsi: f64,
    pub ema: f64,
    pub reason: String,
    pub confidence: Confidence,
}
