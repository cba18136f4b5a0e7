use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::models::{
    Action, Confidence, IndicatorSet, Policy, Timeframe, TrendLabel, VolatilityRegime,
};
use crate::risk::FormattedLevels;
use crate::session::SessionWindow;

/// Trend and indicators reported for one timeframe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeframeAnalysis {
    pub trend: TrendLabel,
    pub indicators: IndicatorSet,
}

/// Result of one analysis run, for either policy.
///
/// `policy` says which decision path produced it, so consumers never have to
/// guess from the set of fields present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    pub symbol: String,
    pub timestamp: DateTime<Utc>,
    pub policy: Policy,
    #[serde(flatten)]
    pub session: SessionWindow,
    pub vix: f64,
    pub environment: VolatilityRegime,
    pub last_price: f64,
    pub timeframes: BTreeMap<Timeframe, TimeframeAnalysis>,
    pub final_signal: Action,
    pub reason: String,
    pub confidence: Confidence,
    pub risk_reward: String,
    pub levels: FormattedLevels,
}
