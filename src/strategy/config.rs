use serde::{Deserialize, Serialize};

/// Configuration for signal generation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyConfig {
    pub rsi_period: usize,
    pub rsi_oversold: f64,
    pub rsi_overbought: f64,
    pub ema_short: usize,
    pub ema_long: usize,
    /// Confluence: volatility index must be strictly below this to trade
    pub volatility_threshold: f64,
    /// Confluence: fast timeframe RSI must be strictly below this to trade
    pub rsi_threshold: f64,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            rsi_period: 14,
            rsi_oversold: 30.0,
            rsi_overbought: 70.0,
            ema_short: 20,
            ema_long: 50,
            volatility_threshold: 15.0,
            rsi_threshold: 70.0,
        }
    }
}

/// Per-request adjustments to the configured strategy
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategyOverrides {
    pub volatility_threshold: Option<f64>,
    pub rsi_threshold: Option<f64>,
    pub ema_short: Option<usize>,
    pub ema_long: Option<usize>,
}

impl StrategyConfig {
    /// Apply caller overrides on top of this configuration
    ///
    /// # Example
    /// ```
    /// use indexbot::strategy::{StrategyConfig, StrategyOverrides};
    ///
    /// let config = StrategyConfig::default().with_overrides(&StrategyOverrides {
    ///     rsi_threshold: Some(65.0),
    ///     ..Default::default()
    /// });
    /// assert_eq!(config.rsi_threshold, 65.0);
    /// assert_eq!(config.volatility_threshold, 15.0);
    /// ```
    pub fn with_overrides(&self, overrides: &StrategyOverrides) -> Self {
        Self {
            volatility_threshold: overrides
                .volatility_threshold
                .unwrap_or(self.volatility_threshold),
            rsi_threshold: overrides.rsi_threshold.unwrap_or(self.rsi_threshold),
            ema_short: overrides.ema_short.unwrap_or(self.ema_short).max(1),
            ema_long: overrides.ema_long.unwrap_or(self.ema_long).max(1),
            ..self.clone()
        }
    }
}
