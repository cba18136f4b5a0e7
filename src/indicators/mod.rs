// Technical indicators module
// Pure functions over close-price series, oldest first

pub mod moving_average;
pub mod rsi;

pub use moving_average::{calculate_ema, calculate_sma};
pub use rsi::{calculate_rsi, DEFAULT_RSI_PERIOD, NEUTRAL_RSI};

use crate::models::IndicatorSet;

/// Compute the EMA/RSI pair reported for a timeframe
pub fn indicator_set(prices: &[f64], ema_period: usize, rsi_period: usize) -> IndicatorSet {
    IndicatorSet {
        ema: calculate_ema(prices, ema_period),
        rsi: calculate_rsi(prices, rsi_period),
    }
}
