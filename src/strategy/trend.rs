use crate::models::TrendLabel;

/// Classify a timeframe from price against a short and a long EMA.
///
/// Bullish needs price above the short EMA and the short EMA above the long one;
/// bearish is the mirror image. Anything in between is sideways.
pub fn classify(price: f64, ema_short: f64, ema_long: f64) -> TrendLabel {
    if price > ema_short && ema_short > ema_long {
        TrendLabel::Bullish
    } else if price < ema_short && ema_short < ema_long {
        TrendLabel::Bearish
    } else {
        TrendLabel::Sideways
    }
}

/// Single-EMA classification used by the simple path. Never sideways.
pub fn classify_simple(price: f64, ema: f64) -> TrendLabel {
    if price > ema {
        TrendLabel::Bullish
    } else {
        TrendLabel::Bearish
    }
}
