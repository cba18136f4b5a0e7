/// RSI reported when there is not enough history to compute one
pub const NEUTRAL_RSI: f64 = 50.0;

pub const DEFAULT_RSI_PERIOD: usize = 14;

/// Calculate Relative Strength Index (RSI) with Wilder smoothing
///
/// RSI measures the magnitude of recent price changes to evaluate
/// overbought or oversold conditions.
///
/// Values:
/// - RSI > 70: Overbought
/// - RSI < 30: Oversold
///
/// Returns [`NEUTRAL_RSI`] when fewer than `period + 1` prices are given.
pub fn calculate_rsi(prices: &[f64], period: usize) -> f64 {
    let period = period.max(1);
    if prices.len() <= period {
        return NEUTRAL_RSI;
    }

    let changes: Vec<f64> = prices.windows(2).map(|w| w[1] - w[0]).collect();

    let (mut avg_gain, mut avg_loss) =
        changes[..period]
            .iter()
            .fold((0.0, 0.0), |(gain, loss), &change| {
                if change > 0.0 {
                    (gain + change, loss)
                } else {
                    (gain, loss + change.abs())
                }
            });
    avg_gain /= period as f64;
    avg_loss /= period as f64;

    let weight = (period - 1) as f64;
    for &change in &changes[period..] {
        let (gain, loss) = if change > 0.0 {
            (change, 0.0)
        } else {
            (0.0, change.abs())
        };
        avg_gain = (avg_gain * weight + gain) / period as f64;
        avg_loss = (avg_loss * weight + loss) / period as f64;
    }

    if avg_loss == 0.0 {
        return 100.0;
    }

    let rs = avg_gain / avg_loss;
    100.0 - (100.0 / (1.0 + rs))
}
