/// Calculate Simple Moving Average (SMA) over the last `period` prices.
///
/// Falls back to the mean of all prices when fewer than `period` are available.
pub fn calculate_sma(prices: &[f64], period: usize) -> Option<f64> {
    if prices.is_empty() {
        return None;
    }

    let take = period.max(1).min(prices.len());
    let sum: f64 = prices.iter().rev().take(take).sum();
    Some(sum / take as f64)
}

/// Calculate Exponential Moving Average (EMA)
///
/// With fewer than `period` prices the most recent price is returned as-is.
pub fn calculate_ema(prices: &[f64], period: usize) -> f64 {
    let period = period.max(1);
    let Some(&last) = prices.last() else {
        return 0.0;
    };
    if prices.len() < period {
        return last;
    }

    let multiplier = 2.0 / (period as f64 + 1.0);

    // Start with SMA of the first window
    let mut ema = prices[..period].iter().sum::<f64>() / period as f64;

    for price in &prices[period..] {
        ema = (price - ema) * multiplier + ema;
    }

    ema
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sma() {
        let prices = vec![100.0, 102.0, 104.0, 106.0, 108.0];
        assert_eq!(calculate_sma(&prices, 5), Some(104.0));
        assert_eq!(calculate_sma(&prices, 2), Some(107.0));
    }

    #[test]
    fn test_sma_short_history_uses_all_prices() {
        let prices = vec![100.0, 102.0];
        assert_eq!(calculate_sma(&prices, 5), Some(101.0));
        assert_eq!(calculate_sma(&[], 5), None);
    }

    #[test]
    fn test_ema_seeded_with_sma() {
        // Exactly `period` values: EMA equals the seed SMA
        let prices = vec![100.0, 102.0, 104.0, 106.0, 108.0];
        assert_eq!(calculate_ema(&prices, 5), 104.0);
    }

    #[test]
    fn test_ema_smoothing() {
        let prices = vec![100.0, 102.0, 104.0, 106.0, 108.0, 110.0];
        // seed 104, multiplier 1/3: (110 - 104) / 3 + 104 = 106
        let ema = calculate_ema(&prices, 5);
        assert!((ema - 106.0).abs() < 1e-9);
    }

    #[test]
    fn test_ema_insufficient_history_returns_last_price() {
        let prices = vec![100.0, 102.0, 101.5];
        assert_eq!(calculate_ema(&prices, 20), 101.5);
    }

    #[test]
    fn test_ema_empty() {
        assert_eq!(calculate_ema(&[], 20), 0.0);
    }
}
