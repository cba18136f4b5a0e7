use super::StrategyConfig;
use crate::models::{Action, Confidence, Decision, Policy, Timeframe, TrendLabel};

/// Everything the multi-timeframe policy looks at
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConfluenceInputs {
    pub daily: TrendLabel,
    pub mid: TrendLabel,
    pub fast: TrendLabel,
    pub fast_rsi: f64,
    pub volatility: f64,
}

/// Multi-timeframe confluence policy
///
/// Rules, in priority order:
/// 1. Daily bearish: AVOID, nothing else is considered
/// 2. Daily, mid and fast bullish, volatility below threshold, RSI below threshold: TRADE
/// 3. Otherwise WAIT, naming every condition that failed
pub fn evaluate(inputs: &ConfluenceInputs, config: &StrategyConfig) -> Decision {
    if inputs.daily == TrendLabel::Bearish {
        return Decision {
            policy: Policy::Confluence,
            action: Action::Avoid,
            reason: "Daily timeframe is in a bearish trend. Avoid trading until trend reverses."
                .to_string(),
            confidence: Confidence::High,
        };
    }

    let trends = [
        (Timeframe::Daily, inputs.daily),
        (Timeframe::Hourly, inputs.mid),
        (Timeframe::FiveMinute, inputs.fast),
    ];
    let non_bullish: Vec<(Timeframe, TrendLabel)> = trends
        .iter()
        .copied()
        .filter(|(_, trend)| *trend != TrendLabel::Bullish)
        .collect();

    let all_bullish = non_bullish.is_empty();
    let volatility_low = inputs.volatility < config.volatility_threshold;
    let rsi_ok = inputs.fast_rsi < config.rsi_threshold;

    if all_bullish && volatility_low && rsi_ok {
        return Decision {
            policy: Policy::Confluence,
            action: Action::Trade,
            reason: format!(
                "All timeframes bullish, VIX is low ({:.2} < {}), and RSI is healthy ({:.2} < {}). Good trading opportunity.",
                inputs.volatility, config.volatility_threshold, inputs.fast_rsi, config.rsi_threshold
            ),
            confidence: Confidence::High,
        };
    }

    let mut reasons = Vec::new();

    if !all_bullish {
        let names: Vec<&str> = non_bullish.iter().map(|(tf, _)| tf.display_name()).collect();
        let labels: Vec<String> = non_bullish.iter().map(|(_, trend)| trend.to_string()).collect();
        let verb = if non_bullish.len() == 1 { "is" } else { "are" };
        reasons.push(format!(
            "Not all timeframes are bullish ({} {} {})",
            names.join(", "),
            verb,
            labels.join(", ")
        ));
    }

    if !volatility_low {
        reasons.push(format!(
            "VIX is elevated ({:.2} >= {})",
            inputs.volatility, config.volatility_threshold
        ));
    }

    if !rsi_ok {
        reasons.push(format!(
            "RSI is overbought ({:.2} >= {})",
            inputs.fast_rsi, config.rsi_threshold
        ));
    }

    let confidence = if reasons.len() > 1 {
        Confidence::Low
    } else {
        Confidence::Medium
    };

    Decision {
        policy: Policy::Confluence,
        action: Action::Wait,
        reason: format!("Waiting for better conditions. {}.", reasons.join(". ")),
        confidence,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs(daily: TrendLabel, mid: TrendLabel, fast: TrendLabel, rsi: f64, vix: f64) -> ConfluenceInputs {
        ConfluenceInputs {
            daily,
            mid,
            fast,
            fast_rsi: rsi,
            volatility: vix,
        }
    }

    #[test]
    fn test_daily_bearish_always_avoids() {
        let config = StrategyConfig::default();
        let decision = evaluate(
            &inputs(TrendLabel::Bearish, TrendLabel::Bullish, TrendLabel::Bullish, 40.0, 10.0),
            &config,
        );
        assert_eq!(decision.action, Action::Avoid);
        assert_eq!(decision.policy, Policy::Confluence);
        assert!(decision.reason.contains("Daily timeframe is in a bearish trend"));
    }

    #[test]
    fn test_trade_iff_all_conditions_hold() {
        let config = StrategyConfig::default();
        let bullish = TrendLabel::Bullish;

        // All 2^4 combinations of (daily, mid, fast, volatility), crossed with RSI ok/overbought
        for rsi_ok in [true, false] {
            for mask in 0u8..16 {
                let daily_bull = mask & 1 != 0;
                let mid_bull = mask & 2 != 0;
                let fast_bull = mask & 4 != 0;
                let vol_ok = mask & 8 != 0;

                let decision = evaluate(
                    &inputs(
                        if daily_bull { bullish } else { TrendLabel::Bearish },
                        if mid_bull { bullish } else { TrendLabel::Sideways },
                        if fast_bull { bullish } else { TrendLabel::Bearish },
                        if rsi_ok { 55.0 } else { 75.0 },
                        if vol_ok { 12.0 } else { 18.0 },
                    ),
                    &config,
                );

                let expected = if !daily_bull {
                    Action::Avoid
                } else if mid_bull && fast_bull && vol_ok && rsi_ok {
                    Action::Trade
                } else {
                    Action::Wait
                };
                assert_eq!(decision.action, expected, "mask={mask:04b} rsi_ok={rsi_ok}");
            }
        }
    }

    #[test]
    fn test_trade_reason() {
        let decision = evaluate(
            &inputs(TrendLabel::Bullish, TrendLabel::Bullish, TrendLabel::Bullish, 55.5, 12.25),
            &StrategyConfig::default(),
        );
        assert_eq!(decision.action, Action::Trade);
        assert_eq!(decision.confidence, Confidence::High);
        assert_eq!(
            decision.reason,
            "All timeframes bullish, VIX is low (12.25 < 15), and RSI is healthy (55.50 < 70). Good trading opportunity."
        );
    }

    #[test]
    fn test_wait_names_every_failing_condition() {
        let decision = evaluate(
            &inputs(TrendLabel::Sideways, TrendLabel::Bullish, TrendLabel::Bearish, 72.0, 16.0),
            &StrategyConfig::default(),
        );
        assert_eq!(decision.action, Action::Wait);
        assert_eq!(decision.confidence, Confidence::Low);
        assert_eq!(
            decision.reason,
            "Waiting for better conditions. Not all timeframes are bullish (Daily, 5m are SIDEWAYS, BEARISH). \
             VIX is elevated (16.00 >= 15). RSI is overbought (72.00 >= 70)."
        );
    }

    #[test]
    fn test_wait_single_condition() {
        let decision = evaluate(
            &inputs(TrendLabel::Bullish, TrendLabel::Sideways, TrendLabel::Bullish, 50.0, 10.0),
            &StrategyConfig::default(),
        );
        assert_eq!(decision.action, Action::Wait);
        assert_eq!(decision.confidence, Confidence::Medium);
        assert_eq!(
            decision.reason,
            "Waiting for better conditions. Not all timeframes are bullish (1H is SIDEWAYS)."
        );
    }

    #[test]
    fn test_thresholds_are_strict_and_configurable() {
        let all_bull = |rsi, vix| {
            inputs(TrendLabel::Bullish, TrendLabel::Bullish, TrendLabel::Bullish, rsi, vix)
        };
        let config = StrategyConfig::default();
        assert_eq!(evaluate(&all_bull(50.0, 15.0), &config).action, Action::Wait);
        assert_eq!(evaluate(&all_bull(70.0, 10.0), &config).action, Action::Wait);

        let relaxed = StrategyConfig {
            volatility_threshold: 20.0,
            rsi_threshold: 80.0,
            ..StrategyConfig::default()
        };
        assert_eq!(evaluate(&all_bull(75.0, 18.0), &relaxed).action, Action::Trade);
    }
}
