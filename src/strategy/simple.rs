use super::StrategyConfig;
use crate::models::{Action, Confidence, Decision, Policy};

/// Single-timeframe RSI/EMA policy.
///
/// RSI extremes win; otherwise price against EMA picks the side. The output is
/// always BUY or SELL: there is no rule that yields HOLD on this path.
pub fn evaluate(price: f64, ema: f64, rsi: f64, config: &StrategyConfig) -> Decision {
    let action = if rsi < config.rsi_oversold {
        Action::Buy
    } else if rsi > config.rsi_overbought {
        Action::Sell
    } else if price > ema {
        Action::Buy
    } else {
        Action::Sell
    };

    Decision {
        policy: Policy::Simple,
        action,
        reason: format!(
            "RSI {:.2} and LTP {:.2} vs EMA {:.2} suggest {}.",
            rsi, price, ema, action
        ),
        confidence: Confidence::Medium,
    }
}
