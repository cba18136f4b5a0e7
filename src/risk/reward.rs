use serde::{Deserialize, Serialize};

use crate::models::{Action, Direction};

/// Fixed-percentage bracket around the entry price.
///
/// This is a flat percentage bracket, not ATR-derived.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BracketConfig {
    pub stop_loss_pct: f64,
    pub target_pct: f64,
}

impl Default for BracketConfig {
    fn default() -> Self {
        Self {
            stop_loss_pct: 0.005, // 0.5% stop
            target_pct: 0.01,     // 1.0% target
        }
    }
}

/// Stop-loss/target pair and the formatted reward:risk ratio
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskLevels {
    pub stop_loss: f64,
    pub target: f64,
    pub risk_reward: String,
}

impl RiskLevels {
    /// Levels for an action: directional actions get a bracket, everything else zeros.
    pub fn for_action(entry: f64, action: Action, bracket: &BracketConfig) -> Self {
        let (stop_loss, target) = match action.direction() {
            Some(Direction::Long) => (
                entry * (1.0 - bracket.stop_loss_pct),
                entry * (1.0 + bracket.target_pct),
            ),
            Some(Direction::Short) => (
                entry * (1.0 + bracket.stop_loss_pct),
                entry * (1.0 - bracket.target_pct),
            ),
            None => (0.0, 0.0),
        };

        Self {
            stop_loss,
            target,
            risk_reward: risk_reward_ratio(entry, stop_loss, target),
        }
    }

    /// Levels as two-decimal strings, the way they are reported
    pub fn formatted(&self) -> FormattedLevels {
        FormattedLevels {
            stop_loss: format!("{:.2}", self.stop_loss),
            target: format!("{:.2}", self.target),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormattedLevels {
    pub stop_loss: String,
    pub target: String,
}

/// Format reward:risk as `1:<reward/risk>`.
///
/// Returns `N/A` when any level is unset (zero) and `0:0` when there is no risk.
pub fn risk_reward_ratio(entry: f64, stop_loss: f64, target: f64) -> String {
    if entry == 0.0 || stop_loss == 0.0 || target == 0.0 {
        return "N/A".to_string();
    }

    let risk = (entry - stop_loss).abs();
    let reward = (target - entry).abs();
    if risk == 0.0 {
        return "0:0".to_string();
    }

    format!("1:{:.2}", reward / risk)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buy_bracket() {
        let levels = RiskLevels::for_action(100.0, Action::Buy, &BracketConfig::default());
        assert!((levels.stop_loss - 99.5).abs() < 1e-9);
        assert!((levels.target - 101.0).abs() < 1e-9);
        assert_eq!(levels.risk_reward, "1:2.00");
    }

    #[test]
    fn test_trade_uses_long_bracket() {
        let trade = RiskLevels::for_action(100.0, Action::Trade, &BracketConfig::default());
        let buy = RiskLevels::for_action(100.0, Action::Buy, &BracketConfig::default());
        assert_eq!(trade, buy);
    }

    #[test]
    fn test_sell_bracket() {
        let levels = RiskLevels::for_action(100.0, Action::Sell, &BracketConfig::default());
        assert!((levels.stop_loss - 100.5).abs() < 1e-9);
        assert!((levels.target - 99.0).abs() < 1e-9);
        assert_eq!(levels.risk_reward, "1:2.00");
        assert_eq!(levels.formatted().stop_loss, "100.50");
        assert_eq!(levels.formatted().target, "99.00");
    }

    #[test]
    fn test_non_directional_has_no_levels() {
        for action in [Action::Wait, Action::Avoid, Action::Hold] {
            let levels = RiskLevels::for_action(100.0, action, &BracketConfig::default());
            assert_eq!(levels.stop_loss, 0.0);
            assert_eq!(levels.target, 0.0);
            assert_eq!(levels.risk_reward, "N/A");
            assert_eq!(levels.formatted().stop_loss, "0.00");
        }
    }

    #[test]
    fn test_ratio_exact_values() {
        assert_eq!(risk_reward_ratio(100.0, 99.5, 101.0), "1:2.00");
        assert_eq!(risk_reward_ratio(100.0, 98.0, 103.0), "1:1.50");
        assert_eq!(risk_reward_ratio(100.0, 100.0, 101.0), "0:0");
        assert_eq!(risk_reward_ratio(0.0, 99.0, 101.0), "N/A");
    }
}
