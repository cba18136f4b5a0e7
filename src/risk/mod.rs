// Risk management module
pub mod reward;

pub use reward::{risk_reward_ratio, BracketConfig, FormattedLevels, RiskLevels};
