// Trading strategy module
//
// Two decision policies coexist: the multi-timeframe confluence policy
// (TRADE/WAIT/AVOID) and the single-timeframe simple policy (BUY/SELL).
pub mod config;
pub mod confluence;
pub mod simple;
pub mod trend;

pub use config::{StrategyConfig, StrategyOverrides};
pub use confluence::ConfluenceInputs;
pub use trend::{classify, classify_simple};
