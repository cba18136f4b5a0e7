// Core modules
pub mod analysis;
pub mod api;
pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod indicators;
pub mod models;
pub mod risk;
pub mod server;
pub mod session;
pub mod strategy;

// Re-export commonly used types
pub use analysis::{AnalysisConfig, AnalysisReport, MarketAnalyzer};
pub use api::{Credentials, MarketDataProvider};
pub use error::AnalysisError;
pub use models::*;

// Error handling
pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;
