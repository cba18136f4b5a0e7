use ::config::builder::DefaultState;
use ::config::{Config, ConfigBuilder, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};

use crate::analysis::AnalysisConfig;
use crate::api::UpstoxConfig;
use crate::session::SessionCalendar;
use crate::strategy::StrategyConfig;
use crate::Result;

const DEFAULT_CONFIG_FILE: &str = "indexbot.toml";
const CONFIG_PATH_VAR: &str = "INDEXBOT_CONFIG";
const ENV_PREFIX: &str = "INDEXBOT";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:5000".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Postgres URL; signals are kept in memory when unset
    pub url: Option<String>,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RedisConfig {
    /// Redis URL; the volatility reading is not cached when unset
    pub url: Option<String>,
    pub volatility_ttl_secs: u64,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: None,
            volatility_ttl_secs: 60,
        }
    }
}

/// Application settings
///
/// Layered, later wins:
/// 1. built-in defaults
/// 2. `indexbot.toml` (or the file named by `INDEXBOT_CONFIG`)
/// 3. `INDEXBOT__SECTION__KEY` environment variables
/// 4. `UPSTOX_ACCESS_TOKEN`, `DATABASE_URL` and `REDIS_URL`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerConfig,
    pub upstox: UpstoxConfig,
    pub analysis: AnalysisConfig,
    pub strategy: StrategyConfig,
    pub session: SessionCalendar,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
}

impl Settings {
    /// Load settings from the config file and the process environment
    pub fn load() -> Result<Self> {
        let path = std::env::var(CONFIG_PATH_VAR).ok();
        let required = path.is_some();
        let path = path.unwrap_or_else(|| DEFAULT_CONFIG_FILE.to_string());

        let builder = Config::builder()
            .add_source(File::with_name(&path).required(required))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            );

        let mut settings = Self::build(builder)?;
        settings.apply_env_overrides(|key| std::env::var(key).ok());

        tracing::debug!("Loaded settings (config file: {})", path);
        Ok(settings)
    }

    /// Parse settings from TOML text on top of the defaults
    pub fn from_toml(toml: &str) -> Result<Self> {
        Self::build(Config::builder().add_source(File::from_str(toml, FileFormat::Toml)))
    }

    fn build(builder: ConfigBuilder<DefaultState>) -> Result<Self> {
        let settings: Settings = builder.build()?.try_deserialize()?;
        Ok(settings)
    }

    /// Conventional unprefixed variables take precedence over everything else
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(token) = non_empty("UPSTOX_ACCESS_TOKEN") {
            self.upstox.access_token = Some(token);
        }
        if let Some(url) = non_empty("DATABASE_URL") {
            self.database.url = Some(url);
        }
        if let Some(url) = non_empty("REDIS_URL") {
            self.redis.url = Some(url);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let settings = Settings::from_toml("").unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.server.bind, "0.0.0.0:5000");
        assert_eq!(settings.strategy.volatility_threshold, 15.0);
        assert_eq!(settings.redis.volatility_ttl_secs, 60);
        assert_eq!(settings.analysis.volatility_fallback, None);
        assert_eq!(settings.session.utc_offset_minutes, 330);
    }

    #[test]
    fn test_file_values_override_defaults() {
        let settings = Settings::from_toml(
            r#"
            [server]
            bind = "127.0.0.1:8080"

            [strategy]
            rsi_threshold = 65.0
            ema_short = 9

            [analysis]
            volatility_fallback = 15.0

            [session]
            open = "09:00:00"
            holidays = ["2024-08-15"]
            "#,
        )
        .unwrap();

        assert_eq!(settings.server.bind, "127.0.0.1:8080");
        assert_eq!(settings.strategy.rsi_threshold, 65.0);
        assert_eq!(settings.strategy.ema_short, 9);
        assert_eq!(settings.strategy.ema_long, 50);
        assert_eq!(settings.analysis.volatility_fallback, Some(15.0));
        assert_eq!(settings.session.open, NaiveTime::from_hms_opt(9, 0, 0).unwrap());
        assert_eq!(settings.session.holidays.len(), 1);
    }

    #[test]
    fn test_env_overrides_win() {
        let env: HashMap<&str, &str> = [
            ("UPSTOX_ACCESS_TOKEN", "token-123"),
            ("DATABASE_URL", "postgres://localhost/indexbot"),
            ("REDIS_URL", "  "),
        ]
        .into_iter()
        .collect();

        let mut settings = Settings::from_toml(
            r#"
            [redis]
            url = "redis://cache:6379"
            "#,
        )
        .unwrap();
        settings.apply_env_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(settings.upstox.access_token.as_deref(), Some("token-123"));
        assert_eq!(
            settings.database.url.as_deref(),
            Some("postgres://localhost/indexbot")
        );
        // Blank values are ignored
        assert_eq!(settings.redis.url.as_deref(), Some("redis://cache:6379"));
    }
}
