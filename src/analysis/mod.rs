// Analysis orchestration
// fetch -> indicators -> trends -> decision -> risk levels -> session -> record

pub mod report;

pub use report::{AnalysisReport, TimeframeAnalysis};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use tokio::time::{timeout, Duration};
use uuid::Uuid;

use crate::api::{Credentials, MarketDataProvider};
use crate::cache::VolatilityCache;
use crate::db::SignalStore;
use crate::error::AnalysisError;
use crate::indicators::{calculate_ema, indicator_set};
use crate::models::{
    closes, Candle, Decision, IndicatorSet, Instrument, SignalRecord, Timeframe, VolatilityRegime,
    VOLATILITY_INDEX_KEY,
};
use crate::risk::{BracketConfig, RiskLevels};
use crate::session::{SessionClock, SessionWindow};
use crate::strategy::{
    classify, classify_simple, confluence, simple, ConfluenceInputs, StrategyConfig,
    StrategyOverrides,
};

/// Orchestration settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Upper bound for all fetches of one run
    pub request_timeout_secs: u64,
    /// Volatility reading to use when the provider cannot supply one.
    /// Unset means a failed volatility fetch fails the run.
    pub volatility_fallback: Option<f64>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 20,
            volatility_fallback: None,
        }
    }
}

/// Composes data fetching, indicators, strategy, risk and session into one run
pub struct MarketAnalyzer {
    provider: Arc<dyn MarketDataProvider>,
    store: Arc<dyn SignalStore>,
    cache: Option<VolatilityCache>,
    clock: SessionClock,
    strategy: StrategyConfig,
    bracket: BracketConfig,
    config: AnalysisConfig,
}

impl MarketAnalyzer {
    pub fn new(provider: Arc<dyn MarketDataProvider>, store: Arc<dyn SignalStore>) -> Self {
        Self {
            provider,
            store,
            cache: None,
            clock: SessionClock::default(),
            strategy: StrategyConfig::default(),
            bracket: BracketConfig::default(),
            config: AnalysisConfig::default(),
        }
    }

    pub fn with_strategy(mut self, strategy: StrategyConfig) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_clock(mut self, clock: SessionClock) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_bracket(mut self, bracket: BracketConfig) -> Self {
        self.bracket = bracket;
        self
    }

    pub fn with_config(mut self, config: AnalysisConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_cache(mut self, cache: VolatilityCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn clock(&self) -> &SessionClock {
        &self.clock
    }

    /// Multi-timeframe confluence analysis at the current time
    pub async fn analyze(
        &self,
        symbol: &str,
        overrides: &StrategyOverrides,
        credentials: &Credentials,
    ) -> Result<AnalysisReport, AnalysisError> {
        self.analyze_at(symbol, overrides, credentials, Utc::now()).await
    }

    /// Multi-timeframe confluence analysis; `now` only feeds the session window
    pub async fn analyze_at(
        &self,
        symbol: &str,
        overrides: &StrategyOverrides,
        credentials: &Credentials,
        now: DateTime<Utc>,
    ) -> Result<AnalysisReport, AnalysisError> {
        let instrument: Instrument = symbol.parse()?;
        let config = self.strategy.with_overrides(overrides);

        let (fast, fifteen, mid, daily, vix) = self
            .with_timeout(async {
                tokio::try_join!(
                    self.fetch_candles(instrument, Timeframe::FiveMinute, credentials),
                    self.fetch_candles(instrument, Timeframe::FifteenMinute, credentials),
                    self.fetch_candles(instrument, Timeframe::Hourly, credentials),
                    self.fetch_candles(instrument, Timeframe::Daily, credentials),
                    self.volatility(credentials),
                )
            })
            .await?;

        let mut timeframes = BTreeMap::new();
        for (timeframe, candles) in [
            (Timeframe::FiveMinute, &fast),
            (Timeframe::FifteenMinute, &fifteen),
            (Timeframe::Hourly, &mid),
            (Timeframe::Daily, &daily),
        ] {
            let analysis = analyze_timeframe(candles, &config);
            tracing::debug!(
                "{} {}: trend={} ema={:.2} rsi={:.2}",
                instrument,
                timeframe,
                analysis.trend,
                analysis.indicators.ema,
                analysis.indicators.rsi
            );
            timeframes.insert(timeframe, analysis);
        }

        let fast_analysis = &timeframes[&Timeframe::FiveMinute];
        let inputs = ConfluenceInputs {
            daily: timeframes[&Timeframe::Daily].trend,
            mid: timeframes[&Timeframe::Hourly].trend,
            fast: fast_analysis.trend,
            fast_rsi: fast_analysis.indicators.rsi,
            volatility: vix,
        };
        let decision = confluence::evaluate(&inputs, &config);

        let entry = last_close(&fast);
        let indicators = fast_analysis.indicators;

        Ok(self
            .finish(instrument, now, decision, entry, indicators, vix, timeframes)
            .await)
    }

    /// Single-timeframe RSI/EMA analysis at the current time
    pub async fn quick_analyze(
        &self,
        symbol: &str,
        credentials: &Credentials,
    ) -> Result<AnalysisReport, AnalysisError> {
        self.quick_analyze_at(symbol, credentials, Utc::now()).await
    }

    /// Single-timeframe analysis of the live price against mid-timeframe EMA/RSI
    pub async fn quick_analyze_at(
        &self,
        symbol: &str,
        credentials: &Credentials,
        now: DateTime<Utc>,
    ) -> Result<AnalysisReport, AnalysisError> {
        let instrument: Instrument = symbol.parse()?;
        let config = &self.strategy;

        let (ltp, candles, vix) = self
            .with_timeout(async {
                tokio::try_join!(
                    self.provider.last_price(instrument, credentials),
                    self.fetch_candles(instrument, Timeframe::Hourly, credentials),
                    self.volatility(credentials),
                )
            })
            .await?;

        let prices = closes(&candles);
        let indicators = indicator_set(&prices, config.ema_short, config.rsi_period);
        tracing::debug!(
            "{} LTP={:.2} EMA={:.2} RSI={:.2}",
            instrument,
            ltp,
            indicators.ema,
            indicators.rsi
        );

        let decision = simple::evaluate(ltp, indicators.ema, indicators.rsi, config);

        let mut timeframes = BTreeMap::new();
        timeframes.insert(
            Timeframe::Hourly,
            TimeframeAnalysis {
                trend: classify_simple(ltp, indicators.ema),
                indicators,
            },
        );

        Ok(self
            .finish(instrument, now, decision, ltp, indicators, vix, timeframes)
            .await)
    }

    /// Session window right now
    pub fn session(&self) -> SessionWindow {
        self.clock.now()
    }

    /// Recently recorded signals for a symbol
    pub async fn recent_signals(
        &self,
        symbol: &str,
        limit: usize,
    ) -> crate::Result<Vec<SignalRecord>> {
        let instrument: Instrument = symbol.parse()?;
        self.store.recent(instrument.symbol(), limit).await
    }

    /// Risk levels, session window, signal record and report assembly
    #[allow(clippy::too_many_arguments)]
    async fn finish(
        &self,
        instrument: Instrument,
        now: DateTime<Utc>,
        decision: Decision,
        entry: f64,
        indicators: IndicatorSet,
        vix: f64,
        timeframes: BTreeMap<Timeframe, TimeframeAnalysis>,
    ) -> AnalysisReport {
        let levels = RiskLevels::for_action(entry, decision.action, &self.bracket);
        let session = self.clock.window_at(now);

        tracing::info!(
            "{} analysis ({:?}): {} at {:.2}, R:R {}",
            instrument,
            decision.policy,
            decision.action,
            entry,
            levels.risk_reward
        );

        if decision.action.is_directional() {
            self.record_signal(instrument, now, &decision, entry, &levels, indicators)
                .await;
        }

        AnalysisReport {
            symbol: instrument.symbol().to_string(),
            timestamp: now,
            policy: decision.policy,
            session,
            vix,
            environment: VolatilityRegime::classify(vix),
            last_price: entry,
            timeframes,
            final_signal: decision.action,
            reason: decision.reason,
            confidence: decision.confidence,
            risk_reward: levels.risk_reward.clone(),
            levels: levels.formatted(),
        }
    }

    /// Store a signal; failures are logged and never reach the caller
    async fn record_signal(
        &self,
        instrument: Instrument,
        now: DateTime<Utc>,
        decision: &Decision,
        entry: f64,
        levels: &RiskLevels,
        indicators: IndicatorSet,
    ) {
        let record = SignalRecord {
            id: Uuid::new_v4(),
            symbol: instrument.symbol().to_string(),
            timestamp: now,
            signal: decision.action,
            price: entry,
            stop_loss: levels.stop_loss,
            target: levels.target,
            risk_reward_ratio: levels.risk_reward.clone(),
            rsi: indicators.rsi,
            ema: indicators.ema,
            reason: decision.reason.clone(),
            confidence: decision.confidence,
        };

        match self.store.append(&record).await {
            Ok(()) => tracing::info!(
                "Signal saved: {} {} @ {:.2}",
                record.symbol,
                record.signal,
                record.price
            ),
            Err(e) => tracing::error!("Failed to save signal for {}: {}", record.symbol, e),
        }
    }

    async fn with_timeout<T, F>(&self, fut: F) -> Result<T, AnalysisError>
    where
        F: Future<Output = Result<T, AnalysisError>>,
    {
        let limit = Duration::from_secs(self.config.request_timeout_secs.max(1));
        timeout(limit, fut).await.map_err(|_| {
            tracing::warn!("Market data fetch timed out after {:?}", limit);
            AnalysisError::UpstreamUnavailable(format!(
                "market data fetch timed out after {}s",
                limit.as_secs()
            ))
        })?
    }

    async fn fetch_candles(
        &self,
        instrument: Instrument,
        timeframe: Timeframe,
        credentials: &Credentials,
    ) -> Result<Vec<Candle>, AnalysisError> {
        let candles = self
            .provider
            .candles(instrument, timeframe, credentials)
            .await?;
        if candles.is_empty() {
            return Err(AnalysisError::no_data(
                instrument.symbol(),
                format!("{} candles", timeframe),
            ));
        }
        Ok(candles)
    }

    /// Volatility reading, through the cache when one is configured
    async fn volatility(&self, credentials: &Credentials) -> Result<f64, AnalysisError> {
        if let Some(cache) = &self.cache {
            match cache.get(VOLATILITY_INDEX_KEY).await {
                Ok(Some(value)) => return Ok(value),
                Ok(None) => {}
                Err(e) => tracing::warn!("Volatility cache read failed: {}", e),
            }
        }

        match self.provider.volatility_index(credentials).await {
            Ok(value) => {
                if let Some(cache) = &self.cache {
                    if let Err(e) = cache.put(VOLATILITY_INDEX_KEY, value).await {
                        tracing::warn!("Volatility cache write failed: {}", e);
                    }
                }
                Ok(value)
            }
            Err(AnalysisError::NotAuthenticated) => Err(AnalysisError::NotAuthenticated),
            Err(e) => match self.config.volatility_fallback {
                Some(fallback) => {
                    tracing::warn!("Volatility fetch failed ({}), using fallback {}", e, fallback);
                    Ok(fallback)
                }
                None => Err(e),
            },
        }
    }
}

/// Indicators and trend for one timeframe's candles
pub fn analyze_timeframe(candles: &[Candle], config: &StrategyConfig) -> TimeframeAnalysis {
    let prices = closes(candles);
    let price = last_close(candles);
    let indicators = indicator_set(&prices, config.ema_short, config.rsi_period);
    let ema_long = calculate_ema(&prices, config.ema_long);

    TimeframeAnalysis {
        trend: classify(price, indicators.ema, ema_long),
        indicators,
    }
}

fn last_close(candles: &[Candle]) -> f64 {
    candles.last().map(|c| c.close).unwrap_or(0.0)
}
