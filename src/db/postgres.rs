use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{postgres::PgPoolOptions, PgPool, Row};
use uuid::Uuid;

use super::SignalStore;
use crate::models::{Action, Confidence, SignalRecord};
use crate::Result;

/// Postgres persistence for produced signals
pub struct PostgresSignalStore {
    pool: PgPool,
}

impl PostgresSignalStore {
    /// Connect to Postgres and run migrations
    ///
    /// # Arguments
    /// * `database_url` - Postgres connection URL
    /// * `max_connections` - Pool size
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect(database_url)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        tracing::info!("Connected to Postgres signal store");

        Ok(Self { pool })
    }

    /// Delete every signal for a symbol (testing only)
    #[cfg(test)]
    pub async fn clear_symbol(&self, symbol: &str) -> Result<()> {
        sqlx::query("DELETE FROM signals WHERE symbol = $1")
            .bind(symbol)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

#[async_trait]
impl SignalStore for PostgresSignalStore {
    async fn append(&self, record: &SignalRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO signals (
                id, symbol, created_at, signal, price, stop_loss, target,
                risk_reward_ratio, rsi, ema, reason, confidence
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(record.id)
        .bind(&record.symbol)
        .bind(record.timestamp)
        .bind(record.signal.as_str())
        .bind(Decimal::try_from(record.price)?)
        .bind(Decimal::try_from(record.stop_loss)?.round_dp(2))
        .bind(Decimal::try_from(record.target)?.round_dp(2))
        .bind(&record.risk_reward_ratio)
        .bind(record.rsi)
        .bind(record.ema)
        .bind(&record.reason)
        .bind(record.confidence.as_str())
        .execute(&self.pool)
        .await?;

        tracing::debug!(
            "Saved {} signal {} for {} to Postgres",
            record.signal,
            record.id,
            record.symbol
        );

        Ok(())
    }

    async fn recent(&self, symbol: &str, limit: usize) -> Result<Vec<SignalRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT id, symbol, created_at, signal, price, stop_loss, target,
                   risk_reward_ratio, rsi, ema, reason, confidence
            FROM signals
            WHERE symbol = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(symbol)
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await?;

        let mut records = Vec::with_capacity(rows.len());

        for row in rows {
            let id: Uuid = row.get("id");
            let symbol: String = row.get("symbol");
            let timestamp: DateTime<Utc> = row.get("created_at");
            let signal_str: String = row.get("signal");
            let price: Decimal = row.get("price");
            let stop_loss: Decimal = row.get("stop_loss");
            let target: Decimal = row.get("target");
            let risk_reward_ratio: String = row.get("risk_reward_ratio");
            let rsi: f64 = row.get("rsi");
            let ema: f64 = row.get("ema");
            let reason: String = row.get("reason");
            let confidence_str: String = row.get("confidence");

            let signal = match signal_str.as_str() {
                "TRADE" => Action::Trade,
                "BUY" => Action::Buy,
                "SELL" => Action::Sell,
                "WAIT" => Action::Wait,
                "AVOID" => Action::Avoid,
                "HOLD" => Action::Hold,
                _ => return Err(format!("Invalid signal: {}", signal_str).into()),
            };

            let confidence = match confidence_str.as_str() {
                "LOW" => Confidence::Low,
                "MEDIUM" => Confidence::Medium,
                "HIGH" => Confidence::High,
                _ => return Err(format!("Invalid confidence: {}", confidence_str).into()),
            };

            records.push(SignalRecord {
                id,
                symbol,
                timestamp,
                signal,
                price: price.to_string().parse()?,
                stop_loss: stop_loss.to_string().parse()?,
                target: target.to_string().parse()?,
                risk_reward_ratio,
                rsi,
                ema,
                reason,
                confidence,
            });
        }

        Ok(records)
    }
}
