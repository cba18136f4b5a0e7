use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use tokio::time::{timeout, Duration};

use crate::Result;

/// Short-lived Redis cache for the volatility index reading
///
/// Only a latency optimisation: callers treat every error as a miss.
#[derive(Clone)]
pub struct VolatilityCache {
    conn: ConnectionManager,
    ttl_secs: u64,
}

impl VolatilityCache {
    /// Connect to Redis
    ///
    /// # Arguments
    /// * `redis_url` - Redis connection URL (e.g., "redis://127.0.0.1:6379")
    /// * `ttl_secs` - How long a cached reading stays valid
    pub async fn new(redis_url: &str, ttl_secs: u64) -> Result<Self> {
        let client = Client::open(redis_url)?;

        let conn = timeout(Duration::from_secs(5), ConnectionManager::new(client))
            .await
            .map_err(|_| "Redis connection timeout after 5 seconds")??;

        tracing::info!("Connected to Redis volatility cache at {}", redis_url);

        Ok(Self {
            conn,
            ttl_secs: ttl_secs.max(1),
        })
    }

    fn key(instrument_key: &str) -> String {
        format!("volatility:{}", instrument_key)
    }

    pub async fn get(&self, instrument_key: &str) -> Result<Option<f64>> {
        let mut conn = self.conn.clone();
        let value: Option<f64> = conn.get(Self::key(instrument_key)).await?;
        Ok(value)
    }

    pub async fn put(&self, instrument_key: &str, value: f64) -> Result<()> {
        let mut conn = self.conn.clone();
        conn.set_ex::<_, _, ()>(Self::key(instrument_key), value, self.ttl_secs)
            .await?;
        tracing::debug!("Cached volatility {:.2} for {}s", value, self.ttl_secs);
        Ok(())
    }

    #[cfg(test)]
    pub async fn invalidate(&self, instrument_key: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        conn.del::<_, ()>(Self::key(instrument_key)).await?;
        Ok(())
    }
}
