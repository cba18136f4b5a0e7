use async_trait::async_trait;
use tokio::sync::RwLock;

use super::SignalStore;
use crate::models::SignalRecord;
use crate::Result;

/// In-process signal store, used when no database is configured
#[derive(Debug, Default)]
pub struct MemorySignalStore {
    records: RwLock<Vec<SignalRecord>>,
}

impl MemorySignalStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    pub async fn all(&self) -> Vec<SignalRecord> {
        self.records.read().await.clone()
    }
}

#[async_trait]
impl SignalStore for MemorySignalStore {
    async fn append(&self, record: &SignalRecord) -> Result<()> {
        self.records.write().await.push(record.clone());
        tracing::debug!("Stored {} signal for {} in memory", record.signal, record.symbol);
        Ok(())
    }

    async fn recent(&self, symbol: &str, limit: usize) -> Result<Vec<SignalRecord>> {
        let records = self.records.read().await;
        Ok(records
            .iter()
            .rev()
            .filter(|r| r.symbol == symbol)
            .take(limit)
            .cloned()
            .collect())
    }
}
