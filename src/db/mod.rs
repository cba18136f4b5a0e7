pub mod memory;
pub mod postgres;

pub use memory::MemorySignalStore;
pub use postgres::PostgresSignalStore;

use async_trait::async_trait;

use crate::models::SignalRecord;
use crate::Result;

/// Append-only sink for produced signals
#[async_trait]
pub trait SignalStore: Send + Sync {
    async fn append(&self, record: &SignalRecord) -> Result<()>;

    /// Most recent signals for a symbol, newest first
    async fn recent(&self, symbol: &str, limit: usize) -> Result<Vec<SignalRecord>>;
}
