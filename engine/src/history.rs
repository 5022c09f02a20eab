//! Process-lifetime ledger of benchmark results
//!
//! Append-only: entries are never updated, merged or removed, and their order
//! is the order in which `record` calls acquired the writer lock.

use tokio::sync::RwLock;

use crate::OptimizationResult;

#[derive(Debug, Default)]
pub struct HistoryLedger {
    entries: RwLock<Vec<OptimizationResult>>,
}

impl HistoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a result; returns its position in the ledger
    pub async fn record(&self, result: OptimizationResult) -> usize {
        let mut entries = self.entries.write().await;
        entries.push(result);
        entries.len() - 1
    }

    /// Point-in-time snapshot in recording order
    pub async fn all(&self) -> Vec<OptimizationResult> {
        self.entries.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}
