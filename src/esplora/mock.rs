use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use super::*;

/// In-memory explorer serving a fixed history in cursor-paged chunks.
#[derive(Default)]
pub struct MockExplorer {
    pub summary: Option<AddressSummary>,
    pub history: Vec<RawTransaction>,
    pub page_size: usize,
    pub utxos: Option<Vec<Utxo>>,
    pub raw_hex: HashMap<String, String>,
    /// Pages requested after this txid fail.
    pub failing_cursor: Option<String>,
    /// Always serve the first page, ignoring the cursor.
    pub stuck: bool,
    /// Summary requests never complete.
    pub hang_summary: bool,
    pub page_calls: AtomicUsize,
}

impl MockExplorer {
    pub fn new(history: Vec<RawTransaction>) -> Self {
        Self {
            history,
            page_size: 25,
            ..Default::default()
        }
    }

    pub fn page_calls(&self) -> usize {
        self.page_calls.load(Ordering::SeqCst)
    }
}

fn unavailable() -> UpstreamError {
    UpstreamError::Status {
        url: "mock://".into(),
        status: 503,
    }
}

#[async_trait]
impl Explorer for MockExplorer {
    async fn address_summary(&self, _address: &str) -> Result<AddressSummary, UpstreamError> {
        if self.hang_summary {
            futures::future::pending::<()>().await;
        }
        self.summary.clone().ok_or_else(unavailable)
    }

    async fn address_txs(
        &self,
        _address: &str,
        after: Option<&str>,
    ) -> Result<Vec<RawTransaction>, UpstreamError> {
        self.page_calls.fetch_add(1, Ordering::SeqCst);
        if after.is_some() && after == self.failing_cursor.as_deref() {
            return Err(unavailable());
        }
        let start = match after {
            Some(cursor) if !self.stuck => match self.history.iter().position(|tx| tx.txid == cursor) {
                Some(pos) => pos + 1,
                None => return Ok(vec![]),
            },
            _ => 0,
        };
        Ok(self
            .history
            .iter()
            .skip(start)
            .take(self.page_size)
            .cloned()
            .collect())
    }

    async fn address_utxos(&self, _address: &str) -> Result<Vec<Utxo>, UpstreamError> {
        self.utxos.clone().ok_or_else(unavailable)
    }

    async fn raw_tx_hex(&self, txid: &str) -> Result<String, UpstreamError> {
        self.raw_hex.get(txid).cloned().ok_or_else(unavailable)
    }
}
