use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Context;

use crate::esplora::Explorer;
use crate::fetch::{fetch_history, FetchPolicy};
use crate::hash160::hash160;
use crate::ledger::{assemble, AddressEnvelope, Window};

/// Everything a request handler needs. Holds no per-request data.
pub struct AppState {
    explorer: Arc<dyn Explorer>,
    policy: FetchPolicy,
}

impl AppState {
    pub fn new(explorer: Arc<dyn Explorer>, policy: FetchPolicy) -> Self {
        Self { explorer, policy }
    }

    /// Gets a reference to the upstream explorer.
    pub fn explorer(&self) -> &dyn Explorer {
        self.explorer.as_ref()
    }

    pub fn policy(&self) -> &FetchPolicy {
        &self.policy
    }

    /// Fetches the address history and renders one window of it in the legacy format.
    pub async fn address_ledger(
        &self,
        address: &str,
        window: Window,
    ) -> anyhow::Result<AddressEnvelope> {
        let history = fetch_history(self.explorer(), address, &self.policy).await;
        log::debug!(
            "{}: {} txs, {} utxos worth {} fetched",
            address,
            history.txs.len(),
            history.utxos.len(),
            history
                .utxos
                .iter()
                .fold(0u64, |acc, utxo| acc.saturating_add(utxo.value))
        );
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .context("system clock is before the unix epoch")?
            .as_secs();
        assemble(address, hash160(address), &history, window, now)
    }
}
