use std::collections::HashSet;
use std::future::Future;
use std::time::Duration;

use smol_timeout::TimeoutExt;

use crate::esplora::{Explorer, RawTransaction, UpstreamError};
use crate::ledger::AddressHistory;

const ATTEMPTS: usize = 2;

/// Limits applied to upstream calls while gathering an address history.
#[derive(Debug, Clone, Copy)]
pub struct FetchPolicy {
    /// Deadline for a single upstream call.
    pub timeout: Duration,
    /// Upper bound on history pages requested per address.
    pub max_pages: usize,
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            max_pages: 200,
        }
    }
}

/// Gathers summary, history and UTXOs for an address.
///
/// Never fails: a failed summary reads as zeroes, failed UTXOs as an empty set, and a failed history
/// page ends the history at the pages fetched so far.
pub async fn fetch_history(
    explorer: &dyn Explorer,
    address: &str,
    policy: &FetchPolicy,
) -> AddressHistory {
    let summary_and_txs = async {
        let summary = match with_retry(policy, || explorer.address_summary(address)).await {
            Ok(summary) => Some(summary),
            Err(err) => {
                log::warn!("summary of {} unavailable: {}", address, err);
                None
            }
        };
        let known_total = summary.as_ref().map(|s| s.total_tx_count());
        let txs = fetch_txs(explorer, address, known_total, policy).await;
        (summary.unwrap_or_default(), txs)
    };
    let utxos = async {
        match with_retry(policy, || explorer.address_utxos(address)).await {
            Ok(utxos) => utxos,
            Err(err) => {
                log::warn!("utxos of {} unavailable: {}", address, err);
                vec![]
            }
        }
    };
    let ((summary, txs), utxos) = futures::join!(summary_and_txs, utxos);
    AddressHistory {
        summary,
        txs,
        utxos,
    }
}

/// Follows the "after txid" cursor until the history is exhausted.
async fn fetch_txs(
    explorer: &dyn Explorer,
    address: &str,
    known_total: Option<u64>,
    policy: &FetchPolicy,
) -> Vec<RawTransaction> {
    let mut txs: Vec<RawTransaction> = Vec::new();
    let mut seen = HashSet::new();
    let mut cursor: Option<String> = None;
    if known_total == Some(0) {
        return txs;
    }
    for page_no in 0..policy.max_pages {
        let fetched = with_retry(policy, || explorer.address_txs(address, cursor.as_deref())).await;
        let page = match fetched {
            Ok(page) => page,
            Err(err) => {
                log::warn!(
                    "history of {} truncated at page {}: {}",
                    address,
                    page_no,
                    err
                );
                return txs;
            }
        };
        let last = match page.last() {
            Some(tx) => tx.txid.clone(),
            None => return txs,
        };
        let before = txs.len();
        txs.extend(page.into_iter().filter(|tx| seen.insert(tx.txid.clone())));
        log::debug!(
            "{}: page {} added {} txs ({} total)",
            address,
            page_no,
            txs.len() - before,
            txs.len()
        );
        if txs.len() == before {
            log::warn!("history of {} stopped advancing after {}", address, last);
            return txs;
        }
        if known_total.map_or(false, |total| txs.len() as u64 >= total) {
            return txs;
        }
        cursor = Some(last);
    }
    log::warn!(
        "history of {} cut at {} pages ({} txs)",
        address,
        policy.max_pages,
        txs.len()
    );
    txs
}

/// Runs an upstream call under the policy deadline, retrying once on transient failures.
pub(crate) async fn with_retry<T, F, Fut>(
    policy: &FetchPolicy,
    mut call: F,
) -> Result<T, UpstreamError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, UpstreamError>>,
{
    let mut attempt = 1;
    loop {
        let result = call()
            .timeout(policy.timeout)
            .await
            .unwrap_or(Err(UpstreamError::Timeout));
        match result {
            Err(err) if attempt < ATTEMPTS && err.is_transient() => {
                log::debug!("retrying upstream call after: {}", err);
                attempt += 1;
            }
            result => return result,
        }
    }
}
