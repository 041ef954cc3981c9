use std::collections::HashMap;

use serde::Serialize;

use super::{assign_index, Outpoint};
use crate::esplora::RawTransaction;

/// One input that consumes an output, in the legacy `spending_outpoints` shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SpendingOutpoint {
    /// Pseudo-index of the spending transaction.
    pub tx_index: u64,
    /// Position of the spending input inside that transaction.
    pub n: u32,
}

/// Which inputs, among the fetched history, consume which outputs.
#[derive(Debug, Default)]
pub struct SpendGraph {
    spends: HashMap<Outpoint, Vec<SpendingOutpoint>>,
}

impl SpendGraph {
    /// Scans every input of every transaction. Only as complete as `txs`.
    pub fn build(txs: &[RawTransaction]) -> Self {
        let mut spends: HashMap<Outpoint, Vec<SpendingOutpoint>> = HashMap::new();
        for tx in txs {
            let tx_index = assign_index(&tx.txid, tx.height().unwrap_or_default());
            for (n, input) in tx.vin.iter().enumerate() {
                let prev_txid = match input.previous_txid() {
                    Some(txid) => txid,
                    None => continue,
                };
                spends
                    .entry(Outpoint::new(prev_txid, input.vout))
                    .or_default()
                    .push(SpendingOutpoint {
                        tx_index,
                        n: n as u32,
                    });
            }
        }
        Self { spends }
    }

    /// Spends recorded for an outpoint, empty if none was seen.
    pub fn spends_of(&self, outpoint: &Outpoint) -> &[SpendingOutpoint] {
        self.spends
            .get(outpoint)
            .map(|v| v.as_slice())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.spends.len()
    }
}
