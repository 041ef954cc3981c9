use serde::{Deserialize, Serialize};

/// A transaction as the explorer reports it, with inputs carrying their prevouts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawTransaction {
    pub txid: String,
    pub version: u32,
    pub locktime: u32,
    pub size: u64,
    #[serde(default)]
    pub weight: Option<u64>,
    #[serde(default)]
    pub fee: Option<u64>,
    pub vin: Vec<RawInput>,
    pub vout: Vec<RawOutput>,
    pub status: TxStatus,
}

impl RawTransaction {
    /// Height used for ordering and indexing. Unconfirmed transactions have none.
    pub fn height(&self) -> Option<u64> {
        self.status.block_height.filter(|_| self.status.confirmed)
    }

    /// A transaction is coinbase if any of its inputs does not reference a previous output.
    pub fn is_coinbase(&self) -> bool {
        self.vin.iter().any(|input| input.previous_txid().is_none())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawInput {
    #[serde(default)]
    pub txid: Option<String>,
    pub vout: u32,
    pub sequence: u32,
    #[serde(default)]
    pub is_coinbase: bool,
    #[serde(default)]
    pub scriptsig: Option<String>,
    #[serde(default)]
    pub witness: Option<Vec<String>>,
    #[serde(default)]
    pub prevout: Option<Prevout>,
}

impl RawInput {
    /// The txid this input spends from, or None for coinbase inputs.
    pub fn previous_txid(&self) -> Option<&str> {
        if self.is_coinbase {
            return None;
        }
        self.txid.as_deref()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prevout {
    pub value: u64,
    pub scriptpubkey: String,
    #[serde(default)]
    pub scriptpubkey_address: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawOutput {
    pub value: u64,
    pub scriptpubkey: String,
    #[serde(default)]
    pub scriptpubkey_address: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TxStatus {
    pub confirmed: bool,
    #[serde(default)]
    pub block_height: Option<u64>,
    #[serde(default)]
    pub block_time: Option<u64>,
}

/// Funded/spent totals for one side (chain or mempool) of an address.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxoStats {
    pub tx_count: u64,
    pub funded_txo_sum: u64,
    pub spent_txo_sum: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressSummary {
    #[serde(default)]
    pub chain_stats: TxoStats,
    #[serde(default)]
    pub mempool_stats: TxoStats,
}

impl AddressSummary {
    /// Total number of transactions touching the address, confirmed or not.
    pub fn total_tx_count(&self) -> u64 {
        self.chain_stats
            .tx_count
            .saturating_add(self.mempool_stats.tx_count)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Utxo {
    pub txid: String,
    pub vout: u32,
    pub value: u64,
}
