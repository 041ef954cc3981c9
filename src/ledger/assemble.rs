use std::collections::{BTreeMap, HashMap, HashSet};

use anyhow::Context;
use serde::Serialize;

use super::{assign_index, serialize_witness, Ledger, Outpoint, SpendGraph, SpendingOutpoint};
use crate::esplora::{AddressSummary, RawInput, RawTransaction, Utxo};

/// Everything fetched about one address for one request.
#[derive(Debug, Clone, Default)]
pub struct AddressHistory {
    pub summary: AddressSummary,
    /// Explorer order, newest first.
    pub txs: Vec<RawTransaction>,
    pub utxos: Vec<Utxo>,
}

/// An offset/limit page over the transaction list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub offset: usize,
    pub limit: usize,
}

impl Default for Window {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 50,
        }
    }
}

impl Window {
    /// Reads `offset` and `limit` from query parameters, falling back to the defaults for anything
    /// missing or not a non-negative integer.
    pub fn from_query(query: &BTreeMap<String, String>) -> Self {
        let default = Self::default();
        let parse = |key: &str, fallback: usize| {
            query
                .get(key)
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(fallback)
        };
        Self {
            offset: parse("offset", default.offset),
            limit: parse("limit", default.limit),
        }
    }

    fn apply<I: Iterator>(&self, items: I) -> impl Iterator<Item = I::Item> {
        items.skip(self.offset).take(self.limit)
    }
}

/// The legacy `/address` response body.
#[derive(Debug, Clone, Serialize)]
pub struct AddressEnvelope {
    pub hash160: String,
    pub address: String,
    pub n_tx: u64,
    pub n_unredeemed: usize,
    pub total_received: u64,
    pub total_sent: u64,
    pub final_balance: i64,
    pub txs: Vec<TxRecord>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TxRecord {
    pub hash: String,
    pub ver: u32,
    pub vin_sz: usize,
    pub vout_sz: usize,
    pub size: u64,
    pub weight: u64,
    pub fee: u64,
    pub relayed_by: &'static str,
    pub lock_time: u32,
    pub tx_index: u64,
    pub double_spend: bool,
    pub time: u64,
    pub block_index: Option<u64>,
    pub block_height: Option<u64>,
    pub inputs: Vec<InputRecord>,
    pub out: Vec<OutputRecord>,
    pub result: i64,
    pub balance: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct InputRecord {
    pub sequence: u32,
    pub witness: String,
    pub script: String,
    pub index: u32,
    pub prev_out: OutputRecord,
}

/// An output, either of the transaction itself or the one an input consumes.
#[derive(Debug, Clone, Serialize)]
pub struct OutputRecord {
    #[serde(rename = "type")]
    pub kind: u8,
    pub spent: bool,
    pub value: u64,
    pub spending_outpoints: Vec<SpendingOutpoint>,
    pub n: u32,
    pub tx_index: u64,
    pub script: String,
    pub addr: String,
}

/// Builds the response envelope for `address`.
///
/// Spend graph and balances are computed over the whole history; only record formatting is
/// restricted to `window`. `now` stands in for the time of unconfirmed transactions.
pub fn assemble(
    address: &str,
    hash160: String,
    history: &AddressHistory,
    window: Window,
    now: u64,
) -> anyhow::Result<AddressEnvelope> {
    let assembler = Assembler::new(address, history, now)?;
    let txs = window
        .apply(history.txs.iter())
        .map(|tx| assembler.tx_record(tx))
        .collect();

    let chain = history.summary.chain_stats;
    let final_balance = i64::try_from(chain.funded_txo_sum)
        .ok()
        .zip(i64::try_from(chain.spent_txo_sum).ok())
        .and_then(|(funded, spent)| funded.checked_sub(spent))
        .context("address totals out of range")?;
    if assembler.ledger.final_balance() != final_balance {
        log::debug!(
            "{}: ledger ends at {} but explorer reports {}",
            address,
            assembler.ledger.final_balance(),
            final_balance
        );
    }

    Ok(AddressEnvelope {
        hash160,
        address: address.to_owned(),
        n_tx: chain.tx_count,
        n_unredeemed: history.utxos.len(),
        total_received: chain.funded_txo_sum,
        total_sent: chain.spent_txo_sum,
        final_balance,
        txs,
    })
}

struct Assembler<'a> {
    graph: SpendGraph,
    ledger: Ledger,
    unspent: HashSet<Outpoint>,
    heights: HashMap<&'a str, u64>,
    now: u64,
}

impl<'a> Assembler<'a> {
    fn new(address: &str, history: &'a AddressHistory, now: u64) -> anyhow::Result<Self> {
        let graph = SpendGraph::build(&history.txs);
        log::trace!("{}: {} outpoints spent within history", address, graph.len());
        Ok(Self {
            graph,
            ledger: Ledger::build(&history.txs, address)?,
            unspent: history
                .utxos
                .iter()
                .map(|utxo| Outpoint::new(&utxo.txid, utxo.vout))
                .collect(),
            heights: history
                .txs
                .iter()
                .map(|tx| (tx.txid.as_str(), tx.height().unwrap_or_default()))
                .collect(),
            now,
        })
    }

    fn tx_record(&self, tx: &RawTransaction) -> TxRecord {
        let tx_index = assign_index(&tx.txid, tx.height().unwrap_or_default());
        let entry = self.ledger.entry(&tx.txid);
        TxRecord {
            hash: tx.txid.clone(),
            ver: tx.version,
            vin_sz: tx.vin.len(),
            vout_sz: tx.vout.len(),
            size: tx.size,
            weight: tx.weight.unwrap_or_default(),
            fee: tx.fee.unwrap_or_default(),
            relayed_by: "0.0.0.0",
            lock_time: tx.locktime,
            tx_index,
            double_spend: false,
            time: tx.status.block_time.unwrap_or(self.now),
            block_index: tx.height(),
            block_height: tx.height(),
            inputs: tx.vin.iter().map(|input| self.input_record(input)).collect(),
            out: tx
                .vout
                .iter()
                .enumerate()
                .map(|(n, out)| {
                    let n = n as u32;
                    let outpoint = Outpoint::new(&tx.txid, n);
                    let spent = !self.unspent.contains(&outpoint);
                    OutputRecord {
                        kind: 0,
                        spent,
                        value: out.value,
                        spending_outpoints: if spent {
                            self.graph.spends_of(&outpoint).to_vec()
                        } else {
                            vec![]
                        },
                        n,
                        tx_index,
                        script: out.scriptpubkey.clone(),
                        addr: out.scriptpubkey_address.clone().unwrap_or_default(),
                    }
                })
                .collect(),
            result: entry.result,
            balance: entry.balance,
        }
    }

    fn input_record(&self, input: &RawInput) -> InputRecord {
        let (tx_index, spending_outpoints) = match input.previous_txid() {
            Some(prev_txid) => {
                // the funding tx may be outside the fetched history
                let height = self.heights.get(prev_txid).copied().unwrap_or_default();
                let spends = self.graph.spends_of(&Outpoint::new(prev_txid, input.vout));
                (assign_index(prev_txid, height), spends.to_vec())
            }
            None => (0, vec![]),
        };
        let prevout = input.prevout.as_ref();
        InputRecord {
            sequence: input.sequence,
            witness: input
                .witness
                .as_deref()
                .map(serialize_witness)
                .unwrap_or_default(),
            script: input.scriptsig.clone().unwrap_or_default(),
            index: input.vout,
            prev_out: OutputRecord {
                kind: 0,
                spent: true,
                value: prevout.map(|p| p.value).unwrap_or_default(),
                spending_outpoints,
                n: input.vout,
                tx_index,
                script: prevout.map(|p| p.scriptpubkey.clone()).unwrap_or_default(),
                addr: prevout
                    .and_then(|p| p.scriptpubkey_address.clone())
                    .unwrap_or_default(),
            },
        }
    }
}
