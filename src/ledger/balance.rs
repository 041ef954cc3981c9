use std::collections::HashMap;

use anyhow::Context;

use crate::esplora::RawTransaction;

/// Effect of one transaction on the address, and the balance right after it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LedgerEntry {
    pub result: i64,
    pub balance: i64,
}

/// Per-txid balance entries computed in chronological order.
#[derive(Debug, Default)]
pub struct Ledger {
    entries: HashMap<String, LedgerEntry>,
    final_balance: i64,
}

impl Ledger {
    /// Walks `txs` oldest first and accumulates the address balance.
    ///
    /// Confirmed transactions come first by height, then unconfirmed ones. Ties are broken by
    /// block time (missing last), then by position in `txs`.
    pub fn build(txs: &[RawTransaction], address: &str) -> anyhow::Result<Self> {
        let mut chronological: Vec<&RawTransaction> = txs.iter().collect();
        chronological.sort_by_key(|tx| {
            (
                tx.height().unwrap_or(u64::MAX),
                tx.status.block_time.unwrap_or(u64::MAX),
            )
        });

        let mut entries = HashMap::with_capacity(txs.len());
        let mut balance: i64 = 0;
        for tx in chronological {
            let result = net_effect(tx, address)
                .with_context(|| format!("cannot compute net effect of {}", tx.txid))?;
            balance = balance
                .checked_add(result)
                .with_context(|| format!("balance overflow at {}", tx.txid))?;
            entries.insert(tx.txid.clone(), LedgerEntry { result, balance });
        }
        Ok(Self {
            entries,
            final_balance: balance,
        })
    }

    /// Entry for a txid; transactions outside the ledger read as zero.
    pub fn entry(&self, txid: &str) -> LedgerEntry {
        self.entries.get(txid).copied().unwrap_or_default()
    }

    /// Balance after the newest transaction.
    pub fn final_balance(&self) -> i64 {
        self.final_balance
    }
}

fn net_effect(tx: &RawTransaction, address: &str) -> anyhow::Result<i64> {
    let received = sum(
        tx.vout
            .iter()
            .filter(|out| out.scriptpubkey_address.as_deref() == Some(address))
            .map(|out| out.value),
    )?;
    let sent = sum(
        tx.vin
            .iter()
            .filter_map(|input| input.prevout.as_ref())
            .filter(|prevout| prevout.scriptpubkey_address.as_deref() == Some(address))
            .map(|prevout| prevout.value),
    )?;

    // an address on both sides nets out; this also folds change into the spend
    let result = if tx.is_coinbase() {
        received
    } else if received > 0 && sent > 0 {
        received - sent
    } else if sent > 0 {
        -sent
    } else {
        received
    };
    Ok(result)
}

fn sum(mut values: impl Iterator<Item = u64>) -> anyhow::Result<i64> {
    values.try_fold(0i64, |acc, value| {
        let value = i64::try_from(value).context("amount does not fit in i64")?;
        acc.checked_add(value).context("amount sum overflow")
    })
}
