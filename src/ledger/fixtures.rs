//! Builders for synthetic address histories.

use crate::esplora::{Prevout, RawInput, RawOutput, RawTransaction, TxStatus, Utxo};

pub const ME: &str = "bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t4";
pub const THEM: &str = "1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa";

pub fn coinbase_input() -> RawInput {
    RawInput {
        txid: None,
        vout: u32::MAX,
        sequence: u32::MAX,
        is_coinbase: false,
        scriptsig: Some("03640000".into()),
        witness: None,
        prevout: None,
    }
}

pub fn spend(txid: &str, vout: u32, value: u64, owner: &str) -> RawInput {
    RawInput {
        txid: Some(txid.into()),
        vout,
        sequence: 0xffff_fffd,
        is_coinbase: false,
        scriptsig: None,
        witness: Some(vec!["AQID".into()]),
        prevout: Some(Prevout {
            value,
            scriptpubkey: format!("0014{}", owner.len()),
            scriptpubkey_address: Some(owner.into()),
        }),
    }
}

pub fn pay(value: u64, owner: &str) -> RawOutput {
    RawOutput {
        value,
        scriptpubkey: format!("0014{}", owner.len()),
        scriptpubkey_address: Some(owner.into()),
    }
}

pub fn tx(txid: &str, height: Option<u64>, vin: Vec<RawInput>, vout: Vec<RawOutput>) -> RawTransaction {
    RawTransaction {
        txid: txid.into(),
        version: 2,
        locktime: 0,
        size: 200,
        weight: Some(800),
        fee: Some(0),
        vin,
        vout,
        status: TxStatus {
            confirmed: height.is_some(),
            block_height: height,
            block_time: height.map(|h| 1_600_000_000 + h * 600),
        },
    }
}

pub fn utxo(txid: &str, vout: u32, value: u64) -> Utxo {
    Utxo {
        txid: txid.into(),
        vout,
        value,
    }
}

/// Coinbase paying 5000 to `ME` at height 100, then a spend of it at 101
/// sending 3000 to `THEM` and 2000 back to `ME`. Newest first, as explorers list them.
pub fn coinbase_then_spend() -> Vec<RawTransaction> {
    let coinbase = tx("aa".repeat(32).as_str(), Some(100), vec![coinbase_input()], vec![pay(5000, ME)]);
    let spender = tx(
        "bb".repeat(32).as_str(),
        Some(101),
        vec![spend(&coinbase.txid, 0, 5000, ME)],
        vec![pay(3000, THEM), pay(2000, ME)],
    );
    vec![spender, coinbase]
}
