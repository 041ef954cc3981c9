//! Reshapes an explorer's view of an address into the legacy ledger format.

mod assemble;
mod balance;
mod index;
mod spends;
mod witness;

#[cfg(test)]
pub(crate) mod fixtures;

pub use assemble::*;
pub use balance::Ledger;
pub use index::assign_index;
pub use spends::{SpendGraph, SpendingOutpoint};
pub use witness::serialize_witness;

/// A reference to one output of one transaction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Outpoint {
    pub txid: String,
    pub vout: u32,
}

impl Outpoint {
    pub fn new(txid: &str, vout: u32) -> Self {
        Self {
            txid: txid.to_owned(),
            vout,
        }
    }
}
