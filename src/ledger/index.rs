use sha2::{Digest, Sha256};

/// Spacing between the index ranges of consecutive block heights.
pub const HEIGHT_STRIDE: u64 = 1_000_000_000;
/// Size of the per-txid range inside one height.
pub const TXID_RANGE: u64 = 1_000_000;

/// Derives the legacy `tx_index` for a transaction.
///
/// The low part is a digest of the txid folded into `TXID_RANGE`, the high part is the block height
/// scaled by `HEIGHT_STRIDE`, so indices grow with height while staying stable for a given txid.
/// Unconfirmed transactions are indexed at height 0.
pub fn assign_index(txid: &str, block_height: u64) -> u64 {
    let digest = Sha256::digest(txid.as_bytes());
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&digest[..8]);
    let low = u64::from_be_bytes(prefix) % TXID_RANGE;
    block_height
        .wrapping_mul(HEIGHT_STRIDE)
        .wrapping_add(low)
}
