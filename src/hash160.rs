use bitcoin::address::{Address, NetworkUnchecked};

/// Returns the 20-byte hash behind an address as hex, or an empty string.
///
/// P2PKH and P2SH yield their hash160, segwit v0 keyhash addresses their witness program. Longer
/// programs (P2WSH, taproot) and anything unparseable yield "".
pub fn hash160(address: &str) -> String {
    let parsed: Address<NetworkUnchecked> = match address.parse() {
        Ok(parsed) => parsed,
        Err(err) => {
            log::debug!("cannot decode address {:?}: {}", address, err);
            return String::new();
        }
    };
    let script = parsed.assume_checked().script_pubkey();
    let bytes = script.as_bytes();
    let hash = if script.is_p2pkh() {
        // OP_DUP OP_HASH160 <20> OP_EQUALVERIFY OP_CHECKSIG
        &bytes[3..23]
    } else if script.is_p2sh() || script.is_p2wpkh() {
        // OP_HASH160 <20> OP_EQUAL, or OP_0 <20>
        &bytes[2..22]
    } else {
        return String::new();
    };
    hex::encode(hash)
}
