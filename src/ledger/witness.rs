use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};

const OP_PUSHDATA1: u8 = 0x4c;
const OP_PUSHDATA2: u8 = 0x4d;
const OP_PUSHDATA4: u8 = 0x4e;

/// Renders a witness stack the way the legacy explorer did: each item as a script push.
///
/// The result is not a meaningful script. It only reproduces the historical formatting, so the
/// push boundaries and little-endian lengths have to match byte for byte.
pub fn serialize_witness(items: &[String]) -> String {
    let mut out = Vec::new();
    for item in items {
        match BASE64.decode(item) {
            Ok(bytes) => {
                push_prefix(&mut out, bytes.len());
                out.extend_from_slice(&bytes);
            }
            Err(err) => log::debug!("skipping undecodable witness item {:?}: {}", item, err),
        }
    }
    hex::encode(out)
}

fn push_prefix(out: &mut Vec<u8>, len: usize) {
    if len < OP_PUSHDATA1 as usize {
        out.push(len as u8);
    } else if len <= 0xff {
        out.push(OP_PUSHDATA1);
        out.push(len as u8);
    } else if len <= 0xffff {
        out.push(OP_PUSHDATA2);
        out.extend_from_slice(&(len as u16).to_le_bytes());
    } else {
        out.push(OP_PUSHDATA4);
        out.extend_from_slice(&(len as u32).to_le_bytes());
    }
}
