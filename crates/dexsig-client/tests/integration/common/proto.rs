//! Just enough protobuf reading to take a broadcast `TxRaw` apart.

use alloy::primitives::Address;
use dexsig_canon::{SignDoc, TxRaw};
use dexsig_signer::{PayloadSigner, RawHashSigner, SignatureParts};

fn read_varint(buf: &[u8], pos: &mut usize) -> u64 {
    let mut value = 0u64;
    let mut shift = 0;
    loop {
        let byte = buf[*pos];
        *pos += 1;
        value |= u64::from(byte & 0x7f) << shift;
        if byte & 0x80 == 0 {
            return value;
        }
        shift += 7;
    }
}

pub fn decode_tx_raw(bytes: &[u8]) -> TxRaw {
    let mut tx = TxRaw {
        body_bytes: Vec::new(),
        auth_info_bytes: Vec::new(),
        signatures: Vec::new(),
    };
    let mut pos = 0;
    while pos < bytes.len() {
        let key = read_varint(bytes, &mut pos);
        assert_eq!(key & 7, 2, "TxRaw fields are length-delimited");
        let len = read_varint(bytes, &mut pos) as usize;
        let value = bytes[pos..pos + len].to_vec();
        pos += len;
        match key >> 3 {
            1 => tx.body_bytes = value,
            2 => tx.auth_info_bytes = value,
            3 => tx.signatures.push(value),
            other => panic!("unexpected TxRaw field {other}"),
        }
    }
    tx
}

/// Fields of one message as `(field number, varint or bytes)`.
fn fields(buf: &[u8]) -> Vec<(u64, Result<u64, Vec<u8>>)> {
    let mut out = Vec::new();
    let mut pos = 0;
    while pos < buf.len() {
        let key = read_varint(buf, &mut pos);
        let value = match key & 7 {
            0 => Ok(read_varint(buf, &mut pos)),
            2 => {
                let len = read_varint(buf, &mut pos) as usize;
                pos += len;
                Err(buf[pos - len..pos].to_vec())
            }
            wire => panic!("unexpected wire type {wire}"),
        };
        out.push((key >> 3, value));
    }
    out
}

/// Sequence in the first `SignerInfo`; proto3 omits it when zero.
pub fn signer_sequence(tx: &TxRaw) -> u64 {
    let signer_info = fields(&tx.auth_info_bytes)
        .into_iter()
        .find_map(|(field, value)| (field == 1).then(|| value.unwrap_err()))
        .expect("auth info without a signer");
    fields(&signer_info)
        .into_iter()
        .find_map(|(field, value)| (field == 3).then(|| value.unwrap()))
        .unwrap_or(0)
}

/// Addresses the compact signature recovers to, trying both parities.
pub fn recover_signers(tx: &TxRaw, chain_id: &str, account_number: u64) -> Vec<Address> {
    let doc = SignDoc {
        body_bytes: tx.body_bytes.clone(),
        auth_info_bytes: tx.auth_info_bytes.clone(),
        chain_id: chain_id.to_string(),
        account_number,
    };
    let digest = RawHashSigner::sha256().digest(&doc.encode());
    assert_eq!(tx.signatures.len(), 1);
    assert_eq!(tx.signatures[0].len(), 64);

    [27u8, 28]
        .iter()
        .filter_map(|v| {
            let mut bytes = [0u8; 65];
            bytes[..64].copy_from_slice(&tx.signatures[0]);
            bytes[64] = *v;
            SignatureParts::from_bytes(&bytes).recover_address(&digest).ok()
        })
        .collect()
}

pub fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}
