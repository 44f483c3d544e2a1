//! Standard output-script templates.
//!
//! Recognizes the standard scriptPubKey shapes by structural pattern
//! match over parsed chunks and exposes a constructor for each.
//! Anything else classifies as `Unknown`, which callers must treat as
//! spendable-by-script-only: no key-based signing assistance.

use crate::address::{Address, AddressKind};
use crate::chunk::ScriptChunk;
use crate::opcodes::*;
use crate::{Script, ScriptError};

/// Structural classification of an output script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptType {
    /// `OP_DUP OP_HASH160 <20 bytes> OP_EQUALVERIFY OP_CHECKSIG`
    PayToPubkeyHash { hash: [u8; 20] },
    /// `<pubkey> OP_CHECKSIG`
    PayToPubkey { pubkey: Vec<u8> },
    /// `OP_HASH160 <20 bytes> OP_EQUAL`
    PayToScriptHash { hash: [u8; 20] },
    /// `<m> <pubkey>... <n> OP_CHECKMULTISIG`
    Multisig { required: usize, pubkeys: Vec<Vec<u8>> },
    /// `OP_RETURN <data>`
    NullData { data: Vec<u8> },
    /// No recognized shape.
    Unknown,
}

/// Classify a script by structural pattern.
pub fn classify(script: &Script) -> ScriptType {
    let bytes = script.to_bytes();

    if bytes.len() == 25
        && bytes[0] == OP_DUP
        && bytes[1] == OP_HASH160
        && bytes[2] == OP_DATA_20
        && bytes[23] == OP_EQUALVERIFY
        && bytes[24] == OP_CHECKSIG
    {
        let mut hash = [0u8; 20];
        hash.copy_from_slice(&bytes[3..23]);
        return ScriptType::PayToPubkeyHash { hash };
    }

    if script.is_p2sh() {
        let mut hash = [0u8; 20];
        hash.copy_from_slice(&bytes[2..22]);
        return ScriptType::PayToScriptHash { hash };
    }

    let chunks = match script.chunks() {
        Ok(c) => c,
        Err(_) => return ScriptType::Unknown,
    };

    if let Some(t) = classify_pay_to_pubkey(&chunks) {
        return t;
    }
    if let Some(t) = classify_multisig(&chunks) {
        return t;
    }
    if let Some(t) = classify_null_data(&chunks) {
        return t;
    }

    ScriptType::Unknown
}

fn classify_pay_to_pubkey(chunks: &[ScriptChunk]) -> Option<ScriptType> {
    if chunks.len() != 2 || chunks[1].op != OP_CHECKSIG {
        return None;
    }
    let pubkey = chunks[0].data.as_ref()?;
    if is_sec_pubkey(pubkey) {
        return Some(ScriptType::PayToPubkey {
            pubkey: pubkey.clone(),
        });
    }
    None
}

fn classify_multisig(chunks: &[ScriptChunk]) -> Option<ScriptType> {
    if chunks.len() < 4 {
        return None;
    }
    let m = small_int_value(chunks[0].op)?;
    let n = small_int_value(chunks[chunks.len() - 2].op)?;
    if chunks[chunks.len() - 1].op != OP_CHECKMULTISIG {
        return None;
    }
    if m < 1 || n < m {
        return None;
    }
    let key_chunks = &chunks[1..chunks.len() - 2];
    if key_chunks.len() != n as usize {
        return None;
    }
    let mut pubkeys = Vec::with_capacity(key_chunks.len());
    for chunk in key_chunks {
        let data = chunk.data.as_ref()?;
        if data.is_empty() {
            return None;
        }
        pubkeys.push(data.clone());
    }
    Some(ScriptType::Multisig {
        required: m as usize,
        pubkeys,
    })
}

fn classify_null_data(chunks: &[ScriptChunk]) -> Option<ScriptType> {
    if chunks.is_empty() || chunks[0].op != OP_RETURN {
        return None;
    }
    match chunks.len() {
        1 => Some(ScriptType::NullData { data: vec![] }),
        2 => chunks[1]
            .push_data()
            .map(|d| ScriptType::NullData { data: d.to_vec() }),
        _ => None,
    }
}

fn is_sec_pubkey(bytes: &[u8]) -> bool {
    match bytes.first() {
        Some(0x02) | Some(0x03) => bytes.len() == 33,
        Some(0x04) | Some(0x06) | Some(0x07) => bytes.len() == 65,
        _ => false,
    }
}

// ---------------------------------------------------------------------------
// Constructors
// ---------------------------------------------------------------------------

/// Build a pay-to-pubkey-hash locking script.
pub fn pay_to_pubkey_hash(hash: &[u8; 20]) -> Script {
    let mut bytes = Vec::with_capacity(25);
    bytes.push(OP_DUP);
    bytes.push(OP_HASH160);
    bytes.push(OP_DATA_20);
    bytes.extend_from_slice(hash);
    bytes.push(OP_EQUALVERIFY);
    bytes.push(OP_CHECKSIG);
    Script::from_bytes(&bytes)
}

/// Build a pay-to-pubkey locking script.
pub fn pay_to_pubkey(pubkey: &[u8]) -> Result<Script, ScriptError> {
    if !is_sec_pubkey(pubkey) {
        return Err(ScriptError::TemplateParameters(format!(
            "not a SEC public key ({} bytes)",
            pubkey.len()
        )));
    }
    let mut script = Script::new();
    script.append_push_data(pubkey)?;
    script.append_opcodes(&[OP_CHECKSIG])?;
    Ok(script)
}

/// Build a pay-to-script-hash locking script.
pub fn pay_to_script_hash(hash: &[u8; 20]) -> Script {
    let mut bytes = Vec::with_capacity(23);
    bytes.push(OP_HASH160);
    bytes.push(OP_DATA_20);
    bytes.extend_from_slice(hash);
    bytes.push(OP_EQUAL);
    Script::from_bytes(&bytes)
}

/// Build an m-of-n multisig locking script.
///
/// Thresholds must satisfy `1 <= m <= n <= 16`.
pub fn multisig(required: usize, pubkeys: &[Vec<u8>]) -> Result<Script, ScriptError> {
    let n = pubkeys.len();
    if required < 1 || required > n || n > 16 {
        return Err(ScriptError::TemplateParameters(format!(
            "multisig threshold {} of {} out of range",
            required, n
        )));
    }
    for pubkey in pubkeys {
        if !is_sec_pubkey(pubkey) {
            return Err(ScriptError::TemplateParameters(format!(
                "not a SEC public key ({} bytes)",
                pubkey.len()
            )));
        }
    }
    let mut script = Script::new();
    script.append_opcodes(&[OP_1 + required as u8 - 1])?;
    for pubkey in pubkeys {
        script.append_push_data(pubkey)?;
    }
    script.append_opcodes(&[OP_1 + n as u8 - 1, OP_CHECKMULTISIG])?;
    Ok(script)
}

/// Build a null-data (provably unspendable) output script.
pub fn null_data(data: &[u8]) -> Result<Script, ScriptError> {
    let mut script = Script::new();
    script.append_opcodes(&[OP_RETURN])?;
    script.append_push_data(data)?;
    Ok(script)
}

/// Build the standard output script for an address: P2PKH for
/// pubkey-hash addresses, P2SH for script-hash addresses.
pub fn script_for_address(address: &Address) -> Script {
    match address.kind {
        AddressKind::PubkeyHash => pay_to_pubkey_hash(&address.hash),
        AddressKind::ScriptHash => pay_to_script_hash(&address.hash),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::Network;

    fn fake_pubkey(tag: u8) -> Vec<u8> {
        let mut key = vec![0x02];
        key.extend_from_slice(&[tag; 32]);
        key
    }

    #[test]
    fn test_classify_p2pkh() {
        let script =
            Script::from_hex("76a91403ececf2d12a7f614aef4c82ecf13c303bd9975d88ac").unwrap();
        match classify(&script) {
            ScriptType::PayToPubkeyHash { hash } => {
                assert_eq!(hex::encode(hash), "03ececf2d12a7f614aef4c82ecf13c303bd9975d");
            }
            other => panic!("classified as {:?}", other),
        }
    }

    #[test]
    fn test_classify_p2pk() {
        let script = Script::from_hex(
            "2102f0d97c290e79bf2a8660c406aa56b6f189ff79f2245cc5aff82808b58131b4d5ac",
        )
        .unwrap();
        assert!(matches!(classify(&script), ScriptType::PayToPubkey { .. }));
    }

    #[test]
    fn test_classify_p2sh() {
        let script =
            Script::from_hex("a9149de5aeaff9c48431ba4dd6e8af73d51f38e451cb87").unwrap();
        assert!(matches!(classify(&script), ScriptType::PayToScriptHash { .. }));
    }

    #[test]
    fn test_classify_multisig() {
        let keys = vec![fake_pubkey(1), fake_pubkey(2), fake_pubkey(3)];
        let script = multisig(2, &keys).unwrap();
        match classify(&script) {
            ScriptType::Multisig { required, pubkeys } => {
                assert_eq!(required, 2);
                assert_eq!(pubkeys, keys);
            }
            other => panic!("classified as {:?}", other),
        }
    }

    #[test]
    fn test_classify_null_data() {
        let script = null_data(b"hello").unwrap();
        match classify(&script) {
            ScriptType::NullData { data } => assert_eq!(data, b"hello"),
            other => panic!("classified as {:?}", other),
        }
    }

    #[test]
    fn test_classify_unknown() {
        assert_eq!(classify(&Script::new()), ScriptType::Unknown);
        assert_eq!(
            classify(&Script::from_bytes(&[OP_DUP, OP_DROP, OP_1])),
            ScriptType::Unknown
        );
        // Truncated push cannot classify.
        assert_eq!(classify(&Script::from_bytes(&[0x05, 0x01])), ScriptType::Unknown);
    }

    #[test]
    fn test_constructors_roundtrip_classification() {
        let hash = [0x42u8; 20];
        assert!(matches!(
            classify(&pay_to_pubkey_hash(&hash)),
            ScriptType::PayToPubkeyHash { .. }
        ));
        assert!(matches!(
            classify(&pay_to_script_hash(&hash)),
            ScriptType::PayToScriptHash { .. }
        ));
        let key = fake_pubkey(9);
        assert!(matches!(
            classify(&pay_to_pubkey(&key).unwrap()),
            ScriptType::PayToPubkey { .. }
        ));
    }

    #[test]
    fn test_multisig_threshold_bounds() {
        let keys: Vec<Vec<u8>> = (0..3).map(fake_pubkey).collect();
        assert!(multisig(0, &keys).is_err());
        assert!(multisig(4, &keys).is_err());
        assert!(multisig(1, &keys).is_ok());
        assert!(multisig(3, &keys).is_ok());

        let many: Vec<Vec<u8>> = (0..17).map(fake_pubkey).collect();
        assert!(matches!(
            multisig(1, &many),
            Err(ScriptError::TemplateParameters(_))
        ));
        assert!(multisig(1, &[]).is_err());
    }

    #[test]
    fn test_pay_to_pubkey_rejects_bad_key() {
        assert!(pay_to_pubkey(&[0x01, 0x02]).is_err());
    }

    #[test]
    fn test_script_for_address() {
        let hash = [0x11u8; 20];
        let p2pkh_addr = Address::from_pubkey_hash(&hash, Network::Mainnet);
        assert!(matches!(
            classify(&script_for_address(&p2pkh_addr)),
            ScriptType::PayToPubkeyHash { .. }
        ));
        let p2sh_addr = Address::from_script_hash(&hash, Network::Mainnet);
        assert!(matches!(
            classify(&script_for_address(&p2sh_addr)),
            ScriptType::PayToScriptHash { .. }
        ));
    }
}
