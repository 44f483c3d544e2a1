//! Transaction signing.
//!
//! Fills in scriptSigs so each input satisfies the prior output it
//! spends, given caller-supplied key and redeem-script lookups. A
//! missing key or redeem script leaves the input unsigned and moves
//! on: partial signing is a supported end state, and multisig inputs
//! accumulate signatures incrementally across calls.

use std::collections::HashMap;

use coin_primitives::ec::{PrivateKey, PublicKey, Signature};
use coin_primitives::hash::hash160;
use coin_script::interpreter::VerifyFlags;
use coin_script::templates::{classify, ScriptType};
use coin_script::Script;

use crate::sighash::signature_hash;
use crate::transaction::Transaction;
use crate::validator;
use crate::TransactionError;

/// Resolves private keys by public-key hash or exact public key.
///
/// Implementations must be safe for concurrent reads; the signer never
/// mutates them.
pub trait KeyLookup {
    /// The key whose public key hashes to `hash`, with the exact SEC
    /// encoding that matched (compressed or uncompressed).
    fn key_for_hash160(&self, hash: &[u8; 20]) -> Option<(&PrivateKey, Vec<u8>)>;

    /// The key for an exact SEC public key encoding.
    fn key_for_public_key(&self, sec: &[u8]) -> Option<&PrivateKey>;
}

/// Resolves redeem scripts by their Hash160.
pub trait ScriptHashLookup {
    fn script_for_hash160(&self, hash: &[u8; 20]) -> Option<&Script>;
}

/// A map-backed [`KeyLookup`] over a set of private keys.
///
/// Registers both the compressed and uncompressed encodings of every
/// key, so either address form can be signed for.
pub struct KeyMap {
    keys: Vec<PrivateKey>,
    by_hash: HashMap<[u8; 20], (usize, Vec<u8>)>,
    by_sec: HashMap<Vec<u8>, usize>,
}

impl KeyMap {
    pub fn new(keys: impl IntoIterator<Item = PrivateKey>) -> Self {
        let keys: Vec<PrivateKey> = keys.into_iter().collect();
        let mut by_hash = HashMap::new();
        let mut by_sec = HashMap::new();
        for (idx, key) in keys.iter().enumerate() {
            let pubkey = key.pub_key();
            for sec in [
                pubkey.to_compressed().to_vec(),
                pubkey.to_uncompressed().to_vec(),
            ] {
                by_hash.insert(hash160(&sec), (idx, sec.clone()));
                by_sec.insert(sec, idx);
            }
        }
        KeyMap {
            keys,
            by_hash,
            by_sec,
        }
    }
}

impl KeyLookup for KeyMap {
    fn key_for_hash160(&self, hash: &[u8; 20]) -> Option<(&PrivateKey, Vec<u8>)> {
        self.by_hash
            .get(hash)
            .map(|(idx, sec)| (&self.keys[*idx], sec.clone()))
    }

    fn key_for_public_key(&self, sec: &[u8]) -> Option<&PrivateKey> {
        self.by_sec.get(sec).map(|idx| &self.keys[*idx])
    }
}

/// A map-backed [`ScriptHashLookup`] over a set of redeem scripts.
pub struct ScriptMap {
    by_hash: HashMap<[u8; 20], Script>,
}

impl ScriptMap {
    pub fn new(scripts: impl IntoIterator<Item = Script>) -> Self {
        let by_hash = scripts
            .into_iter()
            .map(|s| (hash160(s.to_bytes()), s))
            .collect();
        ScriptMap { by_hash }
    }
}

impl ScriptHashLookup for ScriptMap {
    fn script_for_hash160(&self, hash: &[u8; 20]) -> Option<&Script> {
        self.by_hash.get(hash)
    }
}

/// Sign every input the lookups can address.
///
/// Inputs that already verify, have no attached spendable, or whose
/// spent script the lookups cannot satisfy are skipped silently.
/// `sighash_type` applies to every signature this call produces;
/// signatures already present keep the modes they were made with.
pub fn sign(
    tx: &mut Transaction,
    keys: &dyn KeyLookup,
    redeem_scripts: Option<&dyn ScriptHashLookup>,
    sighash_type: u32,
) -> Result<(), TransactionError> {
    for input_index in 0..tx.inputs.len() {
        sign_input(tx, input_index, keys, redeem_scripts, sighash_type)?;
    }
    Ok(())
}

/// Sign a single input, allowing a per-input sighash mode.
///
/// Same skip rules as [`sign`]; a lookup miss is silent partial
/// progress, not an error.
pub fn sign_input(
    tx: &mut Transaction,
    input_index: usize,
    keys: &dyn KeyLookup,
    redeem_scripts: Option<&dyn ScriptHashLookup>,
    sighash_type: u32,
) -> Result<(), TransactionError> {
    let input = match tx.inputs.get(input_index) {
        Some(input) => input,
        None => {
            return Err(TransactionError::Signing(format!(
                "no input {}",
                input_index
            )))
        }
    };
    if input.is_coinbase() {
        return Ok(());
    }
    let spent_script = match tx.unspent_for(input_index) {
        Some(spendable) if !spendable.is_blank() => spendable.script_pubkey.clone(),
        _ => return Ok(()),
    };
    if validator::is_input_valid(tx, input_index, VerifyFlags::P2SH) {
        return Ok(());
    }
    let existing = tx.inputs[input_index].script_sig.clone();
    if let Some(script_sig) = solve(
        tx,
        input_index,
        &spent_script,
        &existing,
        keys,
        redeem_scripts,
        sighash_type,
        true,
    )? {
        tx.inputs[input_index].script_sig = script_sig;
    }
    Ok(())
}

/// Produce a scriptSig satisfying `script`, or `None` when the lookups
/// cannot address it.
#[allow(clippy::too_many_arguments)]
fn solve(
    tx: &Transaction,
    input_index: usize,
    script: &Script,
    existing: &Script,
    keys: &dyn KeyLookup,
    redeem_scripts: Option<&dyn ScriptHashLookup>,
    sighash_type: u32,
    allow_script_hash: bool,
) -> Result<Option<Script>, TransactionError> {
    match classify(script) {
        ScriptType::PayToPubkeyHash { hash } => {
            let (key, sec) = match keys.key_for_hash160(&hash) {
                Some(found) => found,
                None => return Ok(None),
            };
            let digest = signature_hash(tx, input_index, script, sighash_type)?;
            let sig = encode_signature(key, &digest, sighash_type)?;
            let mut out = Script::new();
            out.append_push_data(&sig)?;
            out.append_push_data(&sec)?;
            Ok(Some(out))
        }
        ScriptType::PayToPubkey { pubkey } => {
            let key = match keys.key_for_public_key(&pubkey) {
                Some(key) => key,
                None => return Ok(None),
            };
            let digest = signature_hash(tx, input_index, script, sighash_type)?;
            let sig = encode_signature(key, &digest, sighash_type)?;
            let mut out = Script::new();
            out.append_push_data(&sig)?;
            Ok(Some(out))
        }
        ScriptType::Multisig { required, pubkeys } => solve_multisig(
            tx,
            input_index,
            script,
            existing,
            keys,
            sighash_type,
            required,
            &pubkeys,
        ),
        ScriptType::PayToScriptHash { hash } => {
            // Nested pay-to-script-hash does not recurse further.
            if !allow_script_hash {
                return Ok(None);
            }
            let redeem = match redeem_scripts.and_then(|r| r.script_for_hash160(&hash)) {
                Some(redeem) => redeem.clone(),
                None => return Ok(None),
            };
            let inner_existing = strip_trailing_push(existing, redeem.to_bytes());
            let inner = solve(
                tx,
                input_index,
                &redeem,
                &inner_existing,
                keys,
                redeem_scripts,
                sighash_type,
                false,
            )?;
            let mut script_sig = match inner {
                Some(inner) => inner,
                None => return Ok(None),
            };
            script_sig.append_push_data(redeem.to_bytes())?;
            Ok(Some(script_sig))
        }
        ScriptType::NullData { .. } | ScriptType::Unknown => Ok(None),
    }
}

/// Incremental multisig signing.
///
/// Existing signatures are re-associated with their public keys by
/// trial verification under the sighash mode each carries, held in a
/// per-pubkey slot list so relative order always matches pubkey order,
/// then new signatures fill free slots until `required` are present.
/// Fewer than `required` is a valid partial result.
#[allow(clippy::too_many_arguments)]
fn solve_multisig(
    tx: &Transaction,
    input_index: usize,
    script: &Script,
    existing: &Script,
    keys: &dyn KeyLookup,
    sighash_type: u32,
    required: usize,
    pubkeys: &[Vec<u8>],
) -> Result<Option<Script>, TransactionError> {
    let mut slots: Vec<Option<Vec<u8>>> = vec![None; pubkeys.len()];

    for sig in existing_signatures(existing) {
        let mode = *sig.last().unwrap() as u32;
        let parsed = match Signature::from_der(&sig[..sig.len() - 1]) {
            Ok(parsed) => parsed,
            Err(_) => continue,
        };
        let digest = match signature_hash(tx, input_index, script, mode) {
            Ok(digest) => digest,
            Err(_) => continue,
        };
        for (slot, sec) in slots.iter_mut().zip(pubkeys) {
            if slot.is_some() {
                continue;
            }
            if let Ok(pubkey) = PublicKey::from_bytes(sec) {
                if pubkey.verify(&digest, &parsed) {
                    *slot = Some(sig.clone());
                    break;
                }
            }
        }
    }

    let mut count = slots.iter().filter(|s| s.is_some()).count();
    for (slot, sec) in slots.iter_mut().zip(pubkeys) {
        if count >= required {
            break;
        }
        if slot.is_some() {
            continue;
        }
        let key = match keys.key_for_public_key(sec) {
            Some(key) => key,
            None => continue,
        };
        let digest = signature_hash(tx, input_index, script, sighash_type)?;
        *slot = Some(encode_signature(key, &digest, sighash_type)?);
        count += 1;
    }

    if count == 0 {
        return Ok(None);
    }

    // The historical off-by-one makes CHECKMULTISIG consume one extra
    // item; OP_0 is the conventional filler.
    let mut out = Script::new();
    out.append_opcodes(&[coin_script::opcodes::OP_0])?;
    for sig in slots.into_iter().flatten() {
        out.append_push_data(&sig)?;
    }
    Ok(Some(out))
}

/// The signature pushes already present in a multisig scriptSig.
fn existing_signatures(script_sig: &Script) -> Vec<Vec<u8>> {
    let chunks = match script_sig.chunks() {
        Ok(chunks) => chunks,
        Err(_) => return Vec::new(),
    };
    chunks
        .iter()
        .filter_map(|chunk| chunk.push_data().map(|d| d.to_vec()))
        .filter(|data| data.len() >= 9)
        .collect()
}

/// Drop a trailing push of exactly `data` (the redeem-script push of a
/// pay-to-script-hash scriptSig).
fn strip_trailing_push(script: &Script, data: &[u8]) -> Script {
    if let Ok(prefix) = coin_script::chunk::push_prefix(data.len()) {
        let mut suffix = prefix;
        suffix.extend_from_slice(data);
        let bytes = script.to_bytes();
        if bytes.ends_with(&suffix) {
            return Script::from_bytes(&bytes[..bytes.len() - suffix.len()]);
        }
    }
    script.clone()
}

/// DER-encode a fresh signature with the sighash byte appended.
fn encode_signature(
    key: &PrivateKey,
    digest: &[u8; 32],
    sighash_type: u32,
) -> Result<Vec<u8>, TransactionError> {
    let mut sig = key.sign(digest)?.to_der();
    sig.push(sighash_type as u8);
    Ok(sig)
}
