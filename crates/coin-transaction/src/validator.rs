//! Transaction validation.
//!
//! Orchestrates the script engine, signature hashing, and the
//! transaction model to answer whether inputs are structurally and
//! cryptographically valid, and to introspect who signed an input.
//! Per-input failures are tallied, never raised, so a caller learns
//! "N of M inputs are invalid" instead of aborting on the first.

use std::collections::{BTreeSet, HashSet};

use coin_primitives::ec::{PublicKey, Signature};
use coin_script::interpreter::{Engine, InterpreterError, TxContext, VerifyFlags};
use coin_script::templates::{classify, ScriptType};
use coin_script::{Address, Network, Script};

use crate::sighash::signature_hash;
use crate::transaction::Transaction;
use crate::TransactionError;

/// Upper bound on the total coin supply in base units.
pub const MAX_MONEY: i64 = 21_000_000 * 100_000_000;

/// Upper bound on a serialized transaction.
pub const MAX_TX_SIZE: usize = 1_000_000;

/// Bridges the script engine's signature checks to this transaction.
struct TxSignatureChecker<'a> {
    tx: &'a Transaction,
}

impl<'a> TxContext for TxSignatureChecker<'a> {
    fn verify_signature(
        &self,
        full_sig: &[u8],
        pub_key: &[u8],
        sub_script: &Script,
        input_idx: usize,
        sighash_type: u32,
    ) -> Result<bool, InterpreterError> {
        if full_sig.is_empty() {
            return Ok(false);
        }
        let sig = match Signature::from_der(&full_sig[..full_sig.len() - 1]) {
            Ok(sig) => sig,
            Err(_) => return Ok(false),
        };
        let pubkey = match PublicKey::from_bytes(pub_key) {
            Ok(pubkey) => pubkey,
            Err(_) => return Ok(false),
        };
        // A failed digest construction (e.g. SIGHASH_SINGLE with no
        // matching output) fails the check, not the process.
        let digest = match signature_hash(self.tx, input_idx, sub_script, sighash_type) {
            Ok(digest) => digest,
            Err(_) => return Ok(false),
        };
        Ok(pubkey.verify(&digest, &sig))
    }

    fn lock_time(&self) -> u32 {
        self.tx.lock_time
    }

    fn tx_version(&self) -> u32 {
        self.tx.version
    }

    fn input_sequence(&self, input_idx: usize) -> u32 {
        self.tx
            .inputs
            .get(input_idx)
            .map(|input| input.sequence)
            .unwrap_or(0)
    }
}

/// Structural well-formedness checks.
///
/// Verifies only shape, never signatures: non-empty input and output
/// lists, size bound, value ranges, distinct outpoints, and the
/// coinbase payload rules.
pub fn check(tx: &Transaction) -> Result<(), TransactionError> {
    let fail = |reason: String| Err(TransactionError::ValidationFailure(reason));

    if tx.inputs.is_empty() {
        return fail("transaction has no inputs".to_string());
    }
    if tx.outputs.is_empty() {
        return fail("transaction has no outputs".to_string());
    }
    if tx.size() > MAX_TX_SIZE {
        return fail(format!("serialized size {} exceeds {}", tx.size(), MAX_TX_SIZE));
    }

    let mut total: i64 = 0;
    for output in &tx.outputs {
        if output.value < 0 {
            return fail(format!("output value {} is negative", output.value));
        }
        if output.value > MAX_MONEY {
            return fail(format!("output value {} exceeds money range", output.value));
        }
        total = match total.checked_add(output.value) {
            Some(total) if total <= MAX_MONEY => total,
            _ => return fail("total output value exceeds money range".to_string()),
        };
    }

    let mut seen = HashSet::new();
    for input in &tx.inputs {
        if !input.is_coinbase() && !seen.insert(input.previous_output) {
            return fail("duplicate spent outpoint".to_string());
        }
    }

    if tx.is_coinbase() {
        let payload_len = tx.inputs[0].script_sig.len();
        if !(2..=100).contains(&payload_len) {
            return fail(format!("coinbase payload length {} out of range", payload_len));
        }
    } else if tx.inputs.iter().any(|input| input.previous_output.is_null()) {
        return fail("null outpoint on non-coinbase input".to_string());
    }

    Ok(())
}

/// Return true if input `input_index` has a valid solution for its
/// attached spendable under `flags`.
///
/// Coinbase inputs have nothing to check; a missing or blank spendable
/// always fails.
pub fn is_input_valid(tx: &Transaction, input_index: usize, flags: VerifyFlags) -> bool {
    let input = match tx.inputs.get(input_index) {
        Some(input) => input,
        None => return false,
    };
    if input.is_coinbase() {
        return true;
    }
    let spendable = match tx.unspent_for(input_index) {
        Some(spendable) if !spendable.is_blank() => spendable,
        _ => return false,
    };
    let checker = TxSignatureChecker { tx };
    Engine::new()
        .execute(
            &input.script_sig,
            &spendable.script_pubkey,
            flags,
            Some(&checker),
            input_index,
        )
        .is_ok()
}

/// Count the inputs whose script chain does not terminate in success.
pub fn bad_signature_count(tx: &Transaction, flags: VerifyFlags) -> usize {
    (0..tx.inputs.len())
        .filter(|&i| !is_input_valid(tx, i, flags))
        .count()
}

/// Derive, for each signature in an input's scriptSig, which identity
/// produced it and under which sighash mode.
///
/// Candidates come from the spent script's template: a multisig
/// template's keys, a pay-to-pubkey template's key, or (for
/// pay-to-pubkey-hash) the keys revealed in the scriptSig itself.
/// Templates with no enumerable key set (pay-to-script-hash,
/// null-data, unknown) fail with `NoAddressesForScriptType`.
pub fn who_signed(
    tx: &Transaction,
    input_index: usize,
) -> Result<Vec<(String, u32)>, TransactionError> {
    let input = tx
        .inputs
        .get(input_index)
        .ok_or_else(|| TransactionError::Signing(format!("no input {}", input_index)))?;
    let spendable = match tx.unspent_for(input_index) {
        Some(spendable) if !spendable.is_blank() => spendable,
        _ => {
            return Err(TransactionError::Signing(format!(
                "no attached spendable for input {}",
                input_index
            )))
        }
    };

    let spent_script = &spendable.script_pubkey;
    let candidates: Vec<Vec<u8>> = match classify(spent_script) {
        ScriptType::Multisig { pubkeys, .. } => pubkeys,
        ScriptType::PayToPubkey { pubkey } => vec![pubkey],
        ScriptType::PayToPubkeyHash { .. } => revealed_pubkeys(&input.script_sig),
        other => {
            return Err(TransactionError::NoAddressesForScriptType(format!(
                "{:?}",
                other
            )))
        }
    };

    let mut signers = BTreeSet::new();
    for full_sig in signature_pushes(&input.script_sig) {
        let mode = *full_sig.last().unwrap() as u32;
        let sig = match Signature::from_der(&full_sig[..full_sig.len() - 1]) {
            Ok(sig) => sig,
            Err(_) => continue,
        };
        let digest = match signature_hash(tx, input_index, spent_script, mode) {
            Ok(digest) => digest,
            Err(_) => continue,
        };
        for sec in &candidates {
            let pubkey = match PublicKey::from_bytes(sec) {
                Ok(pubkey) => pubkey,
                Err(_) => continue,
            };
            if pubkey.verify(&digest, &sig) {
                let address = Address::for_public_key(sec, Network::Mainnet);
                signers.insert((address.encode(), mode));
                break;
            }
        }
    }

    Ok(signers.into_iter().collect())
}

/// Data pushes that parse as a DER signature plus sighash byte.
fn signature_pushes(script_sig: &Script) -> Vec<Vec<u8>> {
    let chunks = match script_sig.chunks() {
        Ok(chunks) => chunks,
        Err(_) => return Vec::new(),
    };
    chunks
        .iter()
        .filter_map(|chunk| chunk.push_data().map(|d| d.to_vec()))
        .filter(|data| data.len() >= 9 && Signature::from_der(&data[..data.len() - 1]).is_ok())
        .collect()
}

/// Data pushes that look like SEC public keys.
fn revealed_pubkeys(script_sig: &Script) -> Vec<Vec<u8>> {
    let chunks = match script_sig.chunks() {
        Ok(chunks) => chunks,
        Err(_) => return Vec::new(),
    };
    chunks
        .iter()
        .filter_map(|chunk| chunk.push_data().map(|d| d.to_vec()))
        .filter(|data| {
            matches!(
                (data.first(), data.len()),
                (Some(0x02), 33) | (Some(0x03), 33) | (Some(0x04), 65)
            )
        })
        .collect()
}
