//! Legacy signature-hash computation.
//!
//! The digest a signature must cover is the double SHA-256 of a
//! modified copy of the transaction serialized with the 4-byte sighash
//! type appended. The modification blanks every other input's
//! scriptSig, substitutes the spent output's script into the signed
//! input, and trims inputs/outputs according to the SIGHASH mode.

use coin_primitives::hash::sha256d;
use coin_primitives::util::ByteWriter;
use coin_script::Script;

use crate::input::TxIn;
use crate::output::TxOut;
use crate::transaction::Transaction;
use crate::TransactionError;

/// Sign all inputs and all outputs (the default).
pub const SIGHASH_ALL: u32 = 0x01;
/// Sign all inputs but no outputs.
pub const SIGHASH_NONE: u32 = 0x02;
/// Sign all inputs and only the output matching the signed input.
pub const SIGHASH_SINGLE: u32 = 0x03;
/// Combined with a base mode: sign only the current input.
pub const SIGHASH_ANYONECANPAY: u32 = 0x80;
/// Mask extracting the base mode.
pub const SIGHASH_MASK: u32 = 0x1f;

/// Compute the digest a signature over `input_index` must cover.
///
/// `prior_script` is the script being satisfied: the spent output's
/// scriptPubKey (with any signature pushes and CODESEPARATORs already
/// deleted by the interpreter), or the redeem script for a
/// pay-to-script-hash spend.
pub fn signature_hash(
    tx: &Transaction,
    input_index: usize,
    prior_script: &Script,
    sighash_type: u32,
) -> Result<[u8; 32], TransactionError> {
    if input_index >= tx.inputs.len() {
        return Err(TransactionError::Signing(format!(
            "input index {} out of range (tx has {} inputs)",
            input_index,
            tx.inputs.len()
        )));
    }

    let base_type = sighash_type & SIGHASH_MASK;
    let anyone_can_pay = sighash_type & SIGHASH_ANYONECANPAY != 0;

    if base_type == SIGHASH_SINGLE && input_index >= tx.outputs.len() {
        return Err(TransactionError::SighashSingleIndex {
            input_index,
            output_count: tx.outputs.len(),
        });
    }

    // Build the modified input list. The signed input carries the
    // prior script; all others are blanked, and their sequence numbers
    // are zeroed when outputs are not fully committed.
    let signed_input = &tx.inputs[input_index];
    let inputs: Vec<TxIn> = if anyone_can_pay {
        vec![TxIn::new(
            signed_input.previous_output,
            prior_script.clone(),
            signed_input.sequence,
        )]
    } else {
        tx.inputs
            .iter()
            .enumerate()
            .map(|(i, input)| {
                if i == input_index {
                    TxIn::new(input.previous_output, prior_script.clone(), input.sequence)
                } else {
                    let sequence = match base_type {
                        SIGHASH_NONE | SIGHASH_SINGLE => 0,
                        _ => input.sequence,
                    };
                    TxIn::new(input.previous_output, Script::new(), sequence)
                }
            })
            .collect()
    };

    // Build the modified output list.
    let outputs: Vec<TxOut> = match base_type {
        SIGHASH_NONE => Vec::new(),
        SIGHASH_SINGLE => tx.outputs[..=input_index]
            .iter()
            .enumerate()
            .map(|(i, out)| {
                if i == input_index {
                    out.clone()
                } else {
                    // Intervening outputs are blanked with value -1.
                    TxOut::new(-1, Script::new())
                }
            })
            .collect(),
        _ => tx.outputs.clone(),
    };

    let modified = Transaction {
        version: tx.version,
        inputs,
        outputs,
        lock_time: tx.lock_time,
        unspents: Vec::new(),
    };

    let mut writer = ByteWriter::with_capacity(256);
    modified.write_to(&mut writer);
    writer.write_u32_le(sighash_type);
    Ok(sha256d(writer.as_bytes()))
}
