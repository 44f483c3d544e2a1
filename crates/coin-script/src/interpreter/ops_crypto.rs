//! Hash and signature-checking opcodes.

use num_bigint::BigInt;

use crate::opcodes::*;

use super::error::{InterpreterError, InterpreterErrorCode};
use super::flags::VerifyFlags;
use super::parsed_opcode::{remove_opcode, remove_opcode_by_data, unparse};
use super::thread::Thread;

/// Base sighash modes accepted by strict encoding checks.
const SIGHASH_ALL: u32 = 0x01;
const SIGHASH_SINGLE: u32 = 0x03;
const SIGHASH_ANYONECANPAY: u32 = 0x80;

impl<'a> Thread<'a> {
    pub(crate) fn op_hash(&mut self, opcode: u8) -> Result<(), InterpreterError> {
        let buf = self.dstack.pop_byte_array()?;
        let result: Vec<u8> = match opcode {
            OP_RIPEMD160 => {
                use ripemd::{Digest, Ripemd160};
                Ripemd160::digest(&buf).to_vec()
            }
            OP_SHA1 => {
                use sha1::{Digest, Sha1};
                Sha1::digest(&buf).to_vec()
            }
            OP_SHA256 => {
                use sha2::{Digest, Sha256};
                Sha256::digest(&buf).to_vec()
            }
            OP_HASH160 => coin_primitives::hash::hash160(&buf).to_vec(),
            OP_HASH256 => coin_primitives::hash::sha256d(&buf).to_vec(),
            _ => unreachable!("op_hash dispatched with non-hash opcode"),
        };
        self.dstack.push_byte_array(result);
        Ok(())
    }

    pub(crate) fn op_checksig(&mut self) -> Result<(), InterpreterError> {
        let pk_bytes = self.dstack.pop_byte_array()?;
        let full_sig = self.dstack.pop_byte_array()?;

        let ctx = self.tx_context.ok_or_else(|| {
            InterpreterError::new(
                InterpreterErrorCode::InvalidParams,
                "no tx context for checksig".to_string(),
            )
        })?;

        if full_sig.is_empty() {
            self.dstack.push_bool(false);
            return Ok(());
        }

        let sighash_type = *full_sig.last().unwrap() as u32;
        let sig_der = &full_sig[..full_sig.len() - 1];

        self.check_hash_type_encoding(sighash_type)?;
        self.check_signature_encoding(sig_der)?;
        self.check_pub_key_encoding(&pk_bytes)?;

        // The digest covers the subscript with the signature itself and
        // any CODESEPARATORs deleted.
        let mut sub = self.sub_script();
        sub = remove_opcode_by_data(&sub, &full_sig);
        sub = remove_opcode(&sub, OP_CODESEPARATOR);
        let script_code = unparse(&sub);

        let valid = ctx
            .verify_signature(&full_sig, &pk_bytes, &script_code, self.input_idx, sighash_type)
            .unwrap_or(false);

        if !valid && self.has_flag(VerifyFlags::NULLFAIL) && !sig_der.is_empty() {
            return Err(InterpreterError::new(
                InterpreterErrorCode::NullFail,
                "signature not empty on failed checksig".to_string(),
            ));
        }
        self.dstack.push_bool(valid);
        Ok(())
    }

    pub(crate) fn op_checksigverify(&mut self) -> Result<(), InterpreterError> {
        self.op_checksig()?;
        self.abstract_verify(InterpreterErrorCode::CheckSigVerify)
    }

    pub(crate) fn op_checkmultisig(&mut self) -> Result<(), InterpreterError> {
        let ctx = self.tx_context.ok_or_else(|| {
            InterpreterError::new(
                InterpreterErrorCode::InvalidParams,
                "no tx context for checkmultisig".to_string(),
            )
        })?;

        let num_keys = self.dstack.pop_int()?.to_i64();
        if num_keys < 0 {
            return Err(InterpreterError::new(
                InterpreterErrorCode::InvalidPubKeyCount,
                format!("number of pubkeys {} is negative", num_keys),
            ));
        }
        let num_keys = num_keys as usize;
        if num_keys > self.limits.max_pubkeys_per_multisig {
            return Err(InterpreterError::new(
                InterpreterErrorCode::InvalidPubKeyCount,
                format!(
                    "too many pubkeys: {} > {}",
                    num_keys, self.limits.max_pubkeys_per_multisig
                ),
            ));
        }

        // Key checks count against the operation limit too.
        self.num_ops += num_keys;
        if self.num_ops > self.limits.max_ops {
            return Err(InterpreterError::new(
                InterpreterErrorCode::TooManyOperations,
                format!("exceeded max operation limit of {}", self.limits.max_ops),
            ));
        }

        let mut pub_keys = Vec::with_capacity(num_keys);
        for _ in 0..num_keys {
            pub_keys.push(self.dstack.pop_byte_array()?);
        }

        let num_sigs = self.dstack.pop_int()?.to_i64();
        if num_sigs < 0 {
            return Err(InterpreterError::new(
                InterpreterErrorCode::InvalidSignatureCount,
                format!("number of signatures {} is negative", num_sigs),
            ));
        }
        let num_sigs = num_sigs as usize;
        if num_sigs > num_keys {
            return Err(InterpreterError::new(
                InterpreterErrorCode::InvalidSignatureCount,
                format!("more signatures than pubkeys: {} > {}", num_sigs, num_keys),
            ));
        }

        let mut signatures = Vec::with_capacity(num_sigs);
        for _ in 0..num_sigs {
            signatures.push(self.dstack.pop_byte_array()?);
        }

        // The historical off-by-one consumes one extra stack item.
        let dummy = self.dstack.pop_byte_array()?;
        if self.has_flag(VerifyFlags::NULLDUMMY) && !dummy.is_empty() {
            return Err(InterpreterError::new(
                InterpreterErrorCode::SigNullDummy,
                format!("multisig dummy has length {} instead of 0", dummy.len()),
            ));
        }

        let mut sub = self.sub_script();
        for sig in &signatures {
            sub = remove_opcode_by_data(&sub, sig);
        }
        sub = remove_opcode(&sub, OP_CODESEPARATOR);
        let script_code = unparse(&sub);

        // Signatures must match keys in order; each key is tried once.
        let mut success = true;
        let mut key_idx = 0;
        let mut sig_idx = 0;
        while sig_idx < num_sigs {
            if num_sigs - sig_idx > num_keys - key_idx {
                success = false;
                break;
            }

            let sig = &signatures[sig_idx];
            let pub_key = &pub_keys[key_idx];
            key_idx += 1;

            if sig.is_empty() {
                continue;
            }

            let sighash_type = *sig.last().unwrap() as u32;
            let sig_der = &sig[..sig.len() - 1];
            self.check_hash_type_encoding(sighash_type)?;
            self.check_signature_encoding(sig_der)?;
            self.check_pub_key_encoding(pub_key)?;

            if ctx
                .verify_signature(sig, pub_key, &script_code, self.input_idx, sighash_type)
                .unwrap_or(false)
            {
                sig_idx += 1;
            }
        }
        if sig_idx < num_sigs {
            success = false;
        }

        if !success && self.has_flag(VerifyFlags::NULLFAIL) {
            for sig in &signatures {
                if !sig.is_empty() {
                    return Err(InterpreterError::new(
                        InterpreterErrorCode::NullFail,
                        "not all signatures empty on failed checkmultisig".to_string(),
                    ));
                }
            }
        }

        self.dstack.push_bool(success);
        Ok(())
    }

    pub(crate) fn op_checkmultisigverify(&mut self) -> Result<(), InterpreterError> {
        self.op_checkmultisig()?;
        self.abstract_verify(InterpreterErrorCode::CheckMultiSigVerify)
    }

    pub(crate) fn check_hash_type_encoding(
        &self,
        sighash_type: u32,
    ) -> Result<(), InterpreterError> {
        if !self.has_flag(VerifyFlags::STRICTENC) {
            return Ok(());
        }
        let base = sighash_type & !SIGHASH_ANYONECANPAY;
        if !(SIGHASH_ALL..=SIGHASH_SINGLE).contains(&base) {
            return Err(InterpreterError::new(
                InterpreterErrorCode::InvalidSigHashType,
                format!("invalid hash type {:#04x}", sighash_type),
            ));
        }
        Ok(())
    }

    pub(crate) fn check_pub_key_encoding(&self, pub_key: &[u8]) -> Result<(), InterpreterError> {
        if !self.has_flag(VerifyFlags::STRICTENC) {
            return Ok(());
        }
        if pub_key.len() == 33 && (pub_key[0] == 0x02 || pub_key[0] == 0x03) {
            return Ok(());
        }
        if pub_key.len() == 65 && pub_key[0] == 0x04 {
            return Ok(());
        }
        Err(InterpreterError::new(
            InterpreterErrorCode::PubKeyType,
            "unsupported public key type".to_string(),
        ))
    }

    pub(crate) fn check_signature_encoding(&self, sig: &[u8]) -> Result<(), InterpreterError> {
        if !self.has_any(&[
            VerifyFlags::DERSIG,
            VerifyFlags::LOW_S,
            VerifyFlags::STRICTENC,
        ]) {
            return Ok(());
        }
        if sig.is_empty() {
            return Ok(());
        }

        let sig_len = sig.len();
        if sig_len < 8 {
            return Err(InterpreterError::new(
                InterpreterErrorCode::SigTooShort,
                format!("malformed signature: too short: {} < 8", sig_len),
            ));
        }
        if sig_len > 72 {
            return Err(InterpreterError::new(
                InterpreterErrorCode::SigTooLong,
                format!("malformed signature: too long: {} > 72", sig_len),
            ));
        }
        if sig[0] != 0x30 {
            return Err(InterpreterError::new(
                InterpreterErrorCode::SigInvalidSeqID,
                format!("malformed signature: wrong type: {:#04x}", sig[0]),
            ));
        }
        if sig[1] as usize != sig_len - 2 {
            return Err(InterpreterError::new(
                InterpreterErrorCode::SigInvalidDataLen,
                format!("malformed signature: bad length: {} != {}", sig[1], sig_len - 2),
            ));
        }

        let r_len = sig[3] as usize;
        let s_type_offset = 4 + r_len;
        let s_len_offset = s_type_offset + 1;
        if s_type_offset >= sig_len {
            return Err(InterpreterError::new(
                InterpreterErrorCode::SigMissingSTypeID,
                "malformed signature: S type indicator missing".to_string(),
            ));
        }
        if s_len_offset >= sig_len {
            return Err(InterpreterError::new(
                InterpreterErrorCode::SigMissingSLen,
                "malformed signature: S length missing".to_string(),
            ));
        }
        let s_offset = s_len_offset + 1;
        let s_len = sig[s_len_offset] as usize;
        if s_offset + s_len != sig_len {
            return Err(InterpreterError::new(
                InterpreterErrorCode::SigInvalidSLen,
                "malformed signature: invalid S length".to_string(),
            ));
        }

        if sig[2] != 0x02 {
            return Err(InterpreterError::new(
                InterpreterErrorCode::SigInvalidRIntID,
                format!("malformed signature: R marker: {:#04x} != 0x02", sig[2]),
            ));
        }
        if r_len == 0 {
            return Err(InterpreterError::new(
                InterpreterErrorCode::SigZeroRLen,
                "malformed signature: R length is zero".to_string(),
            ));
        }
        if sig[4] & 0x80 != 0 {
            return Err(InterpreterError::new(
                InterpreterErrorCode::SigNegativeR,
                "malformed signature: R is negative".to_string(),
            ));
        }
        if r_len > 1 && sig[4] == 0x00 && sig[5] & 0x80 == 0 {
            return Err(InterpreterError::new(
                InterpreterErrorCode::SigTooMuchRPadding,
                "malformed signature: R has too much padding".to_string(),
            ));
        }

        if sig[s_type_offset] != 0x02 {
            return Err(InterpreterError::new(
                InterpreterErrorCode::SigInvalidSIntID,
                format!(
                    "malformed signature: S marker: {:#04x} != 0x02",
                    sig[s_type_offset]
                ),
            ));
        }
        if s_len == 0 {
            return Err(InterpreterError::new(
                InterpreterErrorCode::SigZeroSLen,
                "malformed signature: S length is zero".to_string(),
            ));
        }
        if sig[s_offset] & 0x80 != 0 {
            return Err(InterpreterError::new(
                InterpreterErrorCode::SigNegativeS,
                "malformed signature: S is negative".to_string(),
            ));
        }
        if s_len > 1 && sig[s_offset] == 0x00 && sig[s_offset + 1] & 0x80 == 0 {
            return Err(InterpreterError::new(
                InterpreterErrorCode::SigTooMuchSPadding,
                "malformed signature: S has too much padding".to_string(),
            ));
        }

        if self.has_flag(VerifyFlags::LOW_S) {
            let half_order = BigInt::parse_bytes(
                b"7FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFF5D576E7357A4501DDFE92F46681B20A0",
                16,
            )
            .unwrap();
            let s_value =
                BigInt::from_bytes_be(num_bigint::Sign::Plus, &sig[s_offset..s_offset + s_len]);
            if s_value > half_order {
                return Err(InterpreterError::new(
                    InterpreterErrorCode::SigHighS,
                    "signature S value is unnecessarily high".to_string(),
                ));
            }
        }

        Ok(())
    }
}
