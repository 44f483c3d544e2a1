//! Script interpreter.
//!
//! Executes compiled scripts on a stack machine under a configurable
//! flag set, both for standalone evaluation and for the chained
//! scriptSig + scriptPubKey (+ P2SH redeem) validation sequence.
//!
//! # Architecture
//!
//! The interpreter does not depend on the transaction crate. Callers
//! supply a [`TxContext`] implementation that computes signature
//! digests and verifies signatures, which is how the signature-checking
//! opcodes reach transaction data without a circular dependency.

pub mod error;
pub mod flags;
pub mod limits;
pub mod ops_arith;
pub mod ops_crypto;
pub mod ops_flow;
pub mod ops_stack;
pub mod parsed_opcode;
pub mod scriptnum;
pub mod stack;
pub mod thread;

pub use error::{InterpreterError, InterpreterErrorCode};
pub use flags::VerifyFlags;
pub use limits::Limits;
pub use parsed_opcode::{is_push_only, parse_script, ParsedOpcode, ParsedScript};
pub use scriptnum::ScriptNumber;
pub use stack::Stack;
pub use thread::Thread;

use crate::Script;

/// Transaction context consumed by signature and locktime opcodes.
///
/// `verify_signature` receives the full signature (sighash byte still
/// appended), the public key, the subscript the digest must cover, the
/// input index, and the sighash mode. `Ok(false)` is an ordinary
/// failed check; `Err` also fails the check without aborting.
pub trait TxContext {
    fn verify_signature(
        &self,
        full_sig: &[u8],
        pub_key: &[u8],
        sub_script: &Script,
        input_idx: usize,
        sighash_type: u32,
    ) -> Result<bool, InterpreterError>;

    /// The transaction lock time.
    fn lock_time(&self) -> u32;

    /// The transaction version.
    fn tx_version(&self) -> u32;

    /// The sequence number of the given input.
    fn input_sequence(&self, input_idx: usize) -> u32;
}

/// The script execution engine.
pub struct Engine;

impl Engine {
    pub fn new() -> Self {
        Engine
    }

    /// Execute the chained scriptSig + scriptPubKey (+ redeem script)
    /// sequence for one input.
    pub fn execute(
        &self,
        script_sig: &Script,
        script_pubkey: &Script,
        flags: VerifyFlags,
        tx_context: Option<&dyn TxContext>,
        input_idx: usize,
    ) -> Result<(), InterpreterError> {
        let mut thread = Thread::new(script_sig, script_pubkey, flags, tx_context, input_idx)?;
        thread.execute()
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

/// Evaluate a single script over a caller-provided initial stack and
/// return the final stack.
///
/// With `disallow_long_scripts` the standard tight limits apply;
/// without it only the absolute push bound is enforced, so oversized
/// pushes are rejected deterministically instead of exhausting memory.
pub fn eval_script(
    script: &Script,
    initial_stack: Vec<Vec<u8>>,
    flags: VerifyFlags,
    disallow_long_scripts: bool,
) -> Result<Vec<Vec<u8>>, InterpreterError> {
    let limits = if disallow_long_scripts {
        Limits::standard()
    } else {
        Limits::permissive()
    };
    let mut thread = Thread::single(script, initial_stack, flags, limits, None, 0)?;
    thread.run()?;
    Ok(thread.dstack.items().to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opcodes::*;

    fn execute(unlock: &[u8], lock: &[u8], flags: VerifyFlags) -> Result<(), InterpreterError> {
        Engine::new().execute(
            &Script::from_bytes(unlock),
            &Script::from_bytes(lock),
            flags,
            None,
            0,
        )
    }

    fn code_of(result: Result<(), InterpreterError>) -> InterpreterErrorCode {
        result.unwrap_err().code
    }

    #[test]
    fn test_op_1_op_1_op_equal() {
        assert!(execute(&[OP_1], &[OP_1, OP_EQUAL], VerifyFlags::NONE).is_ok());
    }

    #[test]
    fn test_op_1_op_2_op_equal_fails() {
        let r = execute(&[OP_1], &[OP_2, OP_EQUAL], VerifyFlags::NONE);
        assert_eq!(code_of(r), InterpreterErrorCode::EvalFalse);
    }

    #[test]
    fn test_op_add_sub() {
        assert!(execute(&[OP_2, OP_3], &[OP_ADD, OP_5, OP_EQUAL], VerifyFlags::NONE).is_ok());
        assert!(execute(&[OP_5, OP_3], &[OP_SUB, OP_2, OP_EQUAL], VerifyFlags::NONE).is_ok());
    }

    #[test]
    fn test_hash160_equalverify() {
        let pubkey = vec![0x04; 33];
        let digest = coin_primitives::hash::hash160(&pubkey);

        let mut unlock = vec![pubkey.len() as u8];
        unlock.extend_from_slice(&pubkey);

        let mut lock = vec![OP_DUP, OP_HASH160, digest.len() as u8];
        lock.extend_from_slice(&digest);
        lock.extend_from_slice(&[OP_EQUALVERIFY, OP_1]);

        assert!(execute(&unlock, &lock, VerifyFlags::NONE).is_ok());
    }

    #[test]
    fn test_if_else_endif() {
        assert!(execute(
            &[OP_1],
            &[OP_IF, OP_2, OP_ELSE, OP_3, OP_ENDIF],
            VerifyFlags::NONE
        )
        .is_ok());
        // The false arm leaves 3, still truthy.
        assert!(execute(
            &[OP_0],
            &[OP_IF, OP_2, OP_ELSE, OP_3, OP_ENDIF],
            VerifyFlags::NONE
        )
        .is_ok());
        // The false arm leaves 0.
        let r = execute(
            &[OP_0],
            &[OP_IF, OP_2, OP_ELSE, OP_0, OP_ENDIF],
            VerifyFlags::NONE,
        );
        assert_eq!(code_of(r), InterpreterErrorCode::EvalFalse);
    }

    #[test]
    fn test_notif() {
        assert!(execute(&[OP_0], &[OP_NOTIF, OP_1, OP_ELSE, OP_0, OP_ENDIF], VerifyFlags::NONE)
            .is_ok());
    }

    #[test]
    fn test_nested_if() {
        assert!(execute(
            &[],
            &[OP_1, OP_IF, OP_1, OP_IF, OP_2, OP_ENDIF, OP_ENDIF],
            VerifyFlags::NONE
        )
        .is_ok());
        // The skipped outer branch must skip the inner IF operand too.
        assert!(execute(
            &[],
            &[OP_0, OP_IF, OP_IF, OP_2, OP_ENDIF, OP_ENDIF, OP_1],
            VerifyFlags::NONE
        )
        .is_ok());
    }

    #[test]
    fn test_unbalanced_if() {
        let r = execute(&[OP_1], &[OP_IF], VerifyFlags::NONE);
        assert_eq!(code_of(r), InterpreterErrorCode::UnbalancedConditional);
        let r = execute(&[OP_1], &[OP_ENDIF], VerifyFlags::NONE);
        assert_eq!(code_of(r), InterpreterErrorCode::UnbalancedConditional);
    }

    #[test]
    fn test_op_return_fails() {
        let r = execute(&[OP_1], &[OP_RETURN], VerifyFlags::NONE);
        assert_eq!(code_of(r), InterpreterErrorCode::OpReturn);
    }

    #[test]
    fn test_op_return_in_unexecuted_branch_ok() {
        assert!(execute(
            &[],
            &[OP_0, OP_IF, OP_RETURN, OP_ENDIF, OP_1],
            VerifyFlags::NONE
        )
        .is_ok());
    }

    #[test]
    fn test_disabled_opcodes() {
        for op in [OP_CAT, OP_MUL, OP_DIV, OP_MOD, OP_2MUL, OP_AND, OP_LSHIFT] {
            let r = execute(&[OP_1, OP_1], &[op], VerifyFlags::NONE);
            assert_eq!(code_of(r), InterpreterErrorCode::DisabledOpcode, "{:#04x}", op);
        }
    }

    #[test]
    fn test_disabled_opcode_fails_in_unexecuted_branch() {
        let r = execute(
            &[],
            &[OP_0, OP_IF, OP_MUL, OP_ENDIF, OP_1],
            VerifyFlags::NONE,
        );
        assert_eq!(code_of(r), InterpreterErrorCode::DisabledOpcode);
    }

    #[test]
    fn test_depth_size() {
        assert!(execute(&[OP_1, OP_2, OP_3], &[OP_DEPTH, OP_3, OP_EQUAL], VerifyFlags::NONE)
            .is_ok());
        assert!(execute(
            &[0x03, 0xaa, 0xbb, 0xcc],
            &[OP_SIZE, OP_3, OP_EQUALVERIFY, OP_1],
            VerifyFlags::NONE
        )
        .is_ok());
    }

    #[test]
    fn test_pick_and_alt_stack() {
        assert!(execute(
            &[OP_1, OP_2, OP_3, OP_2],
            &[OP_PICK, OP_1, OP_EQUALVERIFY, OP_3, OP_EQUALVERIFY, OP_2, OP_EQUALVERIFY, OP_1],
            VerifyFlags::NONE
        )
        .is_ok());
        assert!(execute(
            &[OP_5],
            &[OP_TOALTSTACK, OP_FROMALTSTACK, OP_5, OP_EQUAL],
            VerifyFlags::NONE
        )
        .is_ok());
    }

    #[test]
    fn test_numeric_ops() {
        assert!(execute(&[OP_1], &[OP_NEGATE, OP_1NEGATE, OP_EQUAL], VerifyFlags::NONE).is_ok());
        assert!(execute(&[OP_1NEGATE], &[OP_ABS, OP_1, OP_EQUAL], VerifyFlags::NONE).is_ok());
        assert!(execute(&[OP_0], &[OP_NOT], VerifyFlags::NONE).is_ok());
        assert!(execute(&[OP_3, OP_2, OP_5], &[OP_WITHIN], VerifyFlags::NONE).is_ok());
        assert!(execute(&[OP_3, OP_5], &[OP_MIN, OP_3, OP_EQUAL], VerifyFlags::NONE).is_ok());
        assert!(execute(&[OP_3, OP_5], &[OP_MAX, OP_5, OP_EQUAL], VerifyFlags::NONE).is_ok());
        assert!(execute(&[OP_5, OP_5], &[OP_NUMEQUAL], VerifyFlags::NONE).is_ok());
        assert!(execute(&[OP_3, OP_5], &[OP_LESSTHAN], VerifyFlags::NONE).is_ok());
    }

    #[test]
    fn test_verify_fail_code() {
        let r = execute(&[OP_0], &[OP_VERIFY], VerifyFlags::NONE);
        assert_eq!(code_of(r), InterpreterErrorCode::Verify);
    }

    #[test]
    fn test_clean_stack_requires_p2sh() {
        let r = execute(&[OP_1], &[OP_1], VerifyFlags::CLEANSTACK);
        assert_eq!(code_of(r), InterpreterErrorCode::InvalidFlags);
    }

    #[test]
    fn test_clean_stack_enforced() {
        let flags = VerifyFlags::CLEANSTACK | VerifyFlags::P2SH;
        let r = execute(&[OP_1, OP_1], &[OP_NOP], flags);
        assert_eq!(code_of(r), InterpreterErrorCode::CleanStack);
        assert!(execute(&[OP_1], &[OP_NOP], flags).is_ok());
    }

    #[test]
    fn test_ifdup() {
        assert!(execute(&[OP_1], &[OP_IFDUP, OP_EQUAL], VerifyFlags::NONE).is_ok());
    }

    #[test]
    fn test_empty_both_scripts() {
        let r = execute(&[], &[], VerifyFlags::NONE);
        assert_eq!(code_of(r), InterpreterErrorCode::EvalFalse);
    }

    #[test]
    fn test_discourage_upgradable_nops() {
        assert!(execute(&[OP_1], &[OP_NOP1, OP_NOP], VerifyFlags::NONE).is_ok());
        let r = execute(&[OP_1], &[OP_NOP1], VerifyFlags::DISCOURAGE_UPGRADABLE_NOPS);
        assert_eq!(code_of(r), InterpreterErrorCode::DiscourageUpgradableNOPs);
    }

    #[test]
    fn test_minimal_data_flag() {
        // PUSHDATA1 of one small byte is a non-minimal push.
        let r = execute(&[OP_PUSHDATA1, 0x01, 0x42], &[OP_DROP, OP_1], VerifyFlags::MINIMALDATA);
        assert_eq!(code_of(r), InterpreterErrorCode::MinimalData);
        assert!(execute(&[0x01, 0x42], &[OP_DROP, OP_1], VerifyFlags::MINIMALDATA).is_ok());
    }

    #[test]
    fn test_too_many_operations() {
        let lock = vec![OP_NOP; 202];
        let r = execute(&[OP_1], &lock, VerifyFlags::NONE);
        assert_eq!(code_of(r), InterpreterErrorCode::TooManyOperations);
        let lock_ok = {
            let mut v = vec![OP_NOP; 200];
            v.push(OP_1);
            v
        };
        assert!(execute(&[], &lock_ok, VerifyFlags::NONE).is_ok());
    }

    #[test]
    fn test_element_size_limit() {
        // A 521-byte push violates the standard element limit.
        let mut lock = vec![OP_PUSHDATA2];
        lock.extend_from_slice(&521u16.to_le_bytes());
        lock.extend_from_slice(&[0x42; 521]);
        let r = execute(&[OP_1], &lock, VerifyFlags::NONE);
        assert_eq!(code_of(r), InterpreterErrorCode::ElementTooBig);
    }

    #[test]
    fn test_eval_script_returns_stack() {
        let script = Script::from_bytes(&[OP_1, OP_2, OP_ADD]);
        let stack = eval_script(&script, vec![], VerifyFlags::NONE, false).unwrap();
        assert_eq!(stack, vec![vec![3u8]]);
    }

    #[test]
    fn test_eval_script_with_initial_stack() {
        let script = Script::from_bytes(&[OP_ADD]);
        let stack =
            eval_script(&script, vec![vec![2], vec![3]], VerifyFlags::NONE, false).unwrap();
        assert_eq!(stack, vec![vec![5u8]]);
    }

    #[test]
    fn test_eval_script_long_push_modes() {
        // A 100k push is fine under the relaxed limits, rejected under
        // the standard ones.
        let data = vec![0x42u8; 100_000];
        let mut bytes = vec![OP_PUSHDATA4];
        bytes.extend_from_slice(&(data.len() as u32).to_le_bytes());
        bytes.extend_from_slice(&data);
        let script = Script::from_bytes(&bytes);

        let stack = eval_script(&script, vec![], VerifyFlags::NONE, false).unwrap();
        assert_eq!(stack.len(), 1);
        assert_eq!(stack[0].len(), 100_000);

        assert!(eval_script(&script, vec![], VerifyFlags::NONE, true).is_err());
    }

    #[test]
    fn test_p2sh_redeem_execution() {
        // Redeem script OP_1; scriptSig pushes it; lock is the P2SH
        // pattern over its hash.
        let redeem = [OP_1];
        let digest = coin_primitives::hash::hash160(&redeem);
        let unlock = vec![0x01, OP_1];
        let mut lock = vec![OP_HASH160, 0x14];
        lock.extend_from_slice(&digest);
        lock.push(OP_EQUAL);

        // Without the P2SH flag the lock script alone succeeds.
        assert!(execute(&unlock, &lock, VerifyFlags::NONE).is_ok());
        // With it, the redeem script runs too.
        assert!(execute(&unlock, &lock, VerifyFlags::P2SH).is_ok());

        // A redeem script that fails.
        let bad_redeem = [OP_0];
        let bad_digest = coin_primitives::hash::hash160(&bad_redeem);
        let bad_unlock = vec![0x01, OP_0];
        let mut bad_lock = vec![OP_HASH160, 0x14];
        bad_lock.extend_from_slice(&bad_digest);
        bad_lock.push(OP_EQUAL);
        assert!(execute(&bad_unlock, &bad_lock, VerifyFlags::NONE).is_ok());
        assert!(execute(&bad_unlock, &bad_lock, VerifyFlags::P2SH).is_err());
    }

    #[test]
    fn test_p2sh_requires_push_only_script_sig() {
        let redeem = [OP_1];
        let digest = coin_primitives::hash::hash160(&redeem);
        // scriptSig computes the push with OP_NOP noise.
        let unlock = vec![0x01, OP_1, OP_NOP];
        let mut lock = vec![OP_HASH160, 0x14];
        lock.extend_from_slice(&digest);
        lock.push(OP_EQUAL);
        let r = execute(&unlock, &lock, VerifyFlags::P2SH);
        assert_eq!(code_of(r), InterpreterErrorCode::NotPushOnly);
    }

    #[test]
    fn test_checksig_without_context_fails() {
        let r = execute(&[OP_1, OP_1], &[OP_CHECKSIG], VerifyFlags::NONE);
        assert_eq!(code_of(r), InterpreterErrorCode::InvalidParams);
    }
}
