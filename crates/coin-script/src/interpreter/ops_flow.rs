//! Flow-control, verification, and locktime opcodes.

use super::error::{InterpreterError, InterpreterErrorCode};
use super::flags::VerifyFlags;
use super::parsed_opcode::ParsedOpcode;
use super::stack::as_bool;
use super::thread::{Thread, COND_FALSE, COND_SKIP, COND_TRUE};

/// Lock-time values at or above this threshold are Unix timestamps;
/// below it they are block heights.
const LOCKTIME_THRESHOLD: i64 = 500_000_000;

/// Sequence bit disabling relative lock-time for an input.
const SEQUENCE_LOCKTIME_DISABLE_FLAG: i64 = 1 << 31;
/// Sequence bit selecting time-based rather than height-based locks.
const SEQUENCE_LOCKTIME_TYPE_FLAG: i64 = 1 << 22;
/// Mask extracting the lock-time value from a sequence number.
const SEQUENCE_LOCKTIME_MASK: i64 = 0x0000_ffff;

impl<'a> Thread<'a> {
    pub(crate) fn op_reserved(&mut self, pop: &ParsedOpcode) -> Result<(), InterpreterError> {
        Err(InterpreterError::new(
            InterpreterErrorCode::ReservedOpcode,
            format!("attempt to execute reserved opcode {}", pop.name()),
        ))
    }

    pub(crate) fn op_upgradable_nop(&mut self, pop: &ParsedOpcode) -> Result<(), InterpreterError> {
        if self.has_flag(VerifyFlags::DISCOURAGE_UPGRADABLE_NOPS) {
            return Err(InterpreterError::new(
                InterpreterErrorCode::DiscourageUpgradableNOPs,
                format!("{} reserved for soft-fork upgrades", pop.name()),
            ));
        }
        Ok(())
    }

    /// OP_IF / OP_NOTIF: open a conditional branch.
    ///
    /// Inside a non-executing branch the operand is not consumed and
    /// the nested branch is marked skipped.
    pub(crate) fn op_if(&mut self, negate: bool) -> Result<(), InterpreterError> {
        if !self.is_branch_executing() {
            self.cond_stack.push(COND_SKIP);
            return Ok(());
        }
        let item = self.dstack.pop_byte_array()?;
        if self.has_flag(VerifyFlags::MINIMALIF) && !item.is_empty() && item != [0x01] {
            return Err(InterpreterError::new(
                InterpreterErrorCode::MinimalIf,
                "IF operand must be empty or exactly 0x01".to_string(),
            ));
        }
        let mut value = as_bool(&item);
        if negate {
            value = !value;
        }
        self.cond_stack
            .push(if value { COND_TRUE } else { COND_FALSE });
        Ok(())
    }

    pub(crate) fn op_else(&mut self) -> Result<(), InterpreterError> {
        match self.cond_stack.last_mut() {
            None => Err(InterpreterError::new(
                InterpreterErrorCode::UnbalancedConditional,
                "OP_ELSE with no matching OP_IF".to_string(),
            )),
            Some(cond) => {
                match *cond {
                    COND_TRUE => *cond = COND_FALSE,
                    COND_FALSE => *cond = COND_TRUE,
                    _ => {}
                }
                Ok(())
            }
        }
    }

    pub(crate) fn op_endif(&mut self) -> Result<(), InterpreterError> {
        if self.cond_stack.pop().is_none() {
            return Err(InterpreterError::new(
                InterpreterErrorCode::UnbalancedConditional,
                "OP_ENDIF with no matching OP_IF".to_string(),
            ));
        }
        Ok(())
    }

    pub(crate) fn op_verify(&mut self) -> Result<(), InterpreterError> {
        self.abstract_verify(InterpreterErrorCode::Verify)
    }

    /// Pop the top item and fail with `code` unless it is truthy.
    pub(crate) fn abstract_verify(
        &mut self,
        code: InterpreterErrorCode,
    ) -> Result<(), InterpreterError> {
        if !self.dstack.pop_bool()? {
            return Err(InterpreterError::new(
                code,
                format!("{} failed", code),
            ));
        }
        Ok(())
    }

    /// CHECKLOCKTIMEVERIFY: fail unless the transaction's lock time
    /// satisfies the script operand. Behaves as NOP2 without its flag.
    pub(crate) fn op_check_locktime_verify(
        &mut self,
        pop: &ParsedOpcode,
    ) -> Result<(), InterpreterError> {
        if !self.has_flag(VerifyFlags::CHECKLOCKTIMEVERIFY) {
            return self.op_upgradable_nop(pop);
        }
        let ctx = self.tx_context.ok_or_else(|| {
            InterpreterError::new(
                InterpreterErrorCode::InvalidParams,
                "no tx context for locktime check".to_string(),
            )
        })?;

        // The operand stays on the stack; lock times may use 5 bytes.
        let n = self.dstack.peek_int_with_length(0, 5)?;
        if n.is_negative() {
            return Err(InterpreterError::new(
                InterpreterErrorCode::NegativeLockTime,
                "negative lock time".to_string(),
            ));
        }
        let n = n.to_i64();
        let lock_time = ctx.lock_time() as i64;

        // Height locks and time locks are incomparable.
        if (n < LOCKTIME_THRESHOLD) != (lock_time < LOCKTIME_THRESHOLD) {
            return Err(InterpreterError::new(
                InterpreterErrorCode::UnsatisfiedLockTime,
                format!("lock time type mismatch: {} vs {}", n, lock_time),
            ));
        }
        if n > lock_time {
            return Err(InterpreterError::new(
                InterpreterErrorCode::UnsatisfiedLockTime,
                format!("lock time {} not yet reached ({})", n, lock_time),
            ));
        }
        // A finalized input ignores lock time entirely.
        if ctx.input_sequence(self.input_idx) == 0xffff_ffff {
            return Err(InterpreterError::new(
                InterpreterErrorCode::UnsatisfiedLockTime,
                "input is finalized".to_string(),
            ));
        }
        Ok(())
    }

    /// CHECKSEQUENCEVERIFY: fail unless the input's relative lock time
    /// satisfies the script operand. Behaves as NOP3 without its flag.
    pub(crate) fn op_check_sequence_verify(
        &mut self,
        pop: &ParsedOpcode,
    ) -> Result<(), InterpreterError> {
        if !self.has_flag(VerifyFlags::CHECKSEQUENCEVERIFY) {
            return self.op_upgradable_nop(pop);
        }
        let ctx = self.tx_context.ok_or_else(|| {
            InterpreterError::new(
                InterpreterErrorCode::InvalidParams,
                "no tx context for sequence check".to_string(),
            )
        })?;

        let n = self.dstack.peek_int_with_length(0, 5)?;
        if n.is_negative() {
            return Err(InterpreterError::new(
                InterpreterErrorCode::NegativeLockTime,
                "negative sequence".to_string(),
            ));
        }
        let n = n.to_i64();

        // The disable bit turns the opcode into a NOP for this operand.
        if n & SEQUENCE_LOCKTIME_DISABLE_FLAG != 0 {
            return Ok(());
        }

        if ctx.tx_version() < 2 {
            return Err(InterpreterError::new(
                InterpreterErrorCode::UnsatisfiedLockTime,
                "relative lock time requires tx version >= 2".to_string(),
            ));
        }
        let sequence = ctx.input_sequence(self.input_idx) as i64;
        if sequence & SEQUENCE_LOCKTIME_DISABLE_FLAG != 0 {
            return Err(InterpreterError::new(
                InterpreterErrorCode::UnsatisfiedLockTime,
                "input sequence disables relative lock time".to_string(),
            ));
        }
        if n & SEQUENCE_LOCKTIME_TYPE_FLAG != sequence & SEQUENCE_LOCKTIME_TYPE_FLAG {
            return Err(InterpreterError::new(
                InterpreterErrorCode::UnsatisfiedLockTime,
                "relative lock time type mismatch".to_string(),
            ));
        }
        if n & SEQUENCE_LOCKTIME_MASK > sequence & SEQUENCE_LOCKTIME_MASK {
            return Err(InterpreterError::new(
                InterpreterErrorCode::UnsatisfiedLockTime,
                "relative lock time not yet reached".to_string(),
            ));
        }
        Ok(())
    }
}
