//! Script execution thread.
//!
//! Owns the stacks and condition state for one chained execution of
//! scriptSig, scriptPubKey, and (under the P2SH flag) the redeem
//! script. Created fresh per validation call and discarded at the end.

use crate::opcodes::*;
use crate::Script;

use super::error::{InterpreterError, InterpreterErrorCode};
use super::flags::VerifyFlags;
use super::limits::Limits;
use super::parsed_opcode::{is_push_only, parse_script, ParsedOpcode, ParsedScript};
use super::stack::Stack;
use super::TxContext;

/// Condition-stack entries for nested IF/ELSE branches.
pub(crate) const COND_FALSE: u8 = 0;
pub(crate) const COND_TRUE: u8 = 1;
/// An IF nested inside a non-executing branch: both arms are skipped.
pub(crate) const COND_SKIP: u8 = 2;

/// The execution thread for the script interpreter.
pub struct Thread<'a> {
    /// The main operand stack.
    pub(crate) dstack: Stack,
    /// The alternate stack used by TOALTSTACK/FROMALTSTACK.
    pub(crate) astack: Stack,
    /// Resource limits for this execution.
    pub(crate) limits: Limits,
    /// The parsed scripts to run in sequence.
    pub(crate) scripts: Vec<ParsedScript>,
    /// Nested conditional execution state.
    pub(crate) cond_stack: Vec<u8>,
    /// Data stack saved after the scriptSig, for P2SH redemption.
    saved_first_stack: Vec<Vec<u8>>,
    /// Index of the currently executing script.
    script_idx: usize,
    /// Offset of the current opcode within the current script.
    script_off: usize,
    /// Index just past the most recent CODESEPARATOR.
    pub(crate) last_code_sep: usize,
    /// Non-push operations executed in the current script.
    pub(crate) num_ops: usize,
    /// Active verification flags.
    pub(crate) flags: VerifyFlags,
    /// Whether P2SH redemption applies to this execution.
    p2sh: bool,
    /// Transaction context for signature and locktime opcodes.
    pub(crate) tx_context: Option<&'a dyn TxContext>,
    /// The input index being validated.
    pub(crate) input_idx: usize,
}

impl<'a> Thread<'a> {
    /// Create a thread for chained scriptSig + scriptPubKey execution.
    pub fn new(
        script_sig: &Script,
        script_pubkey: &Script,
        flags: VerifyFlags,
        tx_context: Option<&'a dyn TxContext>,
        input_idx: usize,
    ) -> Result<Self, InterpreterError> {
        // Clean-stack semantics are only defined on top of P2SH.
        if flags.has_flag(VerifyFlags::CLEANSTACK) && !flags.has_flag(VerifyFlags::P2SH) {
            return Err(InterpreterError::new(
                InterpreterErrorCode::InvalidFlags,
                "CLEANSTACK requires P2SH".to_string(),
            ));
        }

        let limits = Limits::standard();
        for script in [script_sig, script_pubkey] {
            if let Some(max) = limits.max_script_size {
                if script.len() > max {
                    return Err(InterpreterError::new(
                        InterpreterErrorCode::ScriptTooBig,
                        format!("script size {} exceeds the max {}", script.len(), max),
                    ));
                }
            }
        }

        if script_sig.is_empty() && script_pubkey.is_empty() {
            return Err(InterpreterError::new(
                InterpreterErrorCode::EvalFalse,
                "false stack entry at end of script execution".to_string(),
            ));
        }

        let parsed_sig = parse_script(script_sig)?;
        let parsed_pubkey = parse_script(script_pubkey)?;

        if flags.has_flag(VerifyFlags::SIGPUSHONLY) && !is_push_only(&parsed_sig) {
            return Err(InterpreterError::new(
                InterpreterErrorCode::NotPushOnly,
                "signature script is not push only".to_string(),
            ));
        }

        let p2sh = flags.has_flag(VerifyFlags::P2SH) && script_pubkey.is_p2sh();
        if p2sh && !is_push_only(&parsed_sig) {
            return Err(InterpreterError::new(
                InterpreterErrorCode::NotPushOnly,
                "pay to script hash is not push only".to_string(),
            ));
        }

        let mut script_idx = 0;
        if script_sig.is_empty() {
            script_idx = 1;
        }

        let verify_minimal = flags.has_flag(VerifyFlags::MINIMALDATA);
        Ok(Thread {
            dstack: Stack::new(limits.max_number_length, verify_minimal),
            astack: Stack::new(limits.max_number_length, verify_minimal),
            limits,
            scripts: vec![parsed_sig, parsed_pubkey],
            cond_stack: Vec::new(),
            saved_first_stack: Vec::new(),
            script_idx,
            script_off: 0,
            last_code_sep: 0,
            num_ops: 0,
            flags,
            p2sh,
            tx_context,
            input_idx,
        })
    }

    /// Create a thread for one script over a caller-provided stack.
    pub fn single(
        script: &Script,
        initial_stack: Vec<Vec<u8>>,
        flags: VerifyFlags,
        limits: Limits,
        tx_context: Option<&'a dyn TxContext>,
        input_idx: usize,
    ) -> Result<Self, InterpreterError> {
        if let Some(max) = limits.max_script_size {
            if script.len() > max {
                return Err(InterpreterError::new(
                    InterpreterErrorCode::ScriptTooBig,
                    format!("script size {} exceeds the max {}", script.len(), max),
                ));
            }
        }
        let parsed = parse_script(script)?;
        let verify_minimal = flags.has_flag(VerifyFlags::MINIMALDATA);
        let mut dstack = Stack::new(limits.max_number_length, verify_minimal);
        dstack.set_items(initial_stack);
        Ok(Thread {
            dstack,
            astack: Stack::new(limits.max_number_length, verify_minimal),
            limits,
            scripts: vec![parsed],
            cond_stack: Vec::new(),
            saved_first_stack: Vec::new(),
            script_idx: 0,
            script_off: 0,
            last_code_sep: 0,
            num_ops: 0,
            flags,
            p2sh: false,
            tx_context,
            input_idx,
        })
    }

    pub fn has_flag(&self, flag: VerifyFlags) -> bool {
        self.flags.has_flag(flag)
    }

    pub fn has_any(&self, flags: &[VerifyFlags]) -> bool {
        self.flags.has_any(flags)
    }

    /// Return true if the current conditional branch is executing.
    pub fn is_branch_executing(&self) -> bool {
        self.cond_stack.iter().all(|&v| v == COND_TRUE)
    }

    /// Run every script to completion and apply the success rule:
    /// non-empty stack with a truthy top, and (under CLEANSTACK)
    /// exactly one item.
    pub fn execute(&mut self) -> Result<(), InterpreterError> {
        self.run()?;
        self.check_final_state(true)
    }

    /// Run every script to completion without the final truthiness
    /// check. The resulting stack is left in place.
    pub fn run(&mut self) -> Result<(), InterpreterError> {
        // An empty single script has nothing to step through.
        while self.script_idx < self.scripts.len() {
            if self.step()? {
                break;
            }
        }
        Ok(())
    }

    /// Execute one opcode. Returns true once all scripts are finished.
    pub fn step(&mut self) -> Result<bool, InterpreterError> {
        if self.script_idx >= self.scripts.len()
            || self.script_off >= self.scripts[self.script_idx].len()
        {
            // Entering with an exhausted script means a zero-length
            // script slot; advance through it.
            if self.script_idx < self.scripts.len()
                && self.script_off >= self.scripts[self.script_idx].len()
            {
                return self.finish_script();
            }
            return Err(InterpreterError::new(
                InterpreterErrorCode::InvalidProgramCounter,
                format!(
                    "program counter {}:{} beyond {} scripts",
                    self.script_idx,
                    self.script_off,
                    self.scripts.len()
                ),
            ));
        }

        let opcode = self.scripts[self.script_idx][self.script_off].clone();
        self.execute_opcode(&opcode)?;
        self.script_off += 1;

        let combined = self.dstack.depth() + self.astack.depth();
        if combined > self.limits.max_stack_size {
            return Err(InterpreterError::new(
                InterpreterErrorCode::StackOverflow,
                format!(
                    "combined stack size {} > max allowed {}",
                    combined, self.limits.max_stack_size
                ),
            ));
        }

        if self.script_off < self.scripts[self.script_idx].len() {
            return Ok(false);
        }

        self.finish_script()
    }

    /// Handle the end of the current script: balance checks, P2SH
    /// redemption, and advancing to the next script.
    fn finish_script(&mut self) -> Result<bool, InterpreterError> {
        if !self.cond_stack.is_empty() {
            return Err(InterpreterError::new(
                InterpreterErrorCode::UnbalancedConditional,
                "end of script reached in conditional execution".to_string(),
            ));
        }

        // The alt stack does not persist between scripts.
        self.astack.clear();

        self.num_ops = 0;
        self.script_off = 0;
        self.last_code_sep = 0;
        self.script_idx += 1;

        if self.p2sh && self.script_idx <= 2 {
            match self.script_idx {
                1 => {
                    self.saved_first_stack = self.dstack.items().to_vec();
                }
                2 => {
                    // The locking script must succeed on its own, then
                    // the top of the saved scriptSig stack is run as
                    // the redeem script over the remaining items.
                    self.check_final_state(false)?;
                    let redeem_bytes =
                        self.saved_first_stack.last().cloned().unwrap_or_default();
                    let redeem = Script::from_bytes(&redeem_bytes);
                    if let Some(max) = self.limits.max_script_size {
                        if redeem.len() > max {
                            return Err(InterpreterError::new(
                                InterpreterErrorCode::ScriptTooBig,
                                format!("redeem script size {} exceeds the max {}", redeem.len(), max),
                            ));
                        }
                    }
                    let parsed = parse_script(&redeem)?;
                    self.scripts.push(parsed);
                    let len = self.saved_first_stack.len();
                    self.dstack
                        .set_items(self.saved_first_stack[..len.saturating_sub(1)].to_vec());
                }
                _ => {}
            }
        }

        // Skip zero-length script slots.
        while self.script_idx < self.scripts.len()
            && self.scripts[self.script_idx].is_empty()
        {
            self.script_idx += 1;
        }

        Ok(self.script_idx >= self.scripts.len())
    }

    /// Final success rule for the whole chain.
    fn check_final_state(&mut self, final_script: bool) -> Result<(), InterpreterError> {
        if self.dstack.depth() < 1 {
            return Err(InterpreterError::new(
                InterpreterErrorCode::EmptyStack,
                "stack empty at end of script execution".to_string(),
            ));
        }

        if final_script
            && self.has_flag(VerifyFlags::CLEANSTACK)
            && self.dstack.depth() != 1
        {
            return Err(InterpreterError::new(
                InterpreterErrorCode::CleanStack,
                format!("stack contains {} unexpected items", self.dstack.depth() - 1),
            ));
        }

        let top = self.dstack.pop_bool()?;
        if !top {
            return Err(InterpreterError::new(
                InterpreterErrorCode::EvalFalse,
                "false stack entry at end of script execution".to_string(),
            ));
        }
        Ok(())
    }

    fn execute_opcode(&mut self, pop: &ParsedOpcode) -> Result<(), InterpreterError> {
        if pop.data.len() > self.limits.max_element_size {
            return Err(InterpreterError::new(
                InterpreterErrorCode::ElementTooBig,
                format!(
                    "element size {} exceeds max allowed {}",
                    pop.data.len(),
                    self.limits.max_element_size
                ),
            ));
        }

        // Disabled opcodes fail by presence, executed branch or not.
        if pop.is_disabled() {
            return Err(InterpreterError::new(
                InterpreterErrorCode::DisabledOpcode,
                format!("attempt to execute disabled opcode {}", pop.name()),
            ));
        }

        if pop.always_illegal() {
            return Err(InterpreterError::new(
                InterpreterErrorCode::ReservedOpcode,
                format!("attempt to execute reserved opcode {}", pop.name()),
            ));
        }

        // Count non-push operations.
        if pop.opcode > OP_16 {
            self.num_ops += 1;
            if self.num_ops > self.limits.max_ops {
                return Err(InterpreterError::new(
                    InterpreterErrorCode::TooManyOperations,
                    format!("exceeded max operation limit of {}", self.limits.max_ops),
                ));
            }
        }

        let executing = self.is_branch_executing();
        if !executing && !pop.is_conditional() {
            return Ok(());
        }

        if self.dstack.verify_minimal_data() && executing && pop.opcode <= OP_PUSHDATA4 {
            pop.enforce_minimal_push()?;
        }

        self.dispatch_opcode(pop)
    }

    fn dispatch_opcode(&mut self, pop: &ParsedOpcode) -> Result<(), InterpreterError> {
        match pop.opcode {
            OP_0 => {
                self.dstack.push_byte_array(vec![]);
                Ok(())
            }
            op if (OP_DATA_1..=OP_DATA_75).contains(&op) => {
                self.dstack.push_byte_array(pop.data.clone());
                Ok(())
            }
            OP_PUSHDATA1 | OP_PUSHDATA2 | OP_PUSHDATA4 => {
                self.dstack.push_byte_array(pop.data.clone());
                Ok(())
            }
            OP_1NEGATE => {
                self.dstack.push_byte_array(vec![0x81]);
                Ok(())
            }
            op if (OP_1..=OP_16).contains(&op) => {
                self.dstack.push_byte_array(vec![op - OP_1 + 1]);
                Ok(())
            }
            OP_RESERVED | OP_VER | OP_RESERVED1 | OP_RESERVED2 => self.op_reserved(pop),
            OP_NOP => Ok(()),

            // Flow control
            OP_IF => self.op_if(false),
            OP_NOTIF => self.op_if(true),
            OP_ELSE => self.op_else(),
            OP_ENDIF => self.op_endif(),
            OP_VERIFY => self.op_verify(),
            OP_RETURN => Err(InterpreterError::new(
                InterpreterErrorCode::OpReturn,
                "OP_RETURN encountered".to_string(),
            )),

            // Locktime
            OP_CHECKLOCKTIMEVERIFY => self.op_check_locktime_verify(pop),
            OP_CHECKSEQUENCEVERIFY => self.op_check_sequence_verify(pop),

            // Stack ops
            OP_TOALTSTACK => self.op_to_alt_stack(),
            OP_FROMALTSTACK => self.op_from_alt_stack(),
            OP_2DROP => self.dstack.drop_n(2),
            OP_2DUP => self.dstack.dup_n(2),
            OP_3DUP => self.dstack.dup_n(3),
            OP_2OVER => self.dstack.over_n(2),
            OP_2ROT => self.dstack.rot_n(2),
            OP_2SWAP => self.dstack.swap_n(2),
            OP_IFDUP => self.op_ifdup(),
            OP_DEPTH => self.op_depth(),
            OP_DROP => self.dstack.drop_n(1),
            OP_DUP => self.dstack.dup_n(1),
            OP_NIP => self.dstack.nip_n_discard(1),
            OP_OVER => self.dstack.over_n(1),
            OP_PICK => self.op_pick(),
            OP_ROLL => self.op_roll(),
            OP_ROT => self.dstack.rot_n(1),
            OP_SWAP => self.dstack.swap_n(1),
            OP_TUCK => self.dstack.tuck(),
            OP_SIZE => self.op_size(),

            // Comparison
            OP_EQUAL => self.op_equal(),
            OP_EQUALVERIFY => self.op_equalverify(),

            // Arithmetic
            OP_1ADD => self.op_unary_num(|n| n.incr()),
            OP_1SUB => self.op_unary_num(|n| n.decr()),
            OP_NEGATE => self.op_unary_num(|n| n.neg()),
            OP_ABS => self.op_unary_num(|n| n.abs()),
            OP_NOT => self.op_not(),
            OP_0NOTEQUAL => self.op_0notequal(),
            OP_ADD => self.op_binary_num(|a, b| a.add(b)),
            OP_SUB => self.op_binary_num(|a, b| a.sub(b)),
            OP_BOOLAND => self.op_bool_binop(|a, b| !a.is_zero() && !b.is_zero()),
            OP_BOOLOR => self.op_bool_binop(|a, b| !a.is_zero() || !b.is_zero()),
            OP_NUMEQUAL => self.op_bool_binop(|a, b| a.equal(b)),
            OP_NUMEQUALVERIFY => self.op_numequalverify(),
            OP_NUMNOTEQUAL => self.op_bool_binop(|a, b| !a.equal(b)),
            OP_LESSTHAN => self.op_bool_binop(|a, b| a.less_than(b)),
            OP_GREATERTHAN => self.op_bool_binop(|a, b| a.greater_than(b)),
            OP_LESSTHANOREQUAL => self.op_bool_binop(|a, b| a.less_than_or_equal(b)),
            OP_GREATERTHANOREQUAL => self.op_bool_binop(|a, b| a.greater_than_or_equal(b)),
            OP_MIN => self.op_binary_num(|a, b| if a.less_than(b) { a.clone() } else { b.clone() }),
            OP_MAX => self.op_binary_num(|a, b| if a.greater_than(b) { a.clone() } else { b.clone() }),
            OP_WITHIN => self.op_within(),

            // Crypto
            OP_RIPEMD160 | OP_SHA1 | OP_SHA256 | OP_HASH160 | OP_HASH256 => self.op_hash(pop.opcode),
            OP_CODESEPARATOR => {
                self.last_code_sep = self.script_off + 1;
                Ok(())
            }
            OP_CHECKSIG => self.op_checksig(),
            OP_CHECKSIGVERIFY => self.op_checksigverify(),
            OP_CHECKMULTISIG => self.op_checkmultisig(),
            OP_CHECKMULTISIGVERIFY => self.op_checkmultisigverify(),

            // Upgradable NOPs
            OP_NOP1 | OP_NOP4 | OP_NOP5 | OP_NOP6 | OP_NOP7 | OP_NOP8 | OP_NOP9 | OP_NOP10 => {
                self.op_upgradable_nop(pop)
            }

            // Everything above the assigned range.
            _ => Err(InterpreterError::new(
                InterpreterErrorCode::BadOpcode,
                format!("attempt to execute invalid opcode {:#04x}", pop.opcode),
            )),
        }
    }

    /// The subscript used for signature digests: from the last
    /// CODESEPARATOR to the end of the current script.
    pub(crate) fn sub_script(&self) -> ParsedScript {
        self.scripts[self.script_idx][self.last_code_sep..].to_vec()
    }
}
