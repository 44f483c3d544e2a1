//! Parsed opcode representation and the script parser.

use super::error::{InterpreterError, InterpreterErrorCode};
use crate::opcodes::*;
use crate::Script;

/// A decoded opcode with its push payload.
#[derive(Debug, Clone)]
pub struct ParsedOpcode {
    /// The opcode byte value.
    pub opcode: u8,
    /// The pushed bytes (empty for non-push opcodes).
    pub data: Vec<u8>,
}

impl ParsedOpcode {
    /// Return the human-readable opcode name.
    pub fn name(&self) -> &'static str {
        opcode_to_string(self.opcode)
    }

    /// Return true if this opcode is disabled.
    ///
    /// The splice, bitwise-logic, and multiply/divide/shift families
    /// fail a script by mere presence in the instruction stream.
    pub fn is_disabled(&self) -> bool {
        matches!(
            self.opcode,
            OP_CAT
                | OP_SUBSTR
                | OP_LEFT
                | OP_RIGHT
                | OP_INVERT
                | OP_AND
                | OP_OR
                | OP_XOR
                | OP_2MUL
                | OP_2DIV
                | OP_MUL
                | OP_DIV
                | OP_MOD
                | OP_LSHIFT
                | OP_RSHIFT
        )
    }

    /// Return true if this opcode is always illegal, even unexecuted.
    pub fn always_illegal(&self) -> bool {
        matches!(self.opcode, OP_VERIF | OP_VERNOTIF)
    }

    /// Return true if this opcode manages conditional execution.
    pub fn is_conditional(&self) -> bool {
        matches!(
            self.opcode,
            OP_IF | OP_NOTIF | OP_ELSE | OP_ENDIF | OP_VERIF | OP_VERNOTIF
        )
    }

    /// Check that a push uses its minimal encoding.
    pub fn enforce_minimal_push(&self) -> Result<(), InterpreterError> {
        let data_len = self.data.len();
        let err = |msg: String| {
            Err(InterpreterError::new(InterpreterErrorCode::MinimalData, msg))
        };
        if data_len == 0 && self.opcode != OP_0 {
            return err(format!(
                "zero length push encoded with {} instead of OP_0",
                self.name()
            ));
        }
        if data_len == 1 && (1..=16).contains(&self.data[0]) && self.opcode != OP_1 + self.data[0] - 1
        {
            return err(format!(
                "push of {} encoded with {} instead of OP_{}",
                self.data[0],
                self.name(),
                self.data[0]
            ));
        }
        if data_len == 1 && self.data[0] == 0x81 && self.opcode != OP_1NEGATE {
            return err(format!(
                "push of -1 encoded with {} instead of OP_1NEGATE",
                self.name()
            ));
        }
        if data_len <= 75 {
            if data_len > 0 && self.opcode as usize != data_len {
                return err(format!(
                    "push of {} bytes encoded with {} instead of a direct push",
                    data_len,
                    self.name()
                ));
            }
        } else if data_len <= 255 {
            if self.opcode != OP_PUSHDATA1 {
                return err(format!(
                    "push of {} bytes encoded with {} instead of OP_PUSHDATA1",
                    data_len,
                    self.name()
                ));
            }
        } else if data_len <= 65535 && self.opcode != OP_PUSHDATA2 {
            return err(format!(
                "push of {} bytes encoded with {} instead of OP_PUSHDATA2",
                data_len,
                self.name()
            ));
        }
        Ok(())
    }

    /// Return true if this push uses the smallest possible push opcode.
    ///
    /// Non-push opcodes are trivially canonical. Used by the
    /// find-and-delete step of signature checking, which only removes
    /// canonical pushes of the signature.
    pub fn is_canonical_push(&self) -> bool {
        let data_len = self.data.len();
        if self.opcode > OP_16 {
            return true;
        }
        if self.opcode < OP_PUSHDATA1 && self.opcode > OP_0 && data_len == 1 && self.data[0] <= 16 {
            return false;
        }
        if self.opcode == OP_PUSHDATA1 && data_len < OP_PUSHDATA1 as usize {
            return false;
        }
        if self.opcode == OP_PUSHDATA2 && data_len <= 0xff {
            return false;
        }
        if self.opcode == OP_PUSHDATA4 && data_len <= 0xffff {
            return false;
        }
        true
    }

    /// Serialize back to script bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = vec![self.opcode];
        match self.opcode {
            OP_PUSHDATA1 => {
                out.push(self.data.len() as u8);
                out.extend_from_slice(&self.data);
            }
            OP_PUSHDATA2 => {
                out.extend_from_slice(&(self.data.len() as u16).to_le_bytes());
                out.extend_from_slice(&self.data);
            }
            OP_PUSHDATA4 => {
                out.extend_from_slice(&(self.data.len() as u32).to_le_bytes());
                out.extend_from_slice(&self.data);
            }
            op if op >= OP_DATA_1 && op <= OP_DATA_75 => {
                out.extend_from_slice(&self.data);
            }
            _ => {}
        }
        out
    }
}

/// A parsed script: a linear sequence of parsed opcodes.
pub type ParsedScript = Vec<ParsedOpcode>;

/// Check whether every instruction is a data push.
pub fn is_push_only(script: &ParsedScript) -> bool {
    script.iter().all(|op| op.opcode <= OP_16)
}

/// Remove canonical pushes of exactly the given data.
///
/// The legacy find-and-delete step applied to signatures before the
/// digest is computed.
pub fn remove_opcode_by_data(script: &ParsedScript, data: &[u8]) -> ParsedScript {
    script
        .iter()
        .filter(|pop| !(pop.is_canonical_push() && pop.data == data))
        .cloned()
        .collect()
}

/// Remove every occurrence of one opcode.
pub fn remove_opcode(script: &ParsedScript, opcode: u8) -> ParsedScript {
    script
        .iter()
        .filter(|pop| pop.opcode != opcode)
        .cloned()
        .collect()
}

/// Serialize a parsed script back into a Script.
pub fn unparse(script: &ParsedScript) -> Script {
    let mut bytes = Vec::new();
    for pop in script {
        bytes.extend_from_slice(&pop.to_bytes());
    }
    Script::from_bytes(&bytes)
}

/// Parse a Script into its opcode sequence.
pub fn parse_script(script: &Script) -> Result<ParsedScript, InterpreterError> {
    let scr = script.to_bytes();
    let mut parsed = Vec::new();
    let mut i = 0;

    while i < scr.len() {
        let instruction = scr[i];
        let mut pop = ParsedOpcode {
            opcode: instruction,
            data: Vec::new(),
        };

        match instruction {
            OP_PUSHDATA1 => {
                if i + 1 >= scr.len() {
                    return Err(truncated());
                }
                let data_len = scr[i + 1] as usize;
                if i + 2 + data_len > scr.len() {
                    return Err(truncated());
                }
                pop.data = scr[i + 2..i + 2 + data_len].to_vec();
                i += 2 + data_len;
            }
            OP_PUSHDATA2 => {
                if i + 2 >= scr.len() {
                    return Err(truncated());
                }
                let data_len = u16::from_le_bytes([scr[i + 1], scr[i + 2]]) as usize;
                if i + 3 + data_len > scr.len() {
                    return Err(truncated());
                }
                pop.data = scr[i + 3..i + 3 + data_len].to_vec();
                i += 3 + data_len;
            }
            OP_PUSHDATA4 => {
                if i + 4 >= scr.len() {
                    return Err(truncated());
                }
                let data_len =
                    u32::from_le_bytes([scr[i + 1], scr[i + 2], scr[i + 3], scr[i + 4]]) as usize;
                if i + 5 + data_len > scr.len() {
                    return Err(truncated());
                }
                pop.data = scr[i + 5..i + 5 + data_len].to_vec();
                i += 5 + data_len;
            }
            op if op >= OP_DATA_1 && op <= OP_DATA_75 => {
                let data_len = op as usize;
                if i + 1 + data_len > scr.len() {
                    return Err(truncated());
                }
                pop.data = scr[i + 1..i + 1 + data_len].to_vec();
                i += 1 + data_len;
            }
            _ => {
                i += 1;
            }
        }

        parsed.push(pop);
    }

    Ok(parsed)
}

fn truncated() -> InterpreterError {
    InterpreterError::new(
        InterpreterErrorCode::MalformedPush,
        "push data exceeds script length".to_string(),
    )
}
