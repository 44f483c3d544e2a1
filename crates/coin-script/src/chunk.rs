//! Script chunk parsing and push-prefix encoding.
//!
//! A chunk is either a standalone opcode or a data push carrying its
//! payload. This module decodes raw script bytes into chunks and picks
//! the minimal push prefix for a given payload length.

use crate::opcodes::*;
use crate::ScriptError;

/// Exclusive upper bound on a single push: a push of 0x1000000 bytes or
/// more is rejected outright, even though PUSHDATA4 could express it.
pub const MAX_PUSH_SIZE: usize = 0x0100_0000;

/// A single parsed element of a script.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScriptChunk {
    /// The opcode byte. For direct pushes (1-75 bytes) this is the length.
    pub op: u8,
    /// The pushed data, if this chunk is a push operation.
    pub data: Option<Vec<u8>>,
}

impl ScriptChunk {
    /// Return true if this chunk is a data push (including OP_0).
    pub fn is_push(&self) -> bool {
        self.op <= OP_PUSHDATA4
    }

    /// Return the pushed bytes, treating OP_0 as an empty push.
    pub fn push_data(&self) -> Option<&[u8]> {
        if self.op == OP_0 {
            return Some(&[]);
        }
        self.data.as_deref()
    }
}

/// Choose the minimal push prefix for a payload of `len` bytes.
///
/// Selects the direct length byte for 1..=75, PUSHDATA1 for 76..=255,
/// PUSHDATA2 for 256..=65535, and PUSHDATA4 above that. Length 0 is
/// OP_0. Lengths at or beyond `MAX_PUSH_SIZE` are rejected.
pub fn push_prefix(len: usize) -> Result<Vec<u8>, ScriptError> {
    if len >= MAX_PUSH_SIZE {
        return Err(ScriptError::PushTooLarge(len));
    }
    Ok(if len == 0 {
        vec![OP_0]
    } else if len <= OP_DATA_75 as usize {
        vec![len as u8]
    } else if len <= 0xff {
        vec![OP_PUSHDATA1, len as u8]
    } else if len <= 0xffff {
        let mut v = vec![OP_PUSHDATA2];
        v.extend_from_slice(&(len as u16).to_le_bytes());
        v
    } else {
        let mut v = vec![OP_PUSHDATA4];
        v.extend_from_slice(&(len as u32).to_le_bytes());
        v
    })
}

/// Read a single chunk starting at `pos`.
///
/// Returns the chunk and the position just past it. Fails with
/// `DataTooSmall` when a push header claims more bytes than remain.
pub fn read_chunk(bytes: &[u8], pos: usize) -> Result<(ScriptChunk, usize), ScriptError> {
    let op = bytes[pos];
    match op {
        OP_PUSHDATA1 => {
            if bytes.len() < pos + 2 {
                return Err(ScriptError::DataTooSmall);
            }
            let length = bytes[pos + 1] as usize;
            let start = pos + 2;
            if bytes.len() < start + length {
                return Err(ScriptError::DataTooSmall);
            }
            Ok((
                ScriptChunk {
                    op,
                    data: Some(bytes[start..start + length].to_vec()),
                },
                start + length,
            ))
        }
        OP_PUSHDATA2 => {
            if bytes.len() < pos + 3 {
                return Err(ScriptError::DataTooSmall);
            }
            let length = u16::from_le_bytes([bytes[pos + 1], bytes[pos + 2]]) as usize;
            let start = pos + 3;
            if bytes.len() < start + length {
                return Err(ScriptError::DataTooSmall);
            }
            Ok((
                ScriptChunk {
                    op,
                    data: Some(bytes[start..start + length].to_vec()),
                },
                start + length,
            ))
        }
        OP_PUSHDATA4 => {
            if bytes.len() < pos + 5 {
                return Err(ScriptError::DataTooSmall);
            }
            let length = u32::from_le_bytes([
                bytes[pos + 1],
                bytes[pos + 2],
                bytes[pos + 3],
                bytes[pos + 4],
            ]) as usize;
            let start = pos + 5;
            if bytes.len() < start + length {
                return Err(ScriptError::DataTooSmall);
            }
            Ok((
                ScriptChunk {
                    op,
                    data: Some(bytes[start..start + length].to_vec()),
                },
                start + length,
            ))
        }
        op if op >= OP_DATA_1 && op <= OP_DATA_75 => {
            let length = op as usize;
            let start = pos + 1;
            if bytes.len() < start + length {
                return Err(ScriptError::DataTooSmall);
            }
            Ok((
                ScriptChunk {
                    op,
                    data: Some(bytes[start..start + length].to_vec()),
                },
                start + length,
            ))
        }
        _ => Ok((ScriptChunk { op, data: None }, pos + 1)),
    }
}

/// Decode raw script bytes into chunks.
pub fn decode_script(bytes: &[u8]) -> Result<Vec<ScriptChunk>, ScriptError> {
    let mut chunks = Vec::new();
    let mut pos = 0;
    while pos < bytes.len() {
        let (chunk, next) = read_chunk(bytes, pos)?;
        chunks.push(chunk);
        pos = next;
    }
    Ok(chunks)
}
