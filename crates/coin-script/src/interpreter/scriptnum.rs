//! Script number arithmetic.
//!
//! Stack numbers are minimal-length, sign-magnitude, little-endian byte
//! strings: zero is the empty string, and the most significant bit of
//! the last byte carries the sign. Numeric opcodes accept operands of
//! at most four bytes, but results may grow beyond that and stay valid
//! as long as they are not reinterpreted as numbers, so the value is
//! held as a big integer.

use num_bigint::BigInt;
use num_traits::{Signed, ToPrimitive, Zero};

use super::error::{InterpreterError, InterpreterErrorCode};

/// A script number backed by a big integer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptNumber {
    val: BigInt,
}

impl ScriptNumber {
    /// Create a script number from an i64 value.
    pub fn new(val: i64) -> Self {
        ScriptNumber {
            val: BigInt::from(val),
        }
    }

    /// Parse a byte string into a script number.
    ///
    /// `max_len` bounds the accepted encoding length; `require_minimal`
    /// additionally rejects non-minimal encodings.
    pub fn from_bytes(
        bytes: &[u8],
        max_len: usize,
        require_minimal: bool,
    ) -> Result<Self, InterpreterError> {
        if bytes.len() > max_len {
            return Err(InterpreterError::new(
                InterpreterErrorCode::NumberTooBig,
                format!(
                    "numeric value encoded as {} bytes exceeds the max allowed {}",
                    bytes.len(),
                    max_len
                ),
            ));
        }
        if require_minimal {
            check_minimal_number_encoding(bytes)?;
        }
        Ok(ScriptNumber {
            val: decode_bigint(bytes),
        })
    }

    /// Serialize in minimal sign-magnitude little-endian form.
    pub fn to_bytes(&self) -> Vec<u8> {
        encode_bigint(&self.val)
    }

    /// Return true if the value is zero.
    pub fn is_zero(&self) -> bool {
        self.val.is_zero()
    }

    /// Add another number to this one.
    pub fn add(&self, other: &ScriptNumber) -> ScriptNumber {
        ScriptNumber {
            val: &self.val + &other.val,
        }
    }

    /// Subtract another number from this one.
    pub fn sub(&self, other: &ScriptNumber) -> ScriptNumber {
        ScriptNumber {
            val: &self.val - &other.val,
        }
    }

    /// Increment by one.
    pub fn incr(&self) -> ScriptNumber {
        ScriptNumber {
            val: &self.val + 1,
        }
    }

    /// Decrement by one.
    pub fn decr(&self) -> ScriptNumber {
        ScriptNumber {
            val: &self.val - 1,
        }
    }

    /// Negate.
    pub fn neg(&self) -> ScriptNumber {
        ScriptNumber {
            val: -self.val.clone(),
        }
    }

    /// Absolute value.
    pub fn abs(&self) -> ScriptNumber {
        ScriptNumber {
            val: self.val.abs(),
        }
    }

    pub fn equal(&self, other: &ScriptNumber) -> bool {
        self.val == other.val
    }

    pub fn less_than(&self, other: &ScriptNumber) -> bool {
        self.val < other.val
    }

    pub fn less_than_or_equal(&self, other: &ScriptNumber) -> bool {
        self.val <= other.val
    }

    pub fn greater_than(&self, other: &ScriptNumber) -> bool {
        self.val > other.val
    }

    pub fn greater_than_or_equal(&self, other: &ScriptNumber) -> bool {
        self.val >= other.val
    }

    pub fn is_negative(&self) -> bool {
        self.val.is_negative()
    }

    /// Convert to i64, clamping at the i64 range boundaries.
    pub fn to_i64(&self) -> i64 {
        match self.val.to_i64() {
            Some(v) => v,
            None => {
                if self.val.is_negative() {
                    i64::MIN
                } else {
                    i64::MAX
                }
            }
        }
    }
}

/// Decode sign-magnitude little-endian bytes into a big integer.
fn decode_bigint(bytes: &[u8]) -> BigInt {
    if bytes.is_empty() {
        return BigInt::zero();
    }
    let mut v = BigInt::zero();
    for (i, &b) in bytes.iter().enumerate() {
        v |= BigInt::from(b) << (8 * i);
    }
    if bytes[bytes.len() - 1] & 0x80 != 0 {
        let mask = !(BigInt::from(0x80u8) << (8 * (bytes.len() - 1)));
        v &= mask;
        v = -v;
    }
    v
}

/// Encode a big integer into minimal sign-magnitude little-endian bytes.
fn encode_bigint(val: &BigInt) -> Vec<u8> {
    if val.is_zero() {
        return vec![];
    }
    let is_negative = val.is_negative();
    let mut magnitude = val.abs();

    let mut result: Vec<u8> = Vec::new();
    while magnitude > BigInt::zero() {
        result.push((&magnitude & BigInt::from(0xffu8)).to_u8().unwrap_or(0));
        magnitude >>= 8;
    }

    // The top bit of the last byte is the sign bit; grow by one byte
    // when the magnitude already occupies it.
    if result[result.len() - 1] & 0x80 != 0 {
        result.push(if is_negative { 0x80 } else { 0x00 });
    } else if is_negative {
        let last = result.len() - 1;
        result[last] |= 0x80;
    }

    result
}

/// Check that a byte string is a minimal number encoding.
pub fn check_minimal_number_encoding(bytes: &[u8]) -> Result<(), InterpreterError> {
    if bytes.is_empty() {
        return Ok(());
    }
    if bytes[bytes.len() - 1] & 0x7f == 0 {
        // The last byte carries only a sign bit (or nothing); it is
        // redundant unless the byte below it needs the room.
        if bytes.len() == 1 || bytes[bytes.len() - 2] & 0x80 == 0 {
            return Err(InterpreterError::new(
                InterpreterErrorCode::MinimalData,
                format!(
                    "numeric value {} is not minimally encoded",
                    hex::encode(bytes)
                ),
            ));
        }
    }
    Ok(())
}

/// Encode an integer in minimal script-number form.
pub fn int_to_script_bytes(n: i64) -> Vec<u8> {
    encode_bigint(&BigInt::from(n))
}

/// Decode script-number bytes into an integer.
///
/// Accepts any length; values outside the i64 range clamp to the
/// nearest boundary.
pub fn int_from_script_bytes(bytes: &[u8]) -> i64 {
    let v = decode_bigint(bytes);
    match v.to_i64() {
        Some(n) => n,
        None => {
            if v.is_negative() {
                i64::MIN
            } else {
                i64::MAX
            }
        }
    }
}
