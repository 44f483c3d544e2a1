//! Script execution stacks.

use super::error::{InterpreterError, InterpreterErrorCode};
use super::scriptnum::ScriptNumber;

/// Convert a stack item to a boolean.
///
/// Any byte string that is not a numeric-zero encoding is true;
/// negative zero (a lone sign bit) is false.
pub fn as_bool(item: &[u8]) -> bool {
    for (i, &b) in item.iter().enumerate() {
        if b != 0 {
            if i == item.len() - 1 && b == 0x80 {
                return false;
            }
            return true;
        }
    }
    false
}

/// Convert a boolean to its stack item form.
pub fn from_bool(v: bool) -> Vec<u8> {
    if v {
        vec![1]
    } else {
        vec![]
    }
}

/// An operand stack of byte-string items.
pub struct Stack {
    stk: Vec<Vec<u8>>,
    max_number_length: usize,
    verify_minimal_data: bool,
}

impl Stack {
    pub fn new(max_number_length: usize, verify_minimal_data: bool) -> Self {
        Stack {
            stk: Vec::new(),
            max_number_length,
            verify_minimal_data,
        }
    }

    pub fn depth(&self) -> usize {
        self.stk.len()
    }

    pub fn verify_minimal_data(&self) -> bool {
        self.verify_minimal_data
    }

    pub fn push_byte_array(&mut self, data: Vec<u8>) {
        self.stk.push(data);
    }

    pub fn push_int(&mut self, n: &ScriptNumber) {
        self.push_byte_array(n.to_bytes());
    }

    pub fn push_bool(&mut self, val: bool) {
        self.push_byte_array(from_bool(val));
    }

    pub fn pop_byte_array(&mut self) -> Result<Vec<u8>, InterpreterError> {
        self.nip_n(0)
    }

    pub fn pop_int(&mut self) -> Result<ScriptNumber, InterpreterError> {
        let data = self.pop_byte_array()?;
        ScriptNumber::from_bytes(&data, self.max_number_length, self.verify_minimal_data)
    }

    pub fn pop_bool(&mut self) -> Result<bool, InterpreterError> {
        Ok(as_bool(&self.pop_byte_array()?))
    }

    pub fn peek_byte_array(&self, idx: usize) -> Result<&[u8], InterpreterError> {
        let sz = self.stk.len();
        if idx >= sz {
            return Err(InterpreterError::new(
                InterpreterErrorCode::InvalidStackOperation,
                format!("index {} is invalid for stack size {}", idx, sz),
            ));
        }
        Ok(&self.stk[sz - idx - 1])
    }

    /// Peek a numeric operand, allowing the caller to widen the length
    /// bound (the locktime opcodes accept five-byte numbers).
    pub fn peek_int_with_length(
        &self,
        idx: usize,
        max_len: usize,
    ) -> Result<ScriptNumber, InterpreterError> {
        let data = self.peek_byte_array(idx)?;
        ScriptNumber::from_bytes(data, max_len, self.verify_minimal_data)
    }

    fn nip_n(&mut self, idx: usize) -> Result<Vec<u8>, InterpreterError> {
        let sz = self.stk.len();
        if idx >= sz {
            return Err(InterpreterError::new(
                InterpreterErrorCode::InvalidStackOperation,
                format!("index {} is invalid for stack size {}", idx, sz),
            ));
        }
        Ok(self.stk.remove(sz - idx - 1))
    }

    pub fn nip_n_discard(&mut self, idx: usize) -> Result<(), InterpreterError> {
        self.nip_n(idx)?;
        Ok(())
    }

    pub fn drop_n(&mut self, n: usize) -> Result<(), InterpreterError> {
        for _ in 0..n {
            self.pop_byte_array()?;
        }
        Ok(())
    }

    pub fn dup_n(&mut self, n: usize) -> Result<(), InterpreterError> {
        for _ in 0..n {
            let item = self.peek_byte_array(n - 1)?.to_vec();
            self.push_byte_array(item);
        }
        Ok(())
    }

    pub fn over_n(&mut self, n: usize) -> Result<(), InterpreterError> {
        let entry = 2 * n - 1;
        for _ in 0..n {
            let item = self.peek_byte_array(entry)?.to_vec();
            self.push_byte_array(item);
        }
        Ok(())
    }

    pub fn rot_n(&mut self, n: usize) -> Result<(), InterpreterError> {
        let entry = 3 * n - 1;
        for _ in 0..n {
            let item = self.nip_n(entry)?;
            self.push_byte_array(item);
        }
        Ok(())
    }

    pub fn swap_n(&mut self, n: usize) -> Result<(), InterpreterError> {
        let entry = 2 * n - 1;
        for _ in 0..n {
            let item = self.nip_n(entry)?;
            self.push_byte_array(item);
        }
        Ok(())
    }

    pub fn pick_n(&mut self, n: usize) -> Result<(), InterpreterError> {
        let item = self.peek_byte_array(n)?.to_vec();
        self.push_byte_array(item);
        Ok(())
    }

    pub fn roll_n(&mut self, n: usize) -> Result<(), InterpreterError> {
        let item = self.nip_n(n)?;
        self.push_byte_array(item);
        Ok(())
    }

    pub fn tuck(&mut self) -> Result<(), InterpreterError> {
        let top = self.pop_byte_array()?;
        let below = self.pop_byte_array()?;
        self.push_byte_array(top.clone());
        self.push_byte_array(below);
        self.push_byte_array(top);
        Ok(())
    }

    pub fn clear(&mut self) {
        self.stk.clear();
    }

    pub fn items(&self) -> &[Vec<u8>] {
        &self.stk
    }

    pub fn set_items(&mut self, items: Vec<Vec<u8>>) {
        self.stk = items;
    }
}
