//! Stack-manipulation and byte-comparison opcodes.

use super::error::{InterpreterError, InterpreterErrorCode};
use super::scriptnum::ScriptNumber;
use super::stack::as_bool;
use super::thread::Thread;

impl<'a> Thread<'a> {
    pub(crate) fn op_to_alt_stack(&mut self) -> Result<(), InterpreterError> {
        let item = self.dstack.pop_byte_array()?;
        self.astack.push_byte_array(item);
        Ok(())
    }

    pub(crate) fn op_from_alt_stack(&mut self) -> Result<(), InterpreterError> {
        let item = self.astack.pop_byte_array()?;
        self.dstack.push_byte_array(item);
        Ok(())
    }

    /// OP_IFDUP: duplicate the top item when it is truthy.
    pub(crate) fn op_ifdup(&mut self) -> Result<(), InterpreterError> {
        let top = self.dstack.peek_byte_array(0)?.to_vec();
        if as_bool(&top) {
            self.dstack.push_byte_array(top);
        }
        Ok(())
    }

    pub(crate) fn op_depth(&mut self) -> Result<(), InterpreterError> {
        let depth = self.dstack.depth();
        self.dstack.push_int(&ScriptNumber::new(depth as i64));
        Ok(())
    }

    pub(crate) fn op_pick(&mut self) -> Result<(), InterpreterError> {
        let n = self.pop_stack_index()?;
        self.dstack.pick_n(n)
    }

    pub(crate) fn op_roll(&mut self) -> Result<(), InterpreterError> {
        let n = self.pop_stack_index()?;
        self.dstack.roll_n(n)
    }

    /// OP_SIZE: push the byte length of the top item.
    pub(crate) fn op_size(&mut self) -> Result<(), InterpreterError> {
        let len = self.dstack.peek_byte_array(0)?.len();
        self.dstack.push_int(&ScriptNumber::new(len as i64));
        Ok(())
    }

    pub(crate) fn op_equal(&mut self) -> Result<(), InterpreterError> {
        let a = self.dstack.pop_byte_array()?;
        let b = self.dstack.pop_byte_array()?;
        self.dstack.push_bool(a == b);
        Ok(())
    }

    pub(crate) fn op_equalverify(&mut self) -> Result<(), InterpreterError> {
        self.op_equal()?;
        self.abstract_verify(InterpreterErrorCode::EqualVerify)
    }

    fn pop_stack_index(&mut self) -> Result<usize, InterpreterError> {
        let n = self.dstack.pop_int()?.to_i64();
        if n < 0 || n as usize >= self.dstack.depth() {
            return Err(InterpreterError::new(
                InterpreterErrorCode::InvalidStackOperation,
                format!("index {} is invalid for stack size {}", n, self.dstack.depth()),
            ));
        }
        Ok(n as usize)
    }
}
