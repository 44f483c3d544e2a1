//! Numeric opcodes.
//!
//! Operands are popped as script numbers bounded by the numeric length
//! limit; results are pushed back in minimal encoding.

use super::error::{InterpreterError, InterpreterErrorCode};
use super::scriptnum::ScriptNumber;
use super::thread::Thread;

impl<'a> Thread<'a> {
    pub(crate) fn op_unary_num<F>(&mut self, f: F) -> Result<(), InterpreterError>
    where
        F: Fn(&ScriptNumber) -> ScriptNumber,
    {
        let n = self.dstack.pop_int()?;
        self.dstack.push_int(&f(&n));
        Ok(())
    }

    pub(crate) fn op_binary_num<F>(&mut self, f: F) -> Result<(), InterpreterError>
    where
        F: Fn(&ScriptNumber, &ScriptNumber) -> ScriptNumber,
    {
        let b = self.dstack.pop_int()?;
        let a = self.dstack.pop_int()?;
        self.dstack.push_int(&f(&a, &b));
        Ok(())
    }

    pub(crate) fn op_bool_binop<F>(&mut self, f: F) -> Result<(), InterpreterError>
    where
        F: Fn(&ScriptNumber, &ScriptNumber) -> bool,
    {
        let b = self.dstack.pop_int()?;
        let a = self.dstack.pop_int()?;
        self.dstack.push_bool(f(&a, &b));
        Ok(())
    }

    pub(crate) fn op_not(&mut self) -> Result<(), InterpreterError> {
        let n = self.dstack.pop_int()?;
        self.dstack.push_bool(n.is_zero());
        Ok(())
    }

    pub(crate) fn op_0notequal(&mut self) -> Result<(), InterpreterError> {
        let n = self.dstack.pop_int()?;
        self.dstack.push_bool(!n.is_zero());
        Ok(())
    }

    pub(crate) fn op_numequalverify(&mut self) -> Result<(), InterpreterError> {
        self.op_bool_binop(|a, b| a.equal(b))?;
        self.abstract_verify(InterpreterErrorCode::NumEqualVerify)
    }

    /// OP_WITHIN: x is in the half-open interval [min, max).
    pub(crate) fn op_within(&mut self) -> Result<(), InterpreterError> {
        let max = self.dstack.pop_int()?;
        let min = self.dstack.pop_int()?;
        let x = self.dstack.pop_int()?;
        self.dstack
            .push_bool(x.greater_than_or_equal(&min) && x.less_than(&max));
        Ok(())
    }
}
