//! Script verification flags.
//!
//! An immutable bitmask of independently togglable policy rules, parsed
//! once per validation run from the comma-separated names the external
//! test vectors use.

use std::ops::{BitAnd, BitOr, BitOrAssign};

use super::error::{InterpreterError, InterpreterErrorCode};

/// Verification flags controlling interpreter behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VerifyFlags(pub u32);

impl VerifyFlags {
    pub const NONE: VerifyFlags = VerifyFlags(0);
    /// Evaluate pay-to-script-hash redeem scripts.
    pub const P2SH: VerifyFlags = VerifyFlags(1 << 0);
    /// Enforce strict signature and public key encodings.
    pub const STRICTENC: VerifyFlags = VerifyFlags(1 << 1);
    /// Enforce strict DER signature encoding.
    pub const DERSIG: VerifyFlags = VerifyFlags(1 << 2);
    /// Reject signatures with an unnecessarily high S value.
    pub const LOW_S: VerifyFlags = VerifyFlags(1 << 3);
    /// The multisig extra stack element must be empty.
    pub const NULLDUMMY: VerifyFlags = VerifyFlags(1 << 4);
    /// scriptSig must be push-only.
    pub const SIGPUSHONLY: VerifyFlags = VerifyFlags(1 << 5);
    /// Data pushes must use their minimal encoding.
    pub const MINIMALDATA: VerifyFlags = VerifyFlags(1 << 6);
    /// Fail on upgradable NOP opcodes.
    pub const DISCOURAGE_UPGRADABLE_NOPS: VerifyFlags = VerifyFlags(1 << 7);
    /// Exactly one item may remain on the stack after execution.
    pub const CLEANSTACK: VerifyFlags = VerifyFlags(1 << 8);
    /// NOP2 is CHECKLOCKTIMEVERIFY.
    pub const CHECKLOCKTIMEVERIFY: VerifyFlags = VerifyFlags(1 << 9);
    /// NOP3 is CHECKSEQUENCEVERIFY.
    pub const CHECKSEQUENCEVERIFY: VerifyFlags = VerifyFlags(1 << 10);
    /// IF/NOTIF operands must be exactly empty or [0x01].
    pub const MINIMALIF: VerifyFlags = VerifyFlags(1 << 11);
    /// A failed signature check must carry an empty signature.
    pub const NULLFAIL: VerifyFlags = VerifyFlags(1 << 12);

    pub fn has_flag(self, flag: VerifyFlags) -> bool {
        self.0 & flag.0 == flag.0
    }

    pub fn has_any(self, flags: &[VerifyFlags]) -> bool {
        flags.iter().any(|f| self.has_flag(*f))
    }

    pub fn add_flag(&mut self, flag: VerifyFlags) {
        self.0 |= flag.0;
    }

    /// Parse a comma-separated flag-name list, e.g. `"P2SH,STRICTENC"`.
    ///
    /// The literal `"NONE"` (or an empty string) is the empty set. An
    /// unknown name is an error, never silently ignored.
    pub fn from_names(names: &str) -> Result<Self, InterpreterError> {
        let mut flags = VerifyFlags::NONE;
        if names.is_empty() {
            return Ok(flags);
        }
        for name in names.split(',') {
            let flag = match name.trim() {
                "NONE" | "" => VerifyFlags::NONE,
                "P2SH" => VerifyFlags::P2SH,
                "STRICTENC" => VerifyFlags::STRICTENC,
                "DERSIG" => VerifyFlags::DERSIG,
                "LOW_S" => VerifyFlags::LOW_S,
                "NULLDUMMY" => VerifyFlags::NULLDUMMY,
                "SIGPUSHONLY" => VerifyFlags::SIGPUSHONLY,
                "MINIMALDATA" => VerifyFlags::MINIMALDATA,
                "DISCOURAGE_UPGRADABLE_NOPS" => VerifyFlags::DISCOURAGE_UPGRADABLE_NOPS,
                "CLEANSTACK" => VerifyFlags::CLEANSTACK,
                "CHECKLOCKTIMEVERIFY" => VerifyFlags::CHECKLOCKTIMEVERIFY,
                "CHECKSEQUENCEVERIFY" => VerifyFlags::CHECKSEQUENCEVERIFY,
                "MINIMALIF" => VerifyFlags::MINIMALIF,
                "NULLFAIL" => VerifyFlags::NULLFAIL,
                other => {
                    return Err(InterpreterError::new(
                        InterpreterErrorCode::InvalidFlags,
                        format!("unknown verify flag '{}'", other),
                    ))
                }
            };
            flags |= flag;
        }
        Ok(flags)
    }
}

impl BitOr for VerifyFlags {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        VerifyFlags(self.0 | rhs.0)
    }
}

impl BitOrAssign for VerifyFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for VerifyFlags {
    type Output = Self;
    fn bitand(self, rhs: Self) -> Self {
        VerifyFlags(self.0 & rhs.0)
    }
}
