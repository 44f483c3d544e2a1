//! Execution resource limits.

use crate::chunk::MAX_PUSH_SIZE;

/// Maximum script size in bytes under the standard limits.
pub const MAX_SCRIPT_SIZE: usize = 10_000;
/// Maximum size of a single stack element under the standard limits.
pub const MAX_SCRIPT_ELEMENT_SIZE: usize = 520;
/// Maximum number of non-push operations per script.
pub const MAX_OPS_PER_SCRIPT: usize = 201;
/// Maximum combined depth of the data and alt stacks.
pub const MAX_STACK_SIZE: usize = 1_000;
/// Maximum number of public keys per CHECKMULTISIG.
pub const MAX_PUBKEYS_PER_MULTISIG: usize = 20;
/// Maximum byte length of a numeric operand.
pub const MAX_SCRIPT_NUMBER_LENGTH: usize = 4;

/// Resource limits applied to one script execution.
///
/// `standard()` is the consensus rule set used for validation;
/// `permissive()` keeps only the absolute push bound so codec property
/// tests can evaluate giant pushes deterministically instead of failing
/// on the 520-byte element rule.
#[derive(Debug, Clone, Copy)]
pub struct Limits {
    pub max_script_size: Option<usize>,
    pub max_element_size: usize,
    pub max_ops: usize,
    pub max_stack_size: usize,
    pub max_pubkeys_per_multisig: usize,
    pub max_number_length: usize,
}

impl Limits {
    /// The consensus limits used for transaction validation.
    pub fn standard() -> Self {
        Limits {
            max_script_size: Some(MAX_SCRIPT_SIZE),
            max_element_size: MAX_SCRIPT_ELEMENT_SIZE,
            max_ops: MAX_OPS_PER_SCRIPT,
            max_stack_size: MAX_STACK_SIZE,
            max_pubkeys_per_multisig: MAX_PUBKEYS_PER_MULTISIG,
            max_number_length: MAX_SCRIPT_NUMBER_LENGTH,
        }
    }

    /// Relaxed limits for standalone script evaluation: everything
    /// unbounded except the absolute single-push cap.
    pub fn permissive() -> Self {
        Limits {
            max_script_size: None,
            max_element_size: MAX_PUSH_SIZE - 1,
            max_ops: usize::MAX,
            max_stack_size: usize::MAX,
            max_pubkeys_per_multisig: MAX_PUBKEYS_PER_MULTISIG,
            max_number_length: MAX_SCRIPT_NUMBER_LENGTH,
        }
    }
}
