/// Error types for transaction operations.
#[derive(Debug, thiserror::Error)]
pub enum TransactionError {
    /// Binary or hex serialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A structural transaction defect found by `check()`.
    #[error("validation failure: {0}")]
    ValidationFailure(String),

    /// SIGHASH_SINGLE selected for an input with no matching output.
    #[error("SIGHASH_SINGLE input index {input_index} has no matching output ({output_count} outputs)")]
    SighashSingleIndex {
        input_index: usize,
        output_count: usize,
    },

    /// A signing precondition was violated (bad index, missing data).
    #[error("signing error: {0}")]
    Signing(String),

    /// Introspection requested on a script with no enumerable key set.
    #[error("no addresses for script type: {0}")]
    NoAddressesForScriptType(String),

    /// An underlying script error.
    #[error("script error: {0}")]
    Script(#[from] coin_script::ScriptError),

    /// An underlying primitives error.
    #[error("primitives error: {0}")]
    Primitives(#[from] coin_primitives::PrimitivesError),
}
