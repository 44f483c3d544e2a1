/// Error types for script compilation, parsing, and templates.
#[derive(Debug, thiserror::Error)]
pub enum ScriptError {
    /// A token in script text did not name an opcode or a literal.
    #[error("cannot compile token '{0}'")]
    UnknownToken(String),

    /// A bracketed or 0x-prefixed literal held invalid hex.
    #[error("bad literal '{0}'")]
    BadLiteral(String),

    /// Invalid hex string.
    #[error("invalid hex: {0}")]
    InvalidHex(String),

    /// Not enough bytes to complete a push operation.
    #[error("not enough data for push")]
    DataTooSmall,

    /// A push at or beyond the maximum single push size (0x1000000 bytes).
    #[error("push of {0} bytes exceeds maximum push size")]
    PushTooLarge(usize),

    /// Attempted to append a push-data opcode through the opcode path.
    #[error("use append_push_data for push opcodes: {0}")]
    InvalidOpcodeType(String),

    /// Invalid template parameters (e.g. multisig threshold out of range).
    #[error("invalid template parameters: {0}")]
    TemplateParameters(String),

    /// Invalid address string.
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// Invalid address length after base58 decoding.
    #[error("invalid address length for '{0}'")]
    InvalidAddressLength(String),

    /// Address version byte not recognized for any configured network.
    #[error("unsupported address version {0:#04x}")]
    UnsupportedAddressVersion(u8),

    /// Base58Check checksum mismatch.
    #[error("address checksum failed")]
    ChecksumFailed,
}
