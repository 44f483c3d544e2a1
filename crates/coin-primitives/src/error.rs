/// Error types for the primitives crate.
#[derive(Debug, thiserror::Error)]
pub enum PrimitivesError {
    /// Ran out of bytes while reading serialized data.
    #[error("unexpected end of data")]
    UnexpectedEof,

    /// Invalid private key scalar.
    #[error("invalid private key: {0}")]
    InvalidPrivateKey(String),

    /// Invalid public key point encoding.
    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),

    /// Malformed or out-of-range signature.
    #[error("invalid signature: {0}")]
    InvalidSignature(String),

    /// Invalid hex string.
    #[error("invalid hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),

    /// Error from the underlying curve library.
    #[error("ecdsa error: {0}")]
    Ecdsa(#[from] k256::ecdsa::Error),
}
