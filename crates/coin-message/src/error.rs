/// Error types for wire-record parsing.
#[derive(Debug, thiserror::Error)]
pub enum MessageError {
    /// The record was truncated.
    #[error("record parse error: {0}")]
    Parse(#[from] coin_primitives::PrimitivesError),
}
