/// Cryptographic and serialization primitives for the validation engine.
///
/// Provides the hash functions (SHA-256d, HASH160), secp256k1 keys and
/// signatures, and the reader/writer types used for wire serialization.

pub mod ec;
pub mod hash;
pub mod util;

mod error;
pub use error::PrimitivesError;
