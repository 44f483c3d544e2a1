/// Elliptic curve cryptography on secp256k1.
///
/// Provides the opaque sign/verify capability consumed by the
/// transaction layer: private keys, public keys, and DER-encoded
/// ECDSA signatures over 32-byte digests.

pub mod private_key;
pub mod public_key;
pub mod signature;

pub use private_key::PrivateKey;
pub use public_key::PublicKey;
pub use signature::Signature;
