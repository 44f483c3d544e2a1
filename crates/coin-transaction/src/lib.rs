/// Transaction model and validation pipeline.
///
/// Provides the transaction/input/output/spendable data structures and
/// their wire serialization, the legacy signature-hash computation, the
/// key-driven signer, and the validator that answers whether a
/// transaction's inputs are structurally and cryptographically valid.

pub mod input;
pub mod output;
pub mod sighash;
pub mod signer;
pub mod spendable;
pub mod transaction;
pub mod validator;

mod error;
pub use error::TransactionError;
pub use input::{Outpoint, TxIn};
pub use output::TxOut;
pub use spendable::Spendable;
pub use transaction::Transaction;
