#![deny(missing_docs)]

//! Transaction and script validation engine - complete surface.
//!
//! Re-exports every component crate for single-dependency usage.

pub use coin_message as message;
pub use coin_primitives as primitives;
pub use coin_script as script;
pub use coin_transaction as transaction;
