//! Transaction outputs.

use coin_primitives::util::{ByteReader, ByteWriter, VarInt};
use coin_script::Script;

use crate::TransactionError;

/// A single transaction output: a coin value and the locking script
/// that must be satisfied to spend it.
///
/// The value is signed on the wire; the signature-hash construction
/// deliberately writes -1 values for blanked outputs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxOut {
    /// Coin value in the smallest currency denomination.
    pub value: i64,
    /// The locking script.
    pub script_pubkey: Script,
}

impl TxOut {
    pub fn new(value: i64, script_pubkey: Script) -> Self {
        TxOut {
            value,
            script_pubkey,
        }
    }

    /// Deserialize from the wire format: value, varint script length,
    /// script bytes.
    pub fn read_from(reader: &mut ByteReader) -> Result<Self, TransactionError> {
        let value = reader
            .read_i64_le()
            .map_err(|e| TransactionError::Serialization(format!("reading value: {}", e)))?;
        let script_len = reader
            .read_varint()
            .map_err(|e| TransactionError::Serialization(format!("reading script length: {}", e)))?;
        let script_bytes = reader
            .read_bytes(script_len.value() as usize)
            .map_err(|e| TransactionError::Serialization(format!("reading scriptPubKey: {}", e)))?;
        Ok(TxOut {
            value,
            script_pubkey: Script::from_bytes(script_bytes),
        })
    }

    /// Serialize into the wire format.
    pub fn write_to(&self, writer: &mut ByteWriter) {
        writer.write_i64_le(self.value);
        let script_bytes = self.script_pubkey.to_bytes();
        writer.write_varint(VarInt::from(script_bytes.len()));
        writer.write_bytes(script_bytes);
    }
}
