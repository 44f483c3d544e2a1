//! Materialized references to prior outputs.

use coin_primitives::util::{ByteReader, ByteWriter, VarInt};
use coin_script::Script;

use crate::TransactionError;

/// A prior output as looked up by outpoint: the coin value and locking
/// script, plus the source transaction id and output index.
///
/// Supplied by the caller, since the validation core has no storage
/// access of its own. An unresolved lookup is represented by the
/// `blank()` sentinel, which the validator always treats as a failing
/// input.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Spendable {
    /// Coin value of the referenced output.
    pub value: i64,
    /// Locking script of the referenced output.
    pub script_pubkey: Script,
    /// Id of the transaction holding the output (internal byte order).
    pub txid: [u8; 32],
    /// Output index within that transaction.
    pub index: u32,
}

impl Spendable {
    pub fn new(value: i64, script_pubkey: Script, txid: [u8; 32], index: u32) -> Self {
        Spendable {
            value,
            script_pubkey,
            txid,
            index,
        }
    }

    /// The unresolved-lookup sentinel: zero value, empty script, zero
    /// hash and index.
    pub fn blank() -> Self {
        Spendable {
            value: 0,
            script_pubkey: Script::new(),
            txid: [0u8; 32],
            index: 0,
        }
    }

    /// Return true if this is the unresolved-lookup sentinel.
    pub fn is_blank(&self) -> bool {
        self.value == 0
            && self.script_pubkey.is_empty()
            && self.txid == [0u8; 32]
            && self.index == 0
    }

    /// Deserialize from the fixture-extension format.
    pub fn read_from(reader: &mut ByteReader) -> Result<Self, TransactionError> {
        let value = reader
            .read_i64_le()
            .map_err(|e| TransactionError::Serialization(format!("reading value: {}", e)))?;
        let script_len = reader
            .read_varint()
            .map_err(|e| TransactionError::Serialization(format!("reading script length: {}", e)))?;
        let script_bytes = reader
            .read_bytes(script_len.value() as usize)
            .map_err(|e| TransactionError::Serialization(format!("reading script: {}", e)))?;
        let txid_bytes = reader
            .read_bytes(32)
            .map_err(|e| TransactionError::Serialization(format!("reading txid: {}", e)))?;
        let mut txid = [0u8; 32];
        txid.copy_from_slice(txid_bytes);
        let index = reader
            .read_u32_le()
            .map_err(|e| TransactionError::Serialization(format!("reading index: {}", e)))?;
        Ok(Spendable {
            value,
            script_pubkey: Script::from_bytes(script_bytes),
            txid,
            index,
        })
    }

    /// Serialize into the fixture-extension format.
    pub fn write_to(&self, writer: &mut ByteWriter) {
        writer.write_i64_le(self.value);
        let script_bytes = self.script_pubkey.to_bytes();
        writer.write_varint(VarInt::from(script_bytes.len()));
        writer.write_bytes(script_bytes);
        writer.write_bytes(&self.txid);
        writer.write_u32_le(self.index);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_sentinel() {
        assert!(Spendable::blank().is_blank());
        let real = Spendable::new(5, Script::from_bytes(&[0x51]), [1u8; 32], 0);
        assert!(!real.is_blank());
    }

    #[test]
    fn test_wire_roundtrip() {
        let spendable = Spendable::new(42, Script::from_bytes(&[0x51, 0x87]), [9u8; 32], 3);
        let mut writer = ByteWriter::new();
        spendable.write_to(&mut writer);
        let bytes = writer.into_bytes();
        let mut reader = ByteReader::new(&bytes);
        assert_eq!(Spendable::read_from(&mut reader).unwrap(), spendable);
    }
}
