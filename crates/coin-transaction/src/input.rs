//! Transaction inputs and the outpoints they spend.

use coin_primitives::util::{ByteReader, ByteWriter, VarInt};
use coin_script::Script;

use crate::TransactionError;

/// Sequence number of a finalized input (no lock-time participation).
pub const DEFAULT_SEQUENCE: u32 = 0xFFFF_FFFF;

/// Output index marking a coinbase input.
pub const COINBASE_INDEX: u32 = 0xFFFF_FFFF;

/// Reference to a prior transaction output.
///
/// The txid is held in internal (little-endian) byte order; display
/// strings reverse it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Outpoint {
    /// The 32-byte id of the transaction holding the spent output.
    pub txid: [u8; 32],
    /// The index of the spent output within that transaction.
    pub index: u32,
}

impl Outpoint {
    pub fn new(txid: [u8; 32], index: u32) -> Self {
        Outpoint { txid, index }
    }

    /// The coinbase sentinel: zero hash, index 0xFFFFFFFF.
    pub fn null() -> Self {
        Outpoint {
            txid: [0u8; 32],
            index: COINBASE_INDEX,
        }
    }

    /// Return true if this is the coinbase sentinel.
    pub fn is_null(&self) -> bool {
        self.index == COINBASE_INDEX && self.txid == [0u8; 32]
    }

    /// Parse a display-order (big-endian) txid hex string.
    pub fn from_display_hex(txid_hex: &str, index: u32) -> Result<Self, TransactionError> {
        let bytes = hex::decode(txid_hex)
            .map_err(|e| TransactionError::Serialization(format!("invalid txid hex: {}", e)))?;
        if bytes.len() != 32 {
            return Err(TransactionError::Serialization(format!(
                "txid is {} bytes, expected 32",
                bytes.len()
            )));
        }
        let mut txid = [0u8; 32];
        txid.copy_from_slice(&bytes);
        txid.reverse();
        Ok(Outpoint { txid, index })
    }
}

/// A single transaction input.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxIn {
    /// The prior output being spent.
    pub previous_output: Outpoint,
    /// The unlocking script satisfying the prior output's conditions.
    /// For coinbase inputs this is an arbitrary payload instead.
    pub script_sig: Script,
    /// Sequence number.
    pub sequence: u32,
}

impl TxIn {
    pub fn new(previous_output: Outpoint, script_sig: Script, sequence: u32) -> Self {
        TxIn {
            previous_output,
            script_sig,
            sequence,
        }
    }

    /// Create a coinbase input carrying an arbitrary payload.
    pub fn coinbase(payload: &[u8]) -> Self {
        TxIn {
            previous_output: Outpoint::null(),
            script_sig: Script::from_bytes(payload),
            sequence: DEFAULT_SEQUENCE,
        }
    }

    /// Return true if this input is a coinbase input.
    pub fn is_coinbase(&self) -> bool {
        self.previous_output.is_null()
    }

    /// Deserialize from the wire format: txid, output index, varint
    /// script length, script bytes, sequence.
    pub fn read_from(reader: &mut ByteReader) -> Result<Self, TransactionError> {
        let txid_bytes = reader
            .read_bytes(32)
            .map_err(|e| TransactionError::Serialization(format!("reading prev txid: {}", e)))?;
        let mut txid = [0u8; 32];
        txid.copy_from_slice(txid_bytes);

        let index = reader
            .read_u32_le()
            .map_err(|e| TransactionError::Serialization(format!("reading output index: {}", e)))?;

        let script_len = reader
            .read_varint()
            .map_err(|e| TransactionError::Serialization(format!("reading script length: {}", e)))?;
        let script_bytes = reader
            .read_bytes(script_len.value() as usize)
            .map_err(|e| TransactionError::Serialization(format!("reading scriptSig: {}", e)))?;

        let sequence = reader
            .read_u32_le()
            .map_err(|e| TransactionError::Serialization(format!("reading sequence: {}", e)))?;

        Ok(TxIn {
            previous_output: Outpoint::new(txid, index),
            script_sig: Script::from_bytes(script_bytes),
            sequence,
        })
    }

    /// Serialize into the wire format.
    pub fn write_to(&self, writer: &mut ByteWriter) {
        writer.write_bytes(&self.previous_output.txid);
        writer.write_u32_le(self.previous_output.index);
        let script_bytes = self.script_sig.to_bytes();
        writer.write_varint(VarInt::from(script_bytes.len()));
        writer.write_bytes(script_bytes);
        writer.write_u32_le(self.sequence);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coinbase_sentinel() {
        let input = TxIn::coinbase(b"\x00\x00");
        assert!(input.is_coinbase());
        assert!(input.previous_output.is_null());
        assert_eq!(input.previous_output.index, COINBASE_INDEX);

        let normal = TxIn::new(
            Outpoint::new([1u8; 32], 0),
            Script::new(),
            DEFAULT_SEQUENCE,
        );
        assert!(!normal.is_coinbase());
    }

    #[test]
    fn test_wire_roundtrip() {
        let input = TxIn::new(
            Outpoint::new([0xabu8; 32], 7),
            Script::from_bytes(&[0x51]),
            0xfffffffe,
        );
        let mut writer = ByteWriter::new();
        input.write_to(&mut writer);
        let bytes = writer.into_bytes();
        assert_eq!(bytes.len(), 32 + 4 + 1 + 1 + 4);

        let mut reader = ByteReader::new(&bytes);
        let decoded = TxIn::read_from(&mut reader).unwrap();
        assert_eq!(decoded, input);
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn test_display_hex_reverses() {
        let display = "00000000000000000000000000000000000000000000000000000000000000ff";
        let outpoint = Outpoint::from_display_hex(display, 1).unwrap();
        assert_eq!(outpoint.txid[0], 0xff);
        assert_eq!(outpoint.txid[31], 0x00);
    }

    #[test]
    fn test_truncated_input() {
        let mut reader = ByteReader::new(&[0u8; 10]);
        assert!(TxIn::read_from(&mut reader).is_err());
    }
}
