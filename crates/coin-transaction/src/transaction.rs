//! The transaction type.
//!
//! A transaction is a version, ordered inputs, ordered outputs, and a
//! lock time. For validation and signing a parallel list of
//! `Spendable` records can be attached, matching inputs by position;
//! the attachment is never part of the canonical signed/hashed form.
//!
//! The transaction id is the double SHA-256 of the canonical
//! serialization, scriptSigs included: two validly-signed variants of
//! the same economic transaction can carry different ids. The id is
//! deliberately not malleability-resistant at this layer.

use coin_primitives::hash::sha256d;
use coin_primitives::util::{ByteReader, ByteWriter, VarInt};

use crate::input::TxIn;
use crate::output::TxOut;
use crate::spendable::Spendable;
use crate::TransactionError;

/// A transaction.
///
/// # Wire format
///
/// | Field        | Size                 |
/// |--------------|----------------------|
/// | version      | 4 bytes (LE)         |
/// | input count  | VarInt               |
/// | inputs       | variable             |
/// | output count | VarInt               |
/// | outputs      | variable             |
/// | lock_time    | 4 bytes (LE)         |
#[derive(Clone, Debug)]
pub struct Transaction {
    /// Transaction format version.
    pub version: u32,
    /// Ordered inputs.
    pub inputs: Vec<TxIn>,
    /// Ordered outputs.
    pub outputs: Vec<TxOut>,
    /// Lock time: block height or Unix timestamp before which the
    /// transaction is not final.
    pub lock_time: u32,
    /// Attached prior outputs, one per input, for validation and
    /// signing. Empty when unresolved; never serialized canonically.
    pub unspents: Vec<Spendable>,
}

impl Transaction {
    /// Create an empty version-1 transaction.
    pub fn new() -> Self {
        Transaction {
            version: 1,
            inputs: Vec::new(),
            outputs: Vec::new(),
            lock_time: 0,
            unspents: Vec::new(),
        }
    }

    // -----------------------------------------------------------------
    // Deserialization
    // -----------------------------------------------------------------

    /// Parse from a hex string.
    pub fn from_hex(hex_str: &str) -> Result<Self, TransactionError> {
        let bytes = hex::decode(hex_str)
            .map_err(|e| TransactionError::Serialization(format!("invalid hex: {}", e)))?;
        Self::from_bytes(&bytes)
    }

    /// Parse from raw bytes; trailing data is an error.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TransactionError> {
        let mut reader = ByteReader::new(bytes);
        let tx = Self::read_from(&mut reader)?;
        if reader.remaining() != 0 {
            return Err(TransactionError::Serialization(format!(
                "trailing {} bytes after transaction",
                reader.remaining()
            )));
        }
        Ok(tx)
    }

    /// Parse from raw bytes carrying the fixture extension: attached
    /// spendables follow the lock time, one per input.
    pub fn from_bytes_with_unspents(bytes: &[u8]) -> Result<Self, TransactionError> {
        let mut reader = ByteReader::new(bytes);
        let mut tx = Self::read_from(&mut reader)?;
        let mut unspents = Vec::with_capacity(tx.inputs.len());
        for _ in 0..tx.inputs.len() {
            unspents.push(Spendable::read_from(&mut reader)?);
        }
        if reader.remaining() != 0 {
            return Err(TransactionError::Serialization(format!(
                "trailing {} bytes after unspents",
                reader.remaining()
            )));
        }
        tx.unspents = unspents;
        Ok(tx)
    }

    /// Deserialize from a reader positioned at a transaction.
    pub fn read_from(reader: &mut ByteReader) -> Result<Self, TransactionError> {
        let version = reader
            .read_u32_le()
            .map_err(|e| TransactionError::Serialization(format!("reading version: {}", e)))?;

        let input_count = reader
            .read_varint()
            .map_err(|e| TransactionError::Serialization(format!("reading input count: {}", e)))?;
        let mut inputs = Vec::with_capacity(input_count.value().min(1024) as usize);
        for _ in 0..input_count.value() {
            inputs.push(TxIn::read_from(reader)?);
        }

        let output_count = reader
            .read_varint()
            .map_err(|e| TransactionError::Serialization(format!("reading output count: {}", e)))?;
        let mut outputs = Vec::with_capacity(output_count.value().min(1024) as usize);
        for _ in 0..output_count.value() {
            outputs.push(TxOut::read_from(reader)?);
        }

        let lock_time = reader
            .read_u32_le()
            .map_err(|e| TransactionError::Serialization(format!("reading lock time: {}", e)))?;

        Ok(Transaction {
            version,
            inputs,
            outputs,
            lock_time,
            unspents: Vec::new(),
        })
    }

    // -----------------------------------------------------------------
    // Serialization
    // -----------------------------------------------------------------

    /// Serialize into the canonical wire format.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut writer = ByteWriter::with_capacity(256);
        self.write_to(&mut writer);
        writer.into_bytes()
    }

    /// Serialize into a writer.
    pub fn write_to(&self, writer: &mut ByteWriter) {
        writer.write_u32_le(self.version);
        writer.write_varint(VarInt::from(self.inputs.len()));
        for input in &self.inputs {
            input.write_to(writer);
        }
        writer.write_varint(VarInt::from(self.outputs.len()));
        for output in &self.outputs {
            output.write_to(writer);
        }
        writer.write_u32_le(self.lock_time);
    }

    /// Serialize with the fixture extension: attached spendables after
    /// the lock time. Never part of the signed/hashed form.
    pub fn to_bytes_with_unspents(&self) -> Vec<u8> {
        let mut writer = ByteWriter::with_capacity(256);
        self.write_to(&mut writer);
        for spendable in &self.unspents {
            spendable.write_to(&mut writer);
        }
        writer.into_bytes()
    }

    /// Serialize to lowercase hex.
    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    // -----------------------------------------------------------------
    // Identity
    // -----------------------------------------------------------------

    /// The transaction id: double SHA-256 of the canonical
    /// serialization, in internal byte order.
    pub fn tx_id(&self) -> [u8; 32] {
        sha256d(&self.to_bytes())
    }

    /// The transaction id as a display hex string (byte-reversed).
    pub fn tx_id_hex(&self) -> String {
        let mut id = self.tx_id();
        id.reverse();
        hex::encode(id)
    }

    // -----------------------------------------------------------------
    // Attached spendables
    // -----------------------------------------------------------------

    /// Attach prior outputs, one per input by position.
    pub fn set_unspents(&mut self, unspents: Vec<Spendable>) -> Result<(), TransactionError> {
        if unspents.len() != self.inputs.len() {
            return Err(TransactionError::Signing(format!(
                "{} unspents for {} inputs",
                unspents.len(),
                self.inputs.len()
            )));
        }
        self.unspents = unspents;
        Ok(())
    }

    /// The attached prior output for an input, if any.
    pub fn unspent_for(&self, input_index: usize) -> Option<&Spendable> {
        self.unspents.get(input_index)
    }

    /// View this transaction's outputs as spendables of its own id,
    /// ready to attach to a child transaction.
    pub fn outputs_as_spendables(&self) -> Vec<Spendable> {
        let txid = self.tx_id();
        self.outputs
            .iter()
            .enumerate()
            .map(|(i, out)| {
                Spendable::new(out.value, out.script_pubkey.clone(), txid, i as u32)
            })
            .collect()
    }

    // -----------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------

    /// Return true if the single input is the coinbase sentinel.
    pub fn is_coinbase(&self) -> bool {
        self.inputs.len() == 1 && self.inputs[0].is_coinbase()
    }

    /// Serialized size in bytes.
    pub fn size(&self) -> usize {
        self.to_bytes().len()
    }

    /// Sum of output values.
    pub fn total_out(&self) -> i64 {
        self.outputs.iter().map(|o| o.value).sum()
    }
}

impl Default for Transaction {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for Transaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}
