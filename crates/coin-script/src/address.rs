/// Address encoding at the outer API edge.
///
/// The validation core only ever handles 20-byte hashes and raw
/// scripts; Base58Check address text exists for display, test
/// fixtures, and the signer-introspection identities. Network prefix
/// bytes are configuration, including the Litecoin extension.

use std::fmt;

use coin_primitives::hash::{hash160, sha256d};

use crate::ScriptError;

/// Networks with configured address prefixes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Network {
    Mainnet,
    Testnet,
    LitecoinMainnet,
    LitecoinTestnet,
}

/// What the encoded 20-byte hash commits to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AddressKind {
    /// Hash160 of a public key (pay-to-pubkey-hash).
    PubkeyHash,
    /// Hash160 of a redeem script (pay-to-script-hash).
    ScriptHash,
}

/// Per-network address version bytes.
fn pubkey_hash_prefix(network: Network) -> u8 {
    match network {
        Network::Mainnet => 0x00,
        Network::Testnet => 0x6f,
        Network::LitecoinMainnet => 0x30,
        // Unverified: the upstream author could not find a reference
        // for the Litecoin testnet prefix and guessed the Bitcoin
        // testnet value. Kept as configuration, not as fact.
        Network::LitecoinTestnet => 0x6f,
    }
}

fn script_hash_prefix(network: Network) -> Option<u8> {
    match network {
        Network::Mainnet => Some(0x05),
        Network::Testnet => Some(0xc4),
        // No pay-to-script prefix configured for the Litecoin extension.
        Network::LitecoinMainnet | Network::LitecoinTestnet => None,
    }
}

/// A Base58Check address wrapping a 20-byte hash.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Address {
    /// The 20-byte Hash160 payload.
    pub hash: [u8; 20],
    /// Whether the hash commits to a public key or a script.
    pub kind: AddressKind,
    /// The network whose prefix the address carries.
    pub network: Network,
}

impl Address {
    /// Parse a Base58Check address string.
    ///
    /// Validates the checksum and recognizes the version byte against
    /// the configured network prefixes (Bitcoin networks only; the
    /// Litecoin pubkey prefixes collide with none of them).
    pub fn from_string(addr: &str) -> Result<Self, ScriptError> {
        let decoded = bs58::decode(addr)
            .into_vec()
            .map_err(|_| ScriptError::InvalidAddress(format!("bad char in '{}'", addr)))?;
        if decoded.len() != 25 {
            return Err(ScriptError::InvalidAddressLength(addr.to_string()));
        }

        let checksum = sha256d(&decoded[..21]);
        if decoded[21..25] != checksum[..4] {
            return Err(ScriptError::ChecksumFailed);
        }

        let (network, kind) = match decoded[0] {
            0x00 => (Network::Mainnet, AddressKind::PubkeyHash),
            0x05 => (Network::Mainnet, AddressKind::ScriptHash),
            0x6f => (Network::Testnet, AddressKind::PubkeyHash),
            0xc4 => (Network::Testnet, AddressKind::ScriptHash),
            0x30 => (Network::LitecoinMainnet, AddressKind::PubkeyHash),
            other => return Err(ScriptError::UnsupportedAddressVersion(other)),
        };

        let mut hash = [0u8; 20];
        hash.copy_from_slice(&decoded[1..21]);
        Ok(Address { hash, kind, network })
    }

    /// Create a pay-to-pubkey-hash address from a 20-byte hash.
    pub fn from_pubkey_hash(hash: &[u8; 20], network: Network) -> Self {
        Address {
            hash: *hash,
            kind: AddressKind::PubkeyHash,
            network,
        }
    }

    /// Create a pay-to-script-hash address from a 20-byte hash.
    pub fn from_script_hash(hash: &[u8; 20], network: Network) -> Self {
        Address {
            hash: *hash,
            kind: AddressKind::ScriptHash,
            network,
        }
    }

    /// Derive the address of a public key (its Hash160).
    pub fn for_public_key(sec: &[u8], network: Network) -> Self {
        Self::from_pubkey_hash(&hash160(sec), network)
    }

    /// Derive the pay-to-script address of a serialized redeem script.
    pub fn for_script(script_bytes: &[u8], network: Network) -> Self {
        Self::from_script_hash(&hash160(script_bytes), network)
    }

    /// Encode as a Base58Check string.
    pub fn encode(&self) -> String {
        let version = match self.kind {
            AddressKind::PubkeyHash => pubkey_hash_prefix(self.network),
            AddressKind::ScriptHash => {
                script_hash_prefix(self.network).unwrap_or(pubkey_hash_prefix(self.network))
            }
        };
        let mut payload = Vec::with_capacity(25);
        payload.push(version);
        payload.extend_from_slice(&self.hash);
        let checksum = sha256d(&payload);
        payload.extend_from_slice(&checksum[..4]);
        bs58::encode(payload).into_string()
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.encode())
    }
}
