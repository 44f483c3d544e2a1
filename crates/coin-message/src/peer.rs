//! Network address records.
//!
//! A peer address is a services bitfield, a 16-byte IP (IPv4 addresses
//! are carried in their IPv4-mapped form), and a port. Records order
//! by their encoded IP bytes, then port, then services.

use std::cmp::Ordering;
use std::fmt;

use coin_primitives::util::{ByteReader, ByteWriter};

use crate::MessageError;

/// The 12-byte prefix of an IPv4-mapped IPv6 address.
pub const IP4_HEADER: [u8; 12] = [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0xff, 0xff];

/// A peer network address record.
///
/// # Wire format
///
/// | Field    | Size            |
/// |----------|-----------------|
/// | services | 8 bytes (LE)    |
/// | ip       | 16 bytes        |
/// | port     | 2 bytes (BE)    |
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PeerAddress {
    /// Service bits advertised by the peer.
    pub services: u64,
    /// The peer IP in 16-byte form.
    pub ip: [u8; 16],
    /// TCP port, in host order.
    pub port: u16,
}

impl PeerAddress {
    /// Create a record from a 16-byte IP.
    pub fn new(services: u64, ip: [u8; 16], port: u16) -> Self {
        PeerAddress { services, ip, port }
    }

    /// Create a record from an IPv4 address, mapping it into the
    /// 16-byte form.
    pub fn ipv4(services: u64, ip4: [u8; 4], port: u16) -> Self {
        let mut ip = [0u8; 16];
        ip[..12].copy_from_slice(&IP4_HEADER);
        ip[12..].copy_from_slice(&ip4);
        PeerAddress { services, ip, port }
    }

    /// Return true if the IP is an IPv4-mapped address.
    pub fn is_ipv4(&self) -> bool {
        self.ip[..12] == IP4_HEADER
    }

    /// Render the host: dotted quad for IPv4-mapped addresses,
    /// colon-separated uncompressed hex groups otherwise.
    pub fn host(&self) -> String {
        if self.is_ipv4() {
            ip_to_ip4_string(&self.ip[12..])
        } else {
            ip_to_ip6_string(&self.ip)
        }
    }

    /// Serialize into a writer.
    pub fn write_to(&self, writer: &mut ByteWriter) {
        writer.write_u64_le(self.services);
        writer.write_bytes(&self.ip);
        writer.write_u16_be(self.port);
    }

    /// Serialize into a new byte vector.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut writer = ByteWriter::with_capacity(26);
        self.write_to(&mut writer);
        writer.into_bytes()
    }

    /// Deserialize from a reader.
    pub fn read_from(reader: &mut ByteReader) -> Result<Self, MessageError> {
        let services = reader.read_u64_le()?;
        let ip_bytes = reader.read_bytes(16)?;
        let mut ip = [0u8; 16];
        ip.copy_from_slice(ip_bytes);
        let port = reader.read_u16_be()?;
        Ok(PeerAddress { services, ip, port })
    }

    /// Deserialize from a byte slice.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, MessageError> {
        let mut reader = ByteReader::new(bytes);
        Self::read_from(&mut reader)
    }
}

/// Dotted-quad rendering of a 4-byte IPv4 address.
pub fn ip_to_ip4_string(ip4: &[u8]) -> String {
    format!("{}.{}.{}.{}", ip4[0], ip4[1], ip4[2], ip4[3])
}

/// Uncompressed group rendering of a 16-byte IPv6 address: lowercase
/// hex, no leading zeros, no `::` compression.
pub fn ip_to_ip6_string(ip: &[u8; 16]) -> String {
    (0..8)
        .map(|i| format!("{:x}", u16::from_be_bytes([ip[2 * i], ip[2 * i + 1]])))
        .collect::<Vec<_>>()
        .join(":")
}

impl Ord for PeerAddress {
    fn cmp(&self, other: &Self) -> Ordering {
        self.ip
            .cmp(&other.ip)
            .then(self.port.cmp(&other.port))
            .then(self.services.cmp(&other.services))
    }
}

impl PartialOrd for PeerAddress {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for PeerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.host(), self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ipv6_host_rendering() {
        let ip: [u8; 16] = [
            0x26, 0x07, 0xf8, 0xb0, 0x40, 0x06, 0x08, 0x0a, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x20, 0x0e,
        ];
        assert_eq!(ip_to_ip6_string(&ip), "2607:f8b0:4006:80a:0:0:0:200e");
        let pa = PeerAddress::new(945, ip, 8333);
        assert_eq!(pa.host(), "2607:f8b0:4006:80a:0:0:0:200e");
        assert!(!pa.is_ipv4());
    }

    #[test]
    fn test_ipv4_host_rendering() {
        assert_eq!(ip_to_ip4_string(&[0xc0, 0xa8, 0x01, 0x63]), "192.168.1.99");
        let pa = PeerAddress::ipv4(188, [192, 168, 1, 99], 8333);
        assert!(pa.is_ipv4());
        assert_eq!(pa.host(), "192.168.1.99");
        assert_eq!(format!("{}", pa), "192.168.1.99/8333");
    }

    #[test]
    fn test_wire_roundtrip() {
        for pa in [
            PeerAddress::ipv4(188, [192, 168, 1, 99], 8333),
            PeerAddress::new(945, [0x26; 16], 18333),
        ] {
            let bytes = pa.to_bytes();
            assert_eq!(bytes.len(), 26);
            let decoded = PeerAddress::from_bytes(&bytes).unwrap();
            assert_eq!(decoded, pa);
        }
    }

    #[test]
    fn test_truncated_record() {
        assert!(PeerAddress::from_bytes(&[0u8; 25]).is_err());
    }

    #[test]
    fn test_total_ordering() {
        let pa1 = PeerAddress::ipv4(188, [192, 168, 1, 99], 8333);
        let pa2 = PeerAddress::ipv4(188, [192, 168, 1, 98], 8333);
        assert!(pa1 > pa2);
        assert!(pa1 >= pa2);
        assert!(pa2 < pa1);
        assert!(pa2 <= pa1);
        assert_ne!(pa1, pa2);

        // Same IP orders by port, then services.
        let low_port = PeerAddress::ipv4(188, [192, 168, 1, 99], 8332);
        assert!(low_port < pa1);
        let low_services = PeerAddress::ipv4(1, [192, 168, 1, 99], 8333);
        assert!(low_services < pa1);
    }
}
