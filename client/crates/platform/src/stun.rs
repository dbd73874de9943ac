//! STUN Binding Codec (RFC 5389)
//!
//! Just enough of STUN to ask a server for our server-reflexive address:
//! encode a Binding Request, decode the matching Binding Success Response.
//! No authentication, no FINGERPRINT attribute, no retransmission.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

use thiserror::Error;

use crate::crypto::random_bytes;

/// Fixed magic cookie carried in every RFC 5389 header
pub const MAGIC_COOKIE: u32 = 0x2112_A442;

/// STUN header length in bytes
pub const HEADER_LEN: usize = 20;

const BINDING_REQUEST: u16 = 0x0001;
const BINDING_SUCCESS: u16 = 0x0101;
const BINDING_ERROR: u16 = 0x0111;

const ATTR_MAPPED_ADDRESS: u16 = 0x0001;
const ATTR_XOR_MAPPED_ADDRESS: u16 = 0x0020;

const FAMILY_IPV4: u8 = 0x01;
const FAMILY_IPV6: u8 = 0x02;

/// STUN decoding errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StunError {
    #[error("STUN message truncated ({0} bytes)")]
    Truncated(usize),

    #[error("Not a STUN message (bad magic cookie)")]
    BadMagicCookie,

    #[error("Unexpected STUN message type 0x{0:04x}")]
    UnexpectedType(u16),

    #[error("STUN server returned an error response")]
    ErrorResponse,

    #[error("STUN transaction id mismatch")]
    TransactionMismatch,

    #[error("Malformed STUN attribute 0x{0:04x}")]
    MalformedAttribute(u16),

    #[error("STUN response carries no mapped address")]
    NoMappedAddress,
}

/// 96-bit STUN transaction identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransactionId([u8; 12]);

impl TransactionId {
    pub fn new(bytes: [u8; 12]) -> Self {
        Self(bytes)
    }

    /// Fresh random transaction id
    pub fn random() -> Self {
        let mut id = [0u8; 12];
        id.copy_from_slice(&random_bytes(12));
        Self(id)
    }

    pub fn as_bytes(&self) -> &[u8; 12] {
        &self.0
    }
}

/// Encode a Binding Request with no attributes
pub fn encode_binding_request(transaction_id: &TransactionId) -> [u8; HEADER_LEN] {
    let mut buf = [0u8; HEADER_LEN];
    buf[0..2].copy_from_slice(&BINDING_REQUEST.to_be_bytes());
    // Message length stays 0
    buf[4..8].copy_from_slice(&MAGIC_COOKIE.to_be_bytes());
    buf[8..20].copy_from_slice(transaction_id.as_bytes());
    buf
}

/// Decode a Binding Success Response and return the mapped address
///
/// XOR-MAPPED-ADDRESS wins over the legacy MAPPED-ADDRESS when both are
/// present.
pub fn decode_binding_response(
    packet: &[u8],
    transaction_id: &TransactionId,
) -> Result<SocketAddr, StunError> {
    if packet.len() < HEADER_LEN {
        return Err(StunError::Truncated(packet.len()));
    }

    let message_type = u16::from_be_bytes([packet[0], packet[1]]);
    let message_len = u16::from_be_bytes([packet[2], packet[3]]) as usize;
    let cookie = u32::from_be_bytes([packet[4], packet[5], packet[6], packet[7]]);

    if cookie != MAGIC_COOKIE {
        return Err(StunError::BadMagicCookie);
    }
    if &packet[8..20] != transaction_id.as_bytes() {
        return Err(StunError::TransactionMismatch);
    }
    match message_type {
        BINDING_SUCCESS => {}
        BINDING_ERROR => return Err(StunError::ErrorResponse),
        other => return Err(StunError::UnexpectedType(other)),
    }
    if packet.len() < HEADER_LEN + message_len {
        return Err(StunError::Truncated(packet.len()));
    }

    let mut attrs = &packet[HEADER_LEN..HEADER_LEN + message_len];
    let mut mapped = None;
    let mut xor_mapped = None;

    while attrs.len() >= 4 {
        let attr_type = u16::from_be_bytes([attrs[0], attrs[1]]);
        let attr_len = u16::from_be_bytes([attrs[2], attrs[3]]) as usize;
        let padded = (attr_len + 3) & !3;
        if attrs.len() < 4 + attr_len {
            return Err(StunError::MalformedAttribute(attr_type));
        }
        let value = &attrs[4..4 + attr_len];

        match attr_type {
            ATTR_MAPPED_ADDRESS => mapped = Some(parse_address(attr_type, value, None)?),
            ATTR_XOR_MAPPED_ADDRESS => {
                xor_mapped = Some(parse_address(attr_type, value, Some(transaction_id))?)
            }
            _ => {}
        }

        attrs = &attrs[(4 + padded).min(attrs.len())..];
    }

    xor_mapped.or(mapped).ok_or(StunError::NoMappedAddress)
}

/// Parse a (XOR-)MAPPED-ADDRESS value; `xor` carries the transaction id
fn parse_address(
    attr_type: u16,
    value: &[u8],
    xor: Option<&TransactionId>,
) -> Result<SocketAddr, StunError> {
    if value.len() < 4 {
        return Err(StunError::MalformedAttribute(attr_type));
    }
    let family = value[1];
    let mut port = u16::from_be_bytes([value[2], value[3]]);
    if xor.is_some() {
        port ^= (MAGIC_COOKIE >> 16) as u16;
    }

    let ip = match (family, value.len()) {
        (FAMILY_IPV4, 8) => {
            let mut octets = [value[4], value[5], value[6], value[7]];
            if xor.is_some() {
                for (octet, mask) in octets.iter_mut().zip(MAGIC_COOKIE.to_be_bytes()) {
                    *octet ^= mask;
                }
            }
            IpAddr::V4(Ipv4Addr::from(octets))
        }
        (FAMILY_IPV6, 20) => {
            let mut octets = [0u8; 16];
            octets.copy_from_slice(&value[4..20]);
            if let Some(transaction_id) = xor {
                let mut mask = [0u8; 16];
                mask[..4].copy_from_slice(&MAGIC_COOKIE.to_be_bytes());
                mask[4..].copy_from_slice(transaction_id.as_bytes());
                for (octet, m) in octets.iter_mut().zip(mask) {
                    *octet ^= m;
                }
            }
            IpAddr::V6(Ipv6Addr::from(octets))
        }
        _ => return Err(StunError::MalformedAttribute(attr_type)),
    };

    Ok(SocketAddr::new(ip, port))
}
