//! Stateless header decoders.
//!
//! Every decoder takes the undecoded remainder of a frame and returns the
//! parsed header together with the bytes that follow it. Length fields read
//! from the wire are checked against the slice before they are used, so no
//! decoder ever indexes past the input.

pub mod ethernet;
pub mod icmp;
pub mod ipv4;
pub mod ipv6;
pub mod tcp;
pub mod udp;

pub use ethernet::EthernetHeader;
pub use icmp::IcmpHeader;
pub use ipv4::Ipv4Header;
pub use ipv6::Ipv6Header;
pub use tcp::TcpHeader;
pub use udp::UdpHeader;

use crate::error::{DecodeError, DecodeResult, Layer};

#[inline]
pub(crate) fn require(data: &[u8], needed: usize, layer: Layer) -> DecodeResult<()> {
    if data.len() < needed {
        return Err(DecodeError::too_short(layer, needed, data.len()));
    }
    Ok(())
}

// Callers must have checked `offset + 2 <= data.len()`.
#[inline]
pub(crate) fn be_u16(data: &[u8], offset: usize) -> u16 {
    u16::from_be_bytes([data[offset], data[offset + 1]])
}

#[inline]
pub(crate) fn be_u32(data: &[u8], offset: usize) -> u32 {
    u32::from_be_bytes([
        data[offset],
        data[offset + 1],
        data[offset + 2],
        data[offset + 3],
    ])
}

#[inline]
pub(crate) fn octets<const N: usize>(data: &[u8], offset: usize) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&data[offset..offset + N]);
    out
}
