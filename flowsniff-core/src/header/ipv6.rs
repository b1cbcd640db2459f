use network_types::ip::Ipv6Hdr;

use super::{be_u16, be_u32, octets, require};
use crate::{
    addr::NetAddr,
    error::{DecodeError, DecodeResult, Layer},
};

/// Fixed IPv6 header. Extension headers are not walked; their protocol
/// number surfaces as `next_header`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ipv6Header {
    pub version: u8,
    pub traffic_class: u8,
    pub flow_label: u32,
    pub payload_len: u16,
    pub next_header: u8,
    pub hop_limit: u8,
    pub src: [u8; 16],
    pub dst: [u8; 16],
}

impl Ipv6Header {
    pub const LEN: usize = Ipv6Hdr::LEN;

    pub fn src_addr(&self) -> NetAddr {
        NetAddr::V6(self.src)
    }

    pub fn dst_addr(&self) -> NetAddr {
        NetAddr::V6(self.dst)
    }
}

pub fn decode(data: &[u8]) -> DecodeResult<(Ipv6Header, &[u8])> {
    require(data, Ipv6Header::LEN, Layer::Ipv6)?;

    let word = be_u32(data, 0);
    let version = (word >> 28) as u8;
    if version != 6 {
        return Err(DecodeError::InvalidVersion {
            layer: Layer::Ipv6,
            expected: 6,
            found: version,
        });
    }

    let header = Ipv6Header {
        version,
        traffic_class: ((word >> 20) & 0xff) as u8,
        flow_label: word & 0x000f_ffff,
        payload_len: be_u16(data, 4),
        next_header: data[6],
        hop_limit: data[7],
        src: octets(data, 8),
        dst: octets(data, 24),
    };

    Ok((header, &data[Ipv6Header::LEN..]))
}
