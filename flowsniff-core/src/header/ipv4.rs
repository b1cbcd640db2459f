use network_types::ip::Ipv4Hdr;

use super::{be_u16, octets, require};
use crate::{
    addr::NetAddr,
    error::{DecodeError, DecodeResult, Layer},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ipv4Header {
    pub version: u8,
    /// IHL in bytes, options included.
    pub header_len: usize,
    pub total_len: u16,
    pub ttl: u8,
    pub protocol: u8,
    pub src: [u8; 4],
    pub dst: [u8; 4],
}

impl Ipv4Header {
    pub const MIN_LEN: usize = Ipv4Hdr::LEN;

    pub fn src_addr(&self) -> NetAddr {
        NetAddr::V4(self.src)
    }

    pub fn dst_addr(&self) -> NetAddr {
        NetAddr::V4(self.dst)
    }
}

pub fn decode(data: &[u8]) -> DecodeResult<(Ipv4Header, &[u8])> {
    require(data, Ipv4Header::MIN_LEN, Layer::Ipv4)?;

    let version = data[0] >> 4;
    if version != 4 {
        return Err(DecodeError::InvalidVersion {
            layer: Layer::Ipv4,
            expected: 4,
            found: version,
        });
    }

    let header_len = ((data[0] & 0x0f) as usize) * 4;
    if header_len < Ipv4Header::MIN_LEN || header_len > data.len() {
        return Err(DecodeError::InvalidLength {
            layer: Layer::Ipv4,
            declared: header_len,
            available: data.len(),
        });
    }

    let header = Ipv4Header {
        version,
        header_len,
        total_len: be_u16(data, 2),
        ttl: data[8],
        protocol: data[9],
        src: octets(data, 12),
        dst: octets(data, 16),
    };

    Ok((header, &data[header_len..]))
}
