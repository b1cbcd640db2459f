use super::{be_u16, require};
use crate::error::{DecodeResult, Layer};

/// Type and code of an ICMP or IGMP message. The checksum is present only
/// when the first four bytes were captured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IcmpHeader {
    pub msg_type: u8,
    pub code: u8,
    pub checksum: Option<u16>,
}

impl IcmpHeader {
    pub const MIN_LEN: usize = 2;
    pub const LEN: usize = 4;
}

/// `layer` is [`Layer::Icmp`] or [`Layer::Igmp`]; both share the layout of
/// their first four bytes.
pub fn decode(data: &[u8], layer: Layer) -> DecodeResult<(IcmpHeader, &[u8])> {
    require(data, IcmpHeader::MIN_LEN, layer)?;

    if data.len() < IcmpHeader::LEN {
        let header = IcmpHeader {
            msg_type: data[0],
            code: data[1],
            checksum: None,
        };
        return Ok((header, &data[IcmpHeader::MIN_LEN..]));
    }

    let header = IcmpHeader {
        msg_type: data[0],
        code: data[1],
        checksum: Some(be_u16(data, 2)),
    };

    Ok((header, &data[IcmpHeader::LEN..]))
}
