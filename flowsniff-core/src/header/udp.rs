use network_types::udp::UdpHdr;

use super::{be_u16, require};
use crate::error::{DecodeResult, Layer};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UdpHeader {
    pub src_port: u16,
    pub dst_port: u16,
    /// Declared datagram length, not checked against the capture.
    pub length: u16,
}

impl UdpHeader {
    pub const LEN: usize = UdpHdr::LEN;
}

pub fn decode(data: &[u8]) -> DecodeResult<(UdpHeader, &[u8])> {
    require(data, UdpHeader::LEN, Layer::Udp)?;

    let header = UdpHeader {
        src_port: be_u16(data, 0),
        dst_port: be_u16(data, 2),
        length: be_u16(data, 4),
    };

    Ok((header, &data[UdpHeader::LEN..]))
}

#[cfg(test)]
mod test {
    use super::decode;

    #[test]
    fn test_decode_udp() {
        let pkt = [0xc3, 0x50, 0x00, 0x35, 0x00, 0x0c, 0x00, 0x00, 0xab, 0xcd, 0x01, 0x00];
        let (header, tail) = decode(&pkt).unwrap();
        assert_eq!(header.src_port, 50000);
        assert_eq!(header.dst_port, 53);
        assert_eq!(header.length, 12);
        assert_eq!(tail, &[0xab, 0xcd, 0x01, 0x00]);

        assert!(decode(&pkt[..7]).is_err());
    }
}
