use network_types::tcp::TcpHdr;

use super::{be_u16, be_u32, require};
use crate::error::{DecodeError, DecodeResult, Layer};

pub const FIN: u8 = 0x01;
pub const SYN: u8 = 0x02;
pub const RST: u8 = 0x04;
pub const PSH: u8 = 0x08;
pub const ACK: u8 = 0x10;
pub const URG: u8 = 0x20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TcpHeader {
    pub src_port: u16,
    pub dst_port: u16,
    pub seq: u32,
    pub ack: u32,
    /// Data offset in bytes, options included.
    pub header_len: usize,
    pub flags: u8,
    pub window: u16,
    pub checksum: u16,
}

impl TcpHeader {
    pub const MIN_LEN: usize = TcpHdr::LEN;

    #[inline]
    pub fn has(&self, flag: u8) -> bool {
        self.flags & flag != 0
    }
}

pub fn decode(data: &[u8]) -> DecodeResult<(TcpHeader, &[u8])> {
    require(data, TcpHeader::MIN_LEN, Layer::Tcp)?;

    let header_len = ((data[12] >> 4) as usize) * 4;
    if header_len < TcpHeader::MIN_LEN || header_len > data.len() {
        return Err(DecodeError::InvalidLength {
            layer: Layer::Tcp,
            declared: header_len,
            available: data.len(),
        });
    }

    let header = TcpHeader {
        src_port: be_u16(data, 0),
        dst_port: be_u16(data, 2),
        seq: be_u32(data, 4),
        ack: be_u32(data, 8),
        header_len,
        flags: data[13] & 0x3f,
        window: be_u16(data, 14),
        checksum: be_u16(data, 16),
    };

    Ok((header, &data[header_len..]))
}

#[cfg(test)]
mod test {
    use super::{decode, ACK, FIN, PSH, RST, SYN, URG};
    use crate::error::{DecodeError, Layer};

    fn segment(offset: u8) -> Vec<u8> {
        vec![
            0x01, 0xbb, 0xd4, 0x31, 0x00, 0x00, 0x10, 0x00, 0x00, 0x00, 0x20, 0x01, offset << 4,
            0x18, 0xff, 0xff, 0xbe, 0xef, 0x00, 0x00,
        ]
    }

    #[test]
    fn test_decode_tcp() {
        let mut pkt = segment(5);
        pkt.extend_from_slice(b"GET / HTTP/1.1");

        let (header, tail) = decode(&pkt).unwrap();
        assert_eq!(header.src_port, 443);
        assert_eq!(header.dst_port, 54321);
        assert_eq!(header.seq, 0x1000);
        assert_eq!(header.ack, 0x2001);
        assert_eq!(header.header_len, 20);
        assert!(header.has(PSH) && header.has(ACK) && !header.has(SYN));
        assert_eq!(header.window, 0xffff);
        assert_eq!(header.checksum, 0xbeef);
        assert_eq!(tail, b"GET / HTTP/1.1");

        let mut pkt = segment(5);
        pkt[13] = 0xe5;
        let (header, _) = decode(&pkt).unwrap();
        assert_eq!(header.flags, FIN | RST | URG);
        assert!(!header.has(ACK));
    }

    #[test]
    fn test_data_offset_bounds() {
        assert!(matches!(
            decode(&segment(4)),
            Err(DecodeError::InvalidLength { layer: Layer::Tcp, declared: 16, .. })
        ));
        assert!(matches!(
            decode(&segment(15)),
            Err(DecodeError::InvalidLength { declared: 60, available: 20, .. })
        ));
        assert!(matches!(
            decode(&segment(5)[..12]),
            Err(DecodeError::TooShort { layer: Layer::Tcp, .. })
        ));
    }
}
