use network_types::eth::EthHdr;

use super::{be_u16, octets, require};
use crate::{addr::MacAddr, error::DecodeResult, error::Layer};

pub const ETHERTYPE_IPV4: u16 = 0x0800;
pub const ETHERTYPE_IPV6: u16 = 0x86DD;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EthernetHeader {
    pub dst: MacAddr,
    pub src: MacAddr,
    /// Host byte order.
    pub ether_type: u16,
}

impl EthernetHeader {
    pub const LEN: usize = EthHdr::LEN;
}

pub fn decode(data: &[u8]) -> DecodeResult<(EthernetHeader, &[u8])> {
    require(data, EthernetHeader::LEN, Layer::Ethernet)?;

    let header = EthernetHeader {
        dst: MacAddr(octets(data, 0)),
        src: MacAddr(octets(data, 6)),
        ether_type: be_u16(data, 12),
    };

    Ok((header, &data[EthernetHeader::LEN..]))
}
