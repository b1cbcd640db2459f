use log::trace;
use network_types::ip::IpProto;

use crate::{
    error::{DecodeError, Layer},
    header::{
        ethernet::{self, ETHERTYPE_IPV4, ETHERTYPE_IPV6},
        icmp, ipv4, ipv6, tcp, udp, EthernetHeader, IcmpHeader, Ipv4Header, Ipv6Header,
        TcpHeader, UdpHeader,
    },
    record::Outcome,
};

const PROTO_ICMP: u8 = IpProto::Icmp as u8;
const PROTO_IGMP: u8 = IpProto::Igmp as u8;
const PROTO_TCP: u8 = IpProto::Tcp as u8;
const PROTO_UDP: u8 = IpProto::Udp as u8;

/// The decoder selected for the next layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextLayer {
    Ipv4,
    Ipv6,
    Tcp,
    Udp,
    Icmp,
    Igmp,
    Unsupported(u16),
}

#[inline]
pub fn route_ether_type(ether_type: u16) -> NextLayer {
    match ether_type {
        ETHERTYPE_IPV4 => NextLayer::Ipv4,
        ETHERTYPE_IPV6 => NextLayer::Ipv6,
        other => NextLayer::Unsupported(other),
    }
}

#[inline]
pub fn route_ip_proto(proto: u8) -> NextLayer {
    match proto {
        PROTO_TCP => NextLayer::Tcp,
        PROTO_UDP => NextLayer::Udp,
        PROTO_ICMP => NextLayer::Icmp,
        PROTO_IGMP => NextLayer::Igmp,
        other => NextLayer::Unsupported(other as u16),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Network {
    Ipv4(Ipv4Header),
    Ipv6(Ipv6Header),
}

impl Network {
    pub fn layer(&self) -> Layer {
        match self {
            Network::Ipv4(_) => Layer::Ipv4,
            Network::Ipv6(_) => Layer::Ipv6,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Tcp(TcpHeader),
    Udp(UdpHeader),
    Icmp(IcmpHeader),
    Igmp(IcmpHeader),
}

impl Transport {
    pub fn ports(&self) -> Option<(u16, u16)> {
        match self {
            Transport::Tcp(h) => Some((h.src_port, h.dst_port)),
            Transport::Udp(h) => Some((h.src_port, h.dst_port)),
            Transport::Icmp(_) | Transport::Igmp(_) => None,
        }
    }
}

/// Every header decoded from one frame, plus whatever bytes remain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dissection<'a> {
    pub ethernet: Option<EthernetHeader>,
    pub network: Option<Network>,
    pub transport: Option<Transport>,
    /// Undecoded bytes after the deepest header that was decoded.
    pub payload: &'a [u8],
    pub outcome: Outcome,
}

impl<'a> Dissection<'a> {
    fn new(frame: &'a [u8]) -> Self {
        Self {
            ethernet: None,
            network: None,
            transport: None,
            payload: frame,
            outcome: Outcome::Success,
        }
    }

    fn malformed(mut self, err: DecodeError) -> Self {
        self.outcome = Outcome::Malformed {
            layer: err.layer(),
            kind: err.kind(),
        };
        self
    }

    fn unsupported(mut self, layer: Layer, protocol: u16) -> Self {
        trace!("unsupported protocol {:#06x} above {} header", protocol, layer);
        self.outcome = Outcome::Unsupported { layer, protocol };
        self
    }
}

/// Decodes a link-layer frame layer by layer, stopping at the first
/// malformed header or unrecognised protocol number.
pub fn dissect(frame: &[u8]) -> Dissection<'_> {
    let mut out = Dissection::new(frame);

    let (eth, rest) = match ethernet::decode(frame) {
        Ok(v) => v,
        Err(e) => return out.malformed(e),
    };
    out.ethernet = Some(eth);
    out.payload = rest;

    let decoded = match route_ether_type(eth.ether_type) {
        NextLayer::Ipv4 => ipv4::decode(rest).map(|(h, tail)| (Network::Ipv4(h), h.protocol, tail)),
        NextLayer::Ipv6 => {
            ipv6::decode(rest).map(|(h, tail)| (Network::Ipv6(h), h.next_header, tail))
        }
        _ => return out.unsupported(Layer::Ethernet, eth.ether_type),
    };
    let (network, proto, rest) = match decoded {
        Ok(v) => v,
        Err(e) => return out.malformed(e),
    };
    out.network = Some(network);
    out.payload = rest;

    let decoded = match route_ip_proto(proto) {
        NextLayer::Tcp => tcp::decode(rest).map(|(h, tail)| (Transport::Tcp(h), tail)),
        NextLayer::Udp => udp::decode(rest).map(|(h, tail)| (Transport::Udp(h), tail)),
        NextLayer::Icmp => {
            icmp::decode(rest, Layer::Icmp).map(|(h, tail)| (Transport::Icmp(h), tail))
        }
        NextLayer::Igmp => {
            icmp::decode(rest, Layer::Igmp).map(|(h, tail)| (Transport::Igmp(h), tail))
        }
        _ => return out.unsupported(network.layer(), proto as u16),
    };
    match decoded {
        Ok((transport, tail)) => {
            out.transport = Some(transport);
            out.payload = tail;
        }
        Err(e) => return out.malformed(e),
    }

    out
}
