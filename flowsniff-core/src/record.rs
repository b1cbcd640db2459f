use chrono::{DateTime, Local};
use serde::Serialize;

use crate::{
    addr::{MacAddr, NetAddr},
    error::{ErrorKind, Layer},
};

/// One link-layer frame as handed over by the capture collaborator.
#[derive(Debug, Clone)]
pub struct RawFrame {
    pub data: Vec<u8>,
    /// Length reported by the capture source; may differ from `data.len()`
    /// when the frame was truncated by the snap length.
    pub captured_len: usize,
    pub timestamp: DateTime<Local>,
}

impl RawFrame {
    pub fn new(data: Vec<u8>, timestamp: DateTime<Local>) -> Self {
        let captured_len = data.len();
        Self {
            data,
            captured_len,
            timestamp,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum NetworkProto {
    Ipv4,
    Ipv6,
    /// Unrecognised EtherType, host byte order.
    Other(u16),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransportProto {
    Tcp,
    Udp,
    Icmp,
    Igmp,
    Other,
    None,
}

impl TransportProto {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransportProto::Tcp => "TCP",
            TransportProto::Udp => "UDP",
            TransportProto::Icmp => "ICMP",
            TransportProto::Igmp => "IGMP",
            TransportProto::Other => "OTHER",
            TransportProto::None => "NONE",
        }
    }
}

/// Application-level tag assigned by the payload classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AppClass {
    Http,
    Tls,
    Dns,
    Unclassified,
    /// No transport header was decoded.
    None,
}

impl AppClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppClass::Http => "HTTP",
            AppClass::Tls => "TLS",
            AppClass::Dns => "DNS",
            AppClass::Unclassified => "UNCLASSIFIED",
            AppClass::None => "NONE",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Outcome {
    Success,
    Malformed { layer: Layer, kind: ErrorKind },
    Unsupported { layer: Layer, protocol: u16 },
}

/// Terminal output of one pipeline cycle.
///
/// Fields that a frame never reached stay `None`; a malformed Ethernet frame
/// carries nothing but its length and outcome.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecodedRecord {
    /// Arrival order within the session, starting at zero.
    pub index: u64,
    pub timestamp: DateTime<Local>,
    pub len: usize,

    pub src_mac: Option<MacAddr>,
    pub dst_mac: Option<MacAddr>,
    pub ether_type: Option<u16>,

    pub network: Option<NetworkProto>,
    pub src_ip: Option<NetAddr>,
    pub dst_ip: Option<NetAddr>,
    /// TTL for IPv4, hop limit for IPv6.
    pub ttl: Option<u8>,

    pub transport: TransportProto,
    pub src_port: Option<u16>,
    pub dst_port: Option<u16>,
    pub tcp_seq: Option<u32>,
    pub tcp_ack: Option<u32>,
    pub tcp_flags: Option<u8>,
    pub tcp_checksum: Option<u16>,
    pub icmp_type: Option<u8>,
    pub icmp_code: Option<u8>,

    pub app: AppClass,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub signatures: Vec<String>,
    pub outcome: Outcome,
}

impl DecodedRecord {
    pub(crate) fn empty(index: u64, frame: &RawFrame) -> Self {
        Self {
            index,
            timestamp: frame.timestamp,
            len: frame.captured_len,
            src_mac: None,
            dst_mac: None,
            ether_type: None,
            network: None,
            src_ip: None,
            dst_ip: None,
            ttl: None,
            transport: TransportProto::None,
            src_port: None,
            dst_port: None,
            tcp_seq: None,
            tcp_ack: None,
            tcp_flags: None,
            tcp_checksum: None,
            icmp_type: None,
            icmp_code: None,
            app: AppClass::None,
            signatures: Vec::new(),
            outcome: Outcome::Success,
        }
    }

    pub fn matched(&self, signature: &str) -> bool {
        self.signatures.iter().any(|s| s == signature)
    }
}
