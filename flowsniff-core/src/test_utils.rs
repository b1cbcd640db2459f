//! Synthetic frame construction for decoder and pipeline tests.

use chrono::{Local, TimeZone};

use crate::record::RawFrame;

#[derive(Debug, Clone)]
pub struct PacketBuilder {
    src_mac: [u8; 6],
    dst_mac: [u8; 6],
    ether_type: u16,
    ip_version: u8,
    ihl_override: Option<u8>,
    ip_options: Vec<u8>,
    ttl: u8,
    src_v4: [u8; 4],
    dst_v4: [u8; 4],
    src_v6: [u8; 16],
    dst_v6: [u8; 16],
    protocol: u8,
    src_port: u16,
    dst_port: u16,
    seq: u32,
    ack: u32,
    tcp_flags: u8,
    tcp_checksum: u16,
    data_offset_override: Option<u8>,
    icmp_type: u8,
    icmp_code: u8,
    payload: Vec<u8>,
}

impl PacketBuilder {
    fn new(protocol: u8) -> Self {
        let mut src_v6 = [0u8; 16];
        let mut dst_v6 = [0u8; 16];
        src_v6[..2].copy_from_slice(&[0x20, 0x01]);
        src_v6[15] = 1;
        dst_v6[..2].copy_from_slice(&[0x20, 0x01]);
        dst_v6[15] = 2;

        Self {
            src_mac: [0x00, 0x11, 0x22, 0x33, 0x44, 0x55],
            dst_mac: [0x66, 0x77, 0x88, 0x99, 0xaa, 0xbb],
            ether_type: 0x0800,
            ip_version: 4,
            ihl_override: None,
            ip_options: Vec::new(),
            ttl: 64,
            src_v4: [10, 0, 0, 1],
            dst_v4: [10, 0, 0, 2],
            src_v6,
            dst_v6,
            protocol,
            src_port: 12345,
            dst_port: 8080,
            seq: 1,
            ack: 0,
            tcp_flags: 0x18,
            tcp_checksum: 0,
            data_offset_override: None,
            icmp_type: 8,
            icmp_code: 0,
            payload: Vec::new(),
        }
    }

    pub fn tcp() -> Self {
        Self::new(6)
    }

    pub fn udp() -> Self {
        Self::new(17)
    }

    pub fn icmp() -> Self {
        Self::new(1)
    }

    pub fn igmp() -> Self {
        Self::new(2)
    }

    pub fn ether_type(mut self, ether_type: u16) -> Self {
        self.ether_type = ether_type;
        self
    }

    pub fn ipv6(mut self) -> Self {
        self.ip_version = 6;
        self.ether_type = 0x86dd;
        self
    }

    pub fn v4_addrs(mut self, src: [u8; 4], dst: [u8; 4]) -> Self {
        self.src_v4 = src;
        self.dst_v4 = dst;
        self
    }

    pub fn v6_addrs(mut self, src: [u8; 16], dst: [u8; 16]) -> Self {
        self.src_v6 = src;
        self.dst_v6 = dst;
        self
    }

    pub fn protocol(mut self, protocol: u8) -> Self {
        self.protocol = protocol;
        self
    }

    pub fn ports(mut self, src: u16, dst: u16) -> Self {
        self.src_port = src;
        self.dst_port = dst;
        self
    }

    pub fn ttl(mut self, ttl: u8) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn ihl(mut self, words: u8) -> Self {
        self.ihl_override = Some(words);
        self
    }

    pub fn ip_options(mut self, options: &[u8]) -> Self {
        self.ip_options = options.to_vec();
        self
    }

    pub fn seq_ack(mut self, seq: u32, ack: u32) -> Self {
        self.seq = seq;
        self.ack = ack;
        self
    }

    pub fn tcp_checksum(mut self, checksum: u16) -> Self {
        self.tcp_checksum = checksum;
        self
    }

    pub fn data_offset(mut self, words: u8) -> Self {
        self.data_offset_override = Some(words);
        self
    }

    pub fn icmp_type_code(mut self, msg_type: u8, code: u8) -> Self {
        self.icmp_type = msg_type;
        self.icmp_code = code;
        self
    }

    pub fn payload(mut self, payload: &[u8]) -> Self {
        self.payload = payload.to_vec();
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut pkt = Vec::with_capacity(128);
        pkt.extend_from_slice(&self.dst_mac);
        pkt.extend_from_slice(&self.src_mac);
        pkt.extend_from_slice(&self.ether_type.to_be_bytes());

        let l4 = self.build_l4();
        if self.ip_version == 6 {
            self.build_ipv6(&mut pkt, l4.len());
        } else {
            self.build_ipv4(&mut pkt, l4.len());
        }
        pkt.extend_from_slice(&l4);
        pkt
    }

    pub fn frame(&self) -> RawFrame {
        Self::frame_from(self.build())
    }

    pub fn frame_from(data: Vec<u8>) -> RawFrame {
        let timestamp = Local.timestamp_opt(1_700_000_000, 0).unwrap();
        RawFrame::new(data, timestamp)
    }

    fn build_ipv4(&self, pkt: &mut Vec<u8>, l4_len: usize) {
        let header_len = 20 + self.ip_options.len();
        let ihl = self.ihl_override.unwrap_or((header_len / 4) as u8);
        let total_len = (header_len + l4_len) as u16;

        pkt.push(0x40 | (ihl & 0x0f));
        pkt.push(0);
        pkt.extend_from_slice(&total_len.to_be_bytes());
        pkt.extend_from_slice(&[0x1c, 0x46, 0x40, 0x00]);
        pkt.push(self.ttl);
        pkt.push(self.protocol);
        pkt.extend_from_slice(&[0, 0]);
        pkt.extend_from_slice(&self.src_v4);
        pkt.extend_from_slice(&self.dst_v4);
        pkt.extend_from_slice(&self.ip_options);
    }

    fn build_ipv6(&self, pkt: &mut Vec<u8>, l4_len: usize) {
        let word: u32 = (6 << 28) | 0x000a_bcde;
        pkt.extend_from_slice(&word.to_be_bytes());
        pkt.extend_from_slice(&(l4_len as u16).to_be_bytes());
        pkt.push(self.protocol);
        pkt.push(self.ttl);
        pkt.extend_from_slice(&self.src_v6);
        pkt.extend_from_slice(&self.dst_v6);
    }

    fn build_l4(&self) -> Vec<u8> {
        let mut l4 = Vec::new();
        match self.protocol {
            6 => {
                let offset = self.data_offset_override.unwrap_or(5);
                l4.extend_from_slice(&self.src_port.to_be_bytes());
                l4.extend_from_slice(&self.dst_port.to_be_bytes());
                l4.extend_from_slice(&self.seq.to_be_bytes());
                l4.extend_from_slice(&self.ack.to_be_bytes());
                l4.push(offset << 4);
                l4.push(self.tcp_flags);
                l4.extend_from_slice(&0xffffu16.to_be_bytes());
                l4.extend_from_slice(&self.tcp_checksum.to_be_bytes());
                l4.extend_from_slice(&[0, 0]);
            }
            17 => {
                let length = (8 + self.payload.len()) as u16;
                l4.extend_from_slice(&self.src_port.to_be_bytes());
                l4.extend_from_slice(&self.dst_port.to_be_bytes());
                l4.extend_from_slice(&length.to_be_bytes());
                l4.extend_from_slice(&[0, 0]);
            }
            1 | 2 => {
                l4.push(self.icmp_type);
                l4.push(self.icmp_code);
                l4.extend_from_slice(&[0xf7, 0xff]);
            }
            _ => {}
        }
        l4.extend_from_slice(&self.payload);
        l4
    }
}
