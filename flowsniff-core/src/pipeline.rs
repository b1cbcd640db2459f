use log::{debug, trace};

use crate::{
    aggregate::{AggregateSnapshot, Aggregator},
    classify::Classifier,
    dispatch::{self, route_ether_type, Dissection, Network, NextLayer, Transport},
    record::{DecodedRecord, NetworkProto, Outcome, RawFrame, TransportProto},
};

/// How far decoding got for one frame. `Malformed` and `Unsupported` are
/// absorbing; every frame is still aggregated and handed back for emission
/// whichever stage it ends in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Received,
    EthernetDecoded,
    NetworkDecoded,
    TransportDecoded,
    Malformed,
    Unsupported,
}

impl Stage {
    /// Terminal stage: the absorbing state, or the last decoded layer.
    pub fn of(dissection: &Dissection) -> Self {
        match dissection.outcome {
            Outcome::Malformed { .. } => Stage::Malformed,
            Outcome::Unsupported { .. } => Stage::Unsupported,
            Outcome::Success => Stage::decoded(dissection),
        }
    }

    /// The last layer decoded before the frame stopped, absorbing states
    /// aside.
    pub fn decoded(dissection: &Dissection) -> Self {
        if dissection.transport.is_some() {
            Stage::TransportDecoded
        } else if dissection.network.is_some() {
            Stage::NetworkDecoded
        } else if dissection.ethernet.is_some() {
            Stage::EthernetDecoded
        } else {
            Stage::Received
        }
    }
}

/// Decodes and classifies one frame without touching any shared state, so
/// it can run on any number of workers.
pub fn decode_frame(index: u64, frame: &RawFrame, classifier: &Classifier) -> DecodedRecord {
    let dissection = dispatch::dissect(&frame.data);
    let mut record = DecodedRecord::empty(index, frame);

    if let Some(eth) = dissection.ethernet {
        record.src_mac = Some(eth.src);
        record.dst_mac = Some(eth.dst);
        record.ether_type = Some(eth.ether_type);
        record.network = Some(match route_ether_type(eth.ether_type) {
            NextLayer::Ipv4 => NetworkProto::Ipv4,
            NextLayer::Ipv6 => NetworkProto::Ipv6,
            _ => NetworkProto::Other(eth.ether_type),
        });
    }

    match dissection.network {
        Some(Network::Ipv4(ip)) => {
            record.src_ip = Some(ip.src_addr());
            record.dst_ip = Some(ip.dst_addr());
            record.ttl = Some(ip.ttl);
        }
        Some(Network::Ipv6(ip)) => {
            record.src_ip = Some(ip.src_addr());
            record.dst_ip = Some(ip.dst_addr());
            record.ttl = Some(ip.hop_limit);
        }
        None => {}
    }

    match dissection.transport {
        Some(Transport::Tcp(tcp)) => {
            record.transport = TransportProto::Tcp;
            record.src_port = Some(tcp.src_port);
            record.dst_port = Some(tcp.dst_port);
            record.tcp_seq = Some(tcp.seq);
            record.tcp_ack = Some(tcp.ack);
            record.tcp_flags = Some(tcp.flags);
            record.tcp_checksum = Some(tcp.checksum);
        }
        Some(Transport::Udp(udp)) => {
            record.transport = TransportProto::Udp;
            record.src_port = Some(udp.src_port);
            record.dst_port = Some(udp.dst_port);
        }
        Some(Transport::Icmp(icmp)) | Some(Transport::Igmp(icmp)) => {
            record.transport = match dissection.transport {
                Some(Transport::Igmp(_)) => TransportProto::Igmp,
                _ => TransportProto::Icmp,
            };
            record.icmp_type = Some(icmp.msg_type);
            record.icmp_code = Some(icmp.code);
        }
        None => {
            if dissection.network.is_some()
                && matches!(dissection.outcome, Outcome::Unsupported { .. })
            {
                record.transport = TransportProto::Other;
            }
        }
    }

    record.app = classifier.classify(&dissection);
    record.signatures = classifier.match_signatures(&dissection);
    record.outcome = dissection.outcome;

    trace!(
        "frame #{} reached {:?}, ended {:?}, classified as {}",
        index,
        Stage::decoded(&dissection),
        Stage::of(&dissection),
        record.app.as_str()
    );
    record
}

/// Sequential driver: decode, classify, aggregate, then hand the record back
/// for emission. It owns the aggregate state for the whole session.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    classifier: Classifier,
    aggregator: Aggregator,
    next_index: u64,
    dropped: u64,
}

impl Pipeline {
    pub fn new(classifier: Classifier, aggregator: Aggregator) -> Self {
        Self {
            classifier,
            aggregator,
            next_index: 0,
            dropped: 0,
        }
    }

    pub fn process(&mut self, frame: &RawFrame) -> DecodedRecord {
        let index = self.next_index;
        self.next_index += 1;

        let record = decode_frame(index, frame, &self.classifier);
        match record.outcome {
            Outcome::Malformed { layer, kind } => {
                debug!(
                    "frame #{} malformed at {} layer: {:?} ({} bytes)",
                    index, layer, kind, record.len
                );
            }
            Outcome::Unsupported { layer, protocol } => {
                trace!(
                    "frame #{} unsupported protocol {} above {}",
                    index,
                    protocol,
                    layer
                );
            }
            Outcome::Success => {}
        }

        self.aggregator.ingest(&record);
        record
    }

    /// Counts frames lost before they reached the pipeline.
    pub fn add_dropped(&mut self, count: u64) {
        self.dropped += count;
    }

    pub fn received(&self) -> u64 {
        self.next_index
    }

    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    pub fn aggregator(&self) -> &Aggregator {
        &self.aggregator
    }

    pub fn snapshot(&self, top_n: usize) -> AggregateSnapshot {
        let mut snapshot = self.aggregator.snapshot(top_n);
        snapshot.dropped = self.dropped;
        snapshot
    }

    pub fn reset(&mut self) {
        self.aggregator.reset();
        self.next_index = 0;
        self.dropped = 0;
    }
}

#[cfg(test)]
mod test {
    use super::{decode_frame, Pipeline, Stage};
    use crate::{
        addr::NetAddr,
        classify::Classifier,
        dispatch::dissect,
        error::{ErrorKind, Layer},
        record::{AppClass, NetworkProto, Outcome, TransportProto},
        test_utils::PacketBuilder,
    };

    // Ethernet + IPv4 + TCP, 192.168.1.10:443 -> 192.168.1.20:51000
    const TLS_FRAME: [u8; 58] = [
        0x66, 0x77, 0x88, 0x99, 0xaa, 0xbb, 0x00, 0x11, 0x22, 0x33, 0x44, 0x55, 0x08, 0x00, // eth
        0x45, 0x00, 0x00, 0x2c, 0x00, 0x01, 0x40, 0x00, 0x40, 0x06, 0x00, 0x00, 0xc0, 0xa8,
        0x01, 0x0a, 0xc0, 0xa8, 0x01, 0x14, // ipv4
        0x01, 0xbb, 0xc7, 0x38, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x50, 0x18,
        0x01, 0x00, 0x12, 0x34, 0x00, 0x00, // tcp
        0x16, 0x03, 0x01, 0x00, // payload
    ];

    #[test]
    fn test_short_frames_emit_one_malformed_record() {
        let mut pipeline = Pipeline::default();
        for len in 0..14 {
            let record = pipeline.process(&PacketBuilder::frame_from(vec![0xff; len]));
            assert_eq!(
                record.outcome,
                Outcome::Malformed {
                    layer: Layer::Ethernet,
                    kind: ErrorKind::TooShort
                }
            );
            assert_eq!(record.len, len);
            assert_eq!(record.transport, TransportProto::None);
            assert_eq!(record.app, AppClass::None);
        }
        let agg = pipeline.aggregator();
        assert_eq!(agg.total_packets(), 14);
        assert_eq!(agg.outcomes().malformed, 14);
        assert_eq!(pipeline.received(), 14);
    }

    #[test]
    fn test_literal_frame_classification() {
        let classifier = Classifier::default();
        let record = decode_frame(0, &PacketBuilder::frame_from(TLS_FRAME.to_vec()), &classifier);
        assert_eq!(record.outcome, Outcome::Success);
        assert_eq!(record.src_ip, Some(NetAddr::V4([192, 168, 1, 10])));
        assert_eq!(record.dst_ip, Some(NetAddr::V4([192, 168, 1, 20])));
        assert_eq!((record.src_port, record.dst_port), (Some(443), Some(51000)));
        assert_eq!(record.tcp_checksum, Some(0x1234));
        assert_eq!(record.app, AppClass::Tls);

        let mut http = TLS_FRAME[..54].to_vec();
        http.extend_from_slice(b"GET /");
        let record = decode_frame(1, &PacketBuilder::frame_from(http), &classifier);
        assert_eq!(record.app, AppClass::Http);
    }

    #[test]
    fn test_builder_fields_survive_decoding() {
        let classifier = Classifier::default();
        let frame = PacketBuilder::udp()
            .v4_addrs([172, 16, 0, 9], [8, 8, 8, 8])
            .ports(40000, 53)
            .ttl(17)
            .payload(&[0u8; 12])
            .frame();
        let record = decode_frame(7, &frame, &classifier);

        assert_eq!(record.index, 7);
        assert_eq!(record.len, 14 + 20 + 8 + 12);
        assert_eq!(record.network, Some(NetworkProto::Ipv4));
        assert_eq!(record.ether_type, Some(0x0800));
        assert_eq!(record.src_mac.unwrap().to_string(), "00:11:22:33:44:55");
        assert_eq!(record.src_ip.unwrap().to_string(), "172.16.0.9");
        assert_eq!(record.dst_ip.unwrap().to_string(), "8.8.8.8");
        assert_eq!(record.ttl, Some(17));
        assert_eq!(record.transport, TransportProto::Udp);
        assert_eq!((record.src_port, record.dst_port), (Some(40000), Some(53)));
        assert_eq!(record.app, AppClass::Dns);

        let frame = PacketBuilder::tcp()
            .ipv6()
            .ports(443, 1)
            .seq_ack(77, 78)
            .frame();
        let record = decode_frame(0, &frame, &classifier);
        assert_eq!(record.network, Some(NetworkProto::Ipv6));
        assert_eq!(
            record.src_ip.unwrap().to_string(),
            "2001:0000:0000:0000:0000:0000:0000:0001"
        );
        assert_eq!((record.tcp_seq, record.tcp_ack), (Some(77), Some(78)));
        assert_eq!(record.app, AppClass::Tls);
    }

    #[test]
    fn test_partial_records() {
        let classifier = Classifier::default();

        let frame = PacketBuilder::tcp().ihl(6).frame();
        let mut short = frame.clone();
        short.data.truncate(14 + 20);
        let record = decode_frame(0, &short, &classifier);
        assert_eq!(
            record.outcome,
            Outcome::Malformed {
                layer: Layer::Ipv4,
                kind: ErrorKind::InvalidLength
            }
        );
        assert!(record.src_mac.is_some());
        assert_eq!(record.network, Some(NetworkProto::Ipv4));
        assert!(record.src_ip.is_none());

        let record = decode_frame(0, &PacketBuilder::tcp().ether_type(0x0806).frame(), &classifier);
        assert_eq!(record.network, Some(NetworkProto::Other(0x0806)));
        assert_eq!(record.transport, TransportProto::None);
        assert_eq!(record.app, AppClass::None);

        let record = decode_frame(0, &PacketBuilder::tcp().protocol(132).frame(), &classifier);
        assert!(record.src_ip.is_some());
        assert_eq!(record.transport, TransportProto::Other);
        assert_eq!(record.src_port, None);
        assert_eq!(
            record.outcome,
            Outcome::Unsupported {
                layer: Layer::Ipv4,
                protocol: 132
            }
        );

        let record = decode_frame(0, &PacketBuilder::igmp().icmp_type_code(0x16, 0).frame(), &classifier);
        assert_eq!(record.transport, TransportProto::Igmp);
        assert_eq!(record.icmp_type, Some(0x16));
        assert_eq!(record.app, AppClass::Unclassified);
    }

    #[test]
    fn test_tcp_offset_past_segment() {
        let mut pipeline = Pipeline::default();
        let src: [u8; 16] = [0xfe, 0x80, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0xab, 0xcd];
        let mut dst = [0u8; 16];
        dst[15] = 1;
        let frame = PacketBuilder::tcp()
            .ipv6()
            .v6_addrs(src, dst)
            .data_offset(15)
            .frame();

        let record = pipeline.process(&frame);
        assert_eq!(
            record.outcome,
            Outcome::Malformed {
                layer: Layer::Tcp,
                kind: ErrorKind::InvalidLength
            }
        );
        assert_eq!(
            record.src_ip.unwrap().to_string(),
            "fe80:0000:0000:0000:0000:0000:0000:abcd"
        );
        assert_eq!(record.dst_ip, Some(NetAddr::V6(dst)));
        assert_eq!(record.transport, TransportProto::None);
        assert_eq!((record.src_port, record.dst_port), (None, None));

        let snapshot = pipeline.snapshot(5);
        assert_eq!(snapshot.total_packets, 1);
        assert_eq!(snapshot.distinct_flows, 0);
        assert_eq!(snapshot.src_counts[&NetAddr::V6(src)], 1);
    }

    #[test]
    fn test_stage_of_dissection() {
        let ok = PacketBuilder::icmp().build();
        assert_eq!(Stage::of(&dissect(&ok)), Stage::TransportDecoded);
        assert_eq!(Stage::of(&dissect(&ok[..3])), Stage::Malformed);
        let arp = PacketBuilder::tcp().ether_type(0x0806).build();
        assert_eq!(Stage::of(&dissect(&arp)), Stage::Unsupported);

        assert_eq!(Stage::decoded(&dissect(&ok)), Stage::TransportDecoded);
        assert_eq!(Stage::decoded(&dissect(&ok[..3])), Stage::Received);
        assert_eq!(Stage::decoded(&dissect(&arp)), Stage::EthernetDecoded);
        let sctp = PacketBuilder::tcp().protocol(132).build();
        assert_eq!(Stage::decoded(&dissect(&sctp)), Stage::NetworkDecoded);
        assert_eq!(Stage::of(&dissect(&sctp)), Stage::Unsupported);
    }

    #[test]
    fn test_snapshot_and_reset() {
        let mut pipeline = Pipeline::default();
        pipeline.process(&PacketBuilder::tcp().ports(1000, 80).frame());
        pipeline.process(&PacketBuilder::frame_from(vec![1, 2, 3]));
        pipeline.process(&PacketBuilder::tcp().ether_type(0x0806).frame());
        pipeline.process(&PacketBuilder::tcp().protocol(132).frame());
        pipeline.add_dropped(4);

        let snapshot = pipeline.snapshot(5);
        assert_eq!(snapshot.total_packets, 4);
        assert_eq!(snapshot.outcomes.success, 1);
        assert_eq!(snapshot.outcomes.malformed, 1);
        assert_eq!(snapshot.outcomes.unsupported, 2);
        // the unknown-protocol frame still has both addresses
        assert_eq!(snapshot.distinct_flows, 2);
        assert_eq!(snapshot.dropped, 4);
        assert_eq!(snapshot.top_flows.len(), 2);

        pipeline.reset();
        assert_eq!(pipeline.snapshot(5).total_packets, 0);
        assert_eq!(pipeline.dropped(), 0);
    }
}
