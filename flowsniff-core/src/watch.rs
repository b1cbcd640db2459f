use chrono::{DateTime, Local};
use serde::Serialize;

use crate::{addr::NetAddr, classify::Signature, record::DecodedRecord};

/// The first emitted record that carried a signature.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FirstMatch {
    pub index: u64,
    pub timestamp: DateTime<Local>,
    pub src_ip: Option<NetAddr>,
    pub src_port: Option<u16>,
    pub dst_ip: Option<NetAddr>,
    pub dst_port: Option<u16>,
    pub tcp_checksum: Option<u16>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignatureHits {
    pub name: String,
    pub count: u64,
    pub first: Option<FirstMatch>,
}

/// Tracks signature occurrences over the emitted record sequence.
///
/// "First" means first in emission order, which is arrival order for a
/// single capture source.
#[derive(Debug, Clone, Default)]
pub struct SignatureWatcher {
    hits: Vec<SignatureHits>,
}

impl SignatureWatcher {
    pub fn new(signatures: &[Signature]) -> Self {
        let hits = signatures
            .iter()
            .map(|sig| SignatureHits {
                name: sig.name.clone(),
                count: 0,
                first: None,
            })
            .collect();
        Self { hits }
    }

    pub fn observe(&mut self, record: &DecodedRecord) {
        if record.signatures.is_empty() {
            return;
        }
        for hit in self.hits.iter_mut() {
            if !record.matched(&hit.name) {
                continue;
            }
            hit.count += 1;
            if hit.first.is_none() {
                hit.first = Some(FirstMatch {
                    index: record.index,
                    timestamp: record.timestamp,
                    src_ip: record.src_ip,
                    src_port: record.src_port,
                    dst_ip: record.dst_ip,
                    dst_port: record.dst_port,
                    tcp_checksum: record.tcp_checksum,
                });
            }
        }
    }

    pub fn hits(&self) -> &[SignatureHits] {
        &self.hits
    }

    pub fn reset(&mut self) {
        for hit in self.hits.iter_mut() {
            hit.count = 0;
            hit.first = None;
        }
    }
}

#[cfg(test)]
mod test {
    use super::SignatureWatcher;
    use crate::{
        classify::{Classifier, Signature},
        pipeline::Pipeline,
        test_utils::PacketBuilder,
    };

    #[test]
    fn test_first_match_follows_emission_order() {
        let signatures = vec![
            Signature::new("laptop", "laptop ="),
            Signature::new("order", "order successful"),
        ];
        let mut pipeline = Pipeline::new(Classifier::new(signatures.clone()), Default::default());
        let mut watcher = SignatureWatcher::new(&signatures);

        let frames = [
            PacketBuilder::tcp().payload(b"order successful").build(),
            PacketBuilder::tcp()
                .ports(5000, 6000)
                .tcp_checksum(0x1234)
                .payload(b"Laptop = lab-07")
                .build(),
            PacketBuilder::tcp()
                .tcp_checksum(0x9999)
                .payload(b"laptop = other; Order Successful")
                .build(),
        ];
        for data in frames {
            let frame = PacketBuilder::frame_from(data);
            let record = pipeline.process(&frame);
            watcher.observe(&record);
        }

        let hits = watcher.hits();
        assert_eq!(hits[0].count, 2);
        let first = hits[0].first.as_ref().unwrap();
        assert_eq!(first.index, 1);
        assert_eq!(first.tcp_checksum, Some(0x1234));
        assert_eq!(first.src_port, Some(5000));

        assert_eq!(hits[1].count, 2);
        assert_eq!(hits[1].first.as_ref().unwrap().index, 0);

        watcher.reset();
        assert!(watcher.hits().iter().all(|h| h.count == 0 && h.first.is_none()));
    }
}
