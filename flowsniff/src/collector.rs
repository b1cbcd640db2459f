use std::collections::BTreeMap;

use chrono::{DateTime, Local};
use flowsniff_core::{watch::SignatureHits, AggregateSnapshot};
use log::info;
use serde::Serialize;

/// Everything known about a capture session once it has stopped.
#[derive(Debug, Clone, Serialize)]
pub struct SessionReport {
    pub started: DateTime<Local>,
    pub stopped: DateTime<Local>,
    pub received: u64,
    pub snapshot: AggregateSnapshot,
    pub signatures: Vec<SignatureHits>,
    pub watches: BTreeMap<String, u64>,
}

impl SessionReport {
    pub fn log_summary(&self) {
        let snapshot = &self.snapshot;
        info!(
            "session {} - {}: {} frames received, {} dropped",
            self.started.format("[%Y-%m-%d %H:%M:%S]"),
            self.stopped.format("[%Y-%m-%d %H:%M:%S]"),
            self.received,
            snapshot.dropped
        );
        info!(
            "packets={} bytes={} flows={} success={} malformed={} unsupported={}",
            snapshot.total_packets,
            snapshot.total_bytes,
            snapshot.distinct_flows,
            snapshot.outcomes.success,
            snapshot.outcomes.malformed,
            snapshot.outcomes.unsupported
        );

        if let Some(sizes) = snapshot.sizes.as_ref() {
            info!(
                "packet size min={} max={} mean={:.2}",
                sizes.min, sizes.max, sizes.mean
            );
            for bucket in sizes.histogram.iter().filter(|b| b.count > 0) {
                info!("  {:>5}-{:<5} {}", bucket.start, bucket.end, bucket.count);
            }
        }

        match snapshot.top_flow.as_ref() {
            Some(top) => info!("top flow {} with {} bytes", top.flow, top.bytes),
            None => info!("no flow observed"),
        }
        for (rank, top) in snapshot.top_flows.iter().enumerate().skip(1) {
            info!("  #{} {} with {} bytes", rank + 1, top.flow, top.bytes);
        }

        for (addr, count) in snapshot.src_counts.iter() {
            info!("src {:<40} {}", addr.to_string(), count);
        }
        for (addr, count) in snapshot.dst_counts.iter() {
            info!("dst {:<40} {}", addr.to_string(), count);
        }

        for hit in self.signatures.iter() {
            match hit.first.as_ref() {
                Some(first) => info!(
                    "signature '{}' matched {} times, first at #{} checksum={}",
                    hit.name,
                    hit.count,
                    first.index,
                    first
                        .tcp_checksum
                        .map(|c| format!("{:#06x}", c))
                        .unwrap_or_else(|| "N/A".to_string())
                ),
                None => info!("signature '{}' never matched", hit.name),
            }
        }
        for (name, count) in self.watches.iter() {
            info!("watch '{}' saw {} packets", name, count);
        }
    }
}

#[cfg(test)]
mod test {
    use std::collections::BTreeMap;

    use chrono::Local;
    use flowsniff_core::{Pipeline, RawFrame};

    use super::SessionReport;
    use crate::sink::test::DNS_FRAME;

    #[test]
    fn test_report_json() {
        let mut pipeline = Pipeline::default();
        pipeline.process(&RawFrame::new(DNS_FRAME.to_vec(), Local::now()));
        pipeline.add_dropped(4);

        let report = SessionReport {
            started: Local::now(),
            stopped: Local::now(),
            received: pipeline.received(),
            snapshot: pipeline.snapshot(5),
            signatures: vec![],
            watches: BTreeMap::new(),
        };
        report.log_summary();

        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["received"], 1);
        assert_eq!(value["snapshot"]["dropped"], 4);
        assert_eq!(value["snapshot"]["total_bytes"], 46);
        assert_eq!(value["snapshot"]["top_flow"]["bytes"], 46);
        assert_eq!(value["snapshot"]["src_counts"]["10.0.0.1"], 1);
    }
}
