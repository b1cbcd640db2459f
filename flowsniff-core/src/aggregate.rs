use std::{
    collections::{BTreeMap, HashMap},
    fmt::Display,
};

use serde::Serialize;

use crate::{
    addr::NetAddr,
    record::{DecodedRecord, Outcome},
};

pub const DEFAULT_BUCKETS: usize = 20;

/// Directional 4-tuple. Ports are absent for protocols that do not carry
/// them, so all ICMP traffic between two hosts shares one key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct FlowKey {
    pub src_ip: NetAddr,
    pub src_port: Option<u16>,
    pub dst_ip: NetAddr,
    pub dst_port: Option<u16>,
}

impl FlowKey {
    /// `None` unless the record carries both network addresses. Malformed
    /// records never get a key: a broken TCP/UDP header leaves the ports
    /// out and would otherwise land on the portless ICMP key of the same
    /// host pair.
    pub fn from_record(record: &DecodedRecord) -> Option<Self> {
        if let Outcome::Malformed { .. } = record.outcome {
            return None;
        }
        Some(Self {
            src_ip: record.src_ip?,
            src_port: record.src_port,
            dst_ip: record.dst_ip?,
            dst_port: record.dst_port,
        })
    }
}

struct Port(Option<u16>);

impl Display for Port {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0 {
            Some(port) => write!(f, "{port}"),
            None => f.write_str("N/A"),
        }
    }
}

impl Display for FlowKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{} -> {}:{}",
            self.src_ip,
            Port(self.src_port),
            self.dst_ip,
            Port(self.dst_port)
        )
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OutcomeCounts {
    pub success: u64,
    pub malformed: u64,
    pub unsupported: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Bucket {
    pub start: usize,
    /// Inclusive.
    pub end: usize,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SizeSummary {
    pub min: usize,
    pub max: usize,
    pub mean: f64,
    pub histogram: Vec<Bucket>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlowBytes {
    pub flow: FlowKey,
    pub bytes: u64,
}

/// Read-only view of the aggregate state handed to reporting.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateSnapshot {
    pub total_packets: u64,
    pub total_bytes: u64,
    pub distinct_flows: usize,
    pub outcomes: OutcomeCounts,
    pub dropped: u64,
    pub src_counts: BTreeMap<NetAddr, u64>,
    pub dst_counts: BTreeMap<NetAddr, u64>,
    pub top_flow: Option<FlowBytes>,
    pub top_flows: Vec<FlowBytes>,
    pub sizes: Option<SizeSummary>,
}

/// Running flow and size statistics for one capture session.
///
/// Every counter is a sum, so the final state does not depend on ingest
/// order. Only tie-breaking between flows with equal byte totals looks at
/// the order in which flows were first seen.
#[derive(Debug, Clone)]
pub struct Aggregator {
    buckets: usize,

    total_packets: u64,
    total_bytes: u64,
    outcomes: OutcomeCounts,

    // position of each key in `flow_bytes`, which is kept in first-seen order
    flow_index: HashMap<FlowKey, usize>,
    flow_bytes: Vec<(FlowKey, u64)>,

    src_counts: HashMap<NetAddr, u64>,
    dst_counts: HashMap<NetAddr, u64>,

    min_size: Option<usize>,
    max_size: usize,
    // exact size -> packets; binned into `buckets` ranges on query
    sizes: BTreeMap<usize, u64>,
}

impl Default for Aggregator {
    fn default() -> Self {
        Self::new(DEFAULT_BUCKETS)
    }
}

impl Aggregator {
    pub fn new(buckets: usize) -> Self {
        Self {
            buckets: buckets.max(1),
            total_packets: 0,
            total_bytes: 0,
            outcomes: OutcomeCounts::default(),
            flow_index: HashMap::new(),
            flow_bytes: Vec::new(),
            src_counts: HashMap::new(),
            dst_counts: HashMap::new(),
            min_size: None,
            max_size: 0,
            sizes: BTreeMap::new(),
        }
    }

    pub fn ingest(&mut self, record: &DecodedRecord) {
        let size = record.len;
        self.total_packets += 1;
        self.total_bytes += size as u64;

        match record.outcome {
            Outcome::Success => self.outcomes.success += 1,
            Outcome::Malformed { .. } => self.outcomes.malformed += 1,
            Outcome::Unsupported { .. } => self.outcomes.unsupported += 1,
        }

        if let Some(src) = record.src_ip {
            *self.src_counts.entry(src).or_insert(0) += 1;
        }
        if let Some(dst) = record.dst_ip {
            *self.dst_counts.entry(dst).or_insert(0) += 1;
        }

        if let Some(key) = FlowKey::from_record(record) {
            match self.flow_index.get(&key) {
                Some(&i) => self.flow_bytes[i].1 += size as u64,
                None => {
                    self.flow_index.insert(key, self.flow_bytes.len());
                    self.flow_bytes.push((key, size as u64));
                }
            }
        }

        self.min_size = Some(self.min_size.map_or(size, |min| min.min(size)));
        self.max_size = self.max_size.max(size);
        *self.sizes.entry(size).or_insert(0) += 1;
    }

    pub fn reset(&mut self) {
        *self = Self::new(self.buckets);
    }

    pub fn total_packets(&self) -> u64 {
        self.total_packets
    }

    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    pub fn outcomes(&self) -> OutcomeCounts {
        self.outcomes
    }

    pub fn distinct_flows(&self) -> usize {
        self.flow_bytes.len()
    }

    pub fn flow_bytes(&self, key: &FlowKey) -> Option<u64> {
        self.flow_index.get(key).map(|&i| self.flow_bytes[i].1)
    }

    /// Flows in the order they were first observed.
    pub fn flows(&self) -> impl Iterator<Item = (&FlowKey, u64)> {
        self.flow_bytes.iter().map(|(k, b)| (k, *b))
    }

    pub fn src_counts(&self) -> &HashMap<NetAddr, u64> {
        &self.src_counts
    }

    pub fn dst_counts(&self) -> &HashMap<NetAddr, u64> {
        &self.dst_counts
    }

    /// The flow with the most bytes; on a tie the one observed first.
    pub fn top_flow(&self) -> Option<FlowBytes> {
        let mut best: Option<&(FlowKey, u64)> = None;
        for entry in self.flow_bytes.iter() {
            if best.map_or(true, |b| entry.1 > b.1) {
                best = Some(entry);
            }
        }
        best.map(|&(flow, bytes)| FlowBytes { flow, bytes })
    }

    pub fn top_flows(&self, n: usize) -> Vec<FlowBytes> {
        let mut flows: Vec<&(FlowKey, u64)> = self.flow_bytes.iter().collect();
        // stable, so equal totals keep first-seen order
        flows.sort_by(|a, b| b.1.cmp(&a.1));
        flows
            .into_iter()
            .take(n)
            .map(|&(flow, bytes)| FlowBytes { flow, bytes })
            .collect()
    }

    pub fn size_summary(&self) -> Option<SizeSummary> {
        let min = self.min_size?;
        let max = self.max_size;
        let mean = self.total_bytes as f64 / self.total_packets as f64;

        let span = max - min + 1;
        let buckets = self.buckets.min(span);
        let mut histogram: Vec<Bucket> = (0..buckets)
            .map(|i| Bucket {
                start: min + (i * span).div_ceil(buckets),
                end: min + ((i + 1) * span).div_ceil(buckets) - 1,
                count: 0,
            })
            .collect();
        for (&size, &count) in self.sizes.iter() {
            let i = (size - min) * buckets / span;
            histogram[i].count += count;
        }

        Some(SizeSummary {
            min,
            max,
            mean,
            histogram,
        })
    }

    pub fn snapshot(&self, top_n: usize) -> AggregateSnapshot {
        AggregateSnapshot {
            total_packets: self.total_packets,
            total_bytes: self.total_bytes,
            distinct_flows: self.distinct_flows(),
            outcomes: self.outcomes,
            dropped: 0,
            src_counts: self.src_counts.iter().map(|(k, v)| (*k, *v)).collect(),
            dst_counts: self.dst_counts.iter().map(|(k, v)| (*k, *v)).collect(),
            top_flow: self.top_flow(),
            top_flows: self.top_flows(top_n),
            sizes: self.size_summary(),
        }
    }
}
