use std::{collections::BTreeMap, net::SocketAddr, sync::Arc};

use anyhow::Result;
use axum::{extract::State, http::StatusCode, routing::get, Router};
use flowsniff_core::{watch::SignatureHits, AggregateSnapshot};
use log::{error, info};
use prometheus::{GaugeVec, IntGauge, IntGaugeVec, Opts, Registry, TextEncoder};

/// Prometheus view of the latest aggregate snapshot.
pub struct Metrics {
    registry: Registry,

    packets: IntGauge,
    bytes: IntGauge,
    flows: IntGauge,
    dropped: IntGauge,
    outcomes: IntGaugeVec,
    size: GaugeVec,
    histogram: IntGaugeVec,
    top_flows: IntGaugeVec,
    signatures: IntGaugeVec,
    watches: IntGaugeVec,
}

impl Metrics {
    pub fn new() -> Result<Self> {
        let registry = Registry::new_custom(Some("flowsniff".to_string()), None)?;

        let packets = IntGauge::with_opts(Opts::new("packets_total", "frames processed"))?;
        let bytes = IntGauge::with_opts(Opts::new("bytes_total", "captured bytes processed"))?;
        let flows = IntGauge::with_opts(Opts::new("flows_distinct", "distinct directional 4-tuples"))?;
        let dropped = IntGauge::with_opts(Opts::new("frames_dropped", "frames dropped on a full queue"))?;
        let outcomes = IntGaugeVec::new(
            Opts::new("frames_by_outcome", "frames by decode outcome"),
            &["outcome"],
        )?;
        let size = GaugeVec::new(
            Opts::new("packet_size_bytes", "min, max and mean packet size"),
            &["stat"],
        )?;
        let histogram = IntGaugeVec::new(
            Opts::new("packet_size_bucket", "packets per size range"),
            &["range"],
        )?;
        let top_flows = IntGaugeVec::new(
            Opts::new("top_flow_bytes", "cumulative bytes of the largest flows"),
            &["rank", "flow"],
        )?;
        let signatures = IntGaugeVec::new(
            Opts::new("signature_matches", "records carrying a payload signature"),
            &["signature"],
        )?;
        let watches = IntGaugeVec::new(
            Opts::new("watch_packets", "packets to or from a watched cidr"),
            &["watch"],
        )?;

        registry.register(Box::new(packets.clone()))?;
        registry.register(Box::new(bytes.clone()))?;
        registry.register(Box::new(flows.clone()))?;
        registry.register(Box::new(dropped.clone()))?;
        registry.register(Box::new(outcomes.clone()))?;
        registry.register(Box::new(size.clone()))?;
        registry.register(Box::new(histogram.clone()))?;
        registry.register(Box::new(top_flows.clone()))?;
        registry.register(Box::new(signatures.clone()))?;
        registry.register(Box::new(watches.clone()))?;

        Ok(Self {
            registry,
            packets,
            bytes,
            flows,
            dropped,
            outcomes,
            size,
            histogram,
            top_flows,
            signatures,
            watches,
        })
    }

    pub fn update(
        &self,
        snapshot: &AggregateSnapshot,
        hits: &[SignatureHits],
        watches: &BTreeMap<String, u64>,
    ) {
        self.packets.set(snapshot.total_packets as i64);
        self.bytes.set(snapshot.total_bytes as i64);
        self.flows.set(snapshot.distinct_flows as i64);
        self.dropped.set(snapshot.dropped as i64);

        let outcomes = snapshot.outcomes;
        self.outcomes.with_label_values(&["success"]).set(outcomes.success as i64);
        self.outcomes.with_label_values(&["malformed"]).set(outcomes.malformed as i64);
        self.outcomes.with_label_values(&["unsupported"]).set(outcomes.unsupported as i64);

        // bucket edges and flow ranks move between snapshots
        self.histogram.reset();
        self.top_flows.reset();
        if let Some(sizes) = snapshot.sizes.as_ref() {
            self.size.with_label_values(&["min"]).set(sizes.min as f64);
            self.size.with_label_values(&["max"]).set(sizes.max as f64);
            self.size.with_label_values(&["mean"]).set(sizes.mean);
            for bucket in sizes.histogram.iter() {
                let range = format!("{}-{}", bucket.start, bucket.end);
                self.histogram
                    .with_label_values(&[range.as_str()])
                    .set(bucket.count as i64);
            }
        }
        for (rank, top) in snapshot.top_flows.iter().enumerate() {
            let (rank, flow) = ((rank + 1).to_string(), top.flow.to_string());
            self.top_flows
                .with_label_values(&[rank.as_str(), flow.as_str()])
                .set(top.bytes as i64);
        }

        for hit in hits {
            self.signatures
                .with_label_values(&[hit.name.as_str()])
                .set(hit.count as i64);
        }
        for (name, count) in watches {
            self.watches.with_label_values(&[name.as_str()]).set(*count as i64);
        }
    }

    pub fn export(&self) -> Result<String> {
        let text_enc = TextEncoder::new();
        Ok(text_enc.encode_to_string(&self.registry.gather())?)
    }
}

async fn metrics_handler(State(metrics): State<Arc<Metrics>>) -> (StatusCode, String) {
    match metrics.export() {
        Ok(body) => (StatusCode::OK, body),
        Err(e) => {
            error!("failed to encode metrics by error: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, String::new())
        }
    }
}

/// Serves `/metrics` until the task is aborted.
pub async fn serve(addr: SocketAddr, metrics: Arc<Metrics>) -> Result<()> {
    let app = Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(metrics);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("serving metrics on http://{}/metrics", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
