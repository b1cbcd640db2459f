use std::{
    future::Future,
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc,
    },
};

use anyhow::{anyhow, Result};
use chrono::Local;
use flowsniff_core::{Aggregator, Classifier, Pipeline, RawFrame, SignatureWatcher};
use log::{error, info, warn};
use tokio::{sync::mpsc, task::JoinHandle};

use crate::{
    capture::{self, FrameSource, QueuePolicy, RawSocket},
    cidr::WatchList,
    cmd::RecordFormat,
    collector::SessionReport,
    config::Settings,
    metrics::{self, Metrics},
    network::RecordLine,
    sink::{self, RecordSink},
    uname,
};

/// Where a record is echoed at debug level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Echo {
    Stdout,
    Stderr,
    Skip,
}

impl Echo {
    fn for_records(format: RecordFormat) -> Self {
        match format {
            RecordFormat::None => Echo::Stdout,
            // stdout carries nothing but JSON lines
            RecordFormat::Json => Echo::Stderr,
            // the console sink already prints this line
            RecordFormat::Console => Echo::Skip,
        }
    }
}

pub struct Application {
    settings: Settings,

    pipeline: Pipeline,
    watcher: SignatureWatcher,
    watch: WatchList,
    sink: Box<dyn RecordSink>,
    metrics: Option<Arc<Metrics>>,

    stop: Arc<AtomicBool>,
    dropped: Arc<AtomicU64>,

    rx: mpsc::Receiver<RawFrame>,
    // taken once every capture task holds its own sender, so the queue
    // closes when the last of them exits
    tx: Option<mpsc::Sender<RawFrame>>,
}

impl Application {
    pub fn new(settings: Settings) -> Result<Self> {
        let signatures = settings.signatures();
        let watcher = SignatureWatcher::new(&signatures);
        let pipeline = Pipeline::new(
            Classifier::new(signatures),
            Aggregator::new(settings.histogram_buckets),
        );
        let watch = WatchList::new(settings.watch_entries())?;
        let sink = sink::build(settings.records);
        let metrics = match settings.metrics_addr {
            Some(_) => Some(Arc::new(Metrics::new()?)),
            None => None,
        };

        let (tx, rx) = mpsc::channel(settings.queue_capacity);
        Ok(Self {
            settings,
            pipeline,
            watcher,
            watch,
            sink,
            metrics,
            stop: Arc::new(AtomicBool::new(false)),
            dropped: Arc::new(AtomicU64::new(0)),
            rx,
            tx: Some(tx),
        })
    }

    /// Captures on every configured interface until `shutdown` resolves.
    pub async fn run<F>(self, shutdown: F) -> Result<SessionReport>
    where
        F: Future<Output = ()>,
    {
        let mut sources: Vec<Box<dyn FrameSource>> = Vec::new();
        for iface in self.settings.ifaces.iter() {
            sources.push(Box::new(RawSocket::open(iface)?));
        }
        self.run_sources(sources, shutdown).await
    }

    /// Session loop over arbitrary sources. Ends when `shutdown` resolves or
    /// every source has stopped.
    pub async fn run_sources<S, F>(mut self, sources: Vec<S>, shutdown: F) -> Result<SessionReport>
    where
        S: FrameSource + 'static,
        F: Future<Output = ()>,
    {
        let started = Local::now();
        let interval = self.settings.export_interval()?;
        let kernel = uname().map(|info| info.release).unwrap_or_default();
        info!(
            "start flowsniff session, sources: {}, kernel: {:?}",
            sources.len(),
            kernel
        );

        let policy = if self.settings.drop_when_full {
            QueuePolicy::Drop
        } else {
            QueuePolicy::Block
        };

        let mut handles: Vec<JoinHandle<()>> = Vec::with_capacity(sources.len());
        for source in sources {
            let tx = self.fork_tx()?;
            let (stop, dropped) = (self.stop.clone(), self.dropped.clone());
            handles.push(tokio::task::spawn_blocking(move || {
                let name = source.name().to_owned();
                if let Err(e) = capture::pump(source, tx, policy, stop, dropped) {
                    error!("capture on {} stopped by error: {}", name, e);
                }
            }));
        }
        self.tx.take();

        let server = match (self.settings.metrics_addr, self.metrics.as_ref()) {
            (Some(addr), Some(exporter)) => {
                let exporter = exporter.clone();
                Some(tokio::spawn(async move {
                    if let Err(e) = metrics::serve(addr, exporter).await {
                        error!("metrics server stopped by error: {}", e);
                    }
                }))
            }
            _ => None,
        };

        let mut tick = tokio::time::interval(interval);
        // the first tick completes immediately
        tick.tick().await;

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                frame = self.rx.recv() => match frame {
                    Some(frame) => self.handle(frame),
                    None => {
                        info!("all capture sources finished");
                        break;
                    }
                },
                _ = tick.tick() => self.export(),
                _ = &mut shutdown => {
                    info!("stop signal received, draining queued frames");
                    break;
                }
            }
        }

        self.stop.store(true, Ordering::Relaxed);
        while let Some(frame) = self.rx.recv().await {
            self.handle(frame);
        }
        for handle in handles {
            if let Err(e) = handle.await {
                warn!("capture task failed to join: {}", e);
            }
        }

        self.export();
        if let Err(e) = self.sink.flush() {
            warn!("failed to flush records by error: {}", e);
        }
        if let Some(server) = server {
            server.abort();
        }

        Ok(SessionReport {
            started,
            stopped: Local::now(),
            received: self.pipeline.received(),
            snapshot: self.pipeline.snapshot(self.settings.top_flows),
            signatures: self.watcher.hits().to_vec(),
            watches: self.watch.counts().clone(),
        })
    }

    fn handle(&mut self, frame: RawFrame) {
        let record = self.pipeline.process(&frame);
        self.watcher.observe(&record);
        self.watch.observe(&record);

        if let Err(e) = self.sink.emit(&record) {
            warn!("failed to emit record #{} by error: {}", record.index, e);
        }
        if log::log_enabled!(log::Level::Debug) {
            match Echo::for_records(self.settings.records) {
                Echo::Stdout => println!("{}", RecordLine(&record).colored()),
                Echo::Stderr => eprintln!("{}", RecordLine(&record).colored()),
                Echo::Skip => {}
            }
        }
    }

    // Pulls the drop counter of the capture tasks into the pipeline.
    fn sync_dropped(&mut self) {
        let total = self.dropped.load(Ordering::Relaxed);
        let seen = self.pipeline.dropped();
        if total > seen {
            self.pipeline.add_dropped(total - seen);
        }
    }

    fn export(&mut self) {
        self.sync_dropped();
        let snapshot = self.pipeline.snapshot(self.settings.top_flows);
        info!(
            "{} packets, {} bytes, {} flows, {} dropped",
            snapshot.total_packets, snapshot.total_bytes, snapshot.distinct_flows, snapshot.dropped
        );

        if let Some(metrics) = self.metrics.as_ref() {
            metrics.update(&snapshot, self.watcher.hits(), self.watch.counts());
        }
    }

    fn fork_tx(&self) -> Result<mpsc::Sender<RawFrame>> {
        self.tx
            .clone()
            .ok_or_else(|| anyhow!("frame queue already closed"))
    }
}

/// Opens and closes a raw socket on every interface.
pub fn check(ifaces: &[String]) -> Result<()> {
    if ifaces.is_empty() {
        return Err(anyhow!("no interface to check, please provide one with -i"));
    }

    for iface in ifaces {
        RawSocket::open(iface)?;
        info!("raw socket on {} ok", iface);
    }
    Ok(())
}
