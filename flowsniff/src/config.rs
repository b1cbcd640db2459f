use std::{
    collections::HashSet, fs::File, io, net::SocketAddr, path::Path, str::FromStr, time::Duration,
};

use anyhow::{anyhow, Result};
use flowsniff_core::Signature;
use serde::Deserialize;

use crate::{
    cmd::{Cmd, RecordFormat},
    util,
};

#[derive(Debug, Deserialize)]
pub struct Settings {
    #[serde(
        rename(deserialize = "exportInterval"),
        default = "default_export_interval"
    )]
    pub export_interval: String,

    #[serde(
        rename(deserialize = "queueCapacity"),
        default = "default_queue_capacity"
    )]
    pub queue_capacity: usize,

    #[serde(rename(deserialize = "dropWhenFull"), default)]
    pub drop_when_full: bool,

    #[serde(
        rename(deserialize = "histogramBuckets"),
        default = "default_histogram_buckets"
    )]
    pub histogram_buckets: usize,

    #[serde(rename(deserialize = "topFlows"), default = "default_top_flows")]
    pub top_flows: usize,

    #[serde(rename(deserialize = "metricsAddr"))]
    pub metrics_addr: Option<SocketAddr>,

    #[serde(default)]
    pub records: RecordFormat,

    #[serde(default)]
    pub ifaces: Vec<String>,

    pub watch: OptionVec<WatchItem>,

    pub signatures: OptionVec<SignatureItem>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            export_interval: default_export_interval(),
            queue_capacity: default_queue_capacity(),
            drop_when_full: false,
            histogram_buckets: default_histogram_buckets(),
            top_flows: default_top_flows(),
            metrics_addr: None,
            records: RecordFormat::default(),
            ifaces: vec![],
            watch: None,
            signatures: None,
        }
    }
}

impl Settings {
    pub fn load_config_path<P>(path: P) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        Self::load_config(File::options().read(true).open(path.as_ref())?)
    }

    pub fn load_config<R>(reader: R) -> Result<Self>
    where
        R: io::Read,
    {
        let settings: Self = serde_yaml::from_reader(reader)?;
        settings.check()?;

        Ok(settings)
    }

    /// Settings for `live`, built from command line flags alone.
    pub fn from_cmd(cmd: &Cmd) -> Result<Self> {
        let mut settings = Self::default();
        settings.merge_cmd(cmd);
        settings.check()?;

        Ok(settings)
    }

    /// Command line flags extend, or for the output format override, what
    /// the file configured.
    pub fn merge_cmd(&mut self, cmd: &Cmd) {
        for iface in cmd.ifaces.iter() {
            if !self.ifaces.contains(iface) {
                self.ifaces.push(iface.to_owned());
            }
        }

        if !cmd.cidrs.is_empty() {
            self.watch.get_or_insert_with(Vec::new).push(WatchItem {
                name: "cli".to_string(),
                cidrs: cmd.cidrs.clone(),
            });
        }

        if let Some(format) = cmd.output {
            self.records = format;
        }
    }

    pub fn check(&self) -> Result<()> {
        self.export_interval()?;

        if self.queue_capacity == 0 {
            return Err(anyhow!("queueCapacity must be greater than zero"));
        }
        if self.histogram_buckets == 0 {
            return Err(anyhow!("histogramBuckets must be greater than zero"));
        }

        let mut names = HashSet::new();
        for item in self.watch.iter().flatten() {
            if !names.insert(item.name.as_str()) {
                return Err(anyhow!("watch name '{}' is defined twice", item.name));
            }
            for cidr in item.cidrs.iter() {
                if let Err(e) = ipnetwork::IpNetwork::from_str(cidr) {
                    return Err(anyhow!("failed to parse cidr='{}' by {}", cidr, e));
                }
            }
        }

        let mut names = HashSet::new();
        for item in self.signatures.iter().flatten() {
            if !names.insert(item.name.as_str()) {
                return Err(anyhow!("signature name '{}' is defined twice", item.name));
            }
            if item.pattern.is_empty() {
                return Err(anyhow!("signature '{}' has an empty pattern", item.name));
            }
        }

        Ok(())
    }

    /// Checks that every configured interface exists on this host.
    pub fn check_ifaces(&self) -> Result<()> {
        if self.ifaces.is_empty() {
            return Err(anyhow!(
                "no interface to capture on, please provide one with -i or 'ifaces'"
            ));
        }
        util::lookup_interface(self.ifaces.iter().map(String::as_str))
    }

    pub fn export_interval(&self) -> Result<Duration> {
        let interval = humantime::parse_duration(&self.export_interval).map_err(|e| {
            anyhow!(
                "failed to parse exportInterval='{}' by {}",
                self.export_interval,
                e
            )
        })?;
        if interval.is_zero() {
            return Err(anyhow!("exportInterval must be greater than zero"));
        }
        Ok(interval)
    }

    pub fn signatures(&self) -> Vec<Signature> {
        self.signatures
            .iter()
            .flatten()
            .map(|item| Signature::new(item.name.as_str(), &item.pattern))
            .collect()
    }

    pub fn watch_entries(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.watch
            .iter()
            .flatten()
            .map(|item| (item.name.as_str(), item.cidrs.as_slice()))
    }
}

// By default, the snapshot is exported every 30 seconds.
fn default_export_interval() -> String {
    String::from("30s")
}

fn default_queue_capacity() -> usize {
    4096
}

fn default_histogram_buckets() -> usize {
    flowsniff_core::aggregate::DEFAULT_BUCKETS
}

fn default_top_flows() -> usize {
    5
}

type OptionVec<T> = Option<Vec<T>>;

#[derive(Debug, Deserialize)]
pub struct WatchItem {
    pub name: String,

    pub cidrs: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct SignatureItem {
    pub name: String,

    pub pattern: String,
}
