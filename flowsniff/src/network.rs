use std::fmt::Display;

use colored::{ColoredString, Colorize};
use flowsniff_core::{DecodedRecord, NetAddr, Outcome, TransportProto};

/// One-line console rendering of a decoded record.
pub struct RecordLine<'a>(pub &'a DecodedRecord);

fn endpoint(ip: Option<NetAddr>, port: Option<u16>) -> String {
    match (ip, port) {
        (Some(ip), Some(port)) => format!("{}:{}", ip, port),
        (Some(ip), None) => ip.to_string(),
        (None, _) => "N/A".to_string(),
    }
}

impl Display for RecordLine<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let record = self.0;
        let status = match record.outcome {
            Outcome::Success => String::new(),
            Outcome::Malformed { layer, kind } => format!(" malformed={:?}@{}", kind, layer),
            Outcome::Unsupported { layer, protocol } => {
                format!(" unsupported={:#06x}@{}", protocol, layer)
            }
        };
        write!(
            f,
            "* {:<22}#{:<8}{:<7}{:<24} ->    {:<24}{:<14}length={:<5}{}",
            record.timestamp.format("[%Y-%m-%d %H:%M:%S]").to_string(),
            record.index,
            record.transport.as_str(),
            endpoint(record.src_ip, record.src_port),
            endpoint(record.dst_ip, record.dst_port),
            record.app.as_str(),
            record.len,
            status,
        )
    }
}

impl RecordLine<'_> {
    pub fn colored(&self) -> ColoredString {
        let line = self.to_string();
        if matches!(self.0.outcome, Outcome::Malformed { .. }) {
            return line.bright_red();
        }
        match self.0.transport {
            TransportProto::Tcp => line.bright_green(),
            TransportProto::Udp => line.bright_yellow(),
            TransportProto::Icmp | TransportProto::Igmp => line.bright_cyan(),
            TransportProto::Other | TransportProto::None => line.normal(),
        }
    }
}
