//! Decoding and flow aggregation for captured link-layer frames.
//!
//! Frames go through [`pipeline::Pipeline`] one at a time: the dispatcher
//! decodes Ethernet, IPv4/IPv6 and TCP/UDP/ICMP/IGMP headers, the classifier
//! tags the payload, and the aggregator folds the resulting
//! [`record::DecodedRecord`] into the session statistics.

pub mod addr;
pub mod aggregate;
pub mod classify;
pub mod dispatch;
pub mod error;
pub mod header;
pub mod pipeline;
pub mod record;
pub mod watch;

#[cfg(test)]
pub(crate) mod test_utils;

pub use addr::{MacAddr, NetAddr};
pub use aggregate::{AggregateSnapshot, Aggregator, FlowKey};
pub use classify::{Classifier, Signature};
pub use error::{DecodeError, Layer};
pub use pipeline::Pipeline;
pub use record::{AppClass, DecodedRecord, Outcome, RawFrame, TransportProto};
pub use watch::SignatureWatcher;
