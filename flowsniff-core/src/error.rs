use std::fmt::Display;

use serde::Serialize;
use thiserror::Error;

/// The header layer a decoder was working on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Layer {
    Ethernet,
    Ipv4,
    Ipv6,
    Tcp,
    Udp,
    Icmp,
    Igmp,
}

impl Display for Layer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Layer::Ethernet => "ethernet",
            Layer::Ipv4 => "ipv4",
            Layer::Ipv6 => "ipv6",
            Layer::Tcp => "tcp",
            Layer::Udp => "udp",
            Layer::Icmp => "icmp",
            Layer::Igmp => "igmp",
        };
        f.write_str(name)
    }
}

/// Structural decode failure of a single header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("{layer} header too short: need {needed} bytes, have {available}")]
    TooShort {
        layer: Layer,
        needed: usize,
        available: usize,
    },

    #[error("{layer} header has version {found}, expected {expected}")]
    InvalidVersion { layer: Layer, expected: u8, found: u8 },

    #[error("{layer} header declares {declared} bytes, {available} available")]
    InvalidLength {
        layer: Layer,
        declared: usize,
        available: usize,
    },
}

impl DecodeError {
    pub fn layer(&self) -> Layer {
        match self {
            DecodeError::TooShort { layer, .. }
            | DecodeError::InvalidVersion { layer, .. }
            | DecodeError::InvalidLength { layer, .. } => *layer,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            DecodeError::TooShort { .. } => ErrorKind::TooShort,
            DecodeError::InvalidVersion { .. } => ErrorKind::InvalidVersion,
            DecodeError::InvalidLength { .. } => ErrorKind::InvalidLength,
        }
    }

    #[inline]
    pub(crate) fn too_short(layer: Layer, needed: usize, available: usize) -> Self {
        DecodeError::TooShort {
            layer,
            needed,
            available,
        }
    }
}

/// Field-less discriminant of [`DecodeError`], carried by emitted records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
    TooShort,
    InvalidVersion,
    InvalidLength,
}

pub type DecodeResult<T> = Result<T, DecodeError>;
