use std::fmt::{Display, Write};

use serde::{Serialize, Serializer};

/// A 48-bit link-layer address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MacAddr(pub [u8; 6]);

impl Display for MacAddr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02x}:{b:02x}:{c:02x}:{d:02x}:{e:02x}:{g:02x}")
    }
}

impl Serialize for MacAddr {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A network-layer address kept as raw octets until it is displayed.
///
/// IPv6 addresses render as eight colon separated groups of four lowercase
/// hex digits, without zero compression, so every address has one textual
/// form and sorts the same way as its bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NetAddr {
    V4([u8; 4]),
    V6([u8; 16]),
}

impl Display for NetAddr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NetAddr::V4([a, b, c, d]) => write!(f, "{a}.{b}.{c}.{d}"),
            NetAddr::V6(octets) => {
                for (i, pair) in octets.chunks_exact(2).enumerate() {
                    if i > 0 {
                        f.write_char(':')?;
                    }
                    write!(f, "{:02x}{:02x}", pair[0], pair[1])?;
                }
                Ok(())
            }
        }
    }
}

impl Serialize for NetAddr {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl From<std::net::IpAddr> for NetAddr {
    fn from(value: std::net::IpAddr) -> Self {
        match value {
            std::net::IpAddr::V4(v4) => NetAddr::V4(v4.octets()),
            std::net::IpAddr::V6(v6) => NetAddr::V6(v6.octets()),
        }
    }
}

impl From<NetAddr> for std::net::IpAddr {
    fn from(value: NetAddr) -> Self {
        match value {
            NetAddr::V4(o) => std::net::IpAddr::from(o),
            NetAddr::V6(o) => std::net::IpAddr::from(o),
        }
    }
}
