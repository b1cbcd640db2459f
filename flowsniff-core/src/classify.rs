use crate::{dispatch::Dissection, record::AppClass};

const HTTP_PREFIXES: [&[u8; 4]; 3] = [b"GET ", b"POST", b"HTTP"];
const TLS_PORT: u16 = 443;
const DNS_PORT: u16 = 53;

/// Heuristic application tagging, first match wins:
/// an HTTP request/response prefix, then port 443, then port 53.
pub fn classify_payload(payload: &[u8], ports: Option<(u16, u16)>) -> AppClass {
    if let Some(prefix) = payload.get(..4) {
        if HTTP_PREFIXES.iter().any(|sig| sig.as_slice() == prefix) {
            return AppClass::Http;
        }
    }

    match ports {
        Some((src, dst)) if src == TLS_PORT || dst == TLS_PORT => AppClass::Tls,
        Some((src, dst)) if src == DNS_PORT || dst == DNS_PORT => AppClass::Dns,
        _ => AppClass::Unclassified,
    }
}

/// A named, case-insensitive substring searched for in transport payloads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub name: String,
    pattern: Vec<u8>,
}

impl Signature {
    pub fn new(name: impl Into<String>, pattern: &str) -> Self {
        Self {
            name: name.into(),
            pattern: pattern.as_bytes().to_ascii_lowercase(),
        }
    }

    fn found_in(&self, lowered: &[u8]) -> bool {
        if self.pattern.is_empty() || self.pattern.len() > lowered.len() {
            return false;
        }
        lowered
            .windows(self.pattern.len())
            .any(|w| w == self.pattern.as_slice())
    }
}

#[derive(Debug, Clone, Default)]
pub struct Classifier {
    signatures: Vec<Signature>,
}

impl Classifier {
    pub fn new(signatures: Vec<Signature>) -> Self {
        Self { signatures }
    }

    /// `None` when the frame never reached a transport header.
    pub fn classify(&self, dissection: &Dissection) -> AppClass {
        match dissection.transport {
            Some(transport) => classify_payload(dissection.payload, transport.ports()),
            None => AppClass::None,
        }
    }

    /// Names of every configured signature present in the payload, in
    /// configuration order.
    pub fn match_signatures(&self, dissection: &Dissection) -> Vec<String> {
        if self.signatures.is_empty()
            || dissection.transport.is_none()
            || dissection.payload.is_empty()
        {
            return Vec::new();
        }

        let lowered = dissection.payload.to_ascii_lowercase();
        self.signatures
            .iter()
            .filter(|sig| sig.found_in(&lowered))
            .map(|sig| sig.name.clone())
            .collect()
    }
}
