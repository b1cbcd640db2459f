use std::{
    collections::{BTreeMap, BTreeSet},
    fmt::Debug,
    net::{IpAddr, Ipv4Addr, Ipv6Addr},
    str::FromStr,
    sync::Arc,
};

use anyhow::{anyhow, Result};
use flowsniff_core::DecodedRecord;
use ipnetwork::IpNetwork;
use log::debug;

#[derive(Debug)]
struct Node<N> {
    metadata: Option<Arc<N>>,

    left: Option<Box<Node<N>>>,
    right: Option<Box<Node<N>>>,
}

impl<N> Default for Node<N> {
    fn default() -> Self {
        Self {
            metadata: None,
            left: None,
            right: None,
        }
    }
}

impl<N> Node<N> {
    pub fn empty(&self) -> bool {
        self.left.is_none() && self.right.is_none() && self.metadata.is_none()
    }
}

/// Binary trie over address bits with longest-prefix lookup. IPv4 and IPv6
/// prefixes live under separate roots.
#[derive(Debug)]
pub struct PrefixTree<N> {
    v4: Node<N>,
    v6: Node<N>,
}

impl<N> Default for PrefixTree<N>
where
    N: Debug,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<N> PrefixTree<N>
where
    N: Debug,
{
    pub fn new() -> Self {
        PrefixTree {
            v4: Node::default(),
            v6: Node::default(),
        }
    }

    pub fn empty(&self) -> bool {
        self.v4.empty() && self.v6.empty()
    }

    pub fn insert(&mut self, network: IpNetwork, metadata: N) {
        let (octets, root) = match network.network() {
            IpAddr::V4(v4) => (v4.octets().to_vec(), &mut self.v4),
            IpAddr::V6(v6) => (v6.octets().to_vec(), &mut self.v6),
        };

        let mut tmp = root;
        for i in 0..network.prefix() as usize {
            tmp = if bit_at(&octets, i) {
                tmp.right.get_or_insert_with(Box::default).as_mut()
            } else {
                tmp.left.get_or_insert_with(Box::default).as_mut()
            };
        }
        tmp.metadata = Some(Arc::new(metadata));
    }

    /// Metadata of the most specific prefix containing `addr`.
    pub fn search(&self, addr: IpAddr) -> Option<Arc<N>> {
        let (octets, root) = match addr {
            IpAddr::V4(v4) => (v4.octets().to_vec(), &self.v4),
            IpAddr::V6(v6) => (v6.octets().to_vec(), &self.v6),
        };

        let mut tmp = root;
        let mut assume_last = tmp.metadata.as_ref();
        for i in 0..octets.len() * 8 {
            let next = if bit_at(&octets, i) {
                tmp.right.as_deref()
            } else {
                tmp.left.as_deref()
            };
            match next {
                Some(node) => {
                    tmp = node;
                    if node.metadata.is_some() {
                        assume_last = node.metadata.as_ref();
                    }
                }
                None => break,
            }
        }

        assume_last.cloned()
    }

    /// Used to report the cidr items of PrefixTree mounts
    pub fn summary(&self) {
        let mut path = Vec::new();
        self.dfs(&self.v4, &mut path, false);
        self.dfs(&self.v6, &mut path, true);
    }

    fn dfs(&self, node: &Node<N>, path: &mut Vec<bool>, v6: bool) {
        if let Some(metadata) = node.metadata.as_ref() {
            debug!("{} => {:?}", bits_to_cidr(path, v6), metadata);
        }

        if let Some(left) = node.left.as_deref() {
            path.push(false);
            self.dfs(left, path, v6);
            path.pop();
        }

        if let Some(right) = node.right.as_deref() {
            path.push(true);
            self.dfs(right, path, v6);
            path.pop();
        }
    }
}

#[inline]
fn bit_at(octets: &[u8], i: usize) -> bool {
    octets[i / 8] & (0x80 >> (i % 8)) != 0
}

// Rebuild a cidr string from a trie path, zero-filling the host bits.
fn bits_to_cidr(bits: &[bool], v6: bool) -> String {
    let mut octets = [0u8; 16];
    for (i, _) in bits.iter().enumerate().filter(|(_, b)| **b) {
        octets[i / 8] |= 0x80 >> (i % 8);
    }

    if v6 {
        format!("{}/{}", Ipv6Addr::from(octets), bits.len())
    } else {
        let v4 = Ipv4Addr::new(octets[0], octets[1], octets[2], octets[3]);
        format!("{}/{}", v4, bits.len())
    }
}

/// Named address ranges whose traffic is counted separately.
#[derive(Debug, Default)]
pub struct WatchList {
    trie: PrefixTree<String>,
    counts: BTreeMap<String, u64>,
}

impl WatchList {
    pub fn new<'a, I>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a str, &'a [String])>,
    {
        let mut list = Self::default();
        for (name, cidrs) in entries {
            for cidr in cidrs {
                let network = IpNetwork::from_str(cidr)
                    .map_err(|e| anyhow!("failed to parse cidr='{}' by {}", cidr, e))?;
                list.trie.insert(network, name.to_owned());
            }
            list.counts.insert(name.to_owned(), 0);
        }
        list.trie.summary();

        Ok(list)
    }

    pub fn empty(&self) -> bool {
        self.trie.empty()
    }

    /// Counts the record once per watch entry that its source or
    /// destination address falls into.
    pub fn observe(&mut self, record: &DecodedRecord) {
        if self.empty() {
            return;
        }

        let mut names = BTreeSet::new();
        for addr in [record.src_ip, record.dst_ip].into_iter().flatten() {
            if let Some(name) = self.trie.search(addr.into()) {
                names.insert(name);
            }
        }
        for name in names {
            if let Some(count) = self.counts.get_mut(name.as_str()) {
                *count += 1;
            }
        }
    }

    pub fn counts(&self) -> &BTreeMap<String, u64> {
        &self.counts
    }
}
