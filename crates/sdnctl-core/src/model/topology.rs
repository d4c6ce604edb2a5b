// ── Topology domain types ──

use std::collections::BTreeSet;
use std::net::{Ipv4Addr, Ipv6Addr};

use serde::{Deserialize, Serialize};

use super::identity::{Dpid, MacAddress};

/// One side of a link, or a host attachment point.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PortRef {
    pub dpid: Dpid,
    pub port_no: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hw_addr: Option<MacAddress>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl PortRef {
    pub fn new(dpid: Dpid, port_no: u32) -> Self {
        Self {
            dpid,
            port_no,
            hw_addr: None,
            name: None,
        }
    }
}

/// Directed switch-to-switch link. Discovery reports both directions.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Link {
    pub src: PortRef,
    pub dst: PortRef,
}

impl Link {
    pub fn new(src: PortRef, dst: PortRef) -> Self {
        Self { src, dst }
    }
}

/// End host learned at a switch port.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Host {
    pub mac: MacAddress,
    #[serde(default)]
    pub ipv4: BTreeSet<Ipv4Addr>,
    #[serde(default)]
    pub ipv6: BTreeSet<Ipv6Addr>,
    pub port: PortRef,
}

/// Full topology as reported by one discovery query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopologySnapshot {
    #[serde(default)]
    pub links: Vec<Link>,
    #[serde(default)]
    pub hosts: Vec<Host>,
}

impl TopologySnapshot {
    /// Sort into canonical order so structural comparison ignores
    /// the order discovery happened to report things in.
    pub fn canonicalize(&mut self) {
        self.links.sort();
        self.links.dedup();
        self.hosts.sort_by(|a, b| a.mac.cmp(&b.mac));
        self.hosts.dedup_by(|a, b| a.mac == b.mac);
    }
}
