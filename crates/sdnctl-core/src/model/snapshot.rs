// ── Network snapshot ──

use serde::{Deserialize, Serialize};

use super::switch::Switch;
use super::topology::{Host, Link};

/// Whole-network read view assembled from the stores.
///
/// Every collection is in canonical order (switches by dpid, links and
/// hosts sorted), so serializing two snapshots of unchanged state yields
/// identical bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkSnapshot {
    pub switches: Vec<Switch>,
    pub links: Vec<Link>,
    pub hosts: Vec<Host>,
}
