// ── Switch domain types ──

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::Display;

use super::flow::FlowEntry;
use super::identity::Dpid;
use super::meter::Meter;

/// OFPST_DESC reply: static strings a switch reports about itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwitchDescription {
    pub mfr_desc: String,
    pub hw_desc: String,
    pub sw_desc: String,
    pub serial_num: String,
    pub dp_desc: String,
}

/// OFPST_AGGREGATE reply.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateFlowStats {
    pub packet_count: u64,
    pub byte_count: u64,
    pub flow_count: u32,
}

/// Lifecycle of a switch as seen by the reconciliation engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
pub enum SwitchState {
    Unknown,
    Connected,
    Syncing,
    Synced,
    Disconnected,
}

impl SwitchState {
    /// Whether the scheduled cycle should query this switch.
    pub fn is_syncable(self) -> bool {
        matches!(self, Self::Connected | Self::Synced)
    }

    pub fn is_connected(self) -> bool {
        !matches!(self, Self::Disconnected | Self::Unknown)
    }
}

/// Registry record for one switch. Flow and meter data live in their own
/// stores; see [`Switch`] for the assembled view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SwitchRecord {
    pub dpid: Dpid,
    pub description: Option<SwitchDescription>,
    pub state: SwitchState,
    pub connected_at: Option<DateTime<Utc>>,
    pub disconnected_at: Option<DateTime<Utc>>,
    pub last_synced: Option<DateTime<Utc>>,
}

impl SwitchRecord {
    pub(crate) fn new(dpid: Dpid) -> Self {
        Self {
            dpid,
            description: None,
            state: SwitchState::Unknown,
            connected_at: None,
            disconnected_at: None,
            last_synced: None,
        }
    }
}

/// Assembled read view of a switch, as returned by network snapshots.
///
/// Deliberately free of wall-clock timestamps so that two snapshots of
/// unchanged state serialize identically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Switch {
    #[serde(rename = "id")]
    pub dpid: Dpid,
    pub state: SwitchState,
    #[serde(rename = "desc", default, skip_serializing_if = "Option::is_none")]
    pub description: Option<SwitchDescription>,
    pub flow_tables: Vec<FlowEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregate_flow: Option<AggregateFlowStats>,
    pub meters: Vec<Meter>,
}
