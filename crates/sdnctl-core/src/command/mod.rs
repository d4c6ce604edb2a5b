// ── Command API ──
//
// All write operations flow through a unified `Command` enum.
// The controller routes each variant to the flow or meter manager,
// which validates it, serializes on the target switch and calls the
// protocol adapter.

mod envelope;
pub mod requests;
pub(crate) mod validate;

use serde::{Deserialize, Serialize};

use crate::adapter::Ack;
use crate::model::{Action, Dpid, FlowKey};

pub use requests::{FlowSpec, MeterSpec};

/// All possible write operations against the network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    // ── Flow operations ──────────────────────────────────────────────
    AddFlow {
        dpid: Dpid,
        flow: FlowSpec,
    },
    /// Strict modify: replaces the actions of the entry with this key.
    ModifyFlow {
        dpid: Dpid,
        key: FlowKey,
        actions: Vec<Action>,
    },
    DeleteFlow {
        dpid: Dpid,
        key: FlowKey,
    },

    // ── Meter operations ─────────────────────────────────────────────
    AddMeter {
        dpid: Dpid,
        meter: MeterSpec,
    },
    ModifyMeter {
        dpid: Dpid,
        meter: MeterSpec,
    },
    DeleteMeter {
        dpid: Dpid,
        meter_id: u32,
    },
}

impl Command {
    /// Switch the command targets.
    pub fn dpid(&self) -> Dpid {
        match self {
            Self::AddFlow { dpid, .. }
            | Self::ModifyFlow { dpid, .. }
            | Self::DeleteFlow { dpid, .. }
            | Self::AddMeter { dpid, .. }
            | Self::ModifyMeter { dpid, .. }
            | Self::DeleteMeter { dpid, .. } => *dpid,
        }
    }

    /// Short operation name for logs and CLI output.
    pub fn name(&self) -> &'static str {
        match self {
            Self::AddFlow { .. } => "add_flow",
            Self::ModifyFlow { .. } => "modify_flow",
            Self::DeleteFlow { .. } => "delete_flow",
            Self::AddMeter { .. } => "add_meter",
            Self::ModifyMeter { .. } => "modify_meter",
            Self::DeleteMeter { .. } => "delete_meter",
        }
    }
}

/// Outcome of a successful command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CommandResult {
    /// The switch confirmed the change and the cache reflects it.
    Applied,
    /// The switch accepted the change; it shows up after the next
    /// reconciliation.
    Pending,
}

impl From<Ack> for CommandResult {
    fn from(ack: Ack) -> Self {
        match ack {
            Ack::Confirmed => Self::Applied,
            Ack::Accepted => Self::Pending,
        }
    }
}
