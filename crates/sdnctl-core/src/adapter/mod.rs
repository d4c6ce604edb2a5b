// ── Protocol adapter seam ──
//
// The engine never speaks OpenFlow itself. Everything that reaches a
// switch goes through a `ProtocolAdapter`, and every call is bounded
// by a timeout so a slow or hung switch only fails its own operation.

pub mod emulated;

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use strum::Display;
use thiserror::Error;
use tokio::sync::broadcast;

use crate::error::CoreError;
use crate::model::{
    AggregateFlowStats, Dpid, FlowEntry, FlowKey, Meter, SwitchDescription, TopologySnapshot,
};

pub use emulated::{AckMode, EmulatedFabric, FabricSpec, Fault, SwitchSpec};

/// How the adapter acknowledged a mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ack {
    /// The switch confirmed the change (e.g. barrier reply received).
    /// The engine commits it to the cache immediately.
    Confirmed,
    /// The message was sent but not confirmed. The cache is left alone
    /// and the next reconciliation picks up switch-side truth.
    Accepted,
}

/// Failure reported by an adapter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdapterError {
    /// The switch answered with an OpenFlow error message.
    #[error("rejected by switch: {0}")]
    Rejected(String),

    /// The switch has no control channel to the adapter.
    #[error("switch not connected")]
    NotConnected,

    /// The adapter itself could not complete the call.
    #[error("adapter unavailable: {0}")]
    Unavailable(String),
}

/// Switch lifecycle notifications pushed by the adapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SwitchEvent {
    Connected {
        dpid: Dpid,
        #[serde(default)]
        description: Option<SwitchDescription>,
    },
    Disconnected {
        dpid: Dpid,
    },
}

/// Adapter call names, used for error context and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "snake_case")]
pub enum Operation {
    ListSwitches,
    InstallFlow,
    ModifyFlow,
    RemoveFlow,
    QueryDescription,
    QueryFlowStats,
    QueryAggregateFlow,
    InstallMeter,
    ModifyMeter,
    RemoveMeter,
    QueryMeterStats,
    QueryTopology,
}

/// Everything the engine needs from the layer that speaks OpenFlow.
///
/// Flow and meter mods use strict semantics: the key is matched exactly,
/// never as a wildcard superset. Stat queries return full snapshots.
#[async_trait]
pub trait ProtocolAdapter: Send + Sync {
    /// Switches with a live control channel right now.
    async fn connected_switches(&self) -> Result<Vec<Dpid>, AdapterError>;

    /// Subscribe to connect/disconnect notifications.
    fn subscribe_events(&self) -> broadcast::Receiver<SwitchEvent>;

    async fn install_flow(&self, dpid: Dpid, entry: &FlowEntry) -> Result<Ack, AdapterError>;

    async fn modify_flow(&self, dpid: Dpid, entry: &FlowEntry) -> Result<Ack, AdapterError>;

    async fn remove_flow(&self, dpid: Dpid, key: &FlowKey) -> Result<Ack, AdapterError>;

    async fn query_description(&self, dpid: Dpid) -> Result<SwitchDescription, AdapterError>;

    async fn query_flow_stats(&self, dpid: Dpid) -> Result<Vec<FlowEntry>, AdapterError>;

    async fn query_aggregate_flow(&self, dpid: Dpid) -> Result<AggregateFlowStats, AdapterError>;

    async fn install_meter(&self, dpid: Dpid, meter: &Meter) -> Result<Ack, AdapterError>;

    async fn modify_meter(&self, dpid: Dpid, meter: &Meter) -> Result<Ack, AdapterError>;

    async fn remove_meter(&self, dpid: Dpid, meter_id: u32) -> Result<Ack, AdapterError>;

    /// Meter configuration merged with meter statistics.
    async fn query_meter_stats(&self, dpid: Dpid) -> Result<Vec<Meter>, AdapterError>;

    async fn query_topology(&self) -> Result<TopologySnapshot, AdapterError>;
}

/// Run one adapter call under `limit`, translating failures into
/// [`CoreError`] with the switch and operation attached.
pub(crate) async fn bounded<T, F>(
    dpid: Option<Dpid>,
    operation: Operation,
    limit: Duration,
    call: F,
) -> Result<T, CoreError>
where
    F: Future<Output = Result<T, AdapterError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(CoreError::from_adapter(dpid, operation, err)),
        Err(_) => Err(CoreError::AdapterTimeout {
            dpid,
            operation,
            timeout_ms: u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
        }),
    }
}
