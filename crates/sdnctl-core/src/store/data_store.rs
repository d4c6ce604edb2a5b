// ── Central data store ──
//
// Owns every cached entity: the switch registry, topology, and the
// per-switch flow and meter tables. Reads never wait on I/O; table
// writes hold a DashMap shard only for the in-memory edit.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::watch;

use super::flow_table::FlowTable;
use super::locks::SwitchLocks;
use super::meter_table::MeterTable;
use super::registry::SwitchRegistry;
use super::topology::TopologyStore;
use crate::error::CoreError;
use crate::model::{Dpid, FlowEntry, FlowKey, Meter, NetworkSnapshot, Switch, SwitchRecord};

pub(crate) struct DataStore {
    pub(crate) registry: SwitchRegistry,
    pub(crate) topology: TopologyStore,
    pub(crate) locks: SwitchLocks,
    flows: DashMap<Dpid, FlowTable>,
    meters: DashMap<Dpid, MeterTable>,
    last_full_refresh: watch::Sender<Option<DateTime<Utc>>>,
}

impl DataStore {
    pub(crate) fn new() -> Self {
        let (last_full_refresh, _) = watch::channel(None);
        Self {
            registry: SwitchRegistry::new(),
            topology: TopologyStore::new(),
            locks: SwitchLocks::default(),
            flows: DashMap::new(),
            meters: DashMap::new(),
            last_full_refresh,
        }
    }

    // ── Table access ─────────────────────────────────────────────────

    pub(crate) fn with_flows<R>(&self, dpid: Dpid, edit: impl FnOnce(&mut FlowTable) -> R) -> R {
        let mut table = self.flows.entry(dpid).or_default();
        edit(table.value_mut())
    }

    pub(crate) fn with_meters<R>(&self, dpid: Dpid, edit: impl FnOnce(&mut MeterTable) -> R) -> R {
        let mut table = self.meters.entry(dpid).or_default();
        edit(table.value_mut())
    }

    pub(crate) fn cached_flow(&self, dpid: Dpid, key: &FlowKey) -> Option<FlowEntry> {
        self.flows.get(&dpid).and_then(|t| t.get(key).cloned())
    }

    pub(crate) fn has_meter(&self, dpid: Dpid, meter_id: u32) -> bool {
        self.meters.get(&dpid).is_some_and(|t| t.contains(meter_id))
    }

    pub(crate) fn list_flows(&self, dpid: Dpid) -> Vec<FlowEntry> {
        self.flows.get(&dpid).map(|t| t.sorted()).unwrap_or_default()
    }

    pub(crate) fn list_meters(&self, dpid: Dpid) -> Vec<Meter> {
        self.meters.get(&dpid).map(|t| t.list()).unwrap_or_default()
    }

    /// Mutations need a known switch with a live control channel.
    pub(crate) fn ensure_connected(&self, dpid: Dpid) -> Result<(), CoreError> {
        let record = self.registry.get(dpid)?;
        if record.state.is_connected() {
            Ok(())
        } else {
            Err(CoreError::SwitchDisconnected { dpid })
        }
    }

    /// Drop every trace of a purged switch.
    pub(crate) fn drop_switch_state(&self, dpid: Dpid) {
        self.flows.remove(&dpid);
        self.meters.remove(&dpid);
        self.locks.remove(dpid);
    }

    // ── Views ────────────────────────────────────────────────────────

    pub(crate) fn switch_view(&self, record: &SwitchRecord) -> Switch {
        let (flow_tables, aggregate_flow) = self
            .flows
            .get(&record.dpid)
            .map(|t| (t.sorted(), t.aggregate()))
            .unwrap_or_default();
        Switch {
            dpid: record.dpid,
            state: record.state,
            description: record.description.clone(),
            flow_tables,
            aggregate_flow,
            meters: self.list_meters(record.dpid),
        }
    }

    pub(crate) fn snapshot(&self) -> NetworkSnapshot {
        let switches = self
            .registry
            .list()
            .iter()
            .map(|record| self.switch_view(record))
            .collect();
        let topology = self.topology.snapshot();
        NetworkSnapshot {
            switches,
            links: topology.links.clone(),
            hosts: topology.hosts.clone(),
        }
    }

    // ── Refresh bookkeeping ──────────────────────────────────────────

    pub(crate) fn mark_full_refresh(&self) {
        let now = Utc::now();
        self.last_full_refresh.send_modify(|t| *t = Some(now));
    }

    pub(crate) fn last_full_refresh(&self) -> Option<DateTime<Utc>> {
        *self.last_full_refresh.borrow()
    }

    pub(crate) fn subscribe_full_refresh(&self) -> watch::Receiver<Option<DateTime<Utc>>> {
        self.last_full_refresh.subscribe()
    }
}

impl Default for DataStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared handle used by managers, the reconciler and the controller.
pub(crate) type SharedStore = Arc<DataStore>;
