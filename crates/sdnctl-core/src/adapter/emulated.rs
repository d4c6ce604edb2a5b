// ── In-memory emulated fabric ──
//
// A `ProtocolAdapter` that keeps switch tables in memory and applies
// OpenFlow table semantics to them. Backs the integration tests and
// the CLI's offline mode. Latency, ack mode and per-switch faults are
// adjustable at runtime so tests can reproduce slow, hung or flaky
// switches.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use arc_swap::ArcSwap;
use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;

use super::{Ack, AdapterError, ProtocolAdapter, SwitchEvent};
use crate::command::validate;
use crate::model::{
    Action, AggregateFlowStats, BandStats, Dpid, FlowEntry, FlowKey, FlowStats, Host, Link, Meter,
    MeterStats, SwitchDescription, TopologySnapshot,
};

const EVENT_CAPACITY: usize = 64;

/// How the fabric acknowledges mutations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AckMode {
    /// Reply `Ack::Confirmed`, as if a barrier reply came back.
    #[default]
    Confirm,
    /// Apply the change but reply `Ack::Accepted`.
    Defer,
}

/// Injected misbehavior for one switch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Fault {
    /// Every flow/meter mod fails with an OpenFlow error.
    Reject { message: String },
    /// Every call on the switch never completes.
    Hang,
    /// Stat queries fail; mods still succeed.
    FailQueries,
}

/// Declarative description of one emulated switch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwitchSpec {
    pub dpid: Dpid,
    #[serde(default)]
    pub description: SwitchDescription,
    #[serde(default = "connected_by_default")]
    pub connected: bool,
    #[serde(default)]
    pub flows: Vec<FlowEntry>,
    #[serde(default)]
    pub meters: Vec<Meter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fault: Option<Fault>,
}

fn connected_by_default() -> bool {
    true
}

/// Declarative description of a whole fabric, loadable from TOML or JSON.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FabricSpec {
    #[serde(default)]
    pub latency_ms: u64,
    #[serde(default)]
    pub ack_mode: AckMode,
    #[serde(default, alias = "switch")]
    pub switches: Vec<SwitchSpec>,
    #[serde(default)]
    pub links: Vec<Link>,
    #[serde(default)]
    pub hosts: Vec<Host>,
}

#[derive(Debug, Clone)]
struct EmulatedSwitch {
    description: SwitchDescription,
    connected: bool,
    /// Insertion order, as a switch reports its table.
    flows: Vec<FlowEntry>,
    meters: BTreeMap<u32, Meter>,
    fault: Option<Fault>,
}

impl EmulatedSwitch {
    fn new(description: SwitchDescription) -> Self {
        Self {
            description,
            connected: true,
            flows: Vec::new(),
            meters: BTreeMap::new(),
            fault: None,
        }
    }

    /// Strict lookup. Switches key OXM fields, so OpenFlow 1.0 names
    /// address the same entry as their OpenFlow 1.3 spellings.
    fn flow_position(&self, key: &FlowKey) -> Option<usize> {
        let key = validate::reported_key(key.clone());
        self.flows
            .iter()
            .position(|f| validate::reported_key(f.key()) == key)
    }

    fn check_meter_refs(&self, actions: &[Action]) -> Result<(), AdapterError> {
        for action in actions {
            if let Action::Meter { meter_id } = action {
                if !self.meters.contains_key(meter_id) {
                    return Err(AdapterError::Rejected(format!("unknown meter {meter_id}")));
                }
            }
        }
        Ok(())
    }

    fn meter_flow_count(&self, meter_id: u32) -> u32 {
        let count = self
            .flows
            .iter()
            .filter(|f| f.actions.contains(&Action::Meter { meter_id }))
            .count();
        u32::try_from(count).unwrap_or(u32::MAX)
    }
}

/// In-memory OpenFlow fabric.
pub struct EmulatedFabric {
    switches: DashMap<Dpid, EmulatedSwitch>,
    topology: ArcSwap<TopologySnapshot>,
    events: broadcast::Sender<SwitchEvent>,
    latency_ms: AtomicU64,
    deferred_acks: AtomicBool,
    topology_failing: AtomicBool,
}

impl Default for EmulatedFabric {
    fn default() -> Self {
        Self::new()
    }
}

impl EmulatedFabric {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            switches: DashMap::new(),
            topology: ArcSwap::from_pointee(TopologySnapshot::default()),
            events,
            latency_ms: AtomicU64::new(0),
            deferred_acks: AtomicBool::new(false),
            topology_failing: AtomicBool::new(false),
        }
    }

    /// Build a fabric from its declarative form. Seeded flows and meters
    /// get zeroed counters.
    pub fn from_spec(spec: FabricSpec) -> Self {
        let fabric = Self::new();
        fabric.set_latency(Duration::from_millis(spec.latency_ms));
        fabric.set_ack_mode(spec.ack_mode);
        for sw in spec.switches {
            let mut state = EmulatedSwitch::new(sw.description);
            state.connected = sw.connected;
            state.fault = sw.fault;
            state.meters = sw
                .meters
                .into_iter()
                .map(|m| (m.meter_id, Meter { stats: None, ..m }))
                .collect();
            for flow in sw.flows {
                let key = flow.key();
                let entry = with_fresh_stats(flow);
                match state.flow_position(&key) {
                    Some(pos) => state.flows[pos] = entry,
                    None => state.flows.push(entry),
                }
            }
            fabric.switches.insert(sw.dpid, state);
        }
        fabric.set_topology(TopologySnapshot {
            links: spec.links,
            hosts: spec.hosts,
        });
        fabric
    }

    // ── Fabric control ───────────────────────────────────────────────

    /// Add a connected switch (or reconnect an existing one, keeping its
    /// tables) and announce it.
    pub fn add_switch(&self, dpid: Dpid, description: SwitchDescription) {
        self.switches
            .entry(dpid)
            .and_modify(|sw| {
                sw.description = description.clone();
                sw.connected = true;
            })
            .or_insert_with(|| EmulatedSwitch::new(description.clone()));
        self.emit(SwitchEvent::Connected {
            dpid,
            description: Some(description),
        });
    }

    /// Bring the control channel of a known switch back up.
    pub fn connect_switch(&self, dpid: Dpid) -> bool {
        let description = match self.switches.get_mut(&dpid) {
            Some(mut sw) => {
                sw.connected = true;
                sw.description.clone()
            }
            None => return false,
        };
        self.emit(SwitchEvent::Connected {
            dpid,
            description: Some(description),
        });
        true
    }

    /// Drop the control channel. Subsequent calls fail with
    /// `AdapterError::NotConnected`; tables survive for a reconnect.
    pub fn disconnect_switch(&self, dpid: Dpid) -> bool {
        match self.switches.get_mut(&dpid) {
            Some(mut sw) => sw.connected = false,
            None => return false,
        }
        self.emit(SwitchEvent::Disconnected { dpid });
        true
    }

    pub fn set_latency(&self, latency: Duration) {
        let ms = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX);
        self.latency_ms.store(ms, Ordering::Relaxed);
    }

    pub fn set_ack_mode(&self, mode: AckMode) {
        self.deferred_acks
            .store(mode == AckMode::Defer, Ordering::Relaxed);
    }

    pub fn set_fault(&self, dpid: Dpid, fault: Option<Fault>) {
        if let Some(mut sw) = self.switches.get_mut(&dpid) {
            sw.fault = fault;
        }
    }

    pub fn set_topology(&self, mut topology: TopologySnapshot) {
        topology.canonicalize();
        self.topology.store(Arc::new(topology));
    }

    /// Make topology discovery fail until cleared.
    pub fn set_topology_failure(&self, failing: bool) {
        self.topology_failing.store(failing, Ordering::Relaxed);
    }

    /// Count traffic against a flow (and the meter it references).
    /// Returns `false` if the switch or flow does not exist.
    pub fn inject_traffic(&self, dpid: Dpid, key: &FlowKey, packets: u64, bytes: u64) -> bool {
        let Some(mut sw) = self.switches.get_mut(&dpid) else {
            return false;
        };
        let Some(pos) = sw.flow_position(key) else {
            return false;
        };
        let entry = &mut sw.flows[pos];
        let stats = entry.stats.get_or_insert_with(FlowStats::default);
        stats.packet_count += packets;
        stats.byte_count += bytes;
        let meter_ids: Vec<u32> = entry
            .actions
            .iter()
            .filter_map(|a| match a {
                Action::Meter { meter_id } => Some(*meter_id),
                _ => None,
            })
            .collect();
        for id in meter_ids {
            if let Some(meter) = sw.meters.get_mut(&id) {
                let stats = meter.stats.get_or_insert_with(MeterStats::default);
                stats.packet_in_count += packets;
                stats.byte_in_count += bytes;
            }
        }
        true
    }

    /// Switch-side flow table, bypassing the adapter interface.
    pub fn flows(&self, dpid: Dpid) -> Vec<FlowEntry> {
        self.switches
            .get(&dpid)
            .map(|sw| sw.flows.clone())
            .unwrap_or_default()
    }

    /// Switch-side meter table, bypassing the adapter interface.
    pub fn meters(&self, dpid: Dpid) -> Vec<Meter> {
        self.switches
            .get(&dpid)
            .map(|sw| sw.meters.values().cloned().collect())
            .unwrap_or_default()
    }

    // ── Internals ────────────────────────────────────────────────────

    fn emit(&self, event: SwitchEvent) {
        debug!(?event, "emulated fabric event");
        // No receivers is fine; nobody is listening yet.
        let _ = self.events.send(event);
    }

    fn ack(&self) -> Ack {
        if self.deferred_acks.load(Ordering::Relaxed) {
            Ack::Accepted
        } else {
            Ack::Confirmed
        }
    }

    async fn delay(&self) {
        let ms = self.latency_ms.load(Ordering::Relaxed);
        if ms > 0 {
            tokio::time::sleep(Duration::from_millis(ms)).await;
        }
    }

    /// Common preamble for every per-switch call: latency, connection
    /// check, and fault injection. Never holds a map guard across an await.
    async fn reach(&self, dpid: Dpid, query: bool) -> Result<(), AdapterError> {
        self.delay().await;
        let fault = {
            let sw = self.switches.get(&dpid).ok_or(AdapterError::NotConnected)?;
            if !sw.connected {
                return Err(AdapterError::NotConnected);
            }
            sw.fault.clone()
        };
        match fault {
            Some(Fault::Hang) => std::future::pending().await,
            Some(Fault::FailQueries) if query => {
                Err(AdapterError::Unavailable("stats request failed".into()))
            }
            Some(Fault::Reject { message }) if !query => Err(AdapterError::Rejected(message)),
            _ => Ok(()),
        }
    }

    fn with_switch<T>(
        &self,
        dpid: Dpid,
        f: impl FnOnce(&mut EmulatedSwitch) -> Result<T, AdapterError>,
    ) -> Result<T, AdapterError> {
        let mut sw = self
            .switches
            .get_mut(&dpid)
            .ok_or(AdapterError::NotConnected)?;
        f(sw.value_mut())
    }
}

fn with_fresh_stats(entry: FlowEntry) -> FlowEntry {
    // Approximates ofp_flow_stats: fixed header plus match and actions.
    let length = 56 + 8 * (entry.match_fields.len() + entry.actions.len());
    FlowEntry {
        stats: Some(FlowStats {
            length: u32::try_from(length).unwrap_or(u32::MAX),
            ..FlowStats::default()
        }),
        ..entry
    }
}

#[async_trait]
impl ProtocolAdapter for EmulatedFabric {
    async fn connected_switches(&self) -> Result<Vec<Dpid>, AdapterError> {
        self.delay().await;
        let mut dpids: Vec<Dpid> = self
            .switches
            .iter()
            .filter(|sw| sw.connected)
            .map(|sw| *sw.key())
            .collect();
        dpids.sort();
        Ok(dpids)
    }

    fn subscribe_events(&self) -> broadcast::Receiver<SwitchEvent> {
        self.events.subscribe()
    }

    async fn install_flow(&self, dpid: Dpid, entry: &FlowEntry) -> Result<Ack, AdapterError> {
        self.reach(dpid, false).await?;
        self.with_switch(dpid, |sw| {
            sw.check_meter_refs(&entry.actions)?;
            let fresh = with_fresh_stats(FlowEntry {
                stats: None,
                ..entry.clone()
            });
            match sw.flow_position(&entry.key()) {
                Some(pos) => sw.flows[pos] = fresh,
                None => sw.flows.push(fresh),
            }
            Ok(())
        })?;
        Ok(self.ack())
    }

    async fn modify_flow(&self, dpid: Dpid, entry: &FlowEntry) -> Result<Ack, AdapterError> {
        self.reach(dpid, false).await?;
        self.with_switch(dpid, |sw| {
            sw.check_meter_refs(&entry.actions)?;
            // Strict modify of a missing entry is a no-op on the switch.
            if let Some(pos) = sw.flow_position(&entry.key()) {
                sw.flows[pos].actions.clone_from(&entry.actions);
            }
            Ok(())
        })?;
        Ok(self.ack())
    }

    async fn remove_flow(&self, dpid: Dpid, key: &FlowKey) -> Result<Ack, AdapterError> {
        self.reach(dpid, false).await?;
        self.with_switch(dpid, |sw| {
            if let Some(pos) = sw.flow_position(key) {
                sw.flows.remove(pos);
            }
            Ok(())
        })?;
        Ok(self.ack())
    }

    async fn query_description(&self, dpid: Dpid) -> Result<SwitchDescription, AdapterError> {
        self.reach(dpid, true).await?;
        self.with_switch(dpid, |sw| Ok(sw.description.clone()))
    }

    async fn query_flow_stats(&self, dpid: Dpid) -> Result<Vec<FlowEntry>, AdapterError> {
        self.reach(dpid, true).await?;
        self.with_switch(dpid, |sw| Ok(sw.flows.clone()))
    }

    async fn query_aggregate_flow(&self, dpid: Dpid) -> Result<AggregateFlowStats, AdapterError> {
        self.reach(dpid, true).await?;
        self.with_switch(dpid, |sw| {
            let mut agg = AggregateFlowStats {
                flow_count: u32::try_from(sw.flows.len()).unwrap_or(u32::MAX),
                ..AggregateFlowStats::default()
            };
            for stats in sw.flows.iter().filter_map(|f| f.stats) {
                agg.packet_count += stats.packet_count;
                agg.byte_count += stats.byte_count;
            }
            Ok(agg)
        })
    }

    async fn install_meter(&self, dpid: Dpid, meter: &Meter) -> Result<Ack, AdapterError> {
        self.reach(dpid, false).await?;
        self.with_switch(dpid, |sw| {
            if sw.meters.contains_key(&meter.meter_id) {
                return Err(AdapterError::Rejected(format!(
                    "meter {} exists",
                    meter.meter_id
                )));
            }
            sw.meters.insert(
                meter.meter_id,
                Meter {
                    stats: None,
                    ..meter.clone()
                },
            );
            Ok(())
        })?;
        Ok(self.ack())
    }

    async fn modify_meter(&self, dpid: Dpid, meter: &Meter) -> Result<Ack, AdapterError> {
        self.reach(dpid, false).await?;
        self.with_switch(dpid, |sw| {
            let existing = sw
                .meters
                .get_mut(&meter.meter_id)
                .ok_or_else(|| AdapterError::Rejected(format!("unknown meter {}", meter.meter_id)))?;
            existing.flags = meter.flags;
            existing.bands.clone_from(&meter.bands);
            Ok(())
        })?;
        Ok(self.ack())
    }

    async fn remove_meter(&self, dpid: Dpid, meter_id: u32) -> Result<Ack, AdapterError> {
        self.reach(dpid, false).await?;
        self.with_switch(dpid, |sw| {
            if sw.meters.remove(&meter_id).is_some() {
                // Deleting a meter also deletes every flow that uses it.
                sw.flows
                    .retain(|f| !f.actions.contains(&Action::Meter { meter_id }));
            }
            Ok(())
        })?;
        Ok(self.ack())
    }

    async fn query_meter_stats(&self, dpid: Dpid) -> Result<Vec<Meter>, AdapterError> {
        self.reach(dpid, true).await?;
        self.with_switch(dpid, |sw| {
            let meters = sw
                .meters
                .values()
                .map(|meter| {
                    let counters = meter.stats.clone().unwrap_or_default();
                    let bands = meter.bands.len();
                    Meter {
                        stats: Some(MeterStats {
                            len: u32::try_from(40 + 16 * bands).unwrap_or(u32::MAX),
                            flow_count: sw.meter_flow_count(meter.meter_id),
                            band_stats: vec![BandStats::default(); bands],
                            ..counters
                        }),
                        ..meter.clone()
                    }
                })
                .collect();
            Ok(meters)
        })
    }

    async fn query_topology(&self) -> Result<TopologySnapshot, AdapterError> {
        self.delay().await;
        if self.topology_failing.load(Ordering::Relaxed) {
            return Err(AdapterError::Unavailable("topology discovery failed".into()));
        }
        let up = |dpid: &Dpid| self.switches.get(dpid).is_some_and(|sw| sw.connected);
        let full = self.topology.load();
        Ok(TopologySnapshot {
            links: full
                .links
                .iter()
                .filter(|l| up(&l.src.dpid) && up(&l.dst.dpid))
                .cloned()
                .collect(),
            hosts: full
                .hosts
                .iter()
                .filter(|h| up(&h.port.dpid))
                .cloned()
                .collect(),
        })
    }
}
