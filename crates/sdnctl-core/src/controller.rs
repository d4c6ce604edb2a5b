// ── Controller abstraction ──
//
// Public facade over the engine. Owns the stores, the managers and the
// reconciler; runs the adapter event listener and the periodic refresh
// in the background; routes every mutation through `execute`.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, broadcast};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::adapter::{Operation, ProtocolAdapter, SwitchEvent, bounded};
use crate::command::{Command, CommandResult, FlowSpec, MeterSpec};
use crate::config::ControllerConfig;
use crate::error::CoreError;
use crate::flows::FlowTableManager;
use crate::meters::MeterManager;
use crate::model::{
    Action, Dpid, FlowEntry, FlowKey, Meter, NetworkSnapshot, Switch, SwitchDescription,
    SwitchRecord, TopologySnapshot,
};
use crate::reconcile::{CycleReport, Reconciler};
use crate::store::{DataStore, SharedStore, TopologyCallback};
use crate::stream::{SwitchStream, TopologyStream};

// ── Controller ───────────────────────────────────────────────────

/// The main entry point for consumers.
///
/// Cheaply cloneable via `Arc<ControllerInner>`. Reads are served from
/// the stores and never touch the network; mutations are validated,
/// serialized per switch, and sent through the protocol adapter.
#[derive(Clone)]
pub struct Controller {
    inner: Arc<ControllerInner>,
}

struct ControllerInner {
    config: ControllerConfig,
    store: SharedStore,
    adapter: Arc<dyn ProtocolAdapter>,
    flows: FlowTableManager,
    meters: MeterManager,
    reconciler: Reconciler,
    started: AtomicBool,
    cancel: CancellationToken,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Controller {
    /// Create a controller over `adapter`. Does NOT start anything --
    /// call [`start()`](Self::start) to discover switches and spawn the
    /// background tasks.
    pub fn new(config: ControllerConfig, adapter: Arc<dyn ProtocolAdapter>) -> Self {
        let store: SharedStore = Arc::new(DataStore::new());
        let flows = FlowTableManager::new(
            Arc::clone(&store),
            Arc::clone(&adapter),
            config.command_timeout,
        );
        let meters = MeterManager::new(
            Arc::clone(&store),
            Arc::clone(&adapter),
            config.command_timeout,
        );
        let reconciler = Reconciler::new(
            Arc::clone(&store),
            Arc::clone(&adapter),
            config.query_timeout,
            config.disconnect_timeout,
        );

        Self {
            inner: Arc::new(ControllerInner {
                config,
                store,
                adapter,
                flows,
                meters,
                reconciler,
                started: AtomicBool::new(false),
                cancel: CancellationToken::new(),
                task_handles: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Access the controller configuration.
    pub fn config(&self) -> &ControllerConfig {
        &self.inner.config
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Discover connected switches, run an initial reconciliation and
    /// spawn the background tasks (event listener, periodic refresh).
    ///
    /// Fails only if the adapter cannot list switches. A partially
    /// failed initial cycle is logged and retried on schedule.
    pub async fn start(&self) -> Result<CycleReport, CoreError> {
        if self.inner.started.swap(true, Ordering::SeqCst) {
            return Err(CoreError::Internal("controller already started".into()));
        }

        // Subscribe before listing so no connect event falls in between.
        let events = self.inner.adapter.subscribe_events();
        if let Err(e) = self.resync_switch_list().await {
            self.inner.started.store(false, Ordering::SeqCst);
            return Err(e);
        }

        let report = self.inner.reconciler.run_cycle().await;
        if !report.is_complete() {
            warn!(
                failed = ?report.failed,
                topology_failed = report.topology_failed,
                "initial reconciliation incomplete"
            );
        }

        let mut handles = self.inner.task_handles.lock().await;
        let cancel = self.inner.cancel.clone();
        handles.push(tokio::spawn(event_task(self.clone(), events, cancel.clone())));

        let interval = self.inner.config.refresh_interval;
        if !interval.is_zero() {
            handles.push(tokio::spawn(refresh_task(self.clone(), interval, cancel)));
        }

        info!(switches = self.inner.store.registry.list().len(), "controller started");
        Ok(report)
    }

    /// Cancel background tasks and wait for them to finish. Cached state
    /// stays readable.
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();

        // Tasks may register more handles while we wait; the lock is never
        // held across a join.
        loop {
            let handles = std::mem::take(&mut *self.inner.task_handles.lock().await);
            if handles.is_empty() {
                break;
            }
            for handle in handles {
                let _ = handle.await;
            }
        }
        debug!("controller stopped");
    }

    // ── Reads (never block on I/O) ───────────────────────────────

    /// Whole-network view: switches with their tables, links and hosts.
    pub fn network_snapshot(&self) -> NetworkSnapshot {
        self.inner.store.snapshot()
    }

    pub fn switches(&self) -> Vec<Switch> {
        let store = &self.inner.store;
        store
            .registry
            .list()
            .iter()
            .map(|record| store.switch_view(record))
            .collect()
    }

    pub fn switch(&self, dpid: Dpid) -> Result<Switch, CoreError> {
        let record = self.inner.store.registry.get(dpid)?;
        Ok(self.inner.store.switch_view(&record))
    }

    /// Registry record, including lifecycle timestamps.
    pub fn switch_record(&self, dpid: Dpid) -> Result<Arc<SwitchRecord>, CoreError> {
        self.inner.store.registry.get(dpid)
    }

    pub fn list_flows(&self, dpid: Dpid) -> Result<Vec<FlowEntry>, CoreError> {
        self.inner.flows.list(dpid)
    }

    pub fn list_meters(&self, dpid: Dpid) -> Result<Vec<Meter>, CoreError> {
        self.inner.meters.list(dpid)
    }

    pub fn topology(&self) -> Arc<TopologySnapshot> {
        self.inner.store.topology.snapshot()
    }

    /// When the last fully successful reconciliation cycle finished.
    pub fn last_full_refresh(&self) -> Option<DateTime<Utc>> {
        self.inner.store.last_full_refresh()
    }

    // ── Subscriptions ────────────────────────────────────────────

    pub fn subscribe_switches(&self) -> SwitchStream {
        SwitchStream::new(self.inner.store.registry.subscribe())
    }

    pub fn subscribe_topology(&self) -> TopologyStream {
        TopologyStream::new(self.inner.store.topology.subscribe())
    }

    /// Watch completion times of fully successful cycles.
    pub fn subscribe_refreshes(&self) -> tokio::sync::watch::Receiver<Option<DateTime<Utc>>> {
        self.inner.store.subscribe_full_refresh()
    }

    /// Register a callback run once per refresh that changed topology.
    pub fn on_topology_change(&self, callback: TopologyCallback) {
        self.inner.store.topology.on_change(callback);
    }

    // ── Reconciliation ───────────────────────────────────────────

    /// Run one reconciliation cycle now. Partial failures are reported
    /// as [`CoreError::ReconciliationPartialFailure`]; whatever did
    /// succeed has already been applied.
    pub async fn trigger_update(&self) -> Result<CycleReport, CoreError> {
        let report = self.inner.reconciler.run_cycle().await;
        if report.is_complete() {
            Ok(report)
        } else {
            Err(CoreError::ReconciliationPartialFailure {
                failed: report.failed,
                topology_failed: report.topology_failed,
            })
        }
    }

    /// Reconcile a single switch and wait for it.
    pub async fn sync_switch(&self, dpid: Dpid) -> Result<(), CoreError> {
        self.inner.reconciler.sync_switch(dpid).await
    }

    // ── Command execution ────────────────────────────────────────

    /// Execute a command against the network.
    pub async fn execute(&self, cmd: Command) -> Result<CommandResult, CoreError> {
        let dpid = cmd.dpid();
        let name = cmd.name();
        let result = route_command(&self.inner, cmd).await;

        match &result {
            Ok(outcome) => {
                debug!(%dpid, command = name, %outcome, "command succeeded");
                if self.inner.config.resync_after_mutation {
                    if let Err(e) = self.sync_switch(dpid).await {
                        warn!(%dpid, error = %e, "post-mutation resync failed");
                    }
                }
            }
            Err(e) => debug!(%dpid, command = name, error = %e, "command failed"),
        }
        result
    }

    pub async fn add_flow(&self, dpid: Dpid, flow: FlowSpec) -> Result<CommandResult, CoreError> {
        self.execute(Command::AddFlow { dpid, flow }).await
    }

    pub async fn modify_flow(
        &self,
        dpid: Dpid,
        key: FlowKey,
        actions: Vec<Action>,
    ) -> Result<CommandResult, CoreError> {
        self.execute(Command::ModifyFlow { dpid, key, actions })
            .await
    }

    pub async fn delete_flow(&self, dpid: Dpid, key: FlowKey) -> Result<CommandResult, CoreError> {
        self.execute(Command::DeleteFlow { dpid, key }).await
    }

    pub async fn add_meter(&self, dpid: Dpid, meter: MeterSpec) -> Result<CommandResult, CoreError> {
        self.execute(Command::AddMeter { dpid, meter }).await
    }

    pub async fn modify_meter(&self, dpid: Dpid, meter: MeterSpec) -> Result<CommandResult, CoreError> {
        self.execute(Command::ModifyMeter { dpid, meter }).await
    }

    pub async fn delete_meter(&self, dpid: Dpid, meter_id: u32) -> Result<CommandResult, CoreError> {
        self.execute(Command::DeleteMeter { dpid, meter_id }).await
    }

    // ── Switch lifecycle ─────────────────────────────────────────

    async fn switch_connected(&self, dpid: Dpid, description: Option<SwitchDescription>) {
        let registry = &self.inner.store.registry;
        registry.upsert(dpid, description);
        if let Err(e) = registry.mark_connected(dpid) {
            warn!(%dpid, error = %e, "could not mark switch connected");
            return;
        }
        info!(%dpid, "switch connected");

        let mut handles = self.inner.task_handles.lock().await;
        if self.inner.cancel.is_cancelled() {
            return;
        }
        handles.retain(|handle| !handle.is_finished());

        let controller = self.clone();
        let cancel = self.inner.cancel.clone();
        handles.push(tokio::spawn(async move {
            tokio::select! {
                biased;
                () = cancel.cancelled() => {}
                result = controller.sync_switch(dpid) => {
                    if let Err(e) = result {
                        warn!(%dpid, error = %e, "initial switch sync failed");
                    }
                }
            }
        }));
    }

    fn switch_disconnected(&self, dpid: Dpid) {
        match self.inner.store.registry.mark_disconnected(dpid) {
            Ok(()) => info!(%dpid, "switch disconnected"),
            Err(e) => debug!(%dpid, error = %e, "disconnect for unknown switch"),
        }
    }

    /// Align the registry with the adapter's view of connected switches.
    async fn resync_switch_list(&self) -> Result<(), CoreError> {
        let connected = bounded(
            None,
            Operation::ListSwitches,
            self.inner.config.query_timeout,
            self.inner.adapter.connected_switches(),
        )
        .await?;

        let registry = &self.inner.store.registry;
        for &dpid in &connected {
            registry.upsert(dpid, None);
            registry.mark_connected(dpid)?;
        }
        for record in registry.list().iter() {
            if record.state.is_connected() && !connected.contains(&record.dpid) {
                self.switch_disconnected(record.dpid);
            }
        }
        Ok(())
    }
}

// ── Background tasks ─────────────────────────────────────────────

/// Periodically run a reconciliation cycle.
async fn refresh_task(controller: Controller, interval: Duration, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(interval);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    interval.tick().await; // consume the immediate first tick

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => {
                if let Err(e) = controller.trigger_update().await {
                    warn!(error = %e, "periodic reconciliation incomplete");
                }
            }
        }
    }
}

/// Apply adapter connect/disconnect notifications to the registry.
async fn event_task(
    controller: Controller,
    mut events: broadcast::Receiver<SwitchEvent>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            event = events.recv() => match event {
                Ok(SwitchEvent::Connected { dpid, description }) => {
                    controller.switch_connected(dpid, description).await;
                }
                Ok(SwitchEvent::Disconnected { dpid }) => controller.switch_disconnected(dpid),
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    warn!(missed, "switch events lagged, re-listing switches");
                    if let Err(e) = controller.resync_switch_list().await {
                        warn!(error = %e, "switch re-list failed");
                    }
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!("adapter event stream closed");
                    break;
                }
            },
        }
    }
}

// ── Command routing ──────────────────────────────────────────────

async fn route_command(inner: &ControllerInner, cmd: Command) -> Result<CommandResult, CoreError> {
    match cmd {
        Command::AddFlow { dpid, flow } => inner.flows.add(dpid, flow).await,
        Command::ModifyFlow { dpid, key, actions } => inner.flows.modify(dpid, key, actions).await,
        Command::DeleteFlow { dpid, key } => inner.flows.delete(dpid, key).await,
        Command::AddMeter { dpid, meter } => inner.meters.add(dpid, meter).await,
        Command::ModifyMeter { dpid, meter } => inner.meters.modify(dpid, meter).await,
        Command::DeleteMeter { dpid, meter_id } => inner.meters.delete(dpid, meter_id).await,
    }
}
