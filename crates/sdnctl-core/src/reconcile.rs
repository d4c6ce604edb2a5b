// ── Reconciliation engine ──
//
// Pulls switch-reported state through the adapter and merges it into
// the stores. Each switch syncs under its own lock, so a sync never
// interleaves with a flow or meter mod on that switch. Queries are
// failure-isolated: whatever succeeded is applied, the rest waits for
// the next cycle.

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::adapter::{Operation, ProtocolAdapter, bounded};
use crate::command::validate;
use crate::error::CoreError;
use crate::model::{Dpid, SwitchState};
use crate::store::SharedStore;

/// What one reconciliation cycle did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    /// Switches whose every query succeeded.
    pub synced: Vec<Dpid>,
    /// Switches with at least one failed query, or that disconnected
    /// while being synced.
    pub failed: Vec<Dpid>,
    /// Switches purged after their disconnect grace period.
    pub purged: Vec<Dpid>,
    pub topology_changed: bool,
    pub topology_failed: bool,
}

impl CycleReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty() && !self.topology_failed
    }
}

pub(crate) struct Reconciler {
    store: SharedStore,
    adapter: Arc<dyn ProtocolAdapter>,
    query_timeout: Duration,
    disconnect_timeout: Duration,
}

impl Reconciler {
    pub(crate) fn new(
        store: SharedStore,
        adapter: Arc<dyn ProtocolAdapter>,
        query_timeout: Duration,
        disconnect_timeout: Duration,
    ) -> Self {
        Self {
            store,
            adapter,
            query_timeout,
            disconnect_timeout,
        }
    }

    /// One full cycle: purge expired switches, sync every connected
    /// switch in parallel, and refresh topology once.
    pub(crate) async fn run_cycle(&self) -> CycleReport {
        let purged = self.store.registry.purge_expired(self.disconnect_timeout);
        for dpid in &purged {
            self.store.drop_switch_state(*dpid);
        }

        let targets: Vec<Dpid> = self
            .store
            .registry
            .list()
            .iter()
            .filter(|record| record.state.is_syncable())
            .map(|record| record.dpid)
            .collect();

        let syncs = join_all(
            targets
                .iter()
                .map(|&dpid| async move { (dpid, self.sync_switch(dpid).await) }),
        );
        let topology = bounded(
            None,
            Operation::QueryTopology,
            self.query_timeout,
            self.adapter.query_topology(),
        );
        let (results, topology) = tokio::join!(syncs, topology);

        let mut report = CycleReport {
            purged,
            ..CycleReport::default()
        };
        for (dpid, result) in results {
            match result {
                Ok(()) => report.synced.push(dpid),
                Err(_) => report.failed.push(dpid),
            }
        }
        match topology {
            Ok(snapshot) => report.topology_changed = self.store.topology.replace(snapshot),
            Err(e) => {
                warn!(error = %e, "topology query failed");
                report.topology_failed = true;
            }
        }

        if report.is_complete() {
            self.store.mark_full_refresh();
        }
        debug!(
            synced = report.synced.len(),
            failed = report.failed.len(),
            purged = report.purged.len(),
            topology_changed = report.topology_changed,
            "reconciliation cycle complete"
        );
        report
    }

    /// Query and apply one switch. Returns the first failure; partial
    /// results are still applied.
    pub(crate) async fn sync_switch(&self, dpid: Dpid) -> Result<(), CoreError> {
        let record = self.store.registry.get(dpid)?;
        let cancel = self
            .store
            .registry
            .cancel_token(dpid)
            .ok_or(CoreError::SwitchDisconnected { dpid })?;

        let _guard = self.store.locks.acquire(dpid).await;
        let registry = &self.store.registry;
        if !registry.transition(
            dpid,
            &[SwitchState::Connected, SwitchState::Synced],
            SwitchState::Syncing,
        ) {
            return Err(CoreError::SwitchDisconnected { dpid });
        }

        let need_description = record.description.is_none();
        let queries = async {
            tokio::join!(
                async {
                    if need_description {
                        Some(
                            bounded(
                                Some(dpid),
                                Operation::QueryDescription,
                                self.query_timeout,
                                self.adapter.query_description(dpid),
                            )
                            .await,
                        )
                    } else {
                        None
                    }
                },
                bounded(
                    Some(dpid),
                    Operation::QueryFlowStats,
                    self.query_timeout,
                    self.adapter.query_flow_stats(dpid),
                ),
                bounded(
                    Some(dpid),
                    Operation::QueryMeterStats,
                    self.query_timeout,
                    self.adapter.query_meter_stats(dpid),
                ),
                bounded(
                    Some(dpid),
                    Operation::QueryAggregateFlow,
                    self.query_timeout,
                    self.adapter.query_aggregate_flow(dpid),
                ),
            )
        };

        let results = tokio::select! {
            biased;
            () = cancel.cancelled() => None,
            results = queries => Some(results),
        };
        let Some((description, flows, meters, aggregate)) = results else {
            info!(%dpid, "switch disconnected mid-sync, results discarded");
            return Err(CoreError::SwitchDisconnected { dpid });
        };
        if cancel.is_cancelled() {
            info!(%dpid, "switch disconnected mid-sync, results discarded");
            return Err(CoreError::SwitchDisconnected { dpid });
        }

        let mut errors = Vec::new();
        match description {
            Some(Ok(desc)) => {
                registry.upsert(dpid, Some(desc));
            }
            Some(Err(e)) => errors.push(e),
            None => {}
        }
        match flows {
            Ok(entries) => {
                let entries: Vec<_> = entries.into_iter().map(validate::reported_flow).collect();
                let (changed, count) = self.store.with_flows(dpid, |table| {
                    (table.replace_all(entries), table.len())
                });
                debug!(%dpid, flows = count, changed, "flow table reconciled");
            }
            Err(e) => errors.push(e),
        }
        match meters {
            Ok(reported) => {
                self.store
                    .with_meters(dpid, |table| table.replace_all(reported));
            }
            Err(e) => errors.push(e),
        }
        match aggregate {
            Ok(agg) => self.store.with_flows(dpid, |table| table.set_aggregate(agg)),
            Err(e) => errors.push(e),
        }

        if errors.is_empty() {
            registry.transition(dpid, &[SwitchState::Syncing], SwitchState::Synced);
            return Ok(());
        }
        for e in &errors {
            warn!(%dpid, error = %e, "switch query failed, retrying next cycle");
        }
        registry.transition(dpid, &[SwitchState::Syncing], SwitchState::Connected);
        Err(errors.swap_remove(0))
    }
}
