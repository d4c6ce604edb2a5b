// ── Flow table manager ──
//
// Validates flow mods, serializes them per switch and commits to the
// cache only after the adapter confirms. Nothing is retried here.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::adapter::{Ack, Operation, ProtocolAdapter, bounded};
use crate::command::validate;
use crate::command::{CommandResult, FlowSpec};
use crate::error::{CoreError, EntryKind};
use crate::model::{Action, Dpid, FlowEntry, FlowKey};
use crate::store::SharedStore;

pub(crate) struct FlowTableManager {
    store: SharedStore,
    adapter: Arc<dyn ProtocolAdapter>,
    timeout: Duration,
}

impl FlowTableManager {
    pub(crate) fn new(store: SharedStore, adapter: Arc<dyn ProtocolAdapter>, timeout: Duration) -> Self {
        Self {
            store,
            adapter,
            timeout,
        }
    }

    pub(crate) async fn add(&self, dpid: Dpid, spec: FlowSpec) -> Result<CommandResult, CoreError> {
        let entry = spec.into_entry()?;
        self.store.ensure_connected(dpid)?;

        let _guard = self.store.locks.acquire(dpid).await;
        self.store.ensure_connected(dpid)?;

        let ack = bounded(
            Some(dpid),
            Operation::InstallFlow,
            self.timeout,
            self.adapter.install_flow(dpid, &entry),
        )
        .await?;

        debug!(%dpid, key = %entry.key(), ?ack, "flow installed");
        if ack == Ack::Confirmed {
            self.store.with_flows(dpid, |table| table.insert_or_replace(entry));
        }
        Ok(ack.into())
    }

    pub(crate) async fn modify(
        &self,
        dpid: Dpid,
        key: FlowKey,
        actions: Vec<Action>,
    ) -> Result<CommandResult, CoreError> {
        let key = validate::flow_key(key)?;
        validate::actions(&actions)?;
        self.store.ensure_connected(dpid)?;

        let _guard = self.store.locks.acquire(dpid).await;
        self.store.ensure_connected(dpid)?;

        // A strict modify of a missing entry is a no-op on the switch,
        // so there is nothing worth sending.
        let Some(cached) = self.store.cached_flow(dpid, &key) else {
            return Err(not_found(dpid, &key));
        };
        let updated = FlowEntry {
            actions: actions.clone(),
            stats: None,
            ..cached
        };

        let ack = bounded(
            Some(dpid),
            Operation::ModifyFlow,
            self.timeout,
            self.adapter.modify_flow(dpid, &updated),
        )
        .await?;

        debug!(%dpid, %key, ?ack, "flow modified");
        if ack == Ack::Confirmed {
            self.store
                .with_flows(dpid, |table| table.replace_actions(&key, actions));
        }
        Ok(ack.into())
    }

    pub(crate) async fn delete(&self, dpid: Dpid, key: FlowKey) -> Result<CommandResult, CoreError> {
        let key = validate::flow_key(key)?;
        self.store.ensure_connected(dpid)?;

        let _guard = self.store.locks.acquire(dpid).await;
        self.store.ensure_connected(dpid)?;

        if self.store.cached_flow(dpid, &key).is_none() {
            // The cache may lag the switch; remove it there anyway.
            let outcome = bounded(
                Some(dpid),
                Operation::RemoveFlow,
                self.timeout,
                self.adapter.remove_flow(dpid, &key),
            )
            .await;
            match outcome {
                Ok(ack) => debug!(%dpid, %key, ?ack, "uncached flow removal sent"),
                Err(e) => warn!(%dpid, %key, error = %e, "uncached flow removal failed"),
            }
            return Err(not_found(dpid, &key));
        }

        let ack = bounded(
            Some(dpid),
            Operation::RemoveFlow,
            self.timeout,
            self.adapter.remove_flow(dpid, &key),
        )
        .await?;

        debug!(%dpid, %key, ?ack, "flow removed");
        if ack == Ack::Confirmed {
            self.store.with_flows(dpid, |table| table.remove(&key));
        }
        Ok(ack.into())
    }

    /// Cached entries ordered by (table_id asc, priority desc, insertion).
    pub(crate) fn list(&self, dpid: Dpid) -> Result<Vec<FlowEntry>, CoreError> {
        self.store.registry.get(dpid)?;
        Ok(self.store.list_flows(dpid))
    }
}

fn not_found(dpid: Dpid, key: &FlowKey) -> CoreError {
    CoreError::EntryNotFound {
        kind: EntryKind::Flow,
        dpid,
        key: key.to_string(),
    }
}
