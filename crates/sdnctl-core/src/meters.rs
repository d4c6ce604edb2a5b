// ── Meter manager ──
//
// Same discipline as flows: validate, lock the switch, call the
// adapter, commit on confirmation.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::adapter::{Ack, Operation, ProtocolAdapter, bounded};
use crate::command::validate;
use crate::command::{CommandResult, MeterSpec};
use crate::error::{CoreError, EntryKind};
use crate::model::{Dpid, Meter};
use crate::store::SharedStore;

pub(crate) struct MeterManager {
    store: SharedStore,
    adapter: Arc<dyn ProtocolAdapter>,
    timeout: Duration,
}

impl MeterManager {
    pub(crate) fn new(store: SharedStore, adapter: Arc<dyn ProtocolAdapter>, timeout: Duration) -> Self {
        Self {
            store,
            adapter,
            timeout,
        }
    }

    /// Install a new meter. An id already present on the switch is the
    /// switch's call; OpenFlow rejects it as "meter exists".
    pub(crate) async fn add(&self, dpid: Dpid, spec: MeterSpec) -> Result<CommandResult, CoreError> {
        let meter = spec.into_meter()?;
        self.store.ensure_connected(dpid)?;

        let _guard = self.store.locks.acquire(dpid).await;
        self.store.ensure_connected(dpid)?;

        let ack = bounded(
            Some(dpid),
            Operation::InstallMeter,
            self.timeout,
            self.adapter.install_meter(dpid, &meter),
        )
        .await?;

        debug!(%dpid, meter_id = meter.meter_id, ?ack, "meter installed");
        if ack == Ack::Confirmed {
            self.store.with_meters(dpid, |table| table.insert(meter));
        }
        Ok(ack.into())
    }

    pub(crate) async fn modify(&self, dpid: Dpid, spec: MeterSpec) -> Result<CommandResult, CoreError> {
        let meter = spec.into_meter()?;
        self.store.ensure_connected(dpid)?;

        let _guard = self.store.locks.acquire(dpid).await;
        self.store.ensure_connected(dpid)?;

        if !self.store.has_meter(dpid, meter.meter_id) {
            return Err(not_found(dpid, meter.meter_id));
        }

        let ack = bounded(
            Some(dpid),
            Operation::ModifyMeter,
            self.timeout,
            self.adapter.modify_meter(dpid, &meter),
        )
        .await?;

        debug!(%dpid, meter_id = meter.meter_id, ?ack, "meter modified");
        if ack == Ack::Confirmed {
            let Meter {
                meter_id,
                flags,
                bands,
                ..
            } = meter;
            self.store
                .with_meters(dpid, |table| table.replace_config(meter_id, flags, bands));
        }
        Ok(ack.into())
    }

    pub(crate) async fn delete(&self, dpid: Dpid, meter_id: u32) -> Result<CommandResult, CoreError> {
        validate::meter_id(meter_id)?;
        self.store.ensure_connected(dpid)?;

        let _guard = self.store.locks.acquire(dpid).await;
        self.store.ensure_connected(dpid)?;

        if !self.store.has_meter(dpid, meter_id) {
            let outcome = bounded(
                Some(dpid),
                Operation::RemoveMeter,
                self.timeout,
                self.adapter.remove_meter(dpid, meter_id),
            )
            .await;
            match outcome {
                Ok(ack) => debug!(%dpid, meter_id, ?ack, "uncached meter removal sent"),
                Err(e) => warn!(%dpid, meter_id, error = %e, "uncached meter removal failed"),
            }
            return Err(not_found(dpid, meter_id));
        }

        let ack = bounded(
            Some(dpid),
            Operation::RemoveMeter,
            self.timeout,
            self.adapter.remove_meter(dpid, meter_id),
        )
        .await?;

        debug!(%dpid, meter_id, ?ack, "meter removed");
        if ack == Ack::Confirmed {
            self.store.with_meters(dpid, |table| table.remove(meter_id));
            // The switch drops flows that used the meter along with it.
            let dropped = self
                .store
                .with_flows(dpid, |table| table.remove_using_meter(meter_id));
            if dropped > 0 {
                debug!(%dpid, meter_id, dropped, "flows removed with meter");
            }
        }
        Ok(ack.into())
    }

    /// Cached meters ordered by meter_id.
    pub(crate) fn list(&self, dpid: Dpid) -> Result<Vec<Meter>, CoreError> {
        self.store.registry.get(dpid)?;
        Ok(self.store.list_meters(dpid))
    }
}

fn not_found(dpid: Dpid, meter_id: u32) -> CoreError {
    CoreError::EntryNotFound {
        kind: EntryKind::Meter,
        dpid,
        key: format!("meter_id={meter_id}"),
    }
}
