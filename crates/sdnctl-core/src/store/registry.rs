// ── Switch registry ──
//
// Known switches, their descriptors and lifecycle state. Flow and meter
// tables live in their own stores; the registry only decides which
// switches exist and whether they may be talked to.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::watch;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::collection::EntityCollection;
use crate::error::CoreError;
use crate::model::{Dpid, SwitchDescription, SwitchRecord, SwitchState};

pub(crate) struct SwitchRegistry {
    switches: EntityCollection<Dpid, SwitchRecord>,
    /// Monotonic disconnect time, for the purge grace period.
    disconnected_since: DashMap<Dpid, Instant>,
    /// Cancelled on disconnect so in-flight syncs abandon their results.
    cancels: DashMap<Dpid, CancellationToken>,
}

impl SwitchRegistry {
    pub(crate) fn new() -> Self {
        Self {
            switches: EntityCollection::new(),
            disconnected_since: DashMap::new(),
            cancels: DashMap::new(),
        }
    }

    /// Create the switch if unknown, or refresh its description. Never
    /// touches lifecycle state or tables. Returns whether anything changed.
    pub(crate) fn upsert(&self, dpid: Dpid, description: Option<SwitchDescription>) -> bool {
        let updated = self.switches.update(&dpid, |record| {
            if let Some(desc) = description.clone() {
                record.description = Some(desc);
            }
        });
        match updated {
            Some(changed) => changed,
            None => {
                let mut record = SwitchRecord::new(dpid);
                record.description = description;
                debug!(%dpid, "switch registered");
                self.switches.upsert(dpid, record)
            }
        }
    }

    pub(crate) fn get(&self, dpid: Dpid) -> Result<Arc<SwitchRecord>, CoreError> {
        self.switches
            .get(&dpid)
            .ok_or(CoreError::SwitchNotFound { dpid })
    }

    pub(crate) fn contains(&self, dpid: Dpid) -> bool {
        self.switches.contains(&dpid)
    }

    /// All switches ordered by dpid.
    pub(crate) fn list(&self) -> Arc<Vec<Arc<SwitchRecord>>> {
        self.switches.snapshot()
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<Arc<Vec<Arc<SwitchRecord>>>> {
        self.switches.subscribe()
    }

    /// Control channel is up. Clears any pending purge; a switch that
    /// reconnects within the grace period keeps its cached tables.
    pub(crate) fn mark_connected(&self, dpid: Dpid) -> Result<(), CoreError> {
        self.switches
            .update(&dpid, |record| {
                if matches!(record.state, SwitchState::Unknown | SwitchState::Disconnected) {
                    record.state = SwitchState::Connected;
                    record.connected_at = Some(Utc::now());
                    record.disconnected_at = None;
                }
            })
            .ok_or(CoreError::SwitchNotFound { dpid })?;

        if self.disconnected_since.remove(&dpid).is_some() {
            info!(%dpid, "switch reconnected within grace period");
        }
        let mut token = self.cancels.entry(dpid).or_default();
        if token.is_cancelled() {
            *token = CancellationToken::new();
        }
        Ok(())
    }

    /// Control channel is down. Starts the purge grace timer and cancels
    /// any sync in flight for this switch.
    pub(crate) fn mark_disconnected(&self, dpid: Dpid) -> Result<(), CoreError> {
        self.switches
            .update(&dpid, |record| {
                if record.state != SwitchState::Disconnected {
                    record.state = SwitchState::Disconnected;
                    record.disconnected_at = Some(Utc::now());
                }
            })
            .ok_or(CoreError::SwitchNotFound { dpid })?;

        self.disconnected_since.entry(dpid).or_insert_with(Instant::now);
        if let Some((_, token)) = self.cancels.remove(&dpid) {
            token.cancel();
        }
        Ok(())
    }

    /// Move to `to` only if the current state is one of `from`. Returns
    /// whether the transition happened. This is the only way the
    /// reconciler changes state, so a disconnect recorded in between is
    /// never overwritten.
    pub(crate) fn transition(&self, dpid: Dpid, from: &[SwitchState], to: SwitchState) -> bool {
        let mut moved = false;
        self.switches.update(&dpid, |record| {
            if from.contains(&record.state) {
                record.state = to;
                if to == SwitchState::Synced {
                    record.last_synced = Some(Utc::now());
                }
                moved = true;
            }
        });
        moved
    }

    /// Token cancelled when `dpid` disconnects. `None` if the switch is
    /// not currently connected.
    pub(crate) fn cancel_token(&self, dpid: Dpid) -> Option<CancellationToken> {
        self.cancels.get(&dpid).map(|t| t.clone())
    }

    /// Remove switches disconnected for at least `timeout`. Returns the
    /// purged dpids; the caller drops their tables.
    pub(crate) fn purge_expired(&self, timeout: Duration) -> Vec<Dpid> {
        let expired: Vec<Dpid> = self
            .disconnected_since
            .iter()
            .filter(|since| since.value().elapsed() >= timeout)
            .map(|since| *since.key())
            .collect();

        let mut purged = Vec::with_capacity(expired.len());
        for dpid in expired {
            // Re-check under the entry: a reconnect may have raced us.
            let removed = self
                .disconnected_since
                .remove_if(&dpid, |_, since| since.elapsed() >= timeout);
            if removed.is_some() {
                self.switches.remove(&dpid);
                self.cancels.remove(&dpid);
                info!(%dpid, "disconnected switch purged");
                purged.push(dpid);
            }
        }
        purged.sort();
        purged
    }
}
