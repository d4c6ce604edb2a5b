// ── Per-switch serialization ──
//
// One async mutex per dpid. Mutations and reconciliation both hold it,
// so a sync can never interleave with a flow or meter mod on the same
// switch. Different switches never contend.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::model::Dpid;

#[derive(Default)]
pub(crate) struct SwitchLocks {
    locks: DashMap<Dpid, Arc<Mutex<()>>>,
}

impl SwitchLocks {
    pub(crate) async fn acquire(&self, dpid: Dpid) -> OwnedMutexGuard<()> {
        // Clone the Arc out first; never await while holding the shard.
        let lock = Arc::clone(self.locks.entry(dpid).or_default().value());
        lock.lock_owned().await
    }

    pub(crate) fn remove(&self, dpid: Dpid) {
        self.locks.remove(&dpid);
    }
}
