// ── Reactive streams ──
//
// Subscription types for consuming store changes. Both wrap a `watch`
// receiver, so a slow consumer only ever sees the latest state.

use std::sync::Arc;

use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use crate::model::{Dpid, SwitchRecord, SwitchState, TopologySnapshot};

/// Every known switch, ordered by dpid.
pub type SwitchList = Arc<Vec<Arc<SwitchRecord>>>;

/// A subscription to the switch registry. Wakes on any registration,
/// state transition, descriptor change or purge.
pub struct SwitchStream {
    receiver: watch::Receiver<SwitchList>,
}

impl SwitchStream {
    pub(crate) fn new(receiver: watch::Receiver<SwitchList>) -> Self {
        Self { receiver }
    }

    pub fn latest(&self) -> SwitchList {
        self.receiver.borrow().clone()
    }

    /// Wait for the next change. `None` once the controller is dropped.
    pub async fn changed(&mut self) -> Option<SwitchList> {
        self.receiver.changed().await.ok()?;
        Some(self.receiver.borrow_and_update().clone())
    }

    /// Resolve once `dpid` is in `state`, returning its record. Returns
    /// immediately if it already is; `None` if the controller goes away
    /// first.
    pub async fn wait_for(&mut self, dpid: Dpid, state: SwitchState) -> Option<Arc<SwitchRecord>> {
        loop {
            let found = self
                .receiver
                .borrow_and_update()
                .iter()
                .find(|record| record.dpid == dpid && record.state == state)
                .cloned();
            if found.is_some() {
                return found;
            }
            self.receiver.changed().await.ok()?;
        }
    }

    /// Yields the current list first, then one list per change.
    pub fn into_stream(self) -> WatchStream<SwitchList> {
        WatchStream::new(self.receiver)
    }
}

/// A subscription to topology changes. Only content changes wake it;
/// a refresh that reports the same links and hosts does not.
pub struct TopologyStream {
    receiver: watch::Receiver<Arc<TopologySnapshot>>,
}

impl TopologyStream {
    pub(crate) fn new(receiver: watch::Receiver<Arc<TopologySnapshot>>) -> Self {
        Self { receiver }
    }

    pub fn latest(&self) -> Arc<TopologySnapshot> {
        self.receiver.borrow().clone()
    }

    pub async fn changed(&mut self) -> Option<Arc<TopologySnapshot>> {
        self.receiver.changed().await.ok()?;
        Some(self.receiver.borrow_and_update().clone())
    }

    pub fn into_stream(self) -> WatchStream<Arc<TopologySnapshot>> {
        WatchStream::new(self.receiver)
    }
}
