// ── Topology store ──
//
// Links and hosts, replaced wholesale by each refresh cycle. Content is
// kept in canonical order and compared structurally, so a refresh that
// reports the same topology in a different order notifies nobody.

use std::sync::Arc;

use arc_swap::ArcSwap;
use tokio::sync::watch;
use tracing::debug;

use crate::model::{Host, Link, TopologySnapshot};

/// Callback invoked with the new topology after an effective change.
pub type TopologyCallback = Arc<dyn Fn(&TopologySnapshot) + Send + Sync>;

pub(crate) struct TopologyStore {
    current: watch::Sender<Arc<TopologySnapshot>>,
    callbacks: ArcSwap<Vec<TopologyCallback>>,
}

impl TopologyStore {
    pub(crate) fn new() -> Self {
        let (current, _) = watch::channel(Arc::new(TopologySnapshot::default()));
        Self {
            current,
            callbacks: ArcSwap::from_pointee(Vec::new()),
        }
    }

    pub(crate) fn replace_links(&self, links: Vec<Link>) -> bool {
        self.apply(|topo| topo.links = links)
    }

    pub(crate) fn replace_hosts(&self, hosts: Vec<Host>) -> bool {
        self.apply(|topo| topo.hosts = hosts)
    }

    /// Replace links and hosts together; notifies at most once.
    pub(crate) fn replace(&self, snapshot: TopologySnapshot) -> bool {
        self.apply(|topo| *topo = snapshot)
    }

    pub(crate) fn snapshot(&self) -> Arc<TopologySnapshot> {
        self.current.borrow().clone()
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<Arc<TopologySnapshot>> {
        self.current.subscribe()
    }

    pub(crate) fn on_change(&self, callback: TopologyCallback) {
        self.callbacks.rcu(|existing| {
            let mut next = Vec::clone(existing);
            next.push(Arc::clone(&callback));
            next
        });
    }

    fn apply(&self, edit: impl FnOnce(&mut TopologySnapshot)) -> bool {
        let mut published = None;
        self.current.send_if_modified(|current| {
            let mut next = TopologySnapshot::clone(current);
            edit(&mut next);
            next.canonicalize();
            if next == **current {
                return false;
            }
            let next = Arc::new(next);
            published = Some(Arc::clone(&next));
            *current = next;
            true
        });

        let Some(topology) = published else {
            return false;
        };
        debug!(
            links = topology.links.len(),
            hosts = topology.hosts.len(),
            "topology changed"
        );
        for callback in self.callbacks.load().iter() {
            callback(&topology);
        }
        true
    }
}
