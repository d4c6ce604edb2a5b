// ── Reactive data store ──
//
// Concurrent entity storage with push-based change notification.

mod collection;
mod data_store;
mod flow_table;
mod locks;
mod meter_table;
mod registry;
mod topology;

pub(crate) use data_store::{DataStore, SharedStore};
pub use topology::TopologyCallback;
