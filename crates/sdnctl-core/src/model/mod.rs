// ── Unified domain model ──
//
// Canonical representation of every OpenFlow entity the engine tracks.
// Stores, the protocol adapter and callers all speak these types.

pub mod flow;
pub mod identity;
pub mod meter;
pub mod snapshot;
pub mod switch;
pub mod topology;

// ── Re-exports ──────────────────────────────────────────────────────
// Flat access: `use sdnctl_core::model::*` gives you everything.

pub use identity::{Dpid, MacAddress, ParseDpidError};

pub use switch::{AggregateFlowStats, Switch, SwitchDescription, SwitchRecord, SwitchState};

pub use flow::{
    Action, DEFAULT_PRIORITY, FieldKind, FlowEntry, FlowKey, FlowMatch, FlowStats, MatchField,
    MatchValue,
};

pub use meter::{BandStats, BandType, MAX_METER_ID, Meter, MeterBand, MeterFlag, MeterStats};

pub use snapshot::NetworkSnapshot;

pub use topology::{Host, Link, PortRef, TopologySnapshot};
