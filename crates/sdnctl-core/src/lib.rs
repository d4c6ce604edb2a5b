// sdnctl-core: Network state and flow/meter control engine between an
// OpenFlow protocol adapter and its consumers (CLI, dashboards).

pub mod adapter;
pub mod command;
pub mod config;
pub mod controller;
pub mod error;
mod flows;
mod meters;
pub mod model;
pub mod reconcile;
mod store;
pub mod stream;

// ── Primary re-exports ──────────────────────────────────────────────
pub use adapter::{
    Ack, AckMode, AdapterError, EmulatedFabric, FabricSpec, Fault, Operation, ProtocolAdapter,
    SwitchEvent, SwitchSpec,
};
pub use command::{Command, CommandResult, FlowSpec, MeterSpec};
pub use config::ControllerConfig;
pub use controller::Controller;
pub use error::{CoreError, EntryKind};
pub use reconcile::CycleReport;
pub use store::TopologyCallback;
pub use stream::{SwitchList, SwitchStream, TopologyStream};

// Re-export model types at the crate root for ergonomics.
pub use model::{
    // Switches
    AggregateFlowStats, Dpid, Switch, SwitchDescription, SwitchRecord, SwitchState,
    // Flows
    Action, FlowEntry, FlowKey, FlowMatch, FlowStats, MatchValue,
    // Meters
    BandType, Meter, MeterBand, MeterFlag, MeterStats,
    // Topology
    Host, Link, MacAddress, NetworkSnapshot, PortRef, TopologySnapshot,
};
