// ── Runtime engine configuration ──
//
// These types describe *how* the engine paces and bounds its work.
// They never touch disk: the CLI (via sdnctl-config) builds a
// `ControllerConfig` and hands it in.

use std::time::Duration;

/// Configuration for one controller engine instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerConfig {
    /// Interval between scheduled reconciliation cycles. Zero disables
    /// the background scheduler; cycles then only run on demand.
    pub refresh_interval: Duration,
    /// Upper bound for each switch query issued during reconciliation.
    pub query_timeout: Duration,
    /// Upper bound for each mutating adapter call (flow/meter mods).
    pub command_timeout: Duration,
    /// How long a disconnected switch keeps its cached state before it
    /// is purged from every store.
    pub disconnect_timeout: Duration,
    /// Run an on-demand sync of the affected switch after every
    /// successful mutation.
    pub resync_after_mutation: bool,
}

impl ControllerConfig {
    pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(30);
    pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(5);
    pub const DEFAULT_DISCONNECT_TIMEOUT: Duration = Duration::from_secs(300);
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            refresh_interval: Self::DEFAULT_REFRESH_INTERVAL,
            query_timeout: Self::DEFAULT_QUERY_TIMEOUT,
            command_timeout: Self::DEFAULT_QUERY_TIMEOUT,
            disconnect_timeout: Self::DEFAULT_DISCONNECT_TIMEOUT,
            resync_after_mutation: false,
        }
    }
}
