// ── Core error types ──
//
// Every failure the engine reports is a per-operation value. Validation
// errors never reach the adapter; adapter errors carry the switch and
// operation that failed so callers can react without parsing messages.

use thiserror::Error;

use crate::adapter::{AdapterError, Operation};
use crate::model::Dpid;

/// Which kind of table entry an [`CoreError::EntryNotFound`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum EntryKind {
    Flow,
    Meter,
}

/// Unified error type for the core crate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    // ── Lookup errors ────────────────────────────────────────────────
    #[error("Switch not found: {dpid}")]
    SwitchNotFound { dpid: Dpid },

    #[error("Switch {dpid} is disconnected")]
    SwitchDisconnected { dpid: Dpid },

    #[error("No {kind} entry {key} on switch {dpid}")]
    EntryNotFound {
        kind: EntryKind,
        dpid: Dpid,
        key: String,
    },

    // ── Validation errors ────────────────────────────────────────────
    #[error("Invalid entry: {message}")]
    InvalidEntry { message: String },

    // ── Adapter errors (surfaced verbatim, never retried inline) ─────
    #[error("{operation} timed out after {timeout_ms}ms{}", on_switch(.dpid))]
    AdapterTimeout {
        dpid: Option<Dpid>,
        operation: Operation,
        timeout_ms: u64,
    },

    #[error("{operation} rejected{}: {message}", on_switch(.dpid))]
    AdapterRejected {
        dpid: Option<Dpid>,
        operation: Operation,
        message: String,
    },

    #[error("{operation} failed{}: {message}", on_switch(.dpid))]
    AdapterUnavailable {
        dpid: Option<Dpid>,
        operation: Operation,
        message: String,
    },

    // ── Reconciliation ───────────────────────────────────────────────
    #[error("Reconciliation incomplete: {} switch(es) failed{}", .failed.len(), topology_note(.topology_failed))]
    ReconciliationPartialFailure {
        failed: Vec<Dpid>,
        topology_failed: bool,
    },

    // ── Configuration / internal ─────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

fn on_switch(dpid: &Option<Dpid>) -> String {
    dpid.map(|d| format!(" on switch {d}")).unwrap_or_default()
}

fn topology_note(topology_failed: &bool) -> &'static str {
    if *topology_failed { ", topology query failed" } else { "" }
}

impl CoreError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidEntry {
            message: message.into(),
        }
    }

    /// Translate an adapter failure, attaching the switch and operation.
    pub(crate) fn from_adapter(dpid: Option<Dpid>, operation: Operation, err: AdapterError) -> Self {
        match err {
            AdapterError::Rejected(message) => Self::AdapterRejected {
                dpid,
                operation,
                message,
            },
            AdapterError::NotConnected => match dpid {
                Some(dpid) => Self::SwitchDisconnected { dpid },
                None => Self::AdapterUnavailable {
                    dpid,
                    operation,
                    message: "not connected".into(),
                },
            },
            AdapterError::Unavailable(message) => Self::AdapterUnavailable {
                dpid,
                operation,
                message,
            },
        }
    }

    /// Whether the failure came from (or on the way to) a switch, as
    /// opposed to local validation or lookup.
    pub fn is_adapter_error(&self) -> bool {
        matches!(
            self,
            Self::AdapterTimeout { .. } | Self::AdapterRejected { .. } | Self::AdapterUnavailable { .. }
        )
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::invalid(err.to_string())
    }
}
