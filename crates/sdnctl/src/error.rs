//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` variants into user-facing errors
//! with actionable help text and distinct exit codes.

use miette::Diagnostic;
use thiserror::Error;

use sdnctl_config::ConfigError;
use sdnctl_core::{CoreError, Dpid};

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const NOT_FOUND: i32 = 4;
    pub const REJECTED: i32 = 6;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Fabric ───────────────────────────────────────────────────────
    #[error("No fabric to run against")]
    #[diagnostic(
        code(sdnctl::no_fabric),
        help(
            "Pass --fabric <file>, set SDNCTL_FABRIC, or set `fabric` in {path}.\n\
             A sample lives at demos/fabric.toml."
        )
    )]
    NoFabric { path: String },

    #[error("Could not parse fabric file {path}")]
    #[diagnostic(code(sdnctl::fabric), help("{reason}"))]
    FabricParse { path: String, reason: String },

    // ── Switches ─────────────────────────────────────────────────────
    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(sdnctl::not_found),
        help("Run: sdnctl {list_command} to see what is known")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    #[error("Switch {dpid} is disconnected")]
    #[diagnostic(
        code(sdnctl::disconnected),
        help("Cached state stays readable; changes are refused until it reconnects.")
    )]
    Disconnected { dpid: Dpid },

    #[error("Switch rejected {operation}: {message}")]
    #[diagnostic(code(sdnctl::rejected))]
    Rejected { operation: String, message: String },

    #[error("{operation} timed out after {millis}ms")]
    #[diagnostic(
        code(sdnctl::timeout),
        help("Raise query_timeout_secs or command_timeout_secs in the config.")
    )]
    Timeout { operation: String, millis: u64 },

    #[error("Adapter unavailable: {message}")]
    #[diagnostic(code(sdnctl::unavailable))]
    Unavailable { message: String },

    #[error("Reconciliation incomplete ({detail})")]
    #[diagnostic(
        code(sdnctl::partial_sync),
        help("Whatever succeeded was applied; the rest is retried next cycle.")
    )]
    PartialSync { detail: String },

    // ── Commands ─────────────────────────────────────────────────────
    #[error("{failed} of {total} commands failed")]
    #[diagnostic(code(sdnctl::apply_failed))]
    ApplyFailed { failed: usize, total: usize },

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(sdnctl::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error(transparent)]
    #[diagnostic(code(sdnctl::config))]
    Config(Box<ConfigError>),

    #[error("Internal error: {0}")]
    #[diagnostic(code(sdnctl::internal))]
    Internal(String),

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON: {0}")]
    #[diagnostic(code(sdnctl::json), help("Check the JSON input and try again."))]
    Json(#[from] serde_json::Error),

    #[error("YAML rendering failed: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        Self::Config(Box::new(err))
    }
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Rejected { .. } => exit_code::REJECTED,
            Self::Disconnected { .. } | Self::Unavailable { .. } => exit_code::CONNECTION,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::Validation { .. } | Self::NoFabric { .. } | Self::FabricParse { .. } => {
                exit_code::USAGE
            }
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::SwitchNotFound { dpid } => CliError::NotFound {
                resource_type: "switch".into(),
                identifier: dpid.to_string(),
                list_command: "switches".into(),
            },

            CoreError::SwitchDisconnected { dpid } => CliError::Disconnected { dpid },

            CoreError::EntryNotFound { kind, dpid, key } => CliError::NotFound {
                list_command: format!("{kind}s {dpid}"),
                resource_type: kind.to_string(),
                identifier: key,
            },

            CoreError::InvalidEntry { message } => CliError::Validation {
                field: "command".into(),
                reason: message,
            },

            CoreError::AdapterTimeout {
                operation,
                timeout_ms,
                ..
            } => CliError::Timeout {
                operation: operation.to_string(),
                millis: timeout_ms,
            },

            CoreError::AdapterRejected {
                operation, message, ..
            } => CliError::Rejected {
                operation: operation.to_string(),
                message,
            },

            CoreError::AdapterUnavailable { message, .. } => CliError::Unavailable { message },

            err @ CoreError::ReconciliationPartialFailure { .. } => CliError::PartialSync {
                detail: err.to_string(),
            },

            CoreError::Config { message } => CliError::Validation {
                field: "config".into(),
                reason: message,
            },

            CoreError::Internal(message) => CliError::Internal(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sdnctl_core::EntryKind;

    #[test]
    fn missing_flow_points_at_the_flows_command() {
        let err = CliError::from(CoreError::EntryNotFound {
            kind: EntryKind::Flow,
            dpid: Dpid(3),
            key: "table=0,priority=1,match=*".into(),
        });
        assert_eq!(err.exit_code(), exit_code::NOT_FOUND);
        assert!(matches!(
            err,
            CliError::NotFound { ref list_command, .. } if list_command == "flows 3"
        ));
    }

    #[test]
    fn invalid_entry_is_a_usage_error() {
        let err = CliError::from(CoreError::InvalidEntry {
            message: "unknown match field `foo`".into(),
        });
        assert_eq!(err.exit_code(), exit_code::USAGE);
    }
}
