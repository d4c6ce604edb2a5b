//! Clap derive structures for the `sdnctl` CLI.
//!
//! Defines the complete command tree, global flags, and shared types.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use sdnctl_core::Dpid;

// ── Top-Level CLI ────────────────────────────────────────────────────

/// sdnctl -- inspect and program an OpenFlow fabric
#[derive(Debug, Parser)]
#[command(
    name = "sdnctl",
    version,
    about = "Inspect and program OpenFlow switches from the command line",
    long_about = "Reconciles switch, flow, meter and topology state from an OpenFlow\n\
        fabric and applies flow and meter changes through a validated command\n\
        interface. Offline mode drives an emulated fabric described in TOML or JSON.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Config file (defaults to the platform config directory)
    #[arg(long, env = "SDNCTL_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Fabric description to run against (TOML or JSON)
    #[arg(long, short = 'f', env = "SDNCTL_FABRIC", global = true)]
    pub fabric: Option<PathBuf>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "SDNCTL_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Whole-network snapshot: switches, links and hosts
    #[command(alias = "snap")]
    Snapshot,

    /// List switches and their sync state
    #[command(alias = "sw")]
    Switches,

    /// Show the cached flow table of a switch
    Flows(SwitchArgs),

    /// Show the cached meter table of a switch
    Meters(SwitchArgs),

    /// List switch-to-switch links
    Links,

    /// List learned end hosts
    Hosts,

    /// Apply flow/meter command envelopes from a file or stdin
    Apply(ApplyArgs),

    /// Inspect CLI configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Per-command arguments ────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct SwitchArgs {
    /// Datapath ID (decimal, 0x-hex, or 16-digit hex)
    pub dpid: Dpid,
}

#[derive(Debug, Args)]
pub struct ApplyArgs {
    /// JSON file holding one envelope or an array of them; `-` reads stdin
    pub file: String,

    /// Reconcile afterwards and include the resulting network snapshot
    #[arg(long)]
    pub snapshot: bool,
}

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the effective configuration
    Show,
    /// Print the config file path
    Path,
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
