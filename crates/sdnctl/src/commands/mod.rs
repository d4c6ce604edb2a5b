//! Command dispatch: bridges CLI args -> controller calls -> output formatting.

pub mod apply;
pub mod config_cmd;
pub mod flows;
pub mod meters;
pub mod snapshot;
pub mod switches;
pub mod topology;

use sdnctl_core::Controller;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a fabric-bound command to the appropriate handler.
pub async fn dispatch(
    cmd: Command,
    controller: &Controller,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Snapshot => snapshot::handle(controller, global),
        Command::Switches => switches::handle(controller, global),
        Command::Flows(args) => flows::handle(controller, &args, global),
        Command::Meters(args) => meters::handle(controller, &args, global),
        Command::Links => topology::links(controller, global),
        Command::Hosts => topology::hosts(controller, global),
        Command::Apply(args) => apply::handle(controller, args, global).await,
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => Err(CliError::Internal(
            "command does not need a fabric".into(),
        )),
    }
}
