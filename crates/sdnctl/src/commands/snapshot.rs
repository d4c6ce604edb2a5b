//! Whole-network snapshot.

use sdnctl_core::{Controller, NetworkSnapshot};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

use super::switches::SwitchRow;

fn detail(snapshot: &NetworkSnapshot, color: bool) -> String {
    let rows: Vec<SwitchRow> = snapshot
        .switches
        .iter()
        .map(|sw| SwitchRow::new(sw, color))
        .collect();
    format!(
        "{}\n{} link(s), {} host(s)",
        output::render_table(&rows),
        snapshot.links.len(),
        snapshot.hosts.len()
    )
}

pub fn handle(controller: &Controller, global: &GlobalOpts) -> Result<(), CliError> {
    let snapshot = controller.network_snapshot();
    let color = output::should_color(&global.color);
    let out = output::render_single(
        &global.output,
        &snapshot,
        |s| detail(s, color),
        |s| {
            s.switches
                .iter()
                .map(|sw| sw.dpid.to_string())
                .collect::<Vec<_>>()
                .join("\n")
        },
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}
