//! Switch listing.

use tabled::Tabled;

use sdnctl_core::{Controller, Switch};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

#[derive(Tabled)]
pub(crate) struct SwitchRow {
    #[tabled(rename = "DPID")]
    dpid: String,
    #[tabled(rename = "State")]
    state: String,
    #[tabled(rename = "Description")]
    description: String,
    #[tabled(rename = "Flows")]
    flows: usize,
    #[tabled(rename = "Meters")]
    meters: usize,
}

impl SwitchRow {
    pub(crate) fn new(sw: &Switch, color: bool) -> Self {
        let description = sw
            .description
            .as_ref()
            .map(|d| format!("{} {} ({})", d.hw_desc, d.sw_desc, d.dp_desc))
            .unwrap_or_default();
        Self {
            dpid: sw.dpid.to_hex(),
            state: output::state_label(sw.state, color),
            description,
            flows: sw.flow_tables.len(),
            meters: sw.meters.len(),
        }
    }
}

pub fn handle(controller: &Controller, global: &GlobalOpts) -> Result<(), CliError> {
    let switches = controller.switches();
    let color = output::should_color(&global.color);
    let out = output::render_list(
        &global.output,
        &switches,
        |sw| SwitchRow::new(sw, color),
        |sw| sw.dpid.to_string(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}
