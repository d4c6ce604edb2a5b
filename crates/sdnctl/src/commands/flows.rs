//! Flow table listing.

use tabled::Tabled;

use sdnctl_core::{Controller, FlowEntry};

use crate::cli::{GlobalOpts, SwitchArgs};
use crate::error::CliError;
use crate::output;

#[derive(Tabled)]
struct FlowRow {
    #[tabled(rename = "Table")]
    table_id: u8,
    #[tabled(rename = "Priority")]
    priority: u16,
    #[tabled(rename = "Match")]
    match_fields: String,
    #[tabled(rename = "Actions")]
    actions: String,
    #[tabled(rename = "Packets")]
    packets: String,
    #[tabled(rename = "Bytes")]
    bytes: String,
}

impl From<&FlowEntry> for FlowRow {
    fn from(f: &FlowEntry) -> Self {
        let actions: Vec<String> = f.actions.iter().map(ToString::to_string).collect();
        Self {
            table_id: f.table_id,
            priority: f.priority,
            match_fields: f.match_fields.to_string(),
            actions: if actions.is_empty() {
                "DROP".into()
            } else {
                actions.join(",")
            },
            packets: f.stats.map(|s| s.packet_count.to_string()).unwrap_or_default(),
            bytes: f.stats.map(|s| s.byte_count.to_string()).unwrap_or_default(),
        }
    }
}

pub fn handle(controller: &Controller, args: &SwitchArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let flows = controller.list_flows(args.dpid)?;
    let out = output::render_list(&global.output, &flows, |f| FlowRow::from(f), |f| f.key().to_string())?;
    output::print_output(&out, global.quiet);
    Ok(())
}
