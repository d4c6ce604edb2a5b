//! Meter table listing.

use tabled::Tabled;

use sdnctl_core::{Controller, Meter};

use crate::cli::{GlobalOpts, SwitchArgs};
use crate::error::CliError;
use crate::output;

#[derive(Tabled)]
struct MeterRow {
    #[tabled(rename = "ID")]
    meter_id: u32,
    #[tabled(rename = "Unit")]
    flags: String,
    #[tabled(rename = "Bands")]
    bands: String,
    #[tabled(rename = "Flows")]
    flows: String,
    #[tabled(rename = "Packets In")]
    packets: String,
}

impl From<&Meter> for MeterRow {
    fn from(m: &Meter) -> Self {
        let bands: Vec<String> = m.bands.iter().map(ToString::to_string).collect();
        Self {
            meter_id: m.meter_id,
            flags: m.flags.to_string(),
            bands: bands.join(" "),
            flows: m
                .stats
                .as_ref()
                .map(|s| s.flow_count.to_string())
                .unwrap_or_default(),
            packets: m
                .stats
                .as_ref()
                .map(|s| s.packet_in_count.to_string())
                .unwrap_or_default(),
        }
    }
}

pub fn handle(controller: &Controller, args: &SwitchArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let meters = controller.list_meters(args.dpid)?;
    let out = output::render_list(&global.output, &meters, |m| MeterRow::from(m), |m| m.meter_id.to_string())?;
    output::print_output(&out, global.quiet);
    Ok(())
}
