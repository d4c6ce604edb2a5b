//! Apply command envelopes (`{"command", "method", "data"}`) in order.

use std::io::Read;

use serde::Serialize;
use tabled::Tabled;
use tracing::warn;

use sdnctl_core::{Command, Controller, CoreError, Dpid, NetworkSnapshot};

use crate::cli::{ApplyArgs, GlobalOpts};
use crate::error::CliError;
use crate::output;

use super::switches::SwitchRow;

#[derive(Debug, Serialize)]
struct Outcome {
    index: usize,
    command: &'static str,
    dpid: Dpid,
    result: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Debug, Serialize)]
struct ApplyReport {
    results: Vec<Outcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    snapshot: Option<NetworkSnapshot>,
}

#[derive(Tabled)]
struct OutcomeRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "Command")]
    command: &'static str,
    #[tabled(rename = "DPID")]
    dpid: Dpid,
    #[tabled(rename = "Result")]
    result: String,
}

impl From<&Outcome> for OutcomeRow {
    fn from(o: &Outcome) -> Self {
        Self {
            index: o.index,
            command: o.command,
            dpid: o.dpid,
            result: o.error.clone().unwrap_or_else(|| o.result.clone()),
        }
    }
}

fn read_input(file: &str) -> Result<String, CliError> {
    if file == "-" {
        let mut text = String::new();
        std::io::stdin().read_to_string(&mut text)?;
        return Ok(text);
    }
    Ok(std::fs::read_to_string(file)?)
}

fn detail(report: &ApplyReport, color: bool) -> String {
    let rows: Vec<OutcomeRow> = report.results.iter().map(OutcomeRow::from).collect();
    let mut out = output::render_table(&rows);
    if let Some(snapshot) = &report.snapshot {
        let switches: Vec<SwitchRow> = snapshot
            .switches
            .iter()
            .map(|sw| SwitchRow::new(sw, color))
            .collect();
        out.push('\n');
        out.push_str(&output::render_table(&switches));
    }
    out
}

pub async fn handle(
    controller: &Controller,
    args: ApplyArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let text = read_input(&args.file)?;
    let commands = Command::batch_from_json(&text)?;
    let total = commands.len();

    let mut results = Vec::with_capacity(total);
    let mut first_error: Option<CoreError> = None;
    for (index, cmd) in commands.into_iter().enumerate() {
        let command = cmd.name();
        let dpid = cmd.dpid();
        let outcome = match controller.execute(cmd).await {
            Ok(result) => Outcome {
                index,
                command,
                dpid,
                result: result.to_string(),
                error: None,
            },
            Err(e) => {
                warn!(index, command, %dpid, error = %e, "command failed");
                let message = e.to_string();
                if first_error.is_none() {
                    first_error = Some(e);
                }
                Outcome {
                    index,
                    command,
                    dpid,
                    result: "failed".into(),
                    error: Some(message),
                }
            }
        };
        results.push(outcome);
    }

    let snapshot = if args.snapshot {
        if let Err(e) = controller.trigger_update().await {
            warn!(error = %e, "post-apply reconciliation incomplete");
        }
        Some(controller.network_snapshot())
    } else {
        None
    };

    let report = ApplyReport { results, snapshot };
    let color = output::should_color(&global.color);
    let out = output::render_single(
        &global.output,
        &report,
        |r| detail(r, color),
        |r| {
            r.results
                .iter()
                .map(|o| o.result.clone())
                .collect::<Vec<_>>()
                .join("\n")
        },
    )?;
    output::print_output(&out, global.quiet);

    let failed = report.results.iter().filter(|o| o.error.is_some()).count();
    match first_error {
        // A lone command keeps its specific diagnostic and exit code.
        Some(err) if total == 1 => Err(err.into()),
        Some(_) => Err(CliError::ApplyFailed { failed, total }),
        None => Ok(()),
    }
}
