mod cli;
mod commands;
mod config;
mod error;
mod fabric;
mod output;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use sdnctl_core::Controller;

use crate::cli::{Cli, Command};
use crate::config::LogFormat;
use crate::error::CliError;

#[tokio::main]
async fn main() {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Log format comes from the config file; a broken file surfaces later
    let log_format = config::load(&cli.global)
        .map(|cfg| cfg.log_format)
        .unwrap_or_default();
    init_tracing(cli.global.verbose, log_format);

    // Dispatch and handle errors with proper exit codes
    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn init_tracing(verbosity: u8, format: LogFormat) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        // Config commands don't need a fabric
        Command::Config(args) => commands::config_cmd::handle(&args, &cli.global),

        // Shell completions generation
        Command::Completions(args) => {
            use clap::CommandFactory;
            use clap_complete::generate;

            let mut cmd = Cli::command();
            generate(args.shell, &mut cmd, "sdnctl", &mut std::io::stdout());
            Ok(())
        }

        // Everything else runs against a started controller
        cmd => {
            let cfg = config::load(&cli.global)?;
            let engine = config::controller_config(&cfg)?;
            let fabric = fabric::load(&config::fabric_path(&cli.global, &cfg)?)?;

            let controller = Controller::new(engine, fabric);
            controller.start().await?;

            tracing::debug!(command = ?cmd, "dispatching command");
            let result = commands::dispatch(cmd, &controller, &cli.global).await;
            controller.shutdown().await;
            result
        }
    }
}
