//! CLI entry point - the composition root.

use anyhow::Result;
use clap::{CommandFactory, Parser};
use svcbind::handlers::{self, ComposeRequest};
use svcbind::logging::{default_directive, load_settings};
use svcbind::{Cli, Commands};
use tracing_subscriber::EnvFilter;

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let settings = load_settings(cli.settings.as_deref())?;

    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    match command {
        Commands::Demo { strategy } => {
            let report = handlers::execute_demo(&settings, strategy)?;
            print!("{report}");
        }
        Commands::Compose {
            interface,
            version_range,
            filter,
            language,
        } => {
            let request = ComposeRequest {
                interface,
                version_range,
                filter,
                language,
            };
            let report = handlers::execute_compose(&settings, &request)?;
            println!("{}", serde_json::to_string_pretty(&report.to_json())?);
        }
    }
    Ok(())
}
