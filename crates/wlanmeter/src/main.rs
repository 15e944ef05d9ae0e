mod cli;
mod commands;
mod error;
mod output;
mod scheduler;
mod writer;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command};
use crate::error::CliError;
use crate::output::Console;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_tracing(cli.global.verbose);

    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn init_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let config_path = cli
        .global
        .config
        .clone()
        .unwrap_or_else(wlanmeter_config::config_path);

    match cli.command {
        Some(Command::Config(ref args)) => {
            let console = Console::new(false, cli.global.quiet);
            commands::config_cmd::handle(args, &config_path, console)
        }

        Some(Command::Completions(ref args)) => {
            use clap::CommandFactory;
            use clap_complete::generate;

            let mut cmd = Cli::command();
            generate(args.shell, &mut cmd, "wlanmeter", &mut std::io::stdout());
            Ok(())
        }

        None => {
            let cfg = wlanmeter_config::load_config_from(&config_path)?;
            tracing::debug!(path = %config_path.display(), "loaded config");
            commands::measure::handle(cfg, &cli.measure, &cli.global).await
        }
    }
}
