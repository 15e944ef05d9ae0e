//! Config subcommand handlers.

use std::path::Path;

use wlanmeter_config::{self as config, Config};

use crate::cli::{ConfigArgs, ConfigCommand};
use crate::error::CliError;
use crate::output::Console;

pub fn handle(args: &ConfigArgs, path: &Path, console: Console) -> Result<(), CliError> {
    match args.command {
        // ── Path ────────────────────────────────────────────────────
        ConfigCommand::Path => {
            console.print(&path.display().to_string());
            Ok(())
        }

        // ── Show: effective config (file + environment) ─────────────
        ConfigCommand::Show => {
            let cfg = config::load_config_from(path)?;
            let toml_str = toml::to_string_pretty(&cfg).map_err(|e| CliError::Serialization {
                reason: e.to_string(),
            })?;
            console.print(toml_str.trim_end());
            Ok(())
        }

        // ── Init: write defaults ────────────────────────────────────
        ConfigCommand::Init { force } => {
            if force {
                config::save_config_to(&Config::default(), path)?;
            } else {
                config::init_config_at(path)?;
            }
            eprintln!("Wrote default config to {}", path.display());
            Ok(())
        }
    }
}
