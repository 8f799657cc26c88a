//! Config subcommand handlers.

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts, OutputFormat};
use crate::config;
use crate::error::CliError;
use crate::output;

fn show(global: &GlobalOpts) -> Result<String, CliError> {
    let cfg = config::load_config()?;
    Ok(match global.output {
        Some(OutputFormat::Json) => serde_json::to_string_pretty(&cfg)?,
        Some(OutputFormat::JsonCompact) => serde_json::to_string(&cfg)?,
        Some(OutputFormat::Yaml) => serde_yaml::to_string(&cfg)?,
        _ => toml::to_string_pretty(&cfg).map_err(|e| CliError::Internal(e.to_string()))?,
    })
}

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Show => {
            let rendered = show(global)?;
            output::print_output(rendered.trim_end(), global.quiet);
        }

        ConfigCommand::Path => {
            println!("{}", config::config_path().display());
        }

        ConfigCommand::Set { key, value } => {
            let mut cfg = config::load_config()?;
            config::set_value(&mut cfg, &key, &value)?;
            let path = config::save_config(&cfg)?;
            if !global.quiet {
                eprintln!("Set {key} in {}", path.display());
            }
        }
    }
    Ok(())
}
