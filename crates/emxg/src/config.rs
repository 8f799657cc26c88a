//! Resolve effective settings: config file and environment, then CLI flags.

use clap::ValueEnum;

use emxg_config::Config;
use emxg_core::ScreenerConfig;

use crate::cli::{GlobalOpts, OutputFormat};
use crate::error::CliError;

pub use emxg_config::{config_path, load_config, save_config, set_value};

/// Settings for one invocation.
#[derive(Debug)]
pub struct Resolved {
    pub screener: ScreenerConfig,
    pub output: OutputFormat,
}

/// Overlay global flags on the loaded file config.
pub fn apply_overrides(cfg: &mut Config, global: &GlobalOpts) {
    if let Some(ref endpoint) = global.endpoint {
        cfg.endpoint.clone_from(endpoint);
    }
    if let Some(timeout) = global.timeout {
        cfg.timeout = timeout;
    }
    if let Some(ref ua) = global.user_agent {
        cfg.user_agent = Some(ua.clone());
    }
    if global.insecure {
        cfg.insecure = true;
    }
    if let Some(ref fingerprint) = global.fingerprint {
        cfg.fingerprint.clone_from(fingerprint);
    }
}

/// The `--output` flag wins; otherwise the configured format name.
pub fn output_format(cfg: &Config, global: &GlobalOpts) -> Result<OutputFormat, CliError> {
    if let Some(format) = global.output {
        return Ok(format);
    }
    OutputFormat::from_str(&cfg.output, true).map_err(|_| CliError::Validation {
        field: "output".into(),
        reason: format!(
            "unknown format '{}' (expected table, json, json-compact, yaml, csv or plain)",
            cfg.output
        ),
    })
}

pub fn resolve(global: &GlobalOpts) -> Result<Resolved, CliError> {
    let mut cfg = load_config()?;
    apply_overrides(&mut cfg, global);
    Ok(Resolved {
        output: output_format(&cfg, global)?,
        screener: emxg_config::to_screener_config(&cfg)?,
    })
}
