//! `emxg token`: print request tokens from a fresh device profile.

use rand::thread_rng;
use serde::Serialize;

use emxg_api::fingerprint::random_user_agent;
use emxg_api::{TokenCodec, TokenGenerator};

use crate::cli::{GlobalOpts, OutputFormat, TokenArgs};
use crate::config;
use crate::error::CliError;
use crate::output;

#[derive(Debug, Serialize)]
struct TokenLine {
    token: String,
    counter: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    buffer: Option<String>,
}

fn generate<R: rand::Rng>(
    generator: &mut TokenGenerator<R>,
    count: u32,
    decode: bool,
) -> Result<Vec<TokenLine>, CliError> {
    (0..count)
        .map(|_| {
            let token = generator.generate_token();
            let buffer = if decode {
                let raw = TokenCodec::decode(&token)
                    .map_err(|e| CliError::Internal(e.to_string()))?;
                Some(hex::encode(raw))
            } else {
                None
            };
            Ok(TokenLine {
                counter: generator.profile().counter(),
                token,
                buffer,
            })
        })
        .collect()
}

fn render(lines: &[TokenLine], format: OutputFormat) -> Result<String, CliError> {
    Ok(match format {
        OutputFormat::Json => serde_json::to_string_pretty(lines)?,
        OutputFormat::JsonCompact => serde_json::to_string(lines)?,
        OutputFormat::Yaml => serde_yaml::to_string(lines)?,
        _ => lines
            .iter()
            .map(|l| match l.buffer {
                Some(ref buf) => format!("{}\n  {buf}", l.token),
                None => l.token.clone(),
            })
            .collect::<Vec<_>>()
            .join("\n"),
    })
}

pub fn handle(args: &TokenArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let cfg = config::load_config()?;
    let user_agent = global
        .user_agent
        .clone()
        .or(cfg.user_agent)
        .unwrap_or_else(|| random_user_agent(&mut thread_rng()).to_owned());
    tracing::debug!(%user_agent, "generating tokens");

    let mut generator = TokenGenerator::from_entropy(user_agent);
    let lines = generate(&mut generator, args.count, args.decode)?;
    let rendered = render(&lines, global.output.unwrap_or(OutputFormat::Plain))?;
    output::print_output(&rendered, global.quiet);
    Ok(())
}
