//! Clap derive structures for the `emxg` CLI.
//!
//! Shared with `build.rs` for man page generation, so this file depends on
//! nothing but clap and clap_complete.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// emxg -- query the Eastmoney smart stock screener from the terminal
#[derive(Debug, Parser)]
#[command(
    name = "emxg",
    version,
    about = "Query the Eastmoney smart stock screener",
    long_about = "Runs natural-language stock screener queries (e.g. \"今日涨停\") \n\
        against the Eastmoney search service and prints the normalized result table.",
    after_help = "Examples:\n  \
        emxg search 今日涨停 --max-count 10\n  \
        emxg search 涨停板首板 --max-page 2 --out-file stocks.csv\n  \
        emxg -o json search 连续4个季度亏损大于1000万",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Output format [default: from config, else table]
    #[arg(long, short = 'o', global = true)]
    pub output: Option<OutputFormat>,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Request timeout in seconds
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    /// Search endpoint URL
    #[arg(long, global = true)]
    pub endpoint: Option<String>,

    /// Browser user agent sent with every request
    #[arg(long, global = true)]
    pub user_agent: Option<String>,

    /// Accept invalid TLS certificates
    #[arg(long, short = 'k', global = true)]
    pub insecure: bool,

    /// Request fingerprint: `random`, `browser`, or a fixed value
    #[arg(long, global = true, value_name = "MODE")]
    pub fingerprint: Option<String>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// CSV with a header row
    Csv,
    /// First column only, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run a screener query and print the result table
    #[command(alias = "s")]
    Search(SearchArgs),

    /// Generate request tokens (diagnostics)
    Token(TokenArgs),

    /// Inspect and edit the CLI configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  SEARCH
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct SearchArgs {
    /// Query keyword, e.g. 今日涨停 or 涨停板首板 [default: 今日涨停]
    pub keyword: Option<String>,

    /// Maximum number of rows to return (0 = unbounded)
    #[arg(long, short = 'n')]
    pub max_count: Option<usize>,

    /// Maximum number of pages to request (0 = unbounded)
    #[arg(long)]
    pub max_page: Option<u32>,

    /// Rows per page request
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pub page_size: Option<u32>,

    /// Also write the result as CSV (UTF-8 with BOM) to this file
    #[arg(long, short = 'f')]
    pub out_file: Option<PathBuf>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  TOKEN
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct TokenArgs {
    /// Number of consecutive tokens to generate
    #[arg(
        long,
        short = 'c',
        default_value = "1",
        value_parser = clap::value_parser!(u32).range(1..=1000)
    )]
    pub count: u32,

    /// Also print each decoded device buffer as hex
    #[arg(long, short = 'd')]
    pub decode: bool,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  CONFIG
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Display current resolved configuration
    Show,

    /// Set a configuration value
    Set {
        /// Config key (dot-separated for nested keys, e.g. "retry.max_attempts")
        key: String,

        /// Value to set (empty clears optional keys)
        value: String,
    },

    /// Print the config file location
    Path,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  COMPLETIONS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
