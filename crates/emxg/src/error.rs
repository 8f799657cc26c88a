//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text and a process exit code.

use miette::Diagnostic;
use thiserror::Error;

use emxg_config::ConfigError;
use emxg_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const NO_RESULTS: i32 = 4;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not reach the search service (page {page})")]
    #[diagnostic(
        code(emxg::connection_failed),
        help(
            "{reason}\n\
             Check your network or proxy settings, or point --endpoint elsewhere."
        )
    )]
    ConnectionFailed { page: u32, reason: String },

    #[error("Request timed out after {seconds}s")]
    #[diagnostic(
        code(emxg::timeout),
        help("Increase the timeout with --timeout or `emxg config set timeout <secs>`.")
    )]
    Timeout { seconds: u64 },

    // ── Service ──────────────────────────────────────────────────────
    #[error("Search rejected (code {code}): {message}")]
    #[diagnostic(
        code(emxg::api_error),
        help("The service refused the query. Rephrase the keyword or retry later.")
    )]
    ApiError { code: String, message: String },

    #[error("Unexpected response from the search service: {message}")]
    #[diagnostic(code(emxg::invalid_response))]
    InvalidResponse { message: String },

    #[error("No results for '{keyword}'")]
    #[diagnostic(code(emxg::no_results), help("Try a broader keyword."))]
    NoResults { keyword: String },

    // ── Validation / configuration ───────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(emxg::validation))]
    Validation { field: String, reason: String },

    #[error("Unknown config key '{key}'")]
    #[diagnostic(code(emxg::unknown_key), help("Settable keys: {available}"))]
    UnknownKey { key: String, available: String },

    #[error("Could not load configuration")]
    #[diagnostic(
        code(emxg::config),
        help("Fix or remove the file at {path}.\n{reason}")
    )]
    Config { path: String, reason: String },

    #[error("Internal error: {0}")]
    #[diagnostic(code(emxg::internal))]
    Internal(String),

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to render JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to render YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Failed to write CSV: {0}")]
    Csv(#[from] csv::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::NoResults { .. } => exit_code::NO_RESULTS,
            Self::Validation { .. } | Self::UnknownKey { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Network { page, reason } => Self::ConnectionFailed { page, reason },
            CoreError::Timeout { timeout_secs, .. } => Self::Timeout {
                seconds: timeout_secs,
            },
            CoreError::Api { code, message, .. } => Self::ApiError { code, message },
            CoreError::InvalidResponse { message, .. } => Self::InvalidResponse { message },
            CoreError::Config { message } => Self::Validation {
                field: "config".into(),
                reason: message,
            },
            CoreError::Internal(message) => Self::Internal(message),
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            ConfigError::UnknownKey { key } => Self::UnknownKey {
                key,
                available: emxg_config::SETTABLE_KEYS.join(", "),
            },
            ConfigError::Io(e) => Self::Io(e),
            other => Self::Config {
                path: emxg_config::config_path().display().to_string(),
                reason: other.to_string(),
            },
        }
    }
}
