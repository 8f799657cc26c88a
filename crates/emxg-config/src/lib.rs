//! Configuration for the emxg CLI.
//!
//! A single TOML file (platform config dir) layered over built-in defaults,
//! with `EMXG_`-prefixed environment variables on top, translated into
//! `emxg_core::ScreenerConfig`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use emxg_core::{FingerprintMode, RetrySettings, ScreenerConfig, TlsVerification};

/// Prefix for environment overrides. Nested keys use `__`, e.g.
/// `EMXG_RETRY__MAX_ATTEMPTS=3`.
pub const ENV_PREFIX: &str = "EMXG_";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("unknown config key '{key}'")]
    UnknownKey { key: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    /// Search endpoint URL.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Rows per page request.
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Fixed browser user agent; random desktop UA when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,

    /// Default output format.
    #[serde(default = "default_output")]
    pub output: String,

    /// Skip TLS certificate verification.
    #[serde(default)]
    pub insecure: bool,

    /// Extra CA certificate (PEM).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca_cert: Option<PathBuf>,

    /// HTTP(S) proxy URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy: Option<String>,

    /// `random`, `browser`, or a fixed fingerprint value.
    #[serde(default = "default_fingerprint")]
    pub fingerprint: String,

    #[serde(default)]
    pub retry: RetryConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            page_size: default_page_size(),
            timeout: default_timeout(),
            user_agent: None,
            output: default_output(),
            insecure: false,
            ca_cert: None,
            proxy: None,
            fingerprint: default_fingerprint(),
            retry: RetryConfig::default(),
        }
    }
}

/// Backoff for a single page request.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_min_delay_ms")]
    pub min_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    #[serde(default = "default_multiplier_ms")]
    pub multiplier_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            min_delay_ms: default_min_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            multiplier_ms: default_multiplier_ms(),
        }
    }
}

fn default_endpoint() -> String {
    emxg_core::ScreenerConfig::default().endpoint.to_string()
}
fn default_page_size() -> u32 {
    50
}
fn default_timeout() -> u64 {
    30
}
fn default_output() -> String {
    "table".into()
}
fn default_fingerprint() -> String {
    "random".into()
}
fn default_max_attempts() -> u32 {
    5
}
fn default_min_delay_ms() -> u64 {
    4_000
}
fn default_max_delay_ms() -> u64 {
    10_000
}
fn default_multiplier_ms() -> u64 {
    1_000
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("rs", "emxg", "emxg").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("emxg");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load defaults, then `path` if it exists, then `EMXG_*` variables.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<PathBuf, ConfigError> {
    let path = config_path();
    save_config_to(cfg, &path)?;
    Ok(path)
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Editing ─────────────────────────────────────────────────────────

/// Keys accepted by [`set_value`].
pub const SETTABLE_KEYS: &[&str] = &[
    "endpoint",
    "page_size",
    "timeout",
    "user_agent",
    "output",
    "insecure",
    "ca_cert",
    "proxy",
    "fingerprint",
    "retry.max_attempts",
    "retry.min_delay_ms",
    "retry.max_delay_ms",
    "retry.multiplier_ms",
];

/// Set one dotted key from its string form. An empty value clears
/// optional keys.
pub fn set_value(cfg: &mut Config, key: &str, value: &str) -> Result<(), ConfigError> {
    fn parse<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError>
    where
        T::Err: std::fmt::Display,
    {
        value.trim().parse().map_err(|e: T::Err| ConfigError::Validation {
            field: key.into(),
            reason: e.to_string(),
        })
    }
    let optional = |v: &str| (!v.is_empty()).then(|| v.to_owned());

    match key {
        "endpoint" => cfg.endpoint = value.to_owned(),
        "page_size" => cfg.page_size = parse(key, value)?,
        "timeout" => cfg.timeout = parse(key, value)?,
        "user_agent" => cfg.user_agent = optional(value),
        "output" => cfg.output = value.to_owned(),
        "insecure" => cfg.insecure = parse(key, value)?,
        "ca_cert" => cfg.ca_cert = optional(value).map(PathBuf::from),
        "proxy" => cfg.proxy = optional(value),
        "fingerprint" => cfg.fingerprint = value.trim().to_owned(),
        "retry.max_attempts" => cfg.retry.max_attempts = parse(key, value)?,
        "retry.min_delay_ms" => cfg.retry.min_delay_ms = parse(key, value)?,
        "retry.max_delay_ms" => cfg.retry.max_delay_ms = parse(key, value)?,
        "retry.multiplier_ms" => cfg.retry.multiplier_ms = parse(key, value)?,
        _ => return Err(ConfigError::UnknownKey { key: key.into() }),
    }
    validate(cfg)
}

fn validate(cfg: &Config) -> Result<(), ConfigError> {
    to_screener_config(cfg).map(|_| ())
}

// ── Translation ─────────────────────────────────────────────────────

const FIXED_FINGERPRINT_LEN: std::ops::RangeInclusive<usize> = 16..=64;

fn fingerprint_mode(value: &str) -> Result<FingerprintMode, ConfigError> {
    match value {
        "" | "random" => Ok(FingerprintMode::Random),
        "browser" => Ok(FingerprintMode::Browser),
        fixed
            if FIXED_FINGERPRINT_LEN.contains(&fixed.len())
                && fixed.chars().all(|c| c.is_ascii_alphanumeric()) =>
        {
            Ok(FingerprintMode::Fixed(fixed.to_owned()))
        }
        _ => Err(ConfigError::Validation {
            field: "fingerprint".into(),
            reason: "expected 'random', 'browser' or 16-64 ASCII letters and digits".into(),
        }),
    }
}

/// Build a `ScreenerConfig`, validating URLs and bounds.
pub fn to_screener_config(cfg: &Config) -> Result<ScreenerConfig, ConfigError> {
    let endpoint: url::Url = cfg.endpoint.parse().map_err(|_| ConfigError::Validation {
        field: "endpoint".into(),
        reason: format!("invalid URL: {}", cfg.endpoint),
    })?;

    if cfg.page_size == 0 {
        return Err(ConfigError::Validation {
            field: "page_size".into(),
            reason: "must be greater than zero".into(),
        });
    }
    if cfg.retry.max_attempts == 0 {
        return Err(ConfigError::Validation {
            field: "retry.max_attempts".into(),
            reason: "must be at least 1".into(),
        });
    }

    let proxy = cfg
        .proxy
        .as_deref()
        .map(|p| {
            p.parse::<url::Url>().map_err(|_| ConfigError::Validation {
                field: "proxy".into(),
                reason: format!("invalid URL: {p}"),
            })
        })
        .transpose()?;

    let tls = if cfg.insecure {
        TlsVerification::DangerAcceptInvalid
    } else if let Some(ref ca_path) = cfg.ca_cert {
        TlsVerification::CustomCa(ca_path.clone())
    } else {
        TlsVerification::SystemDefaults
    };

    Ok(ScreenerConfig {
        endpoint,
        page_size: cfg.page_size,
        timeout: Duration::from_secs(cfg.timeout),
        user_agent: cfg.user_agent.clone(),
        tls,
        proxy,
        retry: RetrySettings {
            max_attempts: cfg.retry.max_attempts,
            multiplier: Duration::from_millis(cfg.retry.multiplier_ms),
            min_delay: Duration::from_millis(cfg.retry.min_delay_ms),
            max_delay: Duration::from_millis(cfg.retry.max_delay_ms),
        },
        fingerprint: fingerprint_mode(&cfg.fingerprint)?,
    })
}
