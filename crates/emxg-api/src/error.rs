use thiserror::Error;

/// Top-level error type for the `emxg-api` crate.
///
/// Covers transport failures, non-success HTTP statuses, the service's
/// own `{code, msg}` envelope, and malformed payloads. `emxg-core` maps
/// these into page-aware diagnostics.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Request timed out.
    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// TLS or client-builder error.
    #[error("TLS error: {0}")]
    Tls(String),

    /// The server answered with a non-2xx status.
    #[error("HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    // ── Search API ──────────────────────────────────────────────────
    /// The `{code, msg}` envelope reported something other than `"100"`.
    #[error("Search API error (code {code}): {message}")]
    Api { code: String, message: String },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },

    /// A token string could not be decoded back into a device buffer.
    #[error("Invalid token: {0}")]
    InvalidToken(String),
}

impl Error {
    /// Returns `true` if a fresh attempt of the same request may succeed.
    ///
    /// Timeouts, connection failures and 5xx responses qualify; API-level
    /// rejections and malformed payloads do not.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(e) => {
                e.is_timeout()
                    || e.is_connect()
                    || e.status().is_some_and(|s| s.is_server_error())
            }
            Self::Timeout { .. } => true,
            Self::HttpStatus { status, .. } => (500..600).contains(status),
            _ => false,
        }
    }

    /// Returns `true` for failures below the service's JSON envelope
    /// (network, TLS, HTTP status).
    pub fn is_network(&self) -> bool {
        matches!(
            self,
            Self::Transport(_) | Self::Timeout { .. } | Self::Tls(_) | Self::HttpStatus { .. }
        )
    }

    /// Extract the service error code, if available.
    pub fn api_error_code(&self) -> Option<&str> {
        match self {
            Self::Api { code, .. } => Some(code),
            _ => None,
        }
    }
}
