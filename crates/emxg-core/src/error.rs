// ── Core error types ──
//
// Errors a screener caller can see. Transport-level failures from
// `emxg_api` are translated into page-aware variants; only failures on the
// first page (or before any request) ever surface here, since later-page
// failures end the fetch softly and keep the rows gathered so far.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Network failure on page {page}: {reason}")]
    Network { page: u32, reason: String },

    #[error("Request for page {page} timed out after {timeout_secs}s")]
    Timeout { page: u32, timeout_secs: u64 },

    // ── Service errors ───────────────────────────────────────────────
    #[error("Search rejected on page {page} (code {code}): {message}")]
    Api {
        page: u32,
        code: String,
        message: String,
    },

    #[error("Unreadable response for page {page}: {message}")]
    InvalidResponse { page: u32, message: String },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Translate an API error raised while requesting `page`.
    pub fn from_api(page: u32, err: emxg_api::Error) -> Self {
        use emxg_api::Error as Api;

        match err {
            Api::Timeout { timeout_secs } => Self::Timeout { page, timeout_secs },
            Api::Transport(ref e) if e.is_timeout() => Self::Timeout {
                page,
                timeout_secs: 0,
            },
            Api::Transport(e) => Self::Network {
                page,
                reason: e.to_string(),
            },
            Api::HttpStatus { status, body } => Self::Network {
                page,
                reason: if body.is_empty() {
                    format!("HTTP {status}")
                } else {
                    format!("HTTP {status}: {}", truncate(&body, 200))
                },
            },
            Api::Tls(msg) => Self::Network {
                page,
                reason: format!("TLS error: {msg}"),
            },
            Api::Api { code, message } => Self::Api {
                page,
                code,
                message,
            },
            Api::Deserialization { message, body: _ } => Self::InvalidResponse { page, message },
            Api::InvalidUrl(e) => Self::Config {
                message: format!("Invalid URL: {e}"),
            },
            Api::InvalidToken(msg) => Self::Internal(format!("token error: {msg}")),
        }
    }

    /// The page the failure happened on, if it came from a request.
    pub fn page(&self) -> Option<u32> {
        match self {
            Self::Network { page, .. }
            | Self::Timeout { page, .. }
            | Self::Api { page, .. }
            | Self::InvalidResponse { page, .. } => Some(*page),
            Self::Config { .. } | Self::Internal(_) => None,
        }
    }
}

fn truncate(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_rejection_keeps_code_and_page() {
        let err = CoreError::from_api(
            1,
            emxg_api::Error::Api {
                code: "101".into(),
                message: "bad".into(),
            },
        );
        assert!(matches!(err, CoreError::Api { page: 1, ref code, .. } if code == "101"));
        assert_eq!(err.page(), Some(1));
    }

    #[test]
    fn http_status_becomes_network_failure() {
        let err = CoreError::from_api(
            3,
            emxg_api::Error::HttpStatus {
                status: 502,
                body: String::new(),
            },
        );
        assert_eq!(err.to_string(), "Network failure on page 3: HTTP 502");
    }

    #[test]
    fn long_bodies_are_truncated() {
        let body = "é".repeat(500);
        let err = CoreError::from_api(1, emxg_api::Error::HttpStatus { status: 500, body });
        let CoreError::Network { reason, .. } = err else {
            panic!("expected network error");
        };
        assert_eq!(reason.chars().count(), "HTTP 500: ".len() + 200);
    }
}
