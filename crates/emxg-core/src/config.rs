// ── Runtime screener configuration ──
//
// Describes *how* to reach the search endpoint and how hard to try. The
// CLI builds a `ScreenerConfig` from its config file and flags; core never
// reads config files itself.

use std::time::Duration;

use url::Url;

use emxg_api::{BrowserTraits, Fingerprint, RetryPolicy, TlsMode, TransportConfig};

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(std::path::PathBuf),
    /// Skip verification (intercepting proxies).
    DangerAcceptInvalid,
}

/// Where the request-body fingerprint comes from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum FingerprintMode {
    /// 20 random digits drawn once per client.
    #[default]
    Random,
    /// Hash of the local environment's browser-like traits; stable across
    /// runs with the same user agent.
    Browser,
    /// A caller-supplied value, sent as-is.
    Fixed(String),
}

impl FingerprintMode {
    /// The fingerprint to install on a client, or `None` to keep the
    /// client's own random draw.
    pub fn fingerprint(&self, user_agent: &str) -> Option<Fingerprint> {
        match self {
            Self::Random => None,
            Self::Browser => Some(Fingerprint::from_traits(&BrowserTraits::detect(user_agent))),
            Self::Fixed(value) => Some(Fingerprint::from_raw(value.clone())),
        }
    }
}

/// Backoff settings for a single page request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub multiplier: Duration,
    pub min_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            multiplier: Duration::from_secs(1),
            min_delay: Duration::from_secs(4),
            max_delay: Duration::from_secs(10),
        }
    }
}

impl RetrySettings {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_attempts,
            self.multiplier,
            self.min_delay,
            self.max_delay,
        )
    }
}

/// Configuration for one screener session.
#[derive(Debug, Clone)]
pub struct ScreenerConfig {
    /// Search endpoint URL.
    pub endpoint: Url,
    /// Rows requested per page.
    pub page_size: u32,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Browser user agent; a random desktop UA is picked when unset.
    pub user_agent: Option<String>,
    pub tls: TlsVerification,
    pub proxy: Option<Url>,
    pub retry: RetrySettings,
    pub fingerprint: FingerprintMode,
}

impl Default for ScreenerConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            page_size: 50,
            timeout: Duration::from_secs(30),
            user_agent: None,
            tls: TlsVerification::default(),
            proxy: None,
            retry: RetrySettings::default(),
            fingerprint: FingerprintMode::default(),
        }
    }
}

fn default_endpoint() -> Url {
    // valid constant, see `defaults_match_service_expectations`
    Url::parse(emxg_api::DEFAULT_ENDPOINT).expect("default endpoint is a valid URL")
}

impl ScreenerConfig {
    /// Transport settings for the HTTP client, with `user_agent` resolved.
    pub fn transport(&self, user_agent: String) -> TransportConfig {
        let tls = match &self.tls {
            TlsVerification::SystemDefaults => TlsMode::System,
            TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
            TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
        };
        TransportConfig {
            tls,
            timeout: self.timeout,
            user_agent,
            proxy: self.proxy.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_service_expectations() {
        let config = ScreenerConfig::default();
        assert_eq!(config.endpoint.as_str(), emxg_api::DEFAULT_ENDPOINT);
        assert_eq!(config.page_size, 50);
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.policy().delay_for(1), Duration::from_secs(4));
    }

    #[test]
    fn fingerprint_modes() {
        assert_eq!(FingerprintMode::Random.fingerprint("ua"), None);

        let fixed = FingerprintMode::Fixed("abc123".into()).fingerprint("ua");
        assert_eq!(fixed.as_ref().map(Fingerprint::as_str), Some("abc123"));

        let browser = FingerprintMode::Browser.fingerprint("ua").map(|f| f.to_string());
        let again = FingerprintMode::Browser.fingerprint("ua").map(|f| f.to_string());
        assert_eq!(browser.as_deref().map(str::len), Some(32));
        assert_eq!(browser, again);
    }

    #[test]
    fn transport_carries_tls_and_timeout() {
        let config = ScreenerConfig {
            tls: TlsVerification::DangerAcceptInvalid,
            timeout: Duration::from_secs(5),
            ..ScreenerConfig::default()
        };
        let transport = config.transport("ua".into());
        assert!(matches!(transport.tls, TlsMode::DangerAcceptInvalid));
        assert_eq!(transport.timeout_secs(), 5);
        assert_eq!(transport.user_agent, "ua");
    }
}
