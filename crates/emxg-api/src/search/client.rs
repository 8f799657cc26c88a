// Search endpoint HTTP client
//
// Owns the `reqwest::Client`, the token generator and the per-client
// fingerprint. Each page request gets a fresh device token, request id and
// timestamp; transient failures are retried according to the RetryPolicy.

use rand::Rng;
use rand::distributions::Alphanumeric;
use rand::rngs::StdRng;
use reqwest::header::USER_AGENT;
use tracing::{debug, warn};
use url::Url;

use crate::error::Error;
use crate::fingerprint::Fingerprint;
use crate::retry::RetryPolicy;
use crate::search::models::{PageQuery, SUCCESS_CODE, SearchRequest, SearchResponse, SearchResult};
use crate::token::{TOKEN_HEADER, TokenGenerator};
use crate::transport::TransportConfig;

/// Default search endpoint.
pub const DEFAULT_ENDPOINT: &str =
    "https://np-tjxg-b.eastmoney.com/api/smart-tag/stock/v3/pw/search-code";

const REQUEST_ID_LEN: usize = 32;

/// Client for the smart-tag `search-code` endpoint.
///
/// Page requests mutate the token generator, so `search_page` takes
/// `&mut self`. Construct one client per logical session; the underlying
/// `reqwest::Client` can be shared by cloning it into several clients.
#[derive(Debug)]
pub struct SearchClient {
    http: reqwest::Client,
    endpoint: Url,
    tokens: TokenGenerator<StdRng>,
    fingerprint: Fingerprint,
    retry: RetryPolicy,
    timeout_secs: u64,
}

impl SearchClient {
    /// Create a client from a `TransportConfig`.
    pub fn new(endpoint: Url, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        let mut client = Self::with_client(http, endpoint, transport.user_agent.clone());
        client.timeout_secs = transport.timeout_secs();
        Ok(client)
    }

    /// Create a client around a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, endpoint: Url, user_agent: String) -> Self {
        let mut tokens = TokenGenerator::from_entropy(user_agent);
        let fingerprint = Fingerprint::numeric(tokens.rng_mut());
        Self {
            http,
            endpoint,
            tokens,
            fingerprint,
            retry: RetryPolicy::default(),
            timeout_secs: 30,
        }
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Replace the random source. Rebuilds the device profile and redraws
    /// the fingerprint so both derive from `rng`.
    #[must_use]
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        let user_agent = self.tokens.user_agent().to_owned();
        self.tokens = TokenGenerator::new(user_agent, rng);
        self.fingerprint = Fingerprint::numeric(self.tokens.rng_mut());
        self
    }

    #[must_use]
    pub fn with_fingerprint(mut self, fingerprint: Fingerprint) -> Self {
        self.fingerprint = fingerprint;
        self
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }

    pub fn user_agent(&self) -> &str {
        self.tokens.user_agent()
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    // ── Requests ─────────────────────────────────────────────────────

    /// Fetch one page, retrying transient failures.
    pub async fn search_page(&mut self, query: &PageQuery<'_>) -> Result<SearchResult, Error> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.send_once(query).await {
                Ok(result) => return Ok(result),
                Err(err) => match self.retry.next_delay(attempt, &err) {
                    Some(delay) => {
                        warn!(
                            page = query.page_no,
                            attempt,
                            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                            error = %err,
                            "page request failed, retrying"
                        );
                        tokio::time::sleep(delay).await;
                    }
                    None => return Err(err),
                },
            }
        }
    }

    async fn send_once(&mut self, query: &PageQuery<'_>) -> Result<SearchResult, Error> {
        let token = self.tokens.generate_token();
        let timestamp = chrono::Utc::now().timestamp_micros().to_string();
        let request_id = self.request_id(&timestamp);
        let body = SearchRequest::new(query, self.fingerprint.as_str(), timestamp, request_id);

        debug!(page = query.page_no, "POST {}", self.endpoint);

        let resp = self
            .http
            .post(self.endpoint.clone())
            .header(TOKEN_HEADER, token)
            .header(USER_AGENT, self.tokens.user_agent())
            .json(&body)
            .send()
            .await
            .map_err(|e| self.map_transport(e))?;

        let status = resp.status();
        let text = resp.text().await.map_err(|e| self.map_transport(e))?;

        if !status.is_success() {
            return Err(Error::HttpStatus {
                status: status.as_u16(),
                body: text,
            });
        }

        let envelope: SearchResponse =
            serde_json::from_str(&text).map_err(|e| Error::Deserialization {
                message: e.to_string(),
                body: text.clone(),
            })?;

        let code = envelope.code();
        if code != SUCCESS_CODE {
            let message = if envelope.msg.is_empty() {
                "unknown error".to_owned()
            } else {
                envelope.msg
            };
            return Err(Error::Api { code, message });
        }

        Ok(envelope.data.result)
    }

    /// 32 random alphanumerics followed by the microsecond timestamp.
    fn request_id(&mut self, timestamp: &str) -> String {
        let rng = self.tokens.rng_mut();
        let mut id: String = (0..REQUEST_ID_LEN)
            .map(|_| char::from(rng.sample(Alphanumeric)))
            .collect();
        id.push_str(timestamp);
        id
    }

    fn map_transport(&self, err: reqwest::Error) -> Error {
        if err.is_timeout() {
            Error::Timeout {
                timeout_secs: self.timeout_secs,
            }
        } else {
            Error::Transport(err)
        }
    }
}
