// ── Screener facade ──
//
// One call from keyword to finished table: page loop, column
// normalization, then value conversion.

use rand::thread_rng;
use tracing::info;

use emxg_api::SearchClient;
use emxg_api::fingerprint::random_user_agent;

use crate::config::ScreenerConfig;
use crate::convert::{ConversionIssue, ValueConverter};
use crate::error::CoreError;
use crate::fetch::{FetchLimits, PageSource, PagedFetcher, StopReason};
use crate::normalize::{ColumnNormalizer, ResolvedColumn};
use crate::table::Table;

/// Keyword used when the caller does not supply one ("limit-up today").
pub const DEFAULT_KEYWORD: &str = "今日涨停";

/// What to search for and how much of it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub keyword: String,
    /// Row bound; `None` or 0 means unbounded.
    pub max_count: Option<usize>,
    /// Page bound; `None` or 0 means unbounded.
    pub max_page: Option<u32>,
    /// Overrides the configured page size.
    pub page_size: Option<u32>,
}

impl SearchQuery {
    pub fn new(keyword: impl Into<String>) -> Self {
        Self {
            keyword: keyword.into(),
            max_count: None,
            max_page: None,
            page_size: None,
        }
    }

    #[must_use]
    pub fn max_count(mut self, n: usize) -> Self {
        self.max_count = Some(n);
        self
    }

    #[must_use]
    pub fn max_page(mut self, n: u32) -> Self {
        self.max_page = Some(n);
        self
    }

    #[must_use]
    pub fn page_size(mut self, n: u32) -> Self {
        self.page_size = Some(n);
        self
    }
}

impl Default for SearchQuery {
    fn default() -> Self {
        Self::new(DEFAULT_KEYWORD)
    }
}

/// Finished search: the table plus how it came to be.
#[derive(Debug, Clone)]
pub struct SearchReport {
    pub table: Table,
    /// Descriptors that mapped onto a table column.
    pub columns: Vec<ResolvedColumn>,
    pub issues: Vec<ConversionIssue>,
    pub stop: StopReason,
    pub pages: u32,
    /// Total the service reported.
    pub total: u64,
}

/// Runs searches against a page source.
#[derive(Debug)]
pub struct Screener<S = SearchClient> {
    fetcher: PagedFetcher<S>,
    page_size: u32,
}

impl Screener<SearchClient> {
    /// Build an HTTP-backed screener. Without a configured user agent one
    /// of the common desktop agents is picked at random.
    pub fn new(config: &ScreenerConfig) -> Result<Self, CoreError> {
        if config.page_size == 0 {
            return Err(CoreError::Config {
                message: "page size must be greater than zero".into(),
            });
        }
        let user_agent = config
            .user_agent
            .clone()
            .unwrap_or_else(|| random_user_agent(&mut thread_rng()).to_owned());

        let fingerprint = config.fingerprint.fingerprint(&user_agent);
        let transport = config.transport(user_agent);
        let mut client = SearchClient::new(config.endpoint.clone(), &transport)
            .map_err(|e| CoreError::Config {
                message: e.to_string(),
            })?
            .with_retry(config.retry.policy());
        if let Some(fingerprint) = fingerprint {
            client = client.with_fingerprint(fingerprint);
        }

        Ok(Self::with_source(client, config.page_size))
    }
}

impl<S: PageSource> Screener<S> {
    pub fn with_source(source: S, page_size: u32) -> Self {
        Self {
            fetcher: PagedFetcher::new(source),
            page_size,
        }
    }

    pub fn source(&self) -> &S {
        self.fetcher.source()
    }

    /// Fetch, normalize and convert.
    ///
    /// An empty result is an empty table, not an error. Only a failure on
    /// the first page is returned as `Err`.
    pub async fn search(&mut self, query: &SearchQuery) -> Result<SearchReport, CoreError> {
        let limits = FetchLimits::new(
            query.page_size.unwrap_or(self.page_size),
            query.max_count,
            query.max_page,
        );
        let outcome = self.fetcher.fetch(&query.keyword, limits).await?;

        let (mut table, columns) = ColumnNormalizer::normalize(outcome.columns, outcome.rows);
        let issues = ValueConverter::apply(&mut table, &columns);

        info!(
            keyword = %query.keyword,
            rows = table.len(),
            pages = outcome.pages,
            issues = issues.len(),
            "search complete"
        );

        Ok(SearchReport {
            table,
            columns,
            issues,
            stop: outcome.stop,
            pages: outcome.pages,
            total: outcome.total,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::FingerprintMode;
    use crate::fetch::tests::{ScriptedSource, page};
    use crate::table::{CellValue, Frame};
    use emxg_api::{ColumnDescriptor, SearchResult};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[tokio::test]
    async fn converts_after_renaming() {
        let result = SearchResult {
            columns: vec![
                ColumnDescriptor::new("NP{2024-12-31}", "NetProfit", "Double", ""),
                ColumnDescriptor::new("NP{2024-09-30}", "NetProfit", "Double", ""),
                ColumnDescriptor::new("CHG", "Chg", "Double", "%"),
                ColumnDescriptor::new("FIRST", "Board", "Boolean", ""),
            ],
            rows: vec![
                json!({
                    "NP{2024-12-31}": "3.42亿",
                    "NP{2024-09-30}": "7668.05万",
                    "CHG": 10.5,
                    "FIRST": "首板"
                })
                .as_object()
                .unwrap()
                .clone(),
            ],
            total: 1,
            xc_id: None,
        };
        let mut screener = Screener::with_source(ScriptedSource::new(vec![Ok(result)]), 50);
        let report = screener.search(&SearchQuery::new("kw")).await.unwrap();

        let table = &report.table;
        assert_eq!(
            table.columns(),
            &["NetProfit", "NetProfit(2024-09-30)", "Chg", "Board"]
        );
        assert_eq!(table.cell(0, "NetProfit"), Some(&CellValue::Number(342_000_000.0)));
        assert_eq!(
            table.cell(0, "NetProfit(2024-09-30)"),
            Some(&CellValue::Number(76_680_500.0))
        );
        assert_eq!(table.cell(0, "Chg"), Some(&CellValue::Number(0.105)));
        assert_eq!(table.cell(0, "Board"), Some(&CellValue::Bool(true)));
        assert!(report.issues.is_empty());
        assert_eq!(report.stop, StopReason::Exhausted);
    }

    #[tokio::test]
    async fn empty_result_is_empty_table() {
        let source = ScriptedSource::new(vec![Ok(SearchResult::default())]);
        let mut screener = Screener::with_source(source, 50);
        let report = screener.search(&SearchQuery::default()).await.unwrap();
        assert!(report.table.is_empty());
        assert_eq!(report.stop, StopReason::EmptyPage { page: 1 });
    }

    #[tokio::test]
    async fn query_page_size_overrides_default() {
        let mut screener = Screener::with_source(
            ScriptedSource::new(vec![Ok(page(0, 5, 5, None))]),
            50,
        );
        screener.search(&SearchQuery::new("kw").page_size(5)).await.unwrap();
        assert_eq!(screener.source().seen[0].1, 5);
    }

    #[test]
    fn zero_page_size_is_rejected() {
        let config = ScreenerConfig {
            page_size: 0,
            ..ScreenerConfig::default()
        };
        assert!(matches!(Screener::new(&config), Err(CoreError::Config { .. })));
    }

    #[test]
    fn fixed_fingerprint_reaches_the_client() {
        let config = ScreenerConfig {
            fingerprint: FingerprintMode::Fixed("12345678901234567890".into()),
            ..ScreenerConfig::default()
        };
        let screener = Screener::new(&config).unwrap();
        assert_eq!(screener.source().fingerprint().as_str(), "12345678901234567890");
    }

    #[test]
    fn browser_fingerprint_follows_user_agent() {
        let config = ScreenerConfig {
            user_agent: Some("Mozilla/5.0 test".into()),
            fingerprint: FingerprintMode::Browser,
            ..ScreenerConfig::default()
        };
        let first = Screener::new(&config).unwrap();
        let second = Screener::new(&config).unwrap();
        assert_eq!(first.source().fingerprint(), second.source().fingerprint());
        assert_eq!(first.source().fingerprint().as_str().len(), 32);
    }
}
