// ── Paged fetching ──
//
// Drives the page loop against a `PageSource`, carrying the continuation
// cursor between pages and deciding when to stop. Failures on the first
// page are fatal; later failures end the loop and keep the rows gathered
// so far.

use std::fmt;
use std::future::Future;

use emxg_api::{ColumnDescriptor, PageQuery, RawRecord, SearchClient, SearchResult};
use tracing::{debug, info, warn};

use crate::error::CoreError;

/// Anything that can answer one page request.
pub trait PageSource {
    fn fetch_page(
        &mut self,
        query: &PageQuery<'_>,
    ) -> impl Future<Output = Result<SearchResult, emxg_api::Error>> + Send;
}

impl PageSource for SearchClient {
    fn fetch_page(
        &mut self,
        query: &PageQuery<'_>,
    ) -> impl Future<Output = Result<SearchResult, emxg_api::Error>> + Send {
        self.search_page(query)
    }
}

/// Work bounds for one fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchLimits {
    pub page_size: u32,
    pub max_count: Option<usize>,
    pub max_page: Option<u32>,
}

impl FetchLimits {
    /// Zero bounds mean "unbounded"; a zero page size is raised to 1.
    pub fn new(page_size: u32, max_count: Option<usize>, max_page: Option<u32>) -> Self {
        Self {
            page_size: page_size.max(1),
            max_count: max_count.filter(|&n| n > 0),
            max_page: max_page.filter(|&n| n > 0),
        }
    }
}

impl Default for FetchLimits {
    fn default() -> Self {
        Self::new(50, None, None)
    }
}

/// Why the page loop ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// A page came back with no rows.
    EmptyPage { page: u32 },
    /// The row bound was reached; rows were truncated to it.
    MaxCount { limit: usize },
    /// The page bound was reached.
    MaxPage { limit: u32 },
    /// Short page, or the reported total was reached.
    Exhausted,
    /// The service rejected a later page.
    Rejected { page: u32, code: String, message: String },
    /// A later page failed below the API envelope.
    SoftFailure { page: u32, reason: String },
}

impl StopReason {
    /// True when the loop stopped because of an error on a later page.
    pub fn is_partial(&self) -> bool {
        matches!(self, Self::Rejected { .. } | Self::SoftFailure { .. })
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyPage { page } => write!(f, "page {page} returned no rows"),
            Self::MaxCount { limit } => write!(f, "reached max count {limit}"),
            Self::MaxPage { limit } => write!(f, "reached max page {limit}"),
            Self::Exhausted => f.write_str("no more results"),
            Self::Rejected {
                page,
                code,
                message,
            } => write!(f, "page {page} rejected (code {code}): {message}"),
            Self::SoftFailure { page, reason } => write!(f, "page {page} failed: {reason}"),
        }
    }
}

/// Everything the page loop gathered.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchOutcome {
    pub rows: Vec<RawRecord>,
    /// Descriptors from the first page that reported any.
    pub columns: Vec<ColumnDescriptor>,
    /// Total the service reported on the last successful page.
    pub total: u64,
    /// Number of page requests issued, failed ones included.
    pub pages: u32,
    pub stop: StopReason,
}

/// Sequential page loop over a [`PageSource`].
#[derive(Debug)]
pub struct PagedFetcher<S> {
    source: S,
}

impl<S: PageSource> PagedFetcher<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn into_source(self) -> S {
        self.source
    }

    /// Fetch pages for `keyword` until a stop condition holds.
    ///
    /// After each page the checks run in this order: failure, empty page,
    /// row bound, page bound, natural end of data.
    pub async fn fetch(
        &mut self,
        keyword: &str,
        limits: FetchLimits,
    ) -> Result<FetchOutcome, CoreError> {
        let mut rows: Vec<RawRecord> = Vec::new();
        let mut columns: Vec<ColumnDescriptor> = Vec::new();
        let mut xc_id = String::new();
        let mut total = 0u64;
        let mut page_no = 1u32;

        let stop = loop {
            let query = PageQuery {
                keyword,
                page_size: limits.page_size,
                page_no,
                xc_id: &xc_id,
            };
            debug!(page = page_no, xc_id = %xc_id, "requesting page");

            let result = match self.source.fetch_page(&query).await {
                Ok(result) => result,
                Err(err) if page_no == 1 => return Err(CoreError::from_api(1, err)),
                Err(err) => {
                    warn!(
                        page = page_no,
                        error = %err,
                        "page failed, stopping with partial results"
                    );
                    break match err {
                        emxg_api::Error::Api { code, message } => StopReason::Rejected {
                            page: page_no,
                            code,
                            message,
                        },
                        other => StopReason::SoftFailure {
                            page: page_no,
                            reason: other.to_string(),
                        },
                    };
                }
            };

            if let Some(next) = result.xc_id {
                xc_id = next;
            }
            total = result.total;
            if columns.is_empty() {
                columns = result.columns;
            }

            let page_rows = result.rows.len();
            if page_rows == 0 {
                break StopReason::EmptyPage { page: page_no };
            }
            rows.extend(result.rows);
            info!(page = page_no, rows = page_rows, accumulated = rows.len(), "fetched page");

            if let Some(limit) = limits.max_count {
                if rows.len() >= limit {
                    rows.truncate(limit);
                    break StopReason::MaxCount { limit };
                }
            }
            if let Some(limit) = limits.max_page {
                if page_no >= limit {
                    break StopReason::MaxPage { limit };
                }
            }
            let accumulated = u64::try_from(rows.len()).unwrap_or(u64::MAX);
            let short_page = page_rows < usize::try_from(limits.page_size).unwrap_or(usize::MAX);
            if short_page || accumulated >= total {
                break StopReason::Exhausted;
            }
            page_no += 1;
        };

        debug!(pages = page_no, rows = rows.len(), %stop, "page loop finished");
        Ok(FetchOutcome {
            rows,
            columns,
            total,
            pages: page_no,
            stop,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use std::collections::VecDeque;

    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    /// Replays canned page results and records the queries it saw.
    #[derive(Debug, Default)]
    pub(crate) struct ScriptedSource {
        pub responses: VecDeque<Result<SearchResult, emxg_api::Error>>,
        pub seen: Vec<(u32, u32, String)>,
    }

    impl ScriptedSource {
        pub fn new(responses: Vec<Result<SearchResult, emxg_api::Error>>) -> Self {
            Self {
                responses: responses.into(),
                seen: Vec::new(),
            }
        }
    }

    impl PageSource for ScriptedSource {
        fn fetch_page(
            &mut self,
            query: &PageQuery<'_>,
        ) -> impl Future<Output = Result<SearchResult, emxg_api::Error>> + Send {
            self.seen
                .push((query.page_no, query.page_size, query.xc_id.to_owned()));
            let next = self.responses.pop_front().unwrap_or_else(|| Ok(SearchResult::default()));
            std::future::ready(next)
        }
    }

    pub(crate) fn page(
        start: usize,
        count: usize,
        total: u64,
        cursor: Option<&str>,
    ) -> SearchResult {
        SearchResult {
            columns: vec![ColumnDescriptor::new("ID", "Id", "Integer", "")],
            rows: (start..start + count)
                .map(|i| json!({ "ID": i }).as_object().unwrap().clone())
                .collect(),
            total,
            xc_id: cursor.map(str::to_owned),
        }
    }

    fn rejected() -> emxg_api::Error {
        emxg_api::Error::Api {
            code: "500".into(),
            message: "rejected".into(),
        }
    }

    async fn run(
        responses: Vec<Result<SearchResult, emxg_api::Error>>,
        limits: FetchLimits,
    ) -> (Result<FetchOutcome, CoreError>, ScriptedSource) {
        let mut fetcher = PagedFetcher::new(ScriptedSource::new(responses));
        let outcome = fetcher.fetch("kw", limits).await;
        (outcome, fetcher.into_source())
    }

    #[tokio::test]
    async fn max_count_truncates_mid_page() {
        let (outcome, source) = run(
            vec![
                Ok(page(0, 20, 100, None)),
                Ok(page(20, 20, 100, None)),
                Ok(page(40, 20, 100, None)),
            ],
            FetchLimits::new(20, Some(30), None),
        )
        .await;
        let outcome = outcome.unwrap();
        assert_eq!(outcome.rows.len(), 30);
        assert_eq!(outcome.pages, 2);
        assert_eq!(outcome.stop, StopReason::MaxCount { limit: 30 });
        assert_eq!(source.seen.len(), 2);
    }

    #[tokio::test]
    async fn cursor_is_carried_between_pages() {
        let (outcome, source) = run(
            vec![
                Ok(page(0, 2, 5, Some("c1"))),
                Ok(page(2, 2, 5, None)),
                Ok(page(4, 1, 5, Some("c3"))),
            ],
            FetchLimits::new(2, None, None),
        )
        .await;
        let outcome = outcome.unwrap();
        assert_eq!(outcome.rows.len(), 5);
        assert_eq!(outcome.stop, StopReason::Exhausted);
        let cursors: Vec<&str> = source.seen.iter().map(|(_, _, c)| c.as_str()).collect();
        assert_eq!(cursors, vec!["", "c1", "c1"]);
    }

    #[tokio::test]
    async fn total_reached_stops_even_on_full_page() {
        let (outcome, source) = run(
            vec![Ok(page(0, 2, 4, None)), Ok(page(2, 2, 4, None)), Ok(page(4, 2, 4, None))],
            FetchLimits::new(2, None, None),
        )
        .await;
        assert_eq!(outcome.unwrap().rows.len(), 4);
        assert_eq!(source.seen.len(), 2);
    }

    #[tokio::test]
    async fn missing_total_stops_after_first_page() {
        let (outcome, source) = run(
            vec![Ok(page(0, 2, 0, None)), Ok(page(2, 2, 0, None))],
            FetchLimits::new(2, None, None),
        )
        .await;
        assert_eq!(outcome.unwrap().rows.len(), 2);
        assert_eq!(source.seen.len(), 1);
    }

    #[tokio::test]
    async fn max_page_bound() {
        let (outcome, _) = run(
            vec![Ok(page(0, 2, 10, None)), Ok(page(2, 2, 10, None)), Ok(page(4, 2, 10, None))],
            FetchLimits::new(2, None, Some(2)),
        )
        .await;
        let outcome = outcome.unwrap();
        assert_eq!(outcome.rows.len(), 4);
        assert_eq!(outcome.stop, StopReason::MaxPage { limit: 2 });
    }

    #[tokio::test]
    async fn empty_page_stops() {
        let (outcome, _) = run(
            vec![Ok(page(0, 2, 10, None)), Ok(page(0, 0, 10, None))],
            FetchLimits::new(2, None, None),
        )
        .await;
        let outcome = outcome.unwrap();
        assert_eq!(outcome.rows.len(), 2);
        assert_eq!(outcome.stop, StopReason::EmptyPage { page: 2 });
    }

    #[tokio::test]
    async fn first_page_failure_is_fatal() {
        let (outcome, _) = run(vec![Err(rejected())], FetchLimits::default()).await;
        assert!(matches!(outcome, Err(CoreError::Api { page: 1, .. })));
    }

    #[tokio::test]
    async fn later_failure_keeps_partial_rows() {
        let (outcome, _) = run(
            vec![
                Ok(page(0, 2, 10, None)),
                Err(emxg_api::Error::HttpStatus {
                    status: 502,
                    body: String::new(),
                }),
            ],
            FetchLimits::new(2, None, None),
        )
        .await;
        let outcome = outcome.unwrap();
        assert_eq!(outcome.rows.len(), 2);
        assert!(outcome.stop.is_partial());
        assert!(matches!(outcome.stop, StopReason::SoftFailure { page: 2, .. }));
    }

    #[tokio::test]
    async fn later_rejection_is_soft() {
        let (outcome, _) = run(
            vec![Ok(page(0, 2, 10, None)), Err(rejected())],
            FetchLimits::new(2, None, None),
        )
        .await;
        let outcome = outcome.unwrap();
        assert!(matches!(outcome.stop, StopReason::Rejected { page: 2, .. }));
    }

    #[test]
    fn zero_limits_mean_unbounded() {
        let limits = FetchLimits::new(0, Some(0), Some(0));
        assert_eq!(limits.page_size, 1);
        assert_eq!(limits.max_count, None);
        assert_eq!(limits.max_page, None);
    }
}
