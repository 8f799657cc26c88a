// emxg-core: paged fetching and result normalization between emxg-api and the CLI.

pub mod config;
pub mod convert;
pub mod error;
pub mod fetch;
pub mod normalize;
pub mod screener;
pub mod table;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{FingerprintMode, RetrySettings, ScreenerConfig, TlsVerification};
pub use convert::{ConversionIssue, DataType, IssueKind, ValueConverter};
pub use error::CoreError;
pub use fetch::{FetchLimits, FetchOutcome, PageSource, PagedFetcher, StopReason};
pub use normalize::{ColumnNormalizer, ResolvedColumn};
pub use screener::{DEFAULT_KEYWORD, Screener, SearchQuery, SearchReport};
pub use table::{CellValue, Frame, Record, Table};
