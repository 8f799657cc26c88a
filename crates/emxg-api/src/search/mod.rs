// Stock screener search endpoint: wire types and client.

mod client;
mod models;

pub use client::{DEFAULT_ENDPOINT, SearchClient};
pub use models::{ColumnDescriptor, PageQuery, RawRecord, SUCCESS_CODE, SearchResult};
