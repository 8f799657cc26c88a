// emxg-api: Async Rust client for the smart-tag stock screener search API

pub mod error;
pub mod fingerprint;
pub mod retry;
pub mod search;
pub mod token;
pub mod transport;

pub use error::Error;
pub use fingerprint::{BrowserTraits, Fingerprint};
pub use retry::RetryPolicy;
pub use search::{
    ColumnDescriptor, DEFAULT_ENDPOINT, PageQuery, RawRecord, SearchClient, SearchResult,
};
pub use token::{DeviceProfile, TOKEN_HEADER, TokenCodec, TokenGenerator};
pub use transport::{TlsMode, TransportConfig};
