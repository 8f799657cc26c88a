// Wire types for the search-code endpoint
//
// The response envelope is `{ code, msg, data: { result: { columns,
// dataList, total, xcId } } }`. Every nested level may be missing or null
// on sparse pages, so all of them fall back to empty values.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// One raw row: descriptor key → raw JSON value, in server order.
pub type RawRecord = serde_json::Map<String, Value>;

/// Envelope code the service uses for success.
pub const SUCCESS_CODE: &str = "100";

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// ── Request ─────────────────────────────────────────────────────────

/// POST body for one page. Field order follows the browser client.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SearchRequest<'a> {
    pub key_word: &'a str,
    pub page_size: u32,
    pub page_no: u32,
    pub fingerprint: &'a str,
    pub gids: [u64; 0],
    pub match_word: &'static str,
    pub timestamp: String,
    pub share_to_guba: bool,
    pub request_id: String,
    pub need_correct: bool,
    pub removed_condition_id_list: [u64; 0],
    pub xc_id: &'a str,
    pub own_select_all: bool,
    pub dx_info: [u64; 0],
    pub extra_condition: &'static str,
}

impl<'a> SearchRequest<'a> {
    pub fn new(
        query: &PageQuery<'a>,
        fingerprint: &'a str,
        timestamp: String,
        request_id: String,
    ) -> Self {
        Self {
            key_word: query.keyword,
            page_size: query.page_size,
            page_no: query.page_no,
            fingerprint,
            gids: [],
            match_word: "",
            timestamp,
            share_to_guba: false,
            request_id,
            need_correct: true,
            removed_condition_id_list: [],
            xc_id: query.xc_id,
            own_select_all: false,
            dx_info: [],
            extra_condition: "",
        }
    }
}

/// Parameters that vary between page requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageQuery<'a> {
    pub keyword: &'a str,
    pub page_size: u32,
    /// 1-based page number.
    pub page_no: u32,
    /// Continuation cursor from the previous page, empty on page 1.
    pub xc_id: &'a str,
}

// ── Response ────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub(crate) struct SearchResponse {
    #[serde(default)]
    pub code: Value,
    #[serde(default, deserialize_with = "null_as_default")]
    pub msg: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub data: SearchData,
}

impl SearchResponse {
    /// The envelope code as text; the service sends it as a string but a
    /// bare number is tolerated.
    pub fn code(&self) -> String {
        match &self.code {
            Value::String(s) => s.clone(),
            Value::Null => String::new(),
            other => other.to_string(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct SearchData {
    #[serde(default, deserialize_with = "null_as_default")]
    pub result: SearchResult,
}

/// One page of results.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct SearchResult {
    #[serde(default, deserialize_with = "null_as_default")]
    pub columns: Vec<ColumnDescriptor>,
    #[serde(default, rename = "dataList", deserialize_with = "null_as_default")]
    pub rows: Vec<RawRecord>,
    /// Total matches the service reports; 0 when absent.
    #[serde(default, deserialize_with = "null_as_default")]
    pub total: u64,
    /// Continuation cursor, present only when the service sends one.
    #[serde(default, rename = "xcId")]
    pub xc_id: Option<String>,
}

/// Column metadata reported alongside the rows.
///
/// `title` and `dataType` have older spellings (`index_name`, `type`) that
/// some responses still use; the accessors fall back to them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct ColumnDescriptor {
    #[serde(default, deserialize_with = "null_as_default")]
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index_name: Option<String>,
    #[serde(default, rename = "dataType", skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub legacy_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

impl ColumnDescriptor {
    pub fn new(
        key: impl Into<String>,
        title: impl Into<String>,
        data_type: impl Into<String>,
        unit: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            title: Some(title.into()),
            data_type: Some(data_type.into()),
            unit: Some(unit.into()),
            ..Self::default()
        }
    }

    /// Display title, defaulting to the key.
    pub fn title(&self) -> &str {
        self.title
            .as_deref()
            .or(self.index_name.as_deref())
            .unwrap_or(&self.key)
    }

    pub fn data_type(&self) -> &str {
        self.data_type
            .as_deref()
            .or(self.legacy_type.as_deref())
            .unwrap_or_default()
    }

    pub fn unit(&self) -> &str {
        self.unit.as_deref().unwrap_or_default()
    }

    /// Text between the first `{` and the following `}`, if any.
    pub fn time_qualifier(&self) -> Option<&str> {
        let open = self.key.find('{')?;
        let rest = &self.key[open + 1..];
        let close = rest.find('}')?;
        Some(&rest[..close])
    }
}
