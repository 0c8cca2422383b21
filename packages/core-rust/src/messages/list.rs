//! List-query request parameters and responses.
//!
//! The request travels as a query string:
//! `?skip=0&take=100&search={json}&sort={json}&requireTotalCount=true`, where
//! `search` is `{"searchTerm": "...", "columns": "col1,col2"}` and `sort` is a
//! JSON array holding at most one `{"selector": "...", "desc": bool}`.

use serde::{Deserialize, Serialize};

use crate::query::{QueryDescriptor, SearchSpec, SortSpec};
use crate::types::Row;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors from decoding the query-string form of a list request.
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    #[error("malformed search parameter: {0}")]
    InvalidSearch(#[source] serde_json::Error),
    #[error("malformed sort parameter: {0}")]
    InvalidSort(#[source] serde_json::Error),
}

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

/// JSON object carried in the `search` query parameter.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchParam {
    /// Text to look for.
    #[serde(default)]
    pub search_term: String,
    /// Comma-joined column names (a single string, not an array).
    #[serde(default)]
    pub columns: String,
}

/// One element of the JSON array carried in the `sort` query parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SortParam {
    /// Column to order by.
    pub selector: String,
    /// Descending order when true.
    #[serde(default)]
    pub desc: bool,
}

/// Query-string form of a list request.
///
/// `search` and `sort` hold JSON text. The literal values `""` and `"[]"`
/// are treated as absent.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQueryParams {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub skip: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub take: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub search: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub sort: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub require_total_count: Option<bool>,
}

impl ListQueryParams {
    /// Decodes the parameters into a [`QueryDescriptor`] for `resource`.
    ///
    /// A missing `take` falls back to `default_take`, a missing `skip` to 0.
    ///
    /// # Errors
    ///
    /// Returns [`WireError`] when `search` or `sort` is not valid JSON of the
    /// expected shape.
    pub fn into_descriptor(
        self,
        resource: impl Into<String>,
        default_take: u64,
    ) -> Result<QueryDescriptor, WireError> {
        let search = match self.search.as_deref() {
            Some(raw) => parse_search(raw)?,
            None => None,
        };
        let sort = match self.sort.as_deref() {
            Some(raw) => parse_sort(raw)?,
            None => Vec::new(),
        };

        Ok(QueryDescriptor {
            resource: resource.into(),
            search,
            sort,
            skip: self.skip.unwrap_or(0),
            take: self.take.unwrap_or(default_take),
            require_total_count: self.require_total_count.unwrap_or(false),
        })
    }
}

impl From<&QueryDescriptor> for ListQueryParams {
    fn from(descriptor: &QueryDescriptor) -> Self {
        let search = descriptor.effective_search().map(|s| {
            let param = SearchParam {
                search_term: s.search_term.clone(),
                columns: s.columns.join(","),
            };
            serde_json::to_string(&param).unwrap_or_default()
        });
        let sort = descriptor.effective_sort().map(|s| {
            let param = [SortParam {
                selector: s.column.clone(),
                desc: s.descending,
            }];
            serde_json::to_string(&param).unwrap_or_default()
        });

        Self {
            skip: Some(descriptor.skip),
            take: Some(descriptor.take),
            search,
            sort,
            require_total_count: descriptor.require_total_count.then_some(true),
        }
    }
}

fn is_absent(raw: &str) -> bool {
    let trimmed = raw.trim();
    trimmed.is_empty() || trimmed == "[]"
}

/// Parses the `search` parameter.
///
/// Column names are split on commas and trimmed; empty entries are dropped.
/// An empty search term yields `None`.
///
/// # Errors
///
/// Returns [`WireError::InvalidSearch`] on malformed JSON.
pub fn parse_search(raw: &str) -> Result<Option<SearchSpec>, WireError> {
    if is_absent(raw) {
        return Ok(None);
    }
    let param: SearchParam = serde_json::from_str(raw).map_err(WireError::InvalidSearch)?;
    if param.search_term.is_empty() {
        return Ok(None);
    }
    let columns = param
        .columns
        .split(',')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .collect();
    Ok(Some(SearchSpec {
        search_term: param.search_term,
        columns,
    }))
}

/// Parses the `sort` parameter. Every element is kept; consumers honor
/// only the first.
///
/// # Errors
///
/// Returns [`WireError::InvalidSort`] on malformed JSON.
pub fn parse_sort(raw: &str) -> Result<Vec<SortSpec>, WireError> {
    if is_absent(raw) {
        return Ok(Vec::new());
    }
    let params: Vec<SortParam> = serde_json::from_str(raw).map_err(WireError::InvalidSort)?;
    Ok(params
        .into_iter()
        .map(|p| SortSpec {
            column: p.selector,
            descending: p.desc,
        })
        .collect())
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

/// One bounded result set plus an optional total count.
///
/// Serializes as `{"data": [...]}` or `{"data": [...], "totalCount": n}`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub data: Vec<Row>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub total_count: Option<u64>,
}

/// Response of the count endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CountResponse {
    pub total_count: u64,
}

/// Distinguishes the three failure classes a caller must tell apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Malformed or unrecognized descriptor.
    BadRequest,
    /// Detail lookup for a nonexistent id.
    NotFound,
    /// Row store unreachable or faulted.
    UpstreamFailure,
}

/// Body of a non-2xx response: `{"error": {"code": "...", "message": "..."}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub error: ErrorBody,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: ErrorCode,
    pub message: String,
}

impl ErrorPayload {
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            error: ErrorBody {
                code,
                message: message.into(),
            },
        }
    }
}
