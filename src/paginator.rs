//! Offset/limit pagination: request construction, response parsing and the fetch loop.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::LoadError;
use crate::flatten::{flatten_rows, FlatRow};

pub const DEFAULT_LIMIT: u64 = 100;
pub const DEFAULT_LIMIT_PARAM: &str = "limit";
pub const DEFAULT_OFFSET_PARAM: &str = "offset";

/// Names of the two query parameters that carry the page window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParamNames {
    pub limit: String,
    pub offset: String,
}

impl Default for ParamNames {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT_PARAM.to_string(),
            offset: DEFAULT_OFFSET_PARAM.to_string(),
        }
    }
}

/// Position of the next page request for a tab.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaginationCursor {
    pub limit: u64,
    pub offset: u64,
    pub param_names: ParamNames,
}

impl Default for PaginationCursor {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            offset: 0,
            param_names: ParamNames::default(),
        }
    }
}

impl PaginationCursor {
    /// Cursor at offset 0 with the given page size (clamped to at least 1).
    pub fn with_limit(limit: u64) -> Self {
        Self {
            limit: limit.max(1),
            ..Self::default()
        }
    }

    pub fn with_param_names(mut self, param_names: ParamNames) -> Self {
        self.param_names = param_names;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadMode {
    /// One page at the cursor; replaces the tab's rows.
    Single,
    /// Every page from the cursor until an empty page; appends to the tab's rows.
    All,
}

/// Everything needed to run one load, detached from the tab that asked for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadRequest {
    pub endpoint: String,
    pub cursor: PaginationCursor,
    pub mode: LoadMode,
    pub token: Option<String>,
}

/// One HTTP round trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub url: String,
    pub offset: u64,
    pub limit: u64,
    pub token: Option<String>,
}

/// Fetches the JSON body of one page.
pub trait PageFetcher {
    fn fetch_page(&self, request: &PageRequest) -> Result<Value, LoadError>;
}

impl<F: PageFetcher + ?Sized> PageFetcher for &F {
    fn fetch_page(&self, request: &PageRequest) -> Result<Value, LoadError> {
        (**self).fetch_page(request)
    }
}

/// Parsed page body.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub rows: Vec<Value>,
    pub meta: Map<String, Value>,
}

impl Page {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Parse a `{ "data": [...] | row, "meta": {...} }` body.
///
/// A missing or null `data` is an empty page. A bare `data` value counts as one row.
pub fn parse_page(body: Value) -> Result<Page, LoadError> {
    let mut obj = match body {
        Value::Object(obj) => obj,
        other => {
            return Err(LoadError::MalformedResponse(format!(
                "expected a JSON object, got {}",
                json_kind(&other)
            )))
        }
    };
    let meta = match obj.remove("meta") {
        None | Some(Value::Null) => Map::new(),
        Some(Value::Object(meta)) => meta,
        Some(other) => {
            return Err(LoadError::MalformedResponse(format!(
                "\"meta\" must be an object, got {}",
                json_kind(&other)
            )))
        }
    };
    let rows = match obj.remove("data") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(rows)) => rows,
        Some(row) => vec![row],
    };
    Ok(Page { rows, meta })
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Build the URL of the page at `offset`, setting the cursor's offset and limit parameters.
///
/// Existing query parameters with the same names are replaced; other parameters and any
/// fragment are kept.
pub fn page_url(endpoint: &str, cursor: &PaginationCursor, offset: u64) -> String {
    let (without_fragment, fragment) = match endpoint.split_once('#') {
        Some((base, frag)) => (base, Some(frag)),
        None => (endpoint, None),
    };
    let (base, query) = match without_fragment.split_once('?') {
        Some((base, query)) => (base, query),
        None => (without_fragment, ""),
    };

    let offset_name = encode_component(&cursor.param_names.offset);
    let limit_name = encode_component(&cursor.param_names.limit);
    let mut pairs: Vec<String> = query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .filter(|pair| {
            let name = pair.split('=').next().unwrap_or_default();
            name != offset_name && name != limit_name
        })
        .map(str::to_string)
        .collect();
    pairs.push(format!("{offset_name}={offset}"));
    pairs.push(format!("{limit_name}={}", cursor.limit));

    let mut url = format!("{base}?{}", pairs.join("&"));
    if let Some(frag) = fragment {
        url.push('#');
        url.push_str(frag);
    }
    url
}

/// Percent-encode a query component (RFC 3986 unreserved characters pass through).
fn encode_component(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for b in s.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(b as char)
            }
            _ => out.push_str(&format!("%{b:02X}")),
        }
    }
    out
}

/// Result of a successful paginator run, ready to be committed to a tab.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadOutcome {
    pub mode: LoadMode,
    pub rows: Vec<Value>,
    pub flat_rows: Vec<FlatRow>,
    pub meta: Map<String, Value>,
    /// Offset the tab's cursor moves to.
    pub next_offset: u64,
    pub pages_fetched: usize,
}

/// Drives page fetches for one [`LoadRequest`].
pub struct Paginator<F> {
    fetcher: F,
    cancel: Option<Arc<AtomicBool>>,
}

impl<F: PageFetcher> Paginator<F> {
    pub fn new(fetcher: F) -> Self {
        Self {
            fetcher,
            cancel: None,
        }
    }

    /// Stop a running `All` load before its next page once `flag` is set.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    fn cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }

    fn fetch(&self, request: &LoadRequest, offset: u64) -> Result<Page, LoadError> {
        let page_request = PageRequest {
            url: page_url(&request.endpoint, &request.cursor, offset),
            offset,
            limit: request.cursor.limit,
            token: request.token.clone(),
        };
        debug!(url = %page_request.url, offset, limit = page_request.limit, "fetching page");
        let body = self.fetcher.fetch_page(&page_request)?;
        let page = parse_page(body)?;
        debug!(offset, rows = page.rows.len(), "page received");
        Ok(page)
    }

    /// Run the load. Nothing is returned unless every page succeeded.
    pub fn run(&self, request: &LoadRequest) -> Result<LoadOutcome, LoadError> {
        let limit = request.cursor.limit.max(1);
        let start = request.cursor.offset;
        info!(endpoint = %request.endpoint, offset = start, limit, mode = ?request.mode, "load started");

        let outcome = match request.mode {
            LoadMode::Single => {
                let page = self.fetch(request, start)?;
                let flat_rows = flatten_rows(&page.rows)?;
                LoadOutcome {
                    mode: LoadMode::Single,
                    rows: page.rows,
                    flat_rows,
                    meta: page.meta,
                    next_offset: start + limit,
                    pages_fetched: 1,
                }
            }
            LoadMode::All => {
                let mut rows = Vec::new();
                let mut meta = Map::new();
                let mut offset = start;
                let mut pages_fetched = 0;
                loop {
                    if pages_fetched > 0 && self.cancelled() {
                        info!(offset, "load cancelled");
                        return Err(LoadError::Cancelled);
                    }
                    let page = self.fetch(request, offset)?;
                    pages_fetched += 1;
                    if page.is_empty() {
                        break;
                    }
                    rows.extend(page.rows);
                    meta.extend(page.meta);
                    offset += limit;
                }
                let flat_rows = flatten_rows(&rows)?;
                LoadOutcome {
                    mode: LoadMode::All,
                    rows,
                    flat_rows,
                    meta,
                    next_offset: offset,
                    pages_fetched,
                }
            }
        };
        info!(
            rows = outcome.rows.len(),
            pages = outcome.pages_fetched,
            next_offset = outcome.next_offset,
            "load finished"
        );
        Ok(outcome)
    }
}
