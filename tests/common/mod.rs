use jtv::error::LoadError;
use jtv::paginator::{PageFetcher, PageRequest};
use serde_json::{json, Value};
use std::cell::RefCell;
use std::collections::VecDeque;

/// In-memory fetcher that answers with scripted responses and records every request
#[derive(Default)]
pub struct ScriptedFetcher {
    responses: RefCell<VecDeque<Result<Value, LoadError>>>,
    pub requests: RefCell<Vec<PageRequest>>,
}

impl ScriptedFetcher {
    pub fn new(responses: Vec<Result<Value, LoadError>>) -> Self {
        Self {
            responses: RefCell::new(responses.into()),
            requests: RefCell::new(Vec::new()),
        }
    }

    /// Answer with one page body per entry in `pages`
    pub fn pages(pages: Vec<Value>) -> Self {
        Self::new(pages.into_iter().map(Ok).collect())
    }

    pub fn offsets(&self) -> Vec<u64> {
        self.requests.borrow().iter().map(|r| r.offset).collect()
    }

    pub fn urls(&self) -> Vec<String> {
        self.requests.borrow().iter().map(|r| r.url.clone()).collect()
    }
}

impl PageFetcher for ScriptedFetcher {
    fn fetch_page(&self, request: &PageRequest) -> Result<Value, LoadError> {
        self.requests.borrow_mut().push(request.clone());
        self.responses
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Ok(json!({ "data": [] })))
    }
}

/// Page body with `count` rows numbered from `start`
pub fn page(start: u64, count: u64) -> Value {
    let rows: Vec<Value> = (start..start + count)
        .map(|i| json!({ "id": i, "user": { "name": format!("user{}", i) } }))
        .collect();
    json!({ "data": rows, "meta": { "returned": count } })
}

pub fn empty_page() -> Value {
    json!({ "data": [] })
}
