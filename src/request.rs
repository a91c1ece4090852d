//! Incoming request as seen by the datatable view

use std::collections::BTreeMap;

use crate::options::params;

/// Path, query parameters and AJAX header of one request.
#[derive(Debug, Clone, Default)]
pub struct DatatableRequest {
    pub path: String,
    pub query: BTreeMap<String, String>,
    /// `X-Requested-With: XMLHttpRequest` was sent
    pub ajax_header: bool,
}

impl DatatableRequest {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    /// Parse a URL-encoded query string; later duplicates win.
    pub fn with_query_string(mut self, query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            self.query.insert(key.into_owned(), value.into_owned());
        }
        self
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(key.into(), value.into());
        self
    }

    pub fn with_ajax_header(mut self) -> Self {
        self.ajax_header = true;
        self
    }

    /// AJAX header present, or `ajax=true` in the query.
    pub fn is_ajax(&self) -> bool {
        self.ajax_header || self.query.get("ajax").map(String::as_str) == Some("true")
    }

    /// The `sEcho` correlation token, passed back unchanged.
    pub fn echo(&self) -> Option<&str> {
        self.query.get(params::ECHO).map(String::as_str)
    }
}
