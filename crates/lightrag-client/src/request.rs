//! Description of one backend HTTP exchange.

use reqwest::{Method, Url};
use serde_json::Value;

use lightrag_core::{GatewayError, Result};

/// Method, path, query and JSON body of a backend call.
///
/// Built from validated arguments before anything touches the network, so
/// the exact exchange can be inspected and logged.
#[derive(Debug, Clone, PartialEq)]
pub struct BackendRequest {
    pub method: Method,
    pub segments: Vec<String>,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl BackendRequest {
    pub fn new(method: Method, path: &str) -> Self {
        Self {
            method,
            segments: path
                .split('/')
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn get(path: &str) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: &str) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn delete(path: &str) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Append a path parameter. It is percent-encoded as a single segment.
    pub fn param(mut self, value: &str) -> Self {
        self.segments.push(value.to_string());
        self
    }

    /// Add a query string pair.
    pub fn query(mut self, key: &str, value: &str) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    /// Attach a JSON body.
    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Path for logging, e.g. `/documents/track_status/abc`.
    pub fn path(&self) -> String {
        format!("/{}", self.segments.join("/"))
    }

    /// Resolve against the backend base URL, keeping any base path prefix.
    pub fn url(&self, base: &Url) -> Result<Url> {
        let mut url = base.clone();
        url.path_segments_mut()
            .map_err(|_| GatewayError::config(format!("Backend URL {} cannot carry a path", base)))?
            .pop_if_empty()
            .extend(&self.segments);
        if !self.query.is_empty() {
            url.query_pairs_mut().extend_pairs(&self.query);
        }
        Ok(url)
    }
}
