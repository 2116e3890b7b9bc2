//! Profile records and the reconstructed parent/child graph.
//!
//! A `Profile` is what gets written: request metadata, an opaque collector
//! payload and the tokens of its parent and children. Reading a token
//! materializes a `ProfileGraph` with every reachable ancestor and
//! descendant loaded.

pub mod graph;

pub use graph::{NodeId, ProfileGraph};

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ---------------------------------------------------------------------------
// Profile
// ---------------------------------------------------------------------------

/// A single profile record.
///
/// Serializes to the blob layout: `token`, `parent`, `children`, `data`,
/// `ip`, `method`, `url`, `time`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    token: String,
    #[serde(rename = "parent", default)]
    parent_token: Option<String>,
    #[serde(rename = "children", default)]
    child_tokens: Vec<String>,
    #[serde(rename = "data", default)]
    collectors: Value,
    #[serde(default)]
    ip: String,
    #[serde(default)]
    method: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    time: u64,
}

impl Profile {
    pub fn new(token: impl Into<String>) -> Self {
        Profile {
            token: token.into(),
            parent_token: None,
            child_tokens: Vec::new(),
            collectors: Value::Null,
            ip: String::new(),
            method: String::new(),
            url: String::new(),
            time: 0,
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn set_token(&mut self, token: impl Into<String>) {
        self.token = token.into();
    }

    /// The parent token, with an empty stored value read as no parent.
    pub fn parent_token(&self) -> Option<&str> {
        self.parent_token.as_deref().filter(|t| !t.is_empty())
    }

    pub fn set_parent_token(&mut self, token: Option<String>) {
        self.parent_token = token;
    }

    pub fn child_tokens(&self) -> &[String] {
        &self.child_tokens
    }

    pub fn set_child_tokens(&mut self, tokens: Vec<String>) {
        self.child_tokens = tokens;
    }

    /// Register a child, keeping insertion order.
    pub fn add_child_token(&mut self, token: impl Into<String>) {
        self.child_tokens.push(token.into());
    }

    pub fn collectors(&self) -> &Value {
        &self.collectors
    }

    pub fn set_collectors(&mut self, collectors: Value) {
        self.collectors = collectors;
    }

    pub fn ip(&self) -> &str {
        &self.ip
    }

    pub fn set_ip(&mut self, ip: impl Into<String>) {
        self.ip = ip.into();
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn set_method(&mut self, method: impl Into<String>) {
        self.method = method.into();
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn set_url(&mut self, url: impl Into<String>) {
        self.url = url.into();
    }

    /// Request time, unix seconds.
    pub fn time(&self) -> u64 {
        self.time
    }

    pub fn set_time(&mut self, time: u64) {
        self.time = time;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
