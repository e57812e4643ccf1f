//! Parsed request types.

use bytes::Bytes;
use std::collections::HashMap;

pub const CONTENT_LENGTH: &str = "Content-Length";

/// Request headers keyed by exact (case-sensitive) name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    map: HashMap<String, String>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a header. A repeated name replaces the earlier value.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.map.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.map.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.map.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Declared body length.
    ///
    /// `None` when the header is absent. A value that is not a non-negative
    /// integer counts as zero.
    pub fn content_length(&self) -> Option<usize> {
        self.get(CONTENT_LENGTH)
            .map(|value| value.trim().parse().unwrap_or(0))
    }
}

/// A fully read request.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: String,
    pub path: String,
    pub version: String,
    pub headers: Headers,
    pub body: Bytes,
}

impl Request {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    pub fn has_header(&self, name: &str) -> bool {
        self.headers.contains(name)
    }
}
