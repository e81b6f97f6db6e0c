//! Snapshot types returned by the rendering service.

use serde::{Deserialize, Serialize};

/// A single response header from the snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotHeader {
    pub name: String,
    pub value: String,
}

impl SnapshotHeader {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Pre-rendered page returned in place of the dynamic response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapshotResult {
    /// HTTP status the rendered page answered with
    pub status: u16,

    /// Response headers, in order
    pub headers: Vec<SnapshotHeader>,

    /// Rendered HTML
    pub html: String,

    /// Base64 screenshot, when requested
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screenshot: Option<String>,

    /// Snapshot timestamp (unix seconds)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<i64>,
}

impl SnapshotResult {
    /// Create a snapshot with a status and body.
    pub fn new(status: u16, html: impl Into<String>) -> Self {
        Self {
            status,
            html: html.into(),
            ..Default::default()
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push(SnapshotHeader::new(name, value));
        self
    }

    /// First header with the given name (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(name))
            .map(|h| h.value.as_str())
    }
}
