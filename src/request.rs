//! Read-only view of an inbound HTTP request.

use std::collections::HashMap;

/// The parts of a request the detector looks at.
///
/// Header names are stored lower-cased.
#[derive(Debug, Clone, Default)]
pub struct InboundRequest {
    /// HTTP method
    pub method: String,
    /// Raw request target (path and query), as sent on the request line
    pub target: String,
    /// Request headers (lowercase keys)
    pub headers: HashMap<String, Vec<String>>,
    /// Whether the request arrived over TLS
    pub encrypted: bool,
}

impl InboundRequest {
    /// Create a request with the given method and raw target.
    pub fn new(method: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            target: target.into(),
            headers: HashMap::new(),
            encrypted: false,
        }
    }

    /// Shorthand for a GET request.
    pub fn get(target: impl Into<String>) -> Self {
        Self::new("GET", target)
    }

    /// Add a header value.
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers
            .entry(name.to_lowercase())
            .or_default()
            .push(value.into());
        self
    }

    /// Set the User-Agent header.
    pub fn with_user_agent(self, ua: impl Into<String>) -> Self {
        self.with_header("user-agent", ua)
    }

    /// Set the Host header.
    pub fn with_host(self, host: impl Into<String>) -> Self {
        self.with_header("host", host)
    }

    /// Mark the request as received over TLS.
    pub fn with_encrypted(mut self, encrypted: bool) -> Self {
        self.encrypted = encrypted;
        self
    }

    /// Get a single header value (first if multiple).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_lowercase())
            .and_then(|v| v.first())
            .map(|s| s.as_str())
    }

    /// Get the User-Agent header, empty if absent.
    pub fn user_agent(&self) -> &str {
        self.header("user-agent").unwrap_or("")
    }

    /// Path component of the raw target.
    pub fn raw_path(&self) -> &str {
        split_target(&self.target).0
    }

    /// Query component of the raw target, without the leading `?`.
    pub fn raw_query(&self) -> Option<&str> {
        split_target(&self.target).1
    }
}

fn split_target(target: &str) -> (&str, Option<&str>) {
    let target = target.split('#').next().unwrap_or(target);
    match target.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (target, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headers_are_case_insensitive() {
        let req = InboundRequest::get("/").with_header("User-Agent", "Googlebot");
        assert_eq!(req.header("user-agent"), Some("Googlebot"));
        assert_eq!(req.header("USER-AGENT"), Some("Googlebot"));
        assert_eq!(req.user_agent(), "Googlebot");
    }

    #[test]
    fn test_missing_user_agent_is_empty() {
        let req = InboundRequest::get("/");
        assert_eq!(req.user_agent(), "");
    }

    #[test]
    fn test_target_split() {
        let req = InboundRequest::get("/path/a?x=1&y=2");
        assert_eq!(req.raw_path(), "/path/a");
        assert_eq!(req.raw_query(), Some("x=1&y=2"));

        let req = InboundRequest::get("/plain");
        assert_eq!(req.raw_path(), "/plain");
        assert_eq!(req.raw_query(), None);
    }
}
