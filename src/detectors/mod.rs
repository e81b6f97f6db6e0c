//! Search engine robot detection.
//!
//! The detector runs an ordered pipeline of filters over a request. The first
//! filter that reaches a verdict ends the pipeline:
//!
//! 1. protocol must be `http` or `https`
//! 2. method must be `GET`
//! 3. User-Agent must not contain an ignored signature
//! 4. path must match the route whitelist, when one is configured
//! 5. path must not match the route blacklist
//! 6. path extension must be a known page extension, when checking is enabled
//! 7. `_escaped_fragment_` requests are intercepted
//! 8. User-Agent containing a matched signature is intercepted
//!
//! Anything that falls through is a normal request.

pub mod extensions;
pub mod routes;
pub mod signatures;
pub mod url;

pub use extensions::{extract_extension, ExtensionTable};
pub use routes::{RouteFilter, RouteRejection};
pub use signatures::{RobotSignatures, SignatureLists};
pub use self::url::CanonicalUrlParts;

use crate::config::DetectionConfig;
use crate::error::Result;
use crate::request::InboundRequest;
use std::sync::Arc;
use tracing::debug;

/// Pipeline stage that decided a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Filter {
    Protocol,
    Method,
    IgnoredUserAgent,
    Whitelist,
    Blacklist,
    Extension,
    EscapedFragment,
    MatchedUserAgent,
    /// No filter matched
    NoMatch,
}

impl Filter {
    pub fn as_str(&self) -> &'static str {
        match self {
            Filter::Protocol => "protocol",
            Filter::Method => "method",
            Filter::IgnoredUserAgent => "ignored_user_agent",
            Filter::Whitelist => "whitelist",
            Filter::Blacklist => "blacklist",
            Filter::Extension => "extension",
            Filter::EscapedFragment => "escaped_fragment",
            Filter::MatchedUserAgent => "matched_user_agent",
            Filter::NoMatch => "no_match",
        }
    }
}

/// Outcome of running the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detection {
    /// Whether the request should receive a snapshot
    pub intercept: bool,
    /// Filter that decided
    pub filter: Filter,
    /// Detail such as the signature or route that matched
    pub reason: Option<String>,
}

impl Detection {
    fn skip(filter: Filter) -> Self {
        Self {
            intercept: false,
            filter,
            reason: None,
        }
    }

    fn robot(filter: Filter) -> Self {
        Self {
            intercept: true,
            filter,
            reason: None,
        }
    }

    fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

/// Classifies requests as robot or normal.
///
/// Holds no per-request state, so one instance serves concurrent requests.
/// The signature and extension tables are shared and may be patched at
/// runtime; every detection reads their current contents.
#[derive(Debug, Clone)]
pub struct RobotDetector {
    signatures: Arc<RobotSignatures>,
    extensions: Arc<ExtensionTable>,
    routes: RouteFilter,
    check_file_extensions: bool,
    trusted_proxy: bool,
}

impl RobotDetector {
    /// Create a detector from explicit parts.
    pub fn new(
        signatures: Arc<RobotSignatures>,
        extensions: Arc<ExtensionTable>,
        routes: RouteFilter,
    ) -> Self {
        Self {
            signatures,
            extensions,
            routes,
            check_file_extensions: false,
            trusted_proxy: false,
        }
    }

    /// Create a detector with the built-in tables and no route filters.
    pub fn with_defaults() -> Result<Self> {
        Self::from_config(&DetectionConfig::default())
    }

    /// Create a detector from configuration, loading tables from disk when overridden.
    pub fn from_config(config: &DetectionConfig) -> Result<Self> {
        let signatures = RobotSignatures::load(config.robots_json.as_deref())?;
        let extensions = ExtensionTable::load(config.extensions_json.as_deref())?;
        let routes = RouteFilter::new(&config.ignored_routes, &config.matched_routes)?;

        Ok(Self::new(Arc::new(signatures), Arc::new(extensions), routes)
            .with_check_file_extensions(config.check_file_extensions)
            .with_trusted_proxy(config.trusted_proxy))
    }

    pub fn with_check_file_extensions(mut self, enabled: bool) -> Self {
        self.check_file_extensions = enabled;
        self
    }

    pub fn with_trusted_proxy(mut self, trusted: bool) -> Self {
        self.trusted_proxy = trusted;
        self
    }

    /// Live signature table.
    pub fn signatures(&self) -> &Arc<RobotSignatures> {
        &self.signatures
    }

    /// Live extension table.
    pub fn extensions(&self) -> &Arc<ExtensionTable> {
        &self.extensions
    }

    /// Whether the request comes from a robot that should receive a snapshot.
    pub fn detect(&self, request: &InboundRequest) -> Result<bool> {
        Ok(self.evaluate(request)?.intercept)
    }

    /// Run the filter pipeline and report which filter decided.
    pub fn evaluate(&self, request: &InboundRequest) -> Result<Detection> {
        let detection = self.run_filters(request)?;
        debug!(
            filter = detection.filter.as_str(),
            intercept = detection.intercept,
            reason = detection.reason.as_deref().unwrap_or(""),
            target = %request.target,
            "Robot detection complete"
        );
        Ok(detection)
    }

    fn run_filters(&self, request: &InboundRequest) -> Result<Detection> {
        let protocol = self.protocol(request);
        if protocol != "http" && protocol != "https" {
            return Ok(Detection::skip(Filter::Protocol).with_reason(protocol));
        }

        if request.method != "GET" {
            return Ok(Detection::skip(Filter::Method).with_reason(request.method.clone()));
        }

        let user_agent = request.user_agent();
        if let Some(signature) = self.signatures.find_ignored(user_agent) {
            return Ok(Detection::skip(Filter::IgnoredUserAgent).with_reason(signature));
        }

        let path = self.decoded_path(request)?;
        match self.routes.check(&path) {
            Ok(()) => {}
            Err(RouteRejection::NotWhitelisted) => {
                return Ok(Detection::skip(Filter::Whitelist).with_reason(path));
            }
            Err(RouteRejection::Blacklisted(pattern)) => {
                return Ok(Detection::skip(Filter::Blacklist).with_reason(pattern));
            }
        }

        if self.check_file_extensions {
            if let Some(ext) = extract_extension(&path) {
                if !self.extensions.contains(ext) {
                    return Ok(Detection::skip(Filter::Extension).with_reason(ext));
                }
            }
        }

        if self::url::has_escaped_fragment(&request.target) {
            return Ok(Detection::robot(Filter::EscapedFragment));
        }

        if let Some(signature) = self.signatures.find_matched(user_agent) {
            return Ok(Detection::robot(Filter::MatchedUserAgent).with_reason(signature));
        }

        Ok(Detection::skip(Filter::NoMatch))
    }

    /// Decoded path used for route and extension matching.
    pub fn decoded_path(&self, request: &InboundRequest) -> Result<String> {
        self::url::decoded_path(request)
    }

    /// Canonical absolute URL to snapshot.
    pub fn encoded_url(&self, request: &InboundRequest) -> String {
        self::url::encoded_url(request, self.trusted_proxy)
    }

    pub fn protocol(&self, request: &InboundRequest) -> String {
        self::url::protocol(request, self.trusted_proxy)
    }

    pub fn host(&self, request: &InboundRequest) -> String {
        self::url::host(request, self.trusted_proxy)
    }
}
