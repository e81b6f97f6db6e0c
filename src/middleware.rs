//! Framework-neutral middleware adapter.
//!
//! Turns an interception into either a response to send or an instruction to
//! continue with normal handling. Errors never reach the client: they go to
//! the error callback and the request continues.

use crate::cache::SnapshotCache;
use crate::client::SnapshotClient;
use crate::config::PrerenderConfig;
use crate::detectors::RobotDetector;
use crate::error::{PrerenderError, Result};
use crate::interceptor::Interceptor;
use crate::request::InboundRequest;
use crate::snapshot::{SnapshotHeader, SnapshotResult};
use std::sync::Arc;
use tracing::{info, warn};

/// Rewrites a snapshot before it is sent.
pub type ResponseCallback = Box<dyn Fn(SnapshotResult) -> SnapshotResult + Send + Sync>;

/// Receives every error raised while handling a request.
pub type ErrorCallback = Box<dyn Fn(&PrerenderError, &InboundRequest) + Send + Sync>;

/// Response to send in place of the dynamic page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotResponse {
    pub status: u16,
    pub headers: Vec<SnapshotHeader>,
    pub body: String,
}

/// What the surrounding server should do with the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Handle the request normally
    Continue,
    /// Send the snapshot
    Respond(SnapshotResponse),
}

/// Middleware wrapping an [`Interceptor`].
pub struct PrerenderMiddleware {
    interceptor: Interceptor,
    response_callback: Option<ResponseCallback>,
    error_callback: Option<ErrorCallback>,
    forward_all_headers: bool,
}

impl PrerenderMiddleware {
    pub fn new(interceptor: Interceptor) -> Self {
        Self {
            interceptor,
            response_callback: None,
            error_callback: None,
            forward_all_headers: false,
        }
    }

    /// Build the full stack (detector, HTTP client, optional cache) from configuration.
    pub fn from_config(config: &PrerenderConfig) -> Result<Self> {
        let detector = RobotDetector::from_config(&config.detection)?;
        let client = SnapshotClient::new(config.client.clone())?;

        let mut interceptor = Interceptor::new(detector, Arc::new(client));
        if config.cache.enabled {
            interceptor = interceptor.with_hook(Arc::new(SnapshotCache::from_config(&config.cache)));
        }

        Ok(Self::new(interceptor).with_forward_all_headers(config.response.forward_all_headers))
    }

    pub fn with_response_callback<F>(mut self, f: F) -> Self
    where
        F: Fn(SnapshotResult) -> SnapshotResult + Send + Sync + 'static,
    {
        self.response_callback = Some(Box::new(f));
        self
    }

    pub fn with_error_callback<F>(mut self, f: F) -> Self
    where
        F: Fn(&PrerenderError, &InboundRequest) + Send + Sync + 'static,
    {
        self.error_callback = Some(Box::new(f));
        self
    }

    pub fn with_forward_all_headers(mut self, forward: bool) -> Self {
        self.forward_all_headers = forward;
        self
    }

    pub fn interceptor(&self) -> &Interceptor {
        &self.interceptor
    }

    /// Decide how to answer the request.
    pub async fn handle(&self, request: &InboundRequest) -> Outcome {
        match self.interceptor.intercept(request).await {
            Ok(Some(snapshot)) => {
                let response = self.shape(snapshot);
                info!(
                    status = response.status,
                    target = %request.target,
                    "Serving snapshot"
                );
                Outcome::Respond(response)
            }
            Ok(None) => Outcome::Continue,
            Err(err) => {
                warn!(error = %err, target = %request.target, "Interception failed, continuing");
                if let Some(callback) = &self.error_callback {
                    callback(&err, request);
                }
                Outcome::Continue
            }
        }
    }

    fn shape(&self, snapshot: SnapshotResult) -> SnapshotResponse {
        let (snapshot, forward_all) = match &self.response_callback {
            Some(callback) => (callback(snapshot), true),
            None => (snapshot, self.forward_all_headers),
        };

        let headers = if forward_all {
            snapshot.headers
        } else {
            snapshot
                .headers
                .into_iter()
                .filter(|h| h.name.eq_ignore_ascii_case("location"))
                .collect()
        };

        SnapshotResponse {
            status: if snapshot.status == 0 { 200 } else { snapshot.status },
            headers,
            body: snapshot.html,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::SnapshotFetcher;
    use async_trait::async_trait;
    use parking_lot::Mutex;

    struct StaticFetcher(std::result::Result<SnapshotResult, fn() -> PrerenderError>);

    #[async_trait]
    impl SnapshotFetcher for StaticFetcher {
        async fn fetch(&self, _url: &str) -> Result<SnapshotResult> {
            match &self.0 {
                Ok(snapshot) => Ok(snapshot.clone()),
                Err(make) => Err(make()),
            }
        }
    }

    fn middleware(fetcher: StaticFetcher) -> PrerenderMiddleware {
        let detector = RobotDetector::with_defaults().unwrap();
        PrerenderMiddleware::new(Interceptor::new(detector, Arc::new(fetcher)))
    }

    fn redirect_snapshot() -> SnapshotResult {
        SnapshotResult::new(301, "<html>moved</html>")
            .with_header("Location", "http://example.com/new")
            .with_header("Set-Cookie", "a=b")
    }

    fn bot() -> InboundRequest {
        InboundRequest::get("/")
            .with_host("example.com")
            .with_user_agent("Googlebot/2.1")
    }

    #[tokio::test]
    async fn test_only_location_forwarded_by_default() {
        let mw = middleware(StaticFetcher(Ok(redirect_snapshot())));
        let Outcome::Respond(response) = mw.handle(&bot()).await else {
            panic!("expected a snapshot response");
        };
        assert_eq!(response.status, 301);
        assert_eq!(
            response.headers,
            vec![SnapshotHeader::new("Location", "http://example.com/new")]
        );
        assert_eq!(response.body, "<html>moved</html>");
    }

    #[tokio::test]
    async fn test_response_callback() {
        let mw = middleware(StaticFetcher(Ok(redirect_snapshot()))).with_response_callback(|s| {
            SnapshotResult {
                status: 0,
                ..s
            }
        });
        let Outcome::Respond(response) = mw.handle(&bot()).await else {
            panic!("expected a snapshot response");
        };
        assert_eq!(response.status, 200);
        assert_eq!(response.headers.len(), 2);
    }

    #[tokio::test]
    async fn test_normal_request_continues() {
        let mw = middleware(StaticFetcher(Ok(redirect_snapshot())));
        let req = InboundRequest::get("/").with_user_agent("Mozilla/5.0 Firefox/120.0");
        assert_eq!(mw.handle(&req).await, Outcome::Continue);
    }

    #[tokio::test]
    async fn test_errors_go_to_callback_and_continue() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let mw = middleware(StaticFetcher(Err(|| PrerenderError::System {
            errors: serde_json::json!("down"),
        })))
        .with_error_callback(move |err, req| {
            sink.lock().push((err.message(), req.target.clone()));
        });

        assert_eq!(mw.handle(&bot()).await, Outcome::Continue);
        let seen = seen.lock();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].0.starts_with("System error"));
        assert_eq!(seen[0].1, "/");
    }

    #[tokio::test]
    async fn test_errors_without_callback_continue() {
        let mw = middleware(StaticFetcher(Err(|| PrerenderError::connection("refused"))));
        assert_eq!(mw.handle(&bot()).await, Outcome::Continue);
    }

    #[test]
    fn test_from_config() {
        let mut config = PrerenderConfig::default();
        config.cache.enabled = true;
        config.detection.ignored_routes = vec!["^/admin".to_string()];
        assert!(PrerenderMiddleware::from_config(&config).is_ok());

        config.detection.matched_routes = vec!["(".to_string()];
        assert!(PrerenderMiddleware::from_config(&config).is_err());
    }
}
