//! Request interception.
//!
//! Ties the detector to a snapshot fetcher. Hooks run in two phases around
//! the fetch: every `before` hook may supply a snapshot and skip the fetch,
//! and every `after` hook sees the final snapshot.

use crate::client::SnapshotFetcher;
use crate::detectors::RobotDetector;
use crate::error::{PrerenderError, Result};
use crate::request::InboundRequest;
use crate::snapshot::SnapshotResult;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

/// Hooks around the snapshot fetch.
#[async_trait]
pub trait InterceptHook: Send + Sync {
    /// Called with the canonical URL before fetching. Returning a snapshot skips the fetch.
    async fn before(&self, _url: &str) -> anyhow::Result<Option<SnapshotResult>> {
        Ok(None)
    }

    /// Called with the canonical URL and the snapshot about to be returned.
    async fn after(&self, _url: &str, _snapshot: &SnapshotResult) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Before hook built from a closure.
pub struct BeforeFn<F>(pub F);

#[async_trait]
impl<F> InterceptHook for BeforeFn<F>
where
    F: Fn(&str) -> anyhow::Result<Option<SnapshotResult>> + Send + Sync,
{
    async fn before(&self, url: &str) -> anyhow::Result<Option<SnapshotResult>> {
        (self.0)(url)
    }
}

/// After hook built from a closure.
pub struct AfterFn<F>(pub F);

#[async_trait]
impl<F> InterceptHook for AfterFn<F>
where
    F: Fn(&str, &SnapshotResult) -> anyhow::Result<()> + Send + Sync,
{
    async fn after(&self, url: &str, snapshot: &SnapshotResult) -> anyhow::Result<()> {
        (self.0)(url, snapshot)
    }
}

/// Detects robots and fetches their snapshots.
pub struct Interceptor {
    detector: RobotDetector,
    fetcher: Arc<dyn SnapshotFetcher>,
    hooks: Vec<Arc<dyn InterceptHook>>,
}

impl Interceptor {
    pub fn new(detector: RobotDetector, fetcher: Arc<dyn SnapshotFetcher>) -> Self {
        Self {
            detector,
            fetcher,
            hooks: Vec::new(),
        }
    }

    /// Register a hook. Hooks run in registration order.
    pub fn with_hook(mut self, hook: Arc<dyn InterceptHook>) -> Self {
        self.hooks.push(hook);
        self
    }

    /// Register a closure run before the fetch.
    pub fn before_intercept<F>(self, f: F) -> Self
    where
        F: Fn(&str) -> anyhow::Result<Option<SnapshotResult>> + Send + Sync + 'static,
    {
        self.with_hook(Arc::new(BeforeFn(f)))
    }

    /// Register a closure run after the snapshot is available.
    pub fn after_intercept<F>(self, f: F) -> Self
    where
        F: Fn(&str, &SnapshotResult) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.with_hook(Arc::new(AfterFn(f)))
    }

    pub fn detector(&self) -> &RobotDetector {
        &self.detector
    }

    /// Snapshot for a robot request, or `None` for a normal request.
    pub async fn intercept(&self, request: &InboundRequest) -> Result<Option<SnapshotResult>> {
        if !self.detector.detect(request)? {
            return Ok(None);
        }

        let url = self.detector.encoded_url(request);
        info!(url = %url, user_agent = %request.user_agent(), "Intercepting robot request");

        let mut snapshot = None;
        for hook in &self.hooks {
            if let Some(cached) = hook.before(&url).await.map_err(PrerenderError::Hook)? {
                debug!(url = %url, "Before hook supplied snapshot, skipping fetch");
                snapshot = Some(cached);
                break;
            }
        }

        let snapshot = match snapshot {
            Some(snapshot) => snapshot,
            None => self.fetcher.fetch(&url).await?,
        };

        for hook in &self.hooks {
            hook.after(&url, &snapshot)
                .await
                .map_err(PrerenderError::Hook)?;
        }

        Ok(Some(snapshot))
    }
}
