//! Prerender Agent for Zentinel
//!
//! Detects search engine crawlers and answers them with a pre-rendered HTML
//! snapshot of the page, fetched from a remote rendering service.
//!
//! # Features
//!
//! - Ordered robot detection pipeline (method, signatures, route lists, extensions)
//! - `_escaped_fragment_` reversal back to the canonical `#!` URL
//! - Live signature and extension tables that can be patched at runtime
//! - Before/after hooks around the snapshot fetch, with an in-memory cache hook
//! - Middleware adapter that falls through to normal handling on any error
//!
//! # Example
//!
//! ```ignore
//! use zentinel_agent_prerender::{InboundRequest, Outcome, PrerenderConfig, PrerenderMiddleware};
//!
//! let middleware = PrerenderMiddleware::from_config(&PrerenderConfig::default())?;
//! let request = InboundRequest::get("/app?_escaped_fragment_=/about")
//!     .with_host("example.com")
//!     .with_user_agent("Googlebot/2.1");
//!
//! match middleware.handle(&request).await {
//!     Outcome::Respond(snapshot) => { /* send snapshot */ }
//!     Outcome::Continue => { /* normal handling */ }
//! }
//! ```

pub mod cache;
pub mod client;
pub mod config;
pub mod detectors;
pub mod error;
pub mod interceptor;
pub mod middleware;
pub mod request;
pub mod snapshot;

pub use client::{SnapshotClient, SnapshotFetcher};
pub use config::PrerenderConfig;
pub use detectors::{Detection, Filter, RobotDetector};
pub use error::PrerenderError;
pub use interceptor::{InterceptHook, Interceptor};
pub use middleware::{Outcome, PrerenderMiddleware};
pub use request::InboundRequest;
pub use snapshot::{SnapshotHeader, SnapshotResult};
