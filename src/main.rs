//! Prerender Agent for Zentinel
//!
//! Classifies a single request the way the agent would and, optionally,
//! fetches its snapshot.

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::json;
use std::path::PathBuf;
use tracing::{info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use url::Url;
use zentinel_agent_prerender::{
    InboundRequest, Outcome, PrerenderConfig, PrerenderMiddleware, RobotDetector,
};

#[derive(Parser, Debug)]
#[command(name = "zentinel-agent-prerender")]
#[command(author, version, about = "Search engine crawler detection and snapshot agent for Zentinel")]
struct Args {
    /// Absolute URL of the request to classify
    url: String,

    /// HTTP method of the request
    #[arg(short = 'X', long, default_value = "GET")]
    method: String,

    /// User-Agent of the request
    #[arg(short = 'A', long, default_value = "")]
    user_agent: String,

    /// Extra request header, as `Name: value` (repeatable)
    #[arg(short = 'H', long = "header")]
    headers: Vec<String>,

    /// Path to configuration file (JSON or YAML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Path to robot signature database
    #[arg(long, env = "PRERENDER_ROBOTS_JSON")]
    robots_json: Option<PathBuf>,

    /// Path to extension table
    #[arg(long, env = "PRERENDER_EXTENSIONS_JSON")]
    extensions_json: Option<PathBuf>,

    /// Fetch the snapshot when the request is intercepted
    #[arg(long)]
    fetch: bool,

    /// Enable JSON logging format
    #[arg(long)]
    json_logs: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn init_logging(json: bool, level: &str) {
    let level = match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let env_filter = EnvFilter::from_default_env()
        .add_directive(level.into());

    if json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn load_config(args: &Args) -> Result<PrerenderConfig> {
    let mut config = if let Some(config_path) = &args.config {
        let content = std::fs::read_to_string(config_path)
            .with_context(|| format!("reading {}", config_path.display()))?;
        if config_path.extension().is_some_and(|e| e == "yaml" || e == "yml") {
            serde_yaml::from_str(&content)?
        } else {
            serde_json::from_str(&content)?
        }
    } else {
        PrerenderConfig::default()
    };

    if args.robots_json.is_some() {
        config.detection.robots_json = args.robots_json.clone();
    }
    if args.extensions_json.is_some() {
        config.detection.extensions_json = args.extensions_json.clone();
    }

    Ok(config)
}

/// Build the inbound request from an absolute URL and CLI headers.
fn build_request(args: &Args) -> Result<InboundRequest> {
    let url = Url::parse(&args.url).with_context(|| format!("invalid URL `{}`", args.url))?;

    let mut target = url.path().to_string();
    if let Some(query) = url.query() {
        target.push('?');
        target.push_str(query);
    }

    let mut request = InboundRequest::new(args.method.to_uppercase(), target)
        .with_encrypted(url.scheme() == "https");

    if let Some(host) = url.host_str() {
        let host = match url.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        };
        request = request.with_host(host);
    }
    if !args.user_agent.is_empty() {
        request = request.with_user_agent(args.user_agent.clone());
    }
    for header in &args.headers {
        let (name, value) = header
            .split_once(':')
            .with_context(|| format!("header `{header}` is not `Name: value`"))?;
        request = request.with_header(name.trim(), value.trim());
    }

    Ok(request)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    init_logging(args.json_logs, &args.log_level);

    let config = load_config(&args)?;
    let request = build_request(&args)?;

    let detector = RobotDetector::from_config(&config.detection)?;
    let detection = detector.evaluate(&request)?;

    let mut report = json!({
        "intercept": detection.intercept,
        "filter": detection.filter.as_str(),
        "reason": detection.reason,
        "decoded_path": detector.decoded_path(&request).ok(),
        "encoded_url": detector.encoded_url(&request),
    });

    if args.fetch && detection.intercept {
        info!(url = %detector.encoded_url(&request), "Fetching snapshot");
        let middleware = PrerenderMiddleware::from_config(&config)?
            .with_error_callback(|err, _| {
                warn!(error = %err, detail = %err.error_string(), "Snapshot fetch failed");
            });

        if let Outcome::Respond(response) = middleware.handle(&request).await {
            report["snapshot"] = json!({
                "status": response.status,
                "headers": response.headers,
                "body": response.body,
            });
        }
    }

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
