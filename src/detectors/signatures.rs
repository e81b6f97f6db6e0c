//! Robot signature table.
//!
//! Two lists of literal User-Agent substrings:
//! - `ignore`: crawlers that must never be intercepted (checked first)
//! - `match`: crawlers that should receive a snapshot

use crate::error::{PrerenderError, Result};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Built-in signature database.
const DEFAULT_ROBOTS_JSON: &str = include_str!("../../data/robots.json");

/// On-disk shape of the signature database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureLists {
    /// Signatures that are never intercepted
    pub ignore: Vec<String>,
    /// Signatures that are intercepted
    #[serde(rename = "match")]
    pub matches: Vec<String>,
}

/// Live, concurrently readable signature table.
#[derive(Debug)]
pub struct RobotSignatures {
    lists: RwLock<SignatureLists>,
}

impl RobotSignatures {
    /// Create a table from explicit lists.
    pub fn new(lists: SignatureLists) -> Self {
        Self {
            lists: RwLock::new(lists),
        }
    }

    /// Load the built-in table.
    pub fn with_defaults() -> Result<Self> {
        Self::from_json(DEFAULT_ROBOTS_JSON, Path::new("data/robots.json"))
    }

    /// Load a table from a JSON file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| PrerenderError::Config {
            path: path.to_path_buf(),
            source: e.into(),
        })?;
        Self::from_json(&content, path)
    }

    /// Load from the override path when given, else the built-in table.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_path(path),
            None => Self::with_defaults(),
        }
    }

    fn from_json(content: &str, origin: &Path) -> Result<Self> {
        let lists: SignatureLists =
            serde_json::from_str(content).map_err(|e| PrerenderError::Config {
                path: origin.to_path_buf(),
                source: e.into(),
            })?;
        debug!(
            ignore = lists.ignore.len(),
            matches = lists.matches.len(),
            "Loaded robot signatures"
        );
        Ok(Self::new(lists))
    }

    /// Snapshot of the ignore list.
    pub fn ignore(&self) -> Vec<String> {
        self.lists.read().ignore.clone()
    }

    /// Snapshot of the match list.
    pub fn matches(&self) -> Vec<String> {
        self.lists.read().matches.clone()
    }

    /// Snapshot of both lists.
    pub fn lists(&self) -> SignatureLists {
        self.lists.read().clone()
    }

    pub fn add_ignore(&self, signature: impl Into<String>) {
        self.lists.write().ignore.push(signature.into());
    }

    pub fn add_match(&self, signature: impl Into<String>) {
        self.lists.write().matches.push(signature.into());
    }

    /// Remove every ignore entry equal to `signature`. Returns whether any was removed.
    pub fn remove_ignore(&self, signature: &str) -> bool {
        remove_from(&mut self.lists.write().ignore, signature)
    }

    /// Remove every match entry equal to `signature`. Returns whether any was removed.
    pub fn remove_match(&self, signature: &str) -> bool {
        remove_from(&mut self.lists.write().matches, signature)
    }

    /// Find the first ignore signature contained in the User-Agent.
    pub fn find_ignored(&self, user_agent: &str) -> Option<String> {
        find_in(&self.lists.read().ignore, user_agent)
    }

    /// Find the first match signature contained in the User-Agent.
    pub fn find_matched(&self, user_agent: &str) -> Option<String> {
        find_in(&self.lists.read().matches, user_agent)
    }
}

fn remove_from(list: &mut Vec<String>, signature: &str) -> bool {
    let before = list.len();
    list.retain(|s| s != signature);
    list.len() != before
}

/// Case-insensitive literal substring search. Empty signatures never match.
fn find_in(signatures: &[String], user_agent: &str) -> Option<String> {
    let ua_lower = user_agent.to_lowercase();
    signatures
        .iter()
        .filter(|s| !s.is_empty())
        .find(|s| ua_lower.contains(&s.to_lowercase()))
        .cloned()
}
