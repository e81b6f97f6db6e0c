//! File extension table and extension sniffing.
//!
//! Requests for static assets (images, audio, archives) are never worth a
//! snapshot. When extension checking is on, a path whose last segment carries
//! an extension outside this table is skipped.

use crate::error::{PrerenderError, Result};
use dashmap::DashMap;
use regex::Regex;
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::LazyLock;

/// Built-in extension table.
const DEFAULT_EXTENSIONS_JSON: &str = include_str!("../../data/extensions.json");

/// Last `{filename}.{extension}` of the path part, stopping at the first `?` or `#`.
static EXTENSION_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^?#]*/[^/?#]+?\.([^./?#]+)(?:[?#]|$)")
        .expect("valid regex: extension pattern")
});

/// Live table of valid extensions, grouped by category.
#[derive(Debug, Default)]
pub struct ExtensionTable {
    categories: DashMap<String, Vec<String>>,
}

impl ExtensionTable {
    /// Create a table from a category map. Extensions are lower-cased.
    pub fn new(categories: BTreeMap<String, Vec<String>>) -> Self {
        let table = Self::default();
        for (category, extensions) in categories {
            for ext in extensions {
                table.add(&category, &ext);
            }
            table.categories.entry(category).or_default();
        }
        table
    }

    /// Load the built-in table.
    pub fn with_defaults() -> Result<Self> {
        Self::from_json(DEFAULT_EXTENSIONS_JSON, Path::new("data/extensions.json"))
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
        let categories: BTreeMap<String, Vec<String>> =
            serde_json::from_str(content).map_err(|e| PrerenderError::Config {
                path: origin.to_path_buf(),
                source: e.into(),
            })?;
        Ok(Self::new(categories))
    }

    /// Add an extension to a category, creating the category if needed.
    pub fn add(&self, category: &str, extension: &str) {
        let ext = normalize(extension);
        let mut entry = self.categories.entry(category.to_string()).or_default();
        if !ext.is_empty() && !entry.contains(&ext) {
            entry.push(ext);
        }
    }

    /// Remove an extension from a category. Returns whether it was present.
    pub fn remove(&self, category: &str, extension: &str) -> bool {
        let ext = normalize(extension);
        match self.categories.get_mut(category) {
            Some(mut list) => {
                let before = list.len();
                list.retain(|e| *e != ext);
                list.len() != before
            }
            None => false,
        }
    }

    /// Category names, sorted.
    pub fn categories(&self) -> Vec<String> {
        let mut names: Vec<String> = self.categories.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    /// Extensions in one category.
    pub fn extensions(&self, category: &str) -> Option<Vec<String>> {
        self.categories.get(category).map(|list| list.value().clone())
    }

    /// Union of all categories.
    pub fn all(&self) -> HashSet<String> {
        self.categories
            .iter()
            .flat_map(|entry| entry.value().clone())
            .collect()
    }

    /// Whether the extension is valid in any category (case-insensitive).
    pub fn contains(&self, extension: &str) -> bool {
        let ext = normalize(extension);
        self.categories.iter().any(|entry| entry.value().contains(&ext))
    }
}

fn normalize(extension: &str) -> String {
    extension.trim_start_matches('.').to_lowercase()
}

/// Extract the extension of the last path segment, ignoring query and fragment text.
pub fn extract_extension(path: &str) -> Option<&str> {
    EXTENSION_PATTERN
        .captures(path)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}
