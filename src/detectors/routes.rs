//! Route whitelist and blacklist.

use crate::error::{PrerenderError, Result};
use regex::{Regex, RegexBuilder};

/// Why a route was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteRejection {
    /// A whitelist is configured and the path matched none of it
    NotWhitelisted,
    /// The path matched a blacklisted pattern
    Blacklisted(String),
}

/// Compiled route filters. Patterns are case-insensitive and searched, not anchored.
#[derive(Debug, Clone, Default)]
pub struct RouteFilter {
    matched: Vec<Regex>,
    ignored: Vec<Regex>,
}

impl RouteFilter {
    /// Compile whitelist (`matched_routes`) and blacklist (`ignored_routes`) patterns.
    pub fn new(ignored_routes: &[String], matched_routes: &[String]) -> Result<Self> {
        Ok(Self {
            matched: compile(matched_routes)?,
            ignored: compile(ignored_routes)?,
        })
    }

    /// Check the whitelist, then the blacklist.
    pub fn check(&self, path: &str) -> std::result::Result<(), RouteRejection> {
        if !self.matched.is_empty() && !self.matched.iter().any(|re| re.is_match(path)) {
            return Err(RouteRejection::NotWhitelisted);
        }

        if let Some(re) = self.ignored.iter().find(|re| re.is_match(path)) {
            return Err(RouteRejection::Blacklisted(re.as_str().to_string()));
        }

        Ok(())
    }
}

fn compile(patterns: &[String]) -> Result<Vec<Regex>> {
    patterns
        .iter()
        .map(|pattern| {
            RegexBuilder::new(pattern)
                .case_insensitive(true)
                .build()
                .map_err(|source| PrerenderError::InvalidRoutePattern {
                    pattern: pattern.clone(),
                    source,
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn routes(patterns: &[&str]) -> Vec<String> {
        patterns.iter().map(|p| p.to_string()).collect()
    }

    #[test]
    fn test_empty_filter_allows_everything() {
        let filter = RouteFilter::default();
        assert!(filter.check("/anything").is_ok());
    }

    #[test]
    fn test_whitelist() {
        let filter = RouteFilter::new(&[], &routes(&["^/getReqObj"])).unwrap();
        assert!(filter.check("/getReqObj").is_ok());
        assert!(filter.check("/GETREQOBJ/x").is_ok());
        assert_eq!(
            filter.check("/other"),
            Err(RouteRejection::NotWhitelisted)
        );
    }

    #[test]
    fn test_blacklist_is_search_not_full_match() {
        let filter = RouteFilter::new(&routes(&["admin"]), &[]).unwrap();
        assert_eq!(
            filter.check("/site/Admin/users"),
            Err(RouteRejection::Blacklisted("admin".to_string()))
        );
        assert!(filter.check("/site/users").is_ok());
    }

    #[test]
    fn test_whitelist_checked_before_blacklist() {
        let filter = RouteFilter::new(&routes(&["^/a"]), &routes(&["^/b"])).unwrap();
        assert_eq!(filter.check("/a"), Err(RouteRejection::NotWhitelisted));
        assert!(filter.check("/b").is_ok());
    }

    #[test]
    fn test_invalid_pattern() {
        let err = RouteFilter::new(&routes(&["(unclosed"]), &[]).unwrap_err();
        assert!(matches!(err, PrerenderError::InvalidRoutePattern { .. }));
    }
}
