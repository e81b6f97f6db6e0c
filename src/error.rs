//! Error types for the prerender agent.
//!
//! Configuration problems are fatal at startup. Everything raised while
//! handling a request is recoverable: the middleware reports it and lets the
//! request continue as if it came from a normal browser.

use serde_json::Value;
use std::path::PathBuf;
use thiserror::Error;

/// Errors produced by detection, snapshot fetching and hooks.
#[derive(Debug, Error)]
pub enum PrerenderError {
    /// A signature or extension file could not be read or parsed.
    #[error("failed to load {}: {source}", .path.display())]
    Config {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    /// A route pattern in the configuration is not a valid regex.
    #[error("invalid route pattern `{pattern}`: {source}")]
    InvalidRoutePattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// The raw request target contains malformed percent-encoding.
    #[error("could not decode request target: {0}")]
    Decode(String),

    /// The snapshot service could not be reached.
    #[error("Could not establish a connection to the snapshot service.")]
    Connection { errors: Value },

    /// The snapshot service rejected the request parameters.
    #[error("Validation error from the snapshot service. Check your request parameters.")]
    Validation { errors: Value },

    /// The snapshot service failed internally.
    #[error("System error from the snapshot service. Check your request parameters for localhost URLs, otherwise this is a temporary problem from the API.")]
    System { errors: Value },

    /// The snapshot service answered with a code we do not know.
    #[error("Unknown API code `{code}` from the snapshot service.")]
    UnknownCode { code: String, errors: Value },

    /// A before or after hook failed.
    #[error("intercept hook failed: {0}")]
    Hook(#[source] anyhow::Error),
}

impl PrerenderError {
    /// Build a connection error from any transport failure.
    pub fn connection(err: impl std::fmt::Display) -> Self {
        Self::Connection {
            errors: Value::String(err.to_string()),
        }
    }

    /// Human readable message.
    pub fn message(&self) -> String {
        self.to_string()
    }

    /// Structured error detail, if the error carries any.
    pub fn errors(&self) -> Option<&Value> {
        match self {
            Self::Connection { errors }
            | Self::Validation { errors }
            | Self::System { errors }
            | Self::UnknownCode { errors, .. } => Some(errors),
            _ => None,
        }
    }

    /// Pretty-printed error detail.
    pub fn error_string(&self) -> String {
        match self.errors() {
            Some(errors) => serde_json::to_string_pretty(errors).unwrap_or_default(),
            None => String::new(),
        }
    }

    /// Append an entry to the error detail, turning it into a list if needed.
    pub fn append_error(&mut self, error: impl Into<Value>) {
        if let Some(list) = self.errors_list_mut() {
            list.push(error.into());
        }
    }

    /// Prepend an entry to the error detail, turning it into a list if needed.
    pub fn prepend_error(&mut self, error: impl Into<Value>) {
        if let Some(list) = self.errors_list_mut() {
            list.insert(0, error.into());
        }
    }

    fn errors_list_mut(&mut self) -> Option<&mut Vec<Value>> {
        let errors = match self {
            Self::Connection { errors }
            | Self::Validation { errors }
            | Self::System { errors }
            | Self::UnknownCode { errors, .. } => errors,
            _ => return None,
        };

        if !errors.is_array() {
            let previous = errors.take();
            *errors = match previous {
                Value::Null => Value::Array(vec![]),
                other => Value::Array(vec![other]),
            };
        }
        errors.as_array_mut()
    }

    /// Whether the request should simply continue without a snapshot.
    ///
    /// Only startup configuration errors are fatal.
    pub fn is_fallthrough(&self) -> bool {
        !matches!(self, Self::Config { .. } | Self::InvalidRoutePattern { .. })
    }
}

pub type Result<T> = std::result::Result<T, PrerenderError>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_messages() {
        let err = PrerenderError::connection("aahh this is an error!");
        assert_eq!(
            err.message(),
            "Could not establish a connection to the snapshot service."
        );
        assert_eq!(err.errors(), Some(&json!("aahh this is an error!")));

        let err = PrerenderError::Validation {
            errors: json!({"url": "required"}),
        };
        assert!(err.message().starts_with("Validation error"));
    }

    #[test]
    fn test_append_and_prepend() {
        let mut err = PrerenderError::System {
            errors: json!("first"),
        };
        err.append_error("last");
        err.prepend_error(json!({"code": 1}));
        assert_eq!(err.errors(), Some(&json!([{"code": 1}, "first", "last"])));
    }

    #[test]
    fn test_append_on_empty_detail() {
        let mut err = PrerenderError::Validation { errors: Value::Null };
        err.append_error("only");
        assert_eq!(err.errors(), Some(&json!(["only"])));
    }

    #[test]
    fn test_error_string() {
        let err = PrerenderError::Validation {
            errors: json!(["a"]),
        };
        assert_eq!(err.error_string(), "[\n  \"a\"\n]");
        assert_eq!(PrerenderError::Decode("x".into()).error_string(), "");
    }

    #[test]
    fn test_fallthrough() {
        assert!(PrerenderError::connection("down").is_fallthrough());
        assert!(PrerenderError::Hook(anyhow::anyhow!("boom")).is_fallthrough());
        assert!(!PrerenderError::Config {
            path: PathBuf::from("/nope"),
            source: anyhow::anyhow!("missing"),
        }
        .is_fallthrough());
    }
}
