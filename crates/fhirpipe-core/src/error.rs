use std::path::PathBuf;

use thiserror::Error;

use crate::resource::{CountSource, ResourceType};

/// Errors raised while turning a response body or tool output into a count.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("response is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("field `{field}` is missing from the response")]
    MissingField { field: &'static str },

    #[error("field `{field}` is not a non-negative integer: {value}")]
    NotACount { field: String, value: String },

    #[error("tool produced no output")]
    EmptyOutput,

    #[error("column {column} is missing from line `{line}`")]
    MissingColumn { line: String, column: usize },
}

/// Core error types for a validation run
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid arguments: {0}")]
    Argument(String),

    #[error("request to {url} failed: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned HTTP {status}: {message}")]
    HttpStatus {
        url: String,
        status: u16,
        message: String,
    },

    #[error("could not parse {context}: {source}")]
    Parse {
        context: String,
        #[source]
        source: ParseError,
    },

    #[error("`{program}` failed: {reason}")]
    ToolInvocation { program: String, reason: String },

    #[error("sink not ready after {attempts} attempts (last observed count: {})", describe_count(.last_count))]
    Timeout {
        attempts: u32,
        last_count: Option<u64>,
    },

    #[error("wait cancelled")]
    Cancelled,

    #[error("{source_kind} counts are missing {missing:?}")]
    IncompleteCounts {
        source_kind: CountSource,
        missing: Vec<ResourceType>,
    },

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Coarse classification used for exit codes and log fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Argument,
    Network,
    Parse,
    Tool,
    Timeout,
    Cancelled,
    Internal,
}

impl Error {
    pub fn argument(message: impl Into<String>) -> Self {
        Self::Argument(message.into())
    }

    pub fn parse(context: impl Into<String>, source: ParseError) -> Self {
        Self::Parse {
            context: context.into(),
            source,
        }
    }

    pub fn tool(program: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ToolInvocation {
            program: program.into(),
            reason: reason.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Argument(_) => ErrorKind::Argument,
            Self::Network { .. } | Self::HttpStatus { .. } => ErrorKind::Network,
            Self::Parse { .. } => ErrorKind::Parse,
            Self::ToolInvocation { .. } => ErrorKind::Tool,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::IncompleteCounts { .. } | Self::Io { .. } => ErrorKind::Internal,
        }
    }

    /// Errors a readiness poll may see while the sink is still coming up.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network { .. } => true,
            Self::HttpStatus { status, .. } => *status == 404 || *status >= 500,
            _ => false,
        }
    }
}

fn describe_count(count: &Option<u64>) -> String {
    count.map_or_else(|| "none".to_string(), |c| c.to_string())
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_message_distinguishes_missing_count() {
        let never = Error::Timeout {
            attempts: 3,
            last_count: None,
        };
        assert!(never.to_string().contains("last observed count: none"));

        let zero = Error::Timeout {
            attempts: 3,
            last_count: Some(0),
        };
        assert!(zero.to_string().contains("last observed count: 0"));
    }

    #[test]
    fn http_status_transience() {
        let not_found = Error::HttpStatus {
            url: "http://sink/fhir/Patient".into(),
            status: 404,
            message: String::new(),
        };
        let bad_request = Error::HttpStatus {
            url: "http://sink/fhir/Patient".into(),
            status: 400,
            message: String::new(),
        };
        assert!(not_found.is_transient());
        assert!(!bad_request.is_transient());
        assert_eq!(bad_request.kind(), ErrorKind::Network);
    }

    #[test]
    fn parse_errors_are_not_transient() {
        let err = Error::parse("Patient total", ParseError::MissingField { field: "total" });
        assert_eq!(err.kind(), ErrorKind::Parse);
        assert!(!err.is_transient());
    }
}
