//! Error types for enterprise-tools
//!
//! One enum covers every failure mode of the clients. Lower layers return these
//! values; only the top-level dispatcher decides how to print them and which
//! exit code to use.

use crate::config::Service;
use crate::resolve::IdentifierKind;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for enterprise-tools operations
pub type Result<T> = std::result::Result<T, ToolsError>;

/// Exit status for configuration and usage errors
pub const EXIT_CONFIG: i32 = 1;

/// Exit status for remote and business failures
pub const EXIT_REMOTE: i32 = 2;

/// Comprehensive error type for enterprise-tools operations
#[derive(Error, Debug)]
pub enum ToolsError {
    /// Required credential fields are missing after merging all sources
    #[error("{service} credentials not configured (missing: {})", .missing.join(", "))]
    MissingCredentials {
        service: Service,
        missing: Vec<String>,
        /// Credentials file the store consulted
        file: PathBuf,
    },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Remote call returned a status outside the expected set
    #[error("{status} - {body}")]
    Remote { status: u16, body: String },

    /// Remote call succeeded at the HTTP level but the platform rejected it
    #[error("{0}")]
    Rejected(String),

    /// Network failures (connect errors, timeouts)
    #[error("Network error: {0}")]
    Network(String),

    /// HTTP client errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Identifier lookup returned no match
    #[error("{kind} '{input}' not found")]
    NotFound { kind: IdentifierKind, input: String },

    /// Requested workflow transition is not available for the issue
    #[error("Transition '{requested}' not found. Available: {}", .available.join(", "))]
    UnknownTransition {
        requested: String,
        available: Vec<String>,
    },

    /// No transition matched the reopen alias table
    #[error("No reopen transition found. Available: {}", .available.join(", "))]
    NoReopenTransition { available: Vec<String> },

    /// Incoherent flag combination or malformed argument
    #[error("{0}")]
    Validation(String),
}

impl ToolsError {
    /// Process exit status for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            ToolsError::MissingCredentials { .. } | ToolsError::Config(_) | ToolsError::Io(_) => {
                EXIT_CONFIG
            }
            _ => EXIT_REMOTE,
        }
    }

    /// Follow-up guidance printed after the diagnostic line, if any
    pub fn remediation(&self) -> Option<String> {
        match self {
            ToolsError::MissingCredentials { missing, file, .. } => Some(format!(
                "Set {} in the environment or in {}, then run `etools check`",
                missing.join(", "),
                file.display()
            )),
            _ => None,
        }
    }

    /// Whether this error is a failed identifier lookup
    pub fn is_not_found(&self) -> bool {
        matches!(self, ToolsError::NotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        let missing = ToolsError::MissingCredentials {
            service: Service::Jira,
            missing: vec!["JIRA_EMAIL".to_string()],
            file: PathBuf::from("credentials.env"),
        };
        assert_eq!(missing.exit_code(), EXIT_CONFIG);
        assert_eq!(ToolsError::Config("bad".into()).exit_code(), EXIT_CONFIG);

        let remote = ToolsError::Remote {
            status: 404,
            body: "nope".into(),
        };
        assert_eq!(remote.exit_code(), EXIT_REMOTE);
        assert_eq!(ToolsError::Validation("x".into()).exit_code(), EXIT_REMOTE);
        assert_eq!(
            ToolsError::NotFound {
                kind: IdentifierKind::SlackUser,
                input: "bob".into()
            }
            .exit_code(),
            EXIT_REMOTE
        );
    }

    #[test]
    fn test_messages() {
        let err = ToolsError::UnknownTransition {
            requested: "Shipped".into(),
            available: vec!["To Do".into(), "In Progress".into(), "Done".into()],
        };
        assert_eq!(
            err.to_string(),
            "Transition 'Shipped' not found. Available: To Do, In Progress, Done"
        );

        let err = ToolsError::Remote {
            status: 409,
            body: "stale version".into(),
        };
        assert_eq!(err.to_string(), "409 - stale version");

        let err = ToolsError::MissingCredentials {
            service: Service::Confluence,
            missing: vec!["CONFLUENCE_EMAIL".into(), "CONFLUENCE_API_TOKEN".into()],
            file: PathBuf::from("/etc/etools/team.env"),
        };
        assert_eq!(
            err.to_string(),
            "Confluence credentials not configured (missing: CONFLUENCE_EMAIL, CONFLUENCE_API_TOKEN)"
        );
        let hint = err.remediation().unwrap();
        assert!(hint.contains("CONFLUENCE_API_TOKEN"));
        assert!(hint.contains("/etc/etools/team.env"));
    }
}
