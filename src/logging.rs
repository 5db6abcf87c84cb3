//! Logging configuration using tracing
//!
//! Log output goes to stderr so stdout carries only command results.

use crate::ToolsError;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default filter when `RUST_LOG` is unset
fn default_directive(verbose: bool) -> &'static str {
    if verbose {
        "debug"
    } else {
        "warn"
    }
}

/// Initialize the tracing subscriber
///
/// Sets up structured logging with:
/// - Filtering via RUST_LOG environment variable (defaults to "warn", or
///   "debug" with `--verbose`)
/// - Formatted output to stderr
///
/// # Example RUST_LOG values
/// - `RUST_LOG=info` - Show info and above
/// - `RUST_LOG=enterprise_tools::client=debug` - Every HTTP call
/// - `RUST_LOG=enterprise_tools=debug,reqwest=info` - Different levels per crate
///
/// # Errors
/// Returns an error if the subscriber has already been initialized
pub fn init(verbose: bool) -> crate::Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_line_number(verbose),
        )
        .try_init()
        .map_err(|e| ToolsError::Config(format!("Failed to initialize tracing: {e}")))?;

    Ok(())
}

/// Initialize logging for tests (no-op if already initialized)
pub fn init_test() {
    let _ = init(true);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directive() {
        assert_eq!(default_directive(false), "warn");
        assert_eq!(default_directive(true), "debug");
    }

    #[test]
    fn test_init_twice_fails() {
        init_test();
        assert!(init(false).is_err());
    }

    #[test]
    fn test_logging_macros() {
        init_test();

        tracing::debug!(service = "jira", path = "/rest/api/3/myself", "Sending request");
        tracing::warn!(status = 401, "Connection check failed");
    }
}
