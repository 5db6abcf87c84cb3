//! Enterprise Tools - command-line clients for Jira, Confluence, GitLab and Slack
//!
//! Each subcommand is a thin wrapper over one or a few REST calls, with output
//! kept compact so it can be read by people and scripts alike.
//!
//! # Architecture
//!
//! - **config**: Layered credential store (environment, credentials file, defaults)
//! - **client**: HTTP transport seam and the per-service request executor
//! - **resolve**: Human-friendly name to canonical ID resolution with a per-run cache
//! - **integrations**: Typed clients for each platform
//! - **workflow**: Multi-step operations that abort on the first failure
//! - **output**: Summary, JSON, ID, table and markdown renderers
//! - **dispatch**: Maps parsed commands onto clients and workflows

pub mod client;
pub mod commands;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod integrations;
pub mod logging;
pub mod output;
pub mod resolve;
pub mod workflow;

// Re-exports
pub use error::{Result, ToolsError};
