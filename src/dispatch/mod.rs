//! Command dispatch
//!
//! Turns a parsed [`Commands`] into client and workflow calls. Handlers never
//! print: everything destined for stdout or stderr goes into the [`Report`],
//! and failures come back as typed errors for `main` to render.

mod check;
mod confluence;
mod gitlab;
mod jira;
mod slack;

use crate::client::Transport;
use crate::commands::Commands;
use crate::config::{CredentialStore, Credentials, Service};
use crate::workflow::Report;
use crate::Result;
use std::sync::Arc;
use tracing::debug;

/// Exit status of a command that ran to completion
pub const EXIT_OK: i32 = 0;

/// Everything a handler needs to reach a service
pub struct Context {
    store: CredentialStore,
    transport: Arc<dyn Transport>,
}

impl Context {
    pub fn new(store: CredentialStore, transport: Arc<dyn Transport>) -> Self {
        Self { store, transport }
    }

    pub fn store(&self) -> &CredentialStore {
        &self.store
    }

    pub fn transport(&self) -> Arc<dyn Transport> {
        self.transport.clone()
    }

    pub fn credentials(&self, service: Service) -> Result<Credentials> {
        self.store.resolve(service)
    }
}

/// Run one command, returning the exit status on success
///
/// Only `check` can complete with a non-zero status; every other failure is
/// an error.
pub async fn run(command: Commands, ctx: &Context, report: &mut Report) -> Result<i32> {
    debug!(command = ?command, "Dispatching command");

    match command {
        Commands::Jira(cmd) => jira::run(cmd, ctx, report).await.map(|_| EXIT_OK),
        Commands::Confluence(cmd) => confluence::run(cmd, ctx, report).await.map(|_| EXIT_OK),
        Commands::GitLab(cmd) => gitlab::run(cmd, ctx, report).await.map(|_| EXIT_OK),
        Commands::Slack(cmd) => slack::run(cmd, ctx, report).await.map(|_| EXIT_OK),
        Commands::Check => check::run(ctx, report).await,
    }
}
