//! `etools check`: one identity call per configured service

use super::{Context, EXIT_OK};
use crate::config::Service;
use crate::error::EXIT_CONFIG;
use crate::integrations::{ConfluenceClient, GitLabClient, JiraClient, SlackClient};
use crate::workflow::Report;
use crate::{Result, ToolsError};
use tracing::{debug, warn};

async fn ping(ctx: &Context, service: Service) -> Result<()> {
    let credentials = ctx.credentials(service)?;
    let transport = ctx.transport();

    match service {
        Service::Jira => {
            JiraClient::connect(&credentials, transport)?.myself().await?;
        }
        Service::Confluence => {
            ConfluenceClient::connect(&credentials, transport)?
                .current_user()
                .await?;
        }
        Service::GitLab => {
            GitLabClient::connect(&credentials, transport)?
                .current_user()
                .await?;
        }
        Service::Slack => {
            SlackClient::connect(&credentials, transport)?
                .auth_test()
                .await?;
        }
    }
    Ok(())
}

pub(super) async fn run(ctx: &Context, report: &mut Report) -> Result<i32> {
    report.emit("Enterprise Tools - Connection Test");
    report.emit("=".repeat(40));

    let mut configured = 0;
    let mut connected = 0;

    for service in Service::ALL {
        if !ctx.store().is_configured(service) {
            debug!(service = %service, "Skipping unconfigured service");
            report.emit(format!("{service}: Not configured"));
            continue;
        }
        configured += 1;

        match ping(ctx, service).await {
            Ok(()) => {
                connected += 1;
                report.emit(format!("{service}: OK"));
            }
            Err(ToolsError::Remote { status, .. }) => {
                warn!(service = %service, status, "Connection check failed");
                report.emit(format!("{service}: HTTP {status}"));
            }
            Err(e) => {
                warn!(service = %service, error = %e, "Connection check failed");
                report.emit(format!("{service}: {e}"));
            }
        }
    }

    report.emit("");
    if configured == 0 {
        report.emit(format!(
            "No services configured. Add credentials to {}",
            ctx.store().credentials_file().display()
        ));
        return Ok(EXIT_CONFIG);
    }

    report.emit(format!("Result: {connected}/{configured} services connected"));
    Ok(if connected == configured {
        EXIT_OK
    } else {
        EXIT_CONFIG
    })
}
