use super::Context;
use crate::commands::SlackCommands;
use crate::config::Service;
use crate::integrations::SlackClient;
use crate::output::format_list;
use crate::workflow::{Report, SlackWorkflow};
use crate::Result;

pub(super) async fn run(cmd: SlackCommands, ctx: &Context, report: &mut Report) -> Result<()> {
    let slack = SlackClient::connect(&ctx.credentials(Service::Slack)?, ctx.transport())?;
    let mut workflow = SlackWorkflow::new(&slack);

    match cmd {
        SlackCommands::Send {
            channel,
            message,
            thread_ts,
            blocks,
        } => {
            workflow
                .send_message(
                    &channel,
                    &message,
                    thread_ts.as_deref(),
                    blocks.as_deref(),
                    report,
                )
                .await?;
        }

        SlackCommands::Dm { user, message } => {
            workflow.send_dm(&user, &message, report).await?;
        }

        SlackCommands::Channels { limit, format } => {
            let channels = slack.channels(limit, true).await?;
            report.emit(format_list(&channels, format)?);
        }

        SlackCommands::History {
            channel,
            limit,
            format,
        } => {
            let messages = workflow.history(&channel, limit).await?;
            report.emit(format_list(&messages, format)?);
        }

        SlackCommands::Search {
            query,
            in_channel,
            limit,
            format,
        } => {
            let messages = slack.search(&query, in_channel.as_deref(), limit).await?;
            report.emit(format_list(&messages, format)?);
        }
    }

    Ok(())
}
