//! Slack workflows: resolve a channel or user, then send

use super::Report;
use crate::integrations::slack::{MessageRecord, PostedMessage};
use crate::integrations::SlackClient;
use crate::resolve::{IdentifierKind, IdentifierResolver};
use crate::{Result, ToolsError};
use serde_json::Value;

/// Parse a Block Kit argument before anything is sent; blank means none
pub fn parse_blocks(blocks: Option<&str>) -> Result<Option<Value>> {
    blocks
        .filter(|raw| !raw.trim().is_empty())
        .map(|raw| {
            serde_json::from_str(raw)
                .map_err(|e| ToolsError::Validation(format!("Invalid --blocks JSON: {e}")))
        })
        .transpose()
}

pub struct SlackWorkflow<'a> {
    slack: &'a SlackClient,
    resolver: IdentifierResolver,
}

impl<'a> SlackWorkflow<'a> {
    pub fn new(slack: &'a SlackClient) -> Self {
        Self {
            slack,
            resolver: IdentifierResolver::new(),
        }
    }

    async fn channel_id(&mut self, channel: &str) -> Result<String> {
        let resolved = self
            .resolver
            .resolve(self.slack, IdentifierKind::SlackChannel, channel)
            .await?;
        Ok(resolved.canonical_id)
    }

    /// Post to a channel given by name or ID, optionally in a thread
    pub async fn send_message(
        &mut self,
        channel: &str,
        text: &str,
        thread_ts: Option<&str>,
        blocks: Option<&str>,
        report: &mut Report,
    ) -> Result<PostedMessage> {
        let blocks = parse_blocks(blocks)?;

        let channel_id = self.channel_id(channel).await?;
        report.completed("resolve_channel");

        let posted = self
            .slack
            .post_message(&channel_id, text, thread_ts, blocks.as_ref())
            .await?;
        report.completed("post_message");
        report.emit(format!("Message sent to {} (ts: {})", posted.channel, posted.ts));

        Ok(posted)
    }

    /// Open the DM channel with a user and post into it
    pub async fn send_dm(
        &mut self,
        user: &str,
        text: &str,
        report: &mut Report,
    ) -> Result<PostedMessage> {
        let user_id = self
            .resolver
            .resolve(self.slack, IdentifierKind::SlackUser, user)
            .await?
            .canonical_id;
        report.completed("resolve_user");

        let dm_channel = self.slack.open_dm(&user_id).await?;
        report.completed("open_dm");

        let posted = self
            .slack
            .post_message(&dm_channel, text, None, None)
            .await?;
        report.completed("post_message");
        report.emit(format!("DM sent (ts: {})", posted.ts));

        Ok(posted)
    }

    pub async fn history(&mut self, channel: &str, limit: u32) -> Result<Vec<MessageRecord>> {
        let channel_id = self.channel_id(channel).await?;
        self.slack.history(&channel_id, limit).await
    }
}
