//! Slack Web API client
//!
//! Slack answers most calls with HTTP 200 and reports failures in the body as
//! `{"ok": false, "error": "..."}`; those become [`ToolsError::Rejected`].

use crate::client::{Auth, Call, ServiceClient, Transport, EXPECT_OK};
use crate::config::{Credentials, Service};
use crate::output::{prefix, Record};
use crate::resolve::{Directory, DirectoryEntry, IdentifierKind};
use crate::{Result, ToolsError};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info};

/// Public Web API root
pub const SLACK_API_URL: &str = "https://slack.com/api";

const CHANNEL_TYPES: &str = "public_channel,private_channel";
const DIRECTORY_LIMIT: u32 = 200;
const TOPIC_CHARS: usize = 50;
const MESSAGE_CHARS: usize = 100;
const SEARCH_TEXT_CHARS: usize = 200;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct Channel {
    id: String,
    name: String,
    topic: Topic,
    num_members: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct Topic {
    value: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct Member {
    id: String,
    name: String,
    profile: Profile,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct Profile {
    display_name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct Message {
    user: Option<String>,
    text: String,
    ts: String,
    channel: Option<ChannelRef>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct ChannelRef {
    name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChannelRecord {
    pub id: String,
    pub name: String,
    pub topic: String,
    pub members: u64,
}

impl From<Channel> for ChannelRecord {
    fn from(channel: Channel) -> Self {
        Self {
            id: channel.id,
            name: channel.name,
            topic: channel.topic.value,
            members: channel.num_members,
        }
    }
}

impl Record for ChannelRecord {
    fn key(&self) -> String {
        self.id.clone()
    }

    fn summary_line(&self) -> String {
        let mut line = format!("#{}", self.name);
        if !self.topic.is_empty() {
            line.push_str(&format!(" - {}", prefix(&self.topic, TOPIC_CHARS)));
        }
        line
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MessageRecord {
    pub user: String,
    pub text: String,
    pub ts: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub channel: String,
}

impl Record for MessageRecord {
    fn key(&self) -> String {
        self.ts.clone()
    }

    fn summary_line(&self) -> String {
        format!("@{}: {}", self.user, prefix(&self.text, MESSAGE_CHARS))
    }
}

/// Where a posted message landed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostedMessage {
    pub channel: String,
    pub ts: String,
}

fn check_ok(value: Value) -> Result<Value> {
    if value["ok"].as_bool() == Some(true) {
        return Ok(value);
    }
    let error = value["error"].as_str().unwrap_or("Unknown error");
    Err(ToolsError::Rejected(error.to_string()))
}

fn take_field<T: DeserializeOwned + Default>(value: &mut Value, key: &str) -> Result<T> {
    match value.get_mut(key).map(Value::take) {
        None | Some(Value::Null) => Ok(T::default()),
        Some(field) => Ok(serde_json::from_value(field)?),
    }
}

/// Slack Web API client
pub struct SlackClient {
    client: ServiceClient,
}

impl SlackClient {
    pub fn new(client: ServiceClient) -> Self {
        Self { client }
    }

    pub fn connect(credentials: &Credentials, transport: Arc<dyn Transport>) -> Result<Self> {
        Ok(Self::new(ServiceClient::new(
            Service::Slack,
            SLACK_API_URL,
            Auth::Bearer(credentials.secret().to_string()),
            transport,
        )))
    }

    async fn api(&self, call: Call) -> Result<Value> {
        let value = self.client.call(call.expect(EXPECT_OK)).await?;
        check_ok(value)
    }

    pub async fn auth_test(&self) -> Result<Value> {
        self.api(Call::get("/auth.test")).await
    }

    pub async fn channels(&self, limit: u32, exclude_archived: bool) -> Result<Vec<ChannelRecord>> {
        let mut value = self
            .api(
                Call::get("/conversations.list")
                    .query("types", CHANNEL_TYPES)
                    .query("limit", limit)
                    .query("exclude_archived", exclude_archived),
            )
            .await?;
        let channels: Vec<Channel> = take_field(&mut value, "channels")?;
        Ok(channels.into_iter().map(ChannelRecord::from).collect())
    }

    async fn members(&self, limit: u32) -> Result<Vec<Member>> {
        let mut value = self
            .api(Call::get("/users.list").query("limit", limit))
            .await?;
        take_field(&mut value, "members")
    }

    pub async fn post_message(
        &self,
        channel_id: &str,
        text: &str,
        thread_ts: Option<&str>,
        blocks: Option<&Value>,
    ) -> Result<PostedMessage> {
        let mut payload = json!({"channel": channel_id, "text": text});
        if let Some(ts) = thread_ts {
            payload["thread_ts"] = json!(ts);
        }
        if let Some(blocks) = blocks {
            payload["blocks"] = blocks.clone();
        }

        info!(channel = %channel_id, threaded = thread_ts.is_some(), "Posting Slack message");
        let value = self
            .api(Call::post("/chat.postMessage").json(payload))
            .await?;

        Ok(PostedMessage {
            channel: value["channel"].as_str().unwrap_or(channel_id).to_string(),
            ts: value["ts"].as_str().unwrap_or_default().to_string(),
        })
    }

    /// Open (or reuse) the direct-message channel with `user_id`
    pub async fn open_dm(&self, user_id: &str) -> Result<String> {
        let value = self
            .api(Call::post("/conversations.open").json(json!({"users": user_id})))
            .await?;

        if value["already_open"].as_bool() == Some(true) {
            debug!(user = %user_id, "DM channel already open");
        }

        value["channel"]["id"]
            .as_str()
            .map(String::from)
            .ok_or_else(|| ToolsError::Rejected("conversations.open returned no channel".into()))
    }

    pub async fn history(&self, channel_id: &str, limit: u32) -> Result<Vec<MessageRecord>> {
        let mut value = self
            .api(
                Call::get("/conversations.history")
                    .query("channel", channel_id)
                    .query("limit", limit),
            )
            .await?;
        let messages: Vec<Message> = take_field(&mut value, "messages")?;
        Ok(messages
            .into_iter()
            .map(|m| MessageRecord {
                user: m.user.unwrap_or_else(|| "bot".to_string()),
                text: m.text,
                ts: m.ts,
                channel: String::new(),
            })
            .collect())
    }

    /// Full-text search, optionally restricted to one channel by name
    pub async fn search(
        &self,
        query: &str,
        in_channel: Option<&str>,
        limit: u32,
    ) -> Result<Vec<MessageRecord>> {
        let query = match in_channel {
            Some(channel) => format!("in:#{} {}", channel.trim_start_matches('#'), query),
            None => query.to_string(),
        };

        let mut value = self
            .api(
                Call::get("/search.messages")
                    .query("query", &query)
                    .query("count", limit),
            )
            .await?;
        let mut messages = value["messages"].take();
        let matches: Vec<Message> = take_field(&mut messages, "matches")?;

        Ok(matches
            .into_iter()
            .map(|m| MessageRecord {
                user: m.user.unwrap_or_else(|| "unknown".to_string()),
                text: prefix(&m.text, SEARCH_TEXT_CHARS),
                ts: m.ts,
                channel: m.channel.map(|c| c.name).unwrap_or_default(),
            })
            .collect())
    }
}

#[async_trait]
impl Directory for SlackClient {
    async fn list(&self, kind: IdentifierKind, _query: &str) -> Result<Vec<DirectoryEntry>> {
        match kind {
            IdentifierKind::SlackUser => Ok(self
                .members(DIRECTORY_LIMIT)
                .await?
                .into_iter()
                .map(|m| DirectoryEntry::new(m.id, [m.name, m.profile.display_name]))
                .collect()),
            IdentifierKind::SlackChannel => Ok(self
                .channels(DIRECTORY_LIMIT, false)
                .await?
                .into_iter()
                .map(|c| DirectoryEntry::new(c.id, [c.name]))
                .collect()),
            IdentifierKind::JiraUser => Err(ToolsError::Config(format!(
                "Slack cannot look up {kind:?} identifiers"
            ))),
        }
    }
}
