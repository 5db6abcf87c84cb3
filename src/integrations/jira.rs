//! Jira Cloud REST client
//!
//! Thin typed wrapper over `/rest/api/3` and `/rest/agile/1.0`. Every method is
//! a single HTTP call (except [`JiraClient::sprints`] without a board, which
//! looks up the first board). Multi-step actions live in `workflow::jira`.

use super::atlassian_auth;
use crate::client::{Call, ServiceClient, Transport, EXPECT_NO_CONTENT, EXPECT_OK};
use crate::config::{Credentials, Service};
use crate::output::{prefix, truncate, Record};
use crate::resolve::{Directory, DirectoryEntry, IdentifierKind};
use crate::{Result, ToolsError};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info};

/// Configuration key overriding the start-date custom field
pub const START_DATE_FIELD_KEY: &str = "JIRA_START_DATE_FIELD";
pub const DEFAULT_START_DATE_FIELD: &str = "customfield_10015";

/// Fields requested by `search` unless overridden
pub const DEFAULT_SEARCH_FIELDS: &str = "key,summary,status,assignee";

const USER_SEARCH_LIMIT: u32 = 10;
const COMMENT_PREVIEW_CHARS: usize = 200;
const TABLE_SUMMARY_CHARS: usize = 50;

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct JiraIssue {
    pub id: String,
    pub key: String,
    pub fields: JiraFields,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct JiraFields {
    pub summary: String,
    pub description: Option<Value>,
    #[serde(rename = "issuetype")]
    pub issue_type: Option<Named>,
    pub status: Option<Named>,
    pub priority: Option<Named>,
    pub labels: Vec<String>,
    pub assignee: Option<JiraUser>,
    pub created: String,
    pub updated: String,
}

/// Any `{id, name}` object (status, priority, issue type)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Named {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct JiraUser {
    pub account_id: String,
    pub display_name: String,
    pub email_address: String,
    pub active: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct SearchResponse {
    issues: Vec<JiraIssue>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct TransitionsResponse {
    transitions: Vec<Transition>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct CommentsResponse {
    comments: Vec<JiraComment>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct JiraComment {
    id: String,
    author: JiraUser,
    body: Value,
    created: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct LinkTypesResponse {
    issue_link_types: Vec<LinkType>,
}

#[derive(Debug, Clone, Deserialize)]
struct Page<T> {
    #[serde(default)]
    values: Vec<T>,
}

/// Response of issue creation
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CreatedIssue {
    pub id: String,
    pub key: String,
}

/// Fields of a new issue
#[derive(Debug, Clone, Default)]
pub struct NewIssue {
    pub project: String,
    pub issue_type: String,
    pub summary: String,
    pub description: Option<String>,
    pub labels: Vec<String>,
    pub assignee_id: Option<String>,
}

impl NewIssue {
    fn payload(&self) -> Value {
        let mut fields = json!({
            "project": {"key": self.project},
            "issuetype": {"name": self.issue_type},
            "summary": self.summary,
        });

        if let Some(description) = self.description.as_deref().filter(|d| !d.is_empty()) {
            fields["description"] = adf_document(description);
        }
        if !self.labels.is_empty() {
            fields["labels"] = json!(self.labels);
        }
        if let Some(ref account_id) = self.assignee_id {
            fields["assignee"] = json!({"accountId": account_id});
        }

        json!({ "fields": fields })
    }
}

// ---------------------------------------------------------------------------
// Output records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct IssueRecord {
    pub key: String,
    pub summary: String,
    pub status: String,
    pub assignee: String,
}

impl From<JiraIssue> for IssueRecord {
    fn from(issue: JiraIssue) -> Self {
        let fields = issue.fields;
        Self {
            key: issue.key,
            summary: fields.summary,
            status: fields.status.map(|s| s.name).unwrap_or_default(),
            assignee: fields.assignee.map(|a| a.display_name).unwrap_or_default(),
        }
    }
}

impl Record for IssueRecord {
    fn key(&self) -> String {
        self.key.clone()
    }

    fn summary_line(&self) -> String {
        let mut line = format!("{}: {} [{}]", self.key, self.summary, self.status);
        if !self.assignee.is_empty() {
            line.push_str(&format!(" @{}", self.assignee));
        }
        line
    }

    fn table_header() -> Option<&'static str> {
        Some("KEY\tSTATUS\tASSIGNEE\tSUMMARY")
    }

    fn table_row(&self) -> String {
        let assignee = if self.assignee.is_empty() {
            "-"
        } else {
            self.assignee.as_str()
        };
        format!(
            "{}\t{}\t{}\t{}",
            self.key,
            self.status,
            assignee,
            prefix(&self.summary, TABLE_SUMMARY_CHARS)
        )
    }
}

/// Single issue with its descriptive fields
#[derive(Debug, Clone, Serialize)]
pub struct IssueDetail {
    pub key: String,
    pub summary: String,
    pub status: String,
    pub assignee: String,
    pub description: String,
    pub priority: String,
    #[serde(rename = "type")]
    pub issue_type: String,
    pub labels: Vec<String>,
    pub created: String,
    pub updated: String,
}

impl From<JiraIssue> for IssueDetail {
    fn from(issue: JiraIssue) -> Self {
        let fields = issue.fields;
        Self {
            key: issue.key,
            summary: fields.summary,
            status: fields.status.map(|s| s.name).unwrap_or_default(),
            assignee: fields.assignee.map(|a| a.display_name).unwrap_or_default(),
            description: fields
                .description
                .as_ref()
                .map(adf_to_text)
                .unwrap_or_default(),
            priority: fields.priority.map(|p| p.name).unwrap_or_default(),
            issue_type: fields.issue_type.map(|t| t.name).unwrap_or_default(),
            labels: fields.labels,
            created: fields.created,
            updated: fields.updated,
        }
    }
}

impl Record for IssueDetail {
    fn key(&self) -> String {
        self.key.clone()
    }

    fn summary_line(&self) -> String {
        format!("{}: {} [{}]", self.key, self.summary, self.status)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub account_id: String,
    pub display_name: String,
    pub email: String,
    pub active: bool,
}

impl From<JiraUser> for UserRecord {
    fn from(user: JiraUser) -> Self {
        Self {
            account_id: user.account_id,
            display_name: user.display_name,
            email: user.email_address,
            active: user.active,
        }
    }
}

impl Record for UserRecord {
    fn key(&self) -> String {
        self.account_id.clone()
    }

    fn summary_line(&self) -> String {
        let status = if self.active { "active" } else { "inactive" };
        format!(
            "{} ({}) [{}] - {}",
            self.display_name, self.email, status, self.account_id
        )
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectRecord {
    pub key: String,
    pub name: String,
    pub id: String,
}

impl Record for ProjectRecord {
    fn key(&self) -> String {
        self.key.clone()
    }

    fn summary_line(&self) -> String {
        format!("{}: {}", self.key, self.name)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Transition {
    pub id: String,
    pub name: String,
}

impl Record for Transition {
    fn key(&self) -> String {
        self.id.clone()
    }

    fn summary_line(&self) -> String {
        format!("{}: {}", self.id, self.name)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CommentRecord {
    pub id: String,
    pub author: String,
    pub created: String,
    pub body: String,
}

impl From<JiraComment> for CommentRecord {
    fn from(comment: JiraComment) -> Self {
        Self {
            id: comment.id,
            author: comment.author.display_name,
            created: comment.created,
            body: truncate(&adf_to_text(&comment.body), COMMENT_PREVIEW_CHARS),
        }
    }
}

impl Record for CommentRecord {
    fn key(&self) -> String {
        self.id.clone()
    }

    fn summary_line(&self) -> String {
        format!(
            "[{}] {}: {}",
            prefix(&self.created, 10),
            self.author,
            self.body
        )
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkType {
    pub name: String,
    pub inward: String,
    pub outward: String,
}

impl Record for LinkType {
    fn key(&self) -> String {
        self.name.clone()
    }

    fn summary_line(&self) -> String {
        format!("{}: {} / {}", self.name, self.outward, self.inward)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Board {
    pub id: u64,
    pub name: String,
    #[serde(rename = "type")]
    pub board_type: String,
}

impl Record for Board {
    fn key(&self) -> String {
        self.id.to_string()
    }

    fn summary_line(&self) -> String {
        format!("{}: {} ({})", self.id, self.name, self.board_type)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Sprint {
    pub id: u64,
    pub name: String,
    pub state: String,
    pub start_date: String,
    pub end_date: String,
}

impl Record for Sprint {
    fn key(&self) -> String {
        self.id.to_string()
    }

    fn summary_line(&self) -> String {
        let mut line = format!("{}: {} [{}]", self.id, self.name, self.state);
        if !self.start_date.is_empty() {
            line.push_str(&format!(
                " ({} ~ {})",
                prefix(&self.start_date, 10),
                prefix(&self.end_date, 10)
            ));
        }
        line
    }
}

// ---------------------------------------------------------------------------
// Atlassian Document Format
// ---------------------------------------------------------------------------

/// Wrap plain text into a single-paragraph ADF document
pub fn adf_document(text: &str) -> Value {
    json!({
        "type": "doc",
        "version": 1,
        "content": [{
            "type": "paragraph",
            "content": [{"type": "text", "text": text}]
        }]
    })
}

/// Extract the text of an ADF document, one line per top-level block
///
/// Plain strings (older payloads) pass through unchanged.
pub fn adf_to_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Object(_) => value["content"]
            .as_array()
            .map(|blocks| {
                blocks
                    .iter()
                    .map(|block| {
                        let mut text = String::new();
                        collect_text(block, &mut text);
                        text
                    })
                    .collect::<Vec<_>>()
                    .join("\n")
            })
            .unwrap_or_default(),
        _ => String::new(),
    }
}

fn collect_text(node: &Value, out: &mut String) {
    if node["type"] == "text" {
        if let Some(text) = node["text"].as_str() {
            out.push_str(text);
        }
    }
    if let Some(children) = node["content"].as_array() {
        for child in children {
            collect_text(child, out);
        }
    }
}

/// Parse a `YYYY-MM-DD` date argument
pub fn parse_date(input: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d").map_err(|_| {
        ToolsError::Validation(format!("Invalid date '{input}' (expected YYYY-MM-DD)"))
    })
}

/// Split a comma-separated list, dropping empty items
pub fn split_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(String::from)
        .collect()
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Jira REST client
pub struct JiraClient {
    client: ServiceClient,
    start_date_field: String,
}

impl JiraClient {
    pub fn new(client: ServiceClient) -> Self {
        Self {
            client,
            start_date_field: DEFAULT_START_DATE_FIELD.to_string(),
        }
    }

    /// Build a client from resolved credentials
    pub fn connect(credentials: &Credentials, transport: Arc<dyn Transport>) -> Result<Self> {
        Ok(Self::new(ServiceClient::new(
            Service::Jira,
            credentials.base_url()?,
            atlassian_auth(credentials)?,
            transport,
        )))
    }

    pub fn with_start_date_field(mut self, field: impl Into<String>) -> Self {
        self.start_date_field = field.into();
        self
    }

    /// Identity of the authenticated account
    pub async fn myself(&self) -> Result<JiraUser> {
        self.client.call_as(Call::get("/rest/api/3/myself")).await
    }

    pub async fn search(
        &self,
        jql: &str,
        fields: &[String],
        max_results: u32,
    ) -> Result<Vec<IssueRecord>> {
        debug!(jql = %jql, max_results, "Searching Jira issues");

        let response: SearchResponse = self
            .client
            .call_as(
                Call::post("/rest/api/3/search/jql")
                    .json(json!({
                        "jql": jql,
                        "fields": fields,
                        "maxResults": max_results,
                    }))
                    .expect(EXPECT_OK),
            )
            .await?;

        info!(returned = response.issues.len(), "Jira search complete");
        Ok(response.issues.into_iter().map(IssueRecord::from).collect())
    }

    pub async fn issue(&self, key: &str) -> Result<IssueDetail> {
        let issue: JiraIssue = self
            .client
            .call_as(Call::get(format!("/rest/api/3/issue/{key}")))
            .await?;
        Ok(issue.into())
    }

    pub async fn create_issue(&self, issue: &NewIssue) -> Result<CreatedIssue> {
        info!(project = %issue.project, "Creating Jira issue");
        self.client
            .call_as(Call::post("/rest/api/3/issue").json(issue.payload()))
            .await
    }

    pub async fn transitions(&self, key: &str) -> Result<Vec<Transition>> {
        let response: TransitionsResponse = self
            .client
            .call_as(Call::get(format!("/rest/api/3/issue/{key}/transitions")))
            .await?;
        Ok(response.transitions)
    }

    pub async fn do_transition(&self, key: &str, transition_id: &str) -> Result<()> {
        info!(key = %key, transition_id = %transition_id, "Transitioning Jira issue");
        self.client
            .call(
                Call::post(format!("/rest/api/3/issue/{key}/transitions"))
                    .json(json!({"transition": {"id": transition_id}}))
                    .expect(EXPECT_NO_CONTENT),
            )
            .await?;
        Ok(())
    }

    pub async fn add_comment(&self, key: &str, text: &str) -> Result<()> {
        info!(key = %key, "Adding comment to Jira issue");
        self.client
            .call(
                Call::post(format!("/rest/api/3/issue/{key}/comment"))
                    .json(json!({"body": adf_document(text)})),
            )
            .await?;
        Ok(())
    }

    pub async fn comments(&self, key: &str, max_results: u32) -> Result<Vec<CommentRecord>> {
        let response: CommentsResponse = self
            .client
            .call_as(
                Call::get(format!("/rest/api/3/issue/{key}/comment"))
                    .query("maxResults", max_results)
                    .query("orderBy", "-created"),
            )
            .await?;
        Ok(response
            .comments
            .into_iter()
            .map(CommentRecord::from)
            .collect())
    }

    pub async fn search_users(&self, query: &str, max_results: u32) -> Result<Vec<UserRecord>> {
        let users: Vec<JiraUser> = self
            .client
            .call_as(
                Call::get("/rest/api/3/user/search")
                    .query("query", query)
                    .query("maxResults", max_results),
            )
            .await?;
        Ok(users.into_iter().map(UserRecord::from).collect())
    }

    /// Set the assignee; `None` clears it
    pub async fn assign(&self, key: &str, account_id: Option<&str>) -> Result<()> {
        self.client
            .call(
                Call::put(format!("/rest/api/3/issue/{key}/assignee"))
                    .json(json!({"accountId": account_id})),
            )
            .await?;
        Ok(())
    }

    /// Make `epic` the parent of `key`
    pub async fn set_parent(&self, key: &str, epic: &str) -> Result<()> {
        self.update_fields(key, json!({"parent": {"key": epic}}))
            .await
    }

    pub async fn update_fields(&self, key: &str, fields: Value) -> Result<()> {
        self.client
            .call(Call::put(format!("/rest/api/3/issue/{key}")).json(json!({ "fields": fields })))
            .await?;
        Ok(())
    }

    pub async fn set_dates(
        &self,
        key: &str,
        start: Option<NaiveDate>,
        due: Option<NaiveDate>,
    ) -> Result<()> {
        let mut fields = serde_json::Map::new();
        if let Some(start) = start {
            fields.insert(
                self.start_date_field.clone(),
                json!(start.format("%Y-%m-%d").to_string()),
            );
        }
        if let Some(due) = due {
            fields.insert(
                "duedate".to_string(),
                json!(due.format("%Y-%m-%d").to_string()),
            );
        }
        if fields.is_empty() {
            return Err(ToolsError::Validation(
                "Specify --start and/or --due date".to_string(),
            ));
        }
        self.update_fields(key, Value::Object(fields)).await
    }

    pub async fn update_labels(&self, key: &str, add: &[String], remove: &[String]) -> Result<()> {
        let operations: Vec<Value> = add
            .iter()
            .map(|label| json!({"add": label}))
            .chain(remove.iter().map(|label| json!({"remove": label})))
            .collect();

        self.client
            .call(
                Call::put(format!("/rest/api/3/issue/{key}"))
                    .json(json!({"update": {"labels": operations}})),
            )
            .await?;
        Ok(())
    }

    pub async fn projects(&self) -> Result<Vec<ProjectRecord>> {
        self.client.call_as(Call::get("/rest/api/3/project")).await
    }

    pub async fn priorities(&self) -> Result<Vec<Named>> {
        self.client.call_as(Call::get("/rest/api/3/priority")).await
    }

    pub async fn set_priority(&self, key: &str, priority: &str) -> Result<()> {
        self.update_fields(key, json!({"priority": {"name": priority}}))
            .await
    }

    pub async fn link_issues(&self, from: &str, to: &str, link_type: &str) -> Result<()> {
        self.client
            .call(Call::post("/rest/api/3/issueLink").json(json!({
                "type": {"name": link_type},
                "inwardIssue": {"key": from},
                "outwardIssue": {"key": to},
            })))
            .await?;
        Ok(())
    }

    pub async fn link_types(&self) -> Result<Vec<LinkType>> {
        let response: LinkTypesResponse = self
            .client
            .call_as(Call::get("/rest/api/3/issueLinkType"))
            .await?;
        Ok(response.issue_link_types)
    }

    pub async fn boards(&self) -> Result<Vec<Board>> {
        let page: Page<Board> = self
            .client
            .call_as(Call::get("/rest/agile/1.0/board"))
            .await?;
        Ok(page.values)
    }

    /// Active and future sprints of `board`, or of the first board when `None`
    pub async fn sprints(&self, board: Option<u64>) -> Result<Vec<Sprint>> {
        let board_id = match board {
            Some(id) => id,
            None => match self.boards().await?.first() {
                Some(first) => first.id,
                None => return Ok(Vec::new()),
            },
        };

        let page: Page<Sprint> = self
            .client
            .call_as(
                Call::get(format!("/rest/agile/1.0/board/{board_id}/sprint"))
                    .query("state", "active,future"),
            )
            .await?;
        Ok(page.values)
    }

    pub async fn move_to_sprint(&self, key: &str, sprint_id: u64) -> Result<()> {
        self.client
            .call(
                Call::post(format!("/rest/agile/1.0/sprint/{sprint_id}/issue"))
                    .json(json!({"issues": [key]}))
                    .expect(EXPECT_NO_CONTENT),
            )
            .await?;
        Ok(())
    }
}

#[async_trait]
impl Directory for JiraClient {
    async fn list(&self, kind: IdentifierKind, query: &str) -> Result<Vec<DirectoryEntry>> {
        if kind != IdentifierKind::JiraUser {
            return Err(ToolsError::Config(format!(
                "Jira cannot look up {kind:?} identifiers"
            )));
        }
        let users = self.search_users(query, USER_SEARCH_LIMIT).await?;
        Ok(users
            .into_iter()
            .map(|user| DirectoryEntry::new(user.account_id, [user.display_name, user.email]))
            .collect())
    }
}
