//! Confluence REST client (`/wiki/rest/api`)

use super::atlassian_auth;
use crate::client::{Call, ServiceClient, Transport, EXPECT_OK};
use crate::config::{Credentials, Service};
use crate::output::{prefix, Record};
use crate::Result;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::{Arc, LazyLock};
use tracing::info;

static TAG_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").unwrap());

const EXCERPT_CHARS: usize = 200;
const SUMMARY_EXCERPT_CHARS: usize = 100;

/// Strip tags and collapse whitespace
pub fn html_to_text(html: &str) -> String {
    let text = TAG_REGEX.replace_all(html, " ");
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct Content {
    id: String,
    #[serde(rename = "type")]
    content_type: String,
    title: String,
    space: SpaceRef,
    version: VersionRef,
    body: Body,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct SpaceRef {
    key: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
struct VersionRef {
    number: u64,
}

impl Default for VersionRef {
    fn default() -> Self {
        Self { number: 1 }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct Body {
    view: BodyValue,
    storage: BodyValue,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct BodyValue {
    value: String,
}

#[derive(Debug, Clone, Deserialize)]
struct Results<T> {
    #[serde(default)]
    results: Vec<T>,
}

/// Search hit with a plain-text excerpt
#[derive(Debug, Clone, Serialize)]
pub struct PageSummary {
    pub id: String,
    pub title: String,
    pub space: String,
    pub excerpt: String,
    #[serde(rename = "type")]
    pub content_type: String,
}

impl From<Content> for PageSummary {
    fn from(content: Content) -> Self {
        Self {
            excerpt: prefix(&html_to_text(&content.body.view.value), EXCERPT_CHARS),
            id: content.id,
            title: content.title,
            space: content.space.key,
            content_type: content.content_type,
        }
    }
}

impl Record for PageSummary {
    fn key(&self) -> String {
        self.id.clone()
    }

    fn summary_line(&self) -> String {
        let mut line = format!("[{}] {}", self.id, self.title);
        if !self.space.is_empty() {
            line.push_str(&format!(" ({})", self.space));
        }
        if !self.excerpt.is_empty() {
            line.push_str(&format!(
                "\n    {}...",
                prefix(&self.excerpt, SUMMARY_EXCERPT_CHARS)
            ));
        }
        line
    }
}

/// Full page with storage body and version
#[derive(Debug, Clone, Serialize)]
pub struct Page {
    pub id: String,
    pub title: String,
    pub space: String,
    pub version: u64,
    pub content: String,
    pub raw_content: String,
}

impl From<Content> for Page {
    fn from(content: Content) -> Self {
        let raw = content.body.storage.value;
        Self {
            id: content.id,
            title: content.title,
            space: content.space.key,
            version: content.version.number,
            content: html_to_text(&raw),
            raw_content: raw,
        }
    }
}

impl Record for Page {
    fn key(&self) -> String {
        self.id.clone()
    }

    fn summary_line(&self) -> String {
        format!("[{}] {}", self.id, self.title)
    }

    fn markdown(&self) -> Option<String> {
        Some(self.content.clone())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SpaceRecord {
    pub key: String,
    pub name: String,
    #[serde(rename = "type")]
    pub space_type: String,
}

impl Record for SpaceRecord {
    fn key(&self) -> String {
        self.key.clone()
    }

    fn summary_line(&self) -> String {
        format!("{}: {} ({})", self.key, self.name, self.space_type)
    }
}

/// Confluence REST client
pub struct ConfluenceClient {
    client: ServiceClient,
}

impl ConfluenceClient {
    pub fn new(client: ServiceClient) -> Self {
        Self { client }
    }

    pub fn connect(credentials: &Credentials, transport: Arc<dyn Transport>) -> Result<Self> {
        Ok(Self::new(ServiceClient::new(
            Service::Confluence,
            credentials.base_url()?,
            atlassian_auth(credentials)?,
            transport,
        )))
    }

    pub async fn current_user(&self) -> Result<Value> {
        self.client
            .call(Call::get("/wiki/rest/api/user/current"))
            .await
    }

    pub async fn search(&self, cql: &str, limit: u32) -> Result<Vec<PageSummary>> {
        let results: Results<Content> = self
            .client
            .call_as(
                Call::get("/wiki/rest/api/content/search")
                    .query("cql", cql)
                    .query("limit", limit)
                    .query("expand", "space,body.view"),
            )
            .await?;
        Ok(results.results.into_iter().map(PageSummary::from).collect())
    }

    pub async fn page(&self, page_id: &str) -> Result<Page> {
        let content: Content = self
            .client
            .call_as(
                Call::get(format!("/wiki/rest/api/content/{page_id}"))
                    .query("expand", "body.storage,space,version"),
            )
            .await?;
        Ok(content.into())
    }

    pub async fn create_page(
        &self,
        space: &str,
        title: &str,
        content: &str,
        parent_id: Option<&str>,
    ) -> Result<Page> {
        let mut payload = json!({
            "type": "page",
            "title": title,
            "space": {"key": space},
            "body": {"storage": {"value": content, "representation": "storage"}},
        });
        if let Some(parent) = parent_id {
            payload["ancestors"] = json!([{"id": parent}]);
        }

        info!(space = %space, title = %title, "Creating Confluence page");
        let created: Content = self
            .client
            .call_as(Call::post("/wiki/rest/api/content").json(payload))
            .await?;
        Ok(created.into())
    }

    /// Replace the page body, submitting `version` as the new version number
    pub async fn put_page(
        &self,
        page_id: &str,
        title: &str,
        content: &str,
        version: u64,
    ) -> Result<()> {
        info!(page_id = %page_id, version, "Updating Confluence page");
        self.client
            .call(
                Call::put(format!("/wiki/rest/api/content/{page_id}"))
                    .json(json!({
                        "type": "page",
                        "title": title,
                        "body": {"storage": {"value": content, "representation": "storage"}},
                        "version": {"number": version},
                    }))
                    .expect(EXPECT_OK),
            )
            .await?;
        Ok(())
    }

    pub async fn spaces(&self, limit: u32) -> Result<Vec<SpaceRecord>> {
        let results: Results<SpaceRecord> = self
            .client
            .call_as(Call::get("/wiki/rest/api/space").query("limit", limit))
            .await?;
        Ok(results.results)
    }
}
