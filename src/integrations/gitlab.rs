//! GitLab REST client (`/api/v4`)
//!
//! Projects are addressed by their full path (`group/sub/project`), URL-encoded
//! into a single path segment.

use crate::client::{Auth, Call, ServiceClient, Transport, EXPECT_OK};
use crate::config::{Credentials, Service};
use crate::output::{prefix, Record};
use crate::Result;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;

const SHORT_SHA_CHARS: usize = 8;

fn project_path(project: &str) -> String {
    format!("/api/v4/projects/{}", urlencoding::encode(project))
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct MergeRequest {
    iid: u64,
    title: String,
    state: String,
    author: Author,
    source_branch: String,
    target_branch: String,
    description: Option<String>,
    web_url: String,
    merge_status: String,
    has_conflicts: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct Author {
    username: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct MergeRequestRecord {
    pub iid: u64,
    pub title: String,
    pub state: String,
    pub author: String,
    pub source_branch: String,
    pub target_branch: String,
    pub web_url: String,
}

impl From<MergeRequest> for MergeRequestRecord {
    fn from(mr: MergeRequest) -> Self {
        Self {
            iid: mr.iid,
            title: mr.title,
            state: mr.state,
            author: mr.author.username,
            source_branch: mr.source_branch,
            target_branch: mr.target_branch,
            web_url: mr.web_url,
        }
    }
}

impl Record for MergeRequestRecord {
    fn key(&self) -> String {
        self.iid.to_string()
    }

    fn summary_line(&self) -> String {
        let mut line = format!("!{}: {} [{}]", self.iid, self.title, self.state);
        if !self.author.is_empty() {
            line.push_str(&format!(" @{}", self.author));
        }
        line
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MergeRequestDetail {
    #[serde(flatten)]
    pub summary: MergeRequestRecord,
    pub description: String,
    pub merge_status: String,
    pub has_conflicts: bool,
}

impl From<MergeRequest> for MergeRequestDetail {
    fn from(mut mr: MergeRequest) -> Self {
        let description = mr.description.take().unwrap_or_default();
        let merge_status = std::mem::take(&mut mr.merge_status);
        let has_conflicts = mr.has_conflicts;
        Self {
            summary: mr.into(),
            description,
            merge_status,
            has_conflicts,
        }
    }
}

impl Record for MergeRequestDetail {
    fn key(&self) -> String {
        self.summary.key()
    }

    fn summary_line(&self) -> String {
        self.summary.summary_line()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Pipeline {
    pub id: u64,
    pub status: String,
    #[serde(rename = "ref")]
    pub git_ref: String,
    pub sha: String,
    pub web_url: String,
}

impl Record for Pipeline {
    fn key(&self) -> String {
        self.id.to_string()
    }

    fn summary_line(&self) -> String {
        format!("#{}: {} [{}]", self.id, self.git_ref, self.status)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Job {
    pub id: u64,
    pub name: String,
    pub stage: String,
    pub status: String,
}

impl Record for Job {
    fn key(&self) -> String {
        self.id.to_string()
    }

    fn summary_line(&self) -> String {
        format!("{}/{}: {}", self.stage, self.name, self.status)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Branch {
    pub name: String,
    pub merged: bool,
    pub protected: bool,
}

impl Record for Branch {
    fn key(&self) -> String {
        self.name.clone()
    }

    fn summary_line(&self) -> String {
        if self.merged {
            format!("{} (merged)", self.name)
        } else {
            self.name.clone()
        }
    }
}

/// Fields of a new merge request
#[derive(Debug, Clone, Default)]
pub struct NewMergeRequest {
    pub source: String,
    pub target: String,
    pub title: String,
    pub description: String,
}

/// GitLab REST client
pub struct GitLabClient {
    client: ServiceClient,
}

impl GitLabClient {
    pub fn new(client: ServiceClient) -> Self {
        Self { client }
    }

    pub fn connect(credentials: &Credentials, transport: Arc<dyn Transport>) -> Result<Self> {
        Ok(Self::new(ServiceClient::new(
            Service::GitLab,
            credentials.base_url()?,
            Auth::PrivateToken(credentials.secret().to_string()),
            transport,
        )))
    }

    pub async fn current_user(&self) -> Result<Value> {
        self.client.call(Call::get("/api/v4/user")).await
    }

    pub async fn merge_requests(
        &self,
        project: &str,
        state: &str,
        limit: u32,
    ) -> Result<Vec<MergeRequestRecord>> {
        let mrs: Vec<MergeRequest> = self
            .client
            .call_as(
                Call::get(format!("{}/merge_requests", project_path(project)))
                    .query("state", state)
                    .query("per_page", limit),
            )
            .await?;
        Ok(mrs.into_iter().map(MergeRequestRecord::from).collect())
    }

    pub async fn merge_request(&self, project: &str, iid: u64) -> Result<MergeRequestDetail> {
        let mr: MergeRequest = self
            .client
            .call_as(Call::get(format!(
                "{}/merge_requests/{iid}",
                project_path(project)
            )))
            .await?;
        Ok(mr.into())
    }

    pub async fn create_merge_request(
        &self,
        project: &str,
        request: &NewMergeRequest,
    ) -> Result<MergeRequestRecord> {
        info!(project = %project, source = %request.source, target = %request.target, "Creating merge request");
        let mr: MergeRequest = self
            .client
            .call_as(
                Call::post(format!("{}/merge_requests", project_path(project))).json(json!({
                    "source_branch": request.source,
                    "target_branch": request.target,
                    "title": request.title,
                    "description": request.description,
                })),
            )
            .await?;
        Ok(mr.into())
    }

    pub async fn merge(
        &self,
        project: &str,
        iid: u64,
        squash: bool,
        delete_source: bool,
    ) -> Result<()> {
        info!(project = %project, iid, "Merging merge request");
        self.client
            .call(
                Call::put(format!(
                    "{}/merge_requests/{iid}/merge",
                    project_path(project)
                ))
                .json(json!({
                    "squash": squash,
                    "should_remove_source_branch": delete_source,
                }))
                .expect(EXPECT_OK),
            )
            .await?;
        Ok(())
    }

    pub async fn pipelines(
        &self,
        project: &str,
        status: Option<&str>,
        git_ref: Option<&str>,
        limit: u32,
    ) -> Result<Vec<Pipeline>> {
        let pipelines: Vec<Pipeline> = self
            .client
            .call_as(
                Call::get(format!("{}/pipelines", project_path(project)))
                    .query("per_page", limit)
                    .query_opt("status", status)
                    .query_opt("ref", git_ref),
            )
            .await?;
        Ok(pipelines
            .into_iter()
            .map(|mut pipeline| {
                pipeline.sha = prefix(&pipeline.sha, SHORT_SHA_CHARS);
                pipeline
            })
            .collect())
    }

    /// Raw pipeline payload
    pub async fn pipeline(&self, project: &str, pipeline_id: u64) -> Result<Value> {
        self.client
            .call(Call::get(format!(
                "{}/pipelines/{pipeline_id}",
                project_path(project)
            )))
            .await
    }

    pub async fn jobs(
        &self,
        project: &str,
        pipeline_id: u64,
        scope: Option<&str>,
    ) -> Result<Vec<Job>> {
        self.client
            .call_as(
                Call::get(format!(
                    "{}/pipelines/{pipeline_id}/jobs",
                    project_path(project)
                ))
                .query_opt("scope", scope),
            )
            .await
    }

    pub async fn retry_pipeline(&self, project: &str, pipeline_id: u64) -> Result<()> {
        info!(project = %project, pipeline_id, "Retrying pipeline");
        self.client
            .call(Call::post(format!(
                "{}/pipelines/{pipeline_id}/retry",
                project_path(project)
            )))
            .await?;
        Ok(())
    }

    pub async fn branches(&self, project: &str, limit: u32) -> Result<Vec<Branch>> {
        self.client
            .call_as(
                Call::get(format!("{}/repository/branches", project_path(project)))
                    .query("per_page", limit),
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::mock::MockTransport;
    use crate::client::Method;
    use crate::output::{format_list, Format};

    fn gitlab(transport: Arc<MockTransport>) -> GitLabClient {
        GitLabClient::new(ServiceClient::new(
            Service::GitLab,
            "https://gitlab.com",
            Auth::PrivateToken("glpat-test".into()),
            transport,
        ))
    }

    #[test]
    fn test_project_path_encoding() {
        assert_eq!(
            project_path("group/sub group/app"),
            "/api/v4/projects/group%2Fsub%20group%2Fapp"
        );
    }

    #[tokio::test]
    async fn test_merge_requests() {
        let transport = Arc::new(MockTransport::new().on_json(
            Method::GET,
            "/api/v4/projects/team%2Fapp/merge_requests",
            200,
            json!([
                {"iid": 7, "title": "Add cache", "state": "opened", "author": {"username": "jdoe"},
                 "source_branch": "cache", "target_branch": "main", "web_url": "https://gitlab.com/team/app/-/merge_requests/7"},
                {"iid": 5, "title": "Bump deps", "state": "opened"}
            ]),
        ));
        let client = gitlab(transport.clone());
        let mrs = client.merge_requests("team/app", "opened", 20).await.unwrap();

        assert_eq!(
            format_list(&mrs, Format::Summary).unwrap(),
            "!7: Add cache [opened] @jdoe\n!5: Bump deps [opened]"
        );
        assert_eq!(format_list(&mrs, Format::Ids).unwrap(), "7\n5");
        assert_eq!(
            transport.calls()[0].query,
            vec![
                ("state".to_string(), "opened".to_string()),
                ("per_page".to_string(), "20".to_string())
            ]
        );
    }

    #[tokio::test]
    async fn test_pipelines_short_sha_and_filters() {
        let transport = Arc::new(MockTransport::new().on_json(
            Method::GET,
            "/api/v4/projects/team%2Fapp/pipelines",
            200,
            json!([{"id": 99, "status": "failed", "ref": "main", "sha": "0123456789abcdef", "web_url": ""}]),
        ));
        let client = gitlab(transport.clone());
        let pipelines = client
            .pipelines("team/app", Some("failed"), None, 20)
            .await
            .unwrap();

        assert_eq!(pipelines[0].sha, "01234567");
        assert_eq!(pipelines[0].summary_line(), "#99: main [failed]");
        assert!(transport.calls()[0]
            .query
            .contains(&("status".to_string(), "failed".to_string())));
        assert!(!transport.calls()[0].query.iter().any(|(k, _)| k == "ref"));
    }

    #[tokio::test]
    async fn test_merge_expects_ok() {
        let transport = Arc::new(MockTransport::new().on(
            Method::PUT,
            "/api/v4/projects/team%2Fapp/merge_requests/7/merge",
            405,
            "{\"message\":\"Method Not Allowed\"}",
        ));
        let err = gitlab(transport)
            .merge("team/app", 7, true, false)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "405 - {\"message\":\"Method Not Allowed\"}");
    }

    #[test]
    fn test_job_and_branch_lines() {
        let job = Job {
            id: 1,
            name: "unit".into(),
            stage: "test".into(),
            status: "success".into(),
        };
        assert_eq!(job.summary_line(), "test/unit: success");

        let branch = Branch {
            name: "feature".into(),
            merged: true,
            protected: false,
        };
        assert_eq!(branch.summary_line(), "feature (merged)");
    }
}
