//! Jira workflows: create, transition, assign, update, unresolve

use super::{present, Report};
use crate::config::TransitionAliases;
use crate::integrations::jira::{CreatedIssue, JiraClient, NewIssue};
use crate::resolve::{first_match, IdentifierKind, IdentifierResolver};
use crate::{Result, ToolsError};
use serde_json::json;

/// Sentinel accepted by `assign` to clear the assignee
pub const UNASSIGN: &str = "none";

/// Arguments of `jira create`
#[derive(Debug, Clone, Default)]
pub struct CreateIssue {
    pub project: String,
    pub issue_type: String,
    pub summary: String,
    pub description: Option<String>,
    pub labels: Vec<String>,
    pub assignee: Option<String>,
    pub epic: Option<String>,
}

/// Arguments of `jira update`
#[derive(Debug, Clone, Default)]
pub struct UpdateIssue {
    pub issue: String,
    pub transition: Option<String>,
    pub comment: Option<String>,
    pub assignee: Option<String>,
    pub summary: Option<String>,
}

impl UpdateIssue {
    fn without_blanks(self) -> Self {
        Self {
            issue: self.issue,
            transition: present(self.transition),
            comment: present(self.comment),
            assignee: present(self.assignee),
            summary: present(self.summary),
        }
    }

    fn is_empty(&self) -> bool {
        self.transition.is_none()
            && self.comment.is_none()
            && self.assignee.is_none()
            && self.summary.is_none()
    }
}

/// Jira orchestrator owning the per-run identifier cache
pub struct JiraWorkflow<'a> {
    jira: &'a JiraClient,
    resolver: IdentifierResolver,
    aliases: TransitionAliases,
}

impl<'a> JiraWorkflow<'a> {
    pub fn new(jira: &'a JiraClient, aliases: TransitionAliases) -> Self {
        Self {
            jira,
            resolver: IdentifierResolver::new(),
            aliases,
        }
    }

    pub fn resolver(&self) -> &IdentifierResolver {
        &self.resolver
    }

    async fn account_id(&mut self, user: &str) -> Result<String> {
        let resolved = self
            .resolver
            .resolve(self.jira, IdentifierKind::JiraUser, user)
            .await?;
        Ok(resolved.canonical_id)
    }

    /// Resolve a user, turning a failed lookup into a warning
    async fn soft_account_id(
        &mut self,
        user: &str,
        suffix: &str,
        report: &mut Report,
    ) -> Result<Option<String>> {
        match self.account_id(user).await {
            Ok(id) => Ok(Some(id)),
            Err(err) if err.is_not_found() => {
                report.warn(format!("User '{user}' not found{suffix}"));
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    /// Create an issue, then link it to an epic if one was given
    ///
    /// An unknown assignee only produces a warning. A failed epic link is an
    /// error, but the `Created:` line is already in the report.
    pub async fn create_issue(
        &mut self,
        request: CreateIssue,
        report: &mut Report,
    ) -> Result<CreatedIssue> {
        let request = CreateIssue {
            description: present(request.description),
            assignee: present(request.assignee),
            epic: present(request.epic),
            ..request
        };
        let assignee_id = match request.assignee.as_deref() {
            Some(user) => {
                let id = self
                    .soft_account_id(user, ", creating without assignee", report)
                    .await?;
                report.completed("resolve_assignee");
                id
            }
            None => None,
        };

        let created = self
            .jira
            .create_issue(&NewIssue {
                project: request.project,
                issue_type: request.issue_type,
                summary: request.summary,
                description: request.description,
                labels: request.labels,
                assignee_id,
            })
            .await?;
        report.completed("create_issue");
        report.emit(format!("Created: {}", created.key));

        if let Some(epic) = request.epic.as_deref() {
            self.jira.set_parent(&created.key, epic).await?;
            report.completed("link_epic");
            report.emit(format!("Linked to epic: {epic}"));
        }

        Ok(created)
    }

    /// Move an issue through a named transition, then optionally comment
    ///
    /// The name match is case-insensitive. No transition call is made when
    /// nothing matches.
    pub async fn transition(
        &mut self,
        issue: &str,
        name: &str,
        comment: Option<&str>,
        report: &mut Report,
    ) -> Result<()> {
        let transitions = self.jira.transitions(issue).await?;
        report.completed("fetch_transitions");

        let wanted = name.to_lowercase();
        let transition = first_match(&transitions, |t| t.name.to_lowercase() == wanted)
            .ok_or_else(|| ToolsError::UnknownTransition {
                requested: name.to_string(),
                available: transitions.iter().map(|t| t.name.clone()).collect(),
            })?;

        self.jira.do_transition(issue, &transition.id).await?;
        report.completed("transition");

        if let Some(text) = comment {
            self.jira.add_comment(issue, text).await?;
            report.completed("comment");
        }

        report.emit(format!("Transitioned {issue} to {}", transition.name));
        Ok(())
    }

    /// Assign to a user, or unassign when given `none`
    pub async fn assign(&mut self, issue: &str, user: &str, report: &mut Report) -> Result<()> {
        if user.trim().eq_ignore_ascii_case(UNASSIGN) {
            self.jira.assign(issue, None).await?;
            report.completed("unassign");
            report.emit(format!("Unassigned {issue}"));
            return Ok(());
        }

        let account_id = self.account_id(user).await?;
        report.completed("resolve_assignee");

        self.jira.assign(issue, Some(&account_id)).await?;
        report.completed("assign");
        report.emit(format!("Assigned {issue} to {user}"));
        Ok(())
    }

    /// Apply assignee, summary, transition and comment changes in that order
    pub async fn update(&mut self, request: UpdateIssue, report: &mut Report) -> Result<()> {
        let request = request.without_blanks();
        if request.is_empty() {
            return Err(ToolsError::Validation(
                "Specify --transition, --comment, --assignee, or --summary".to_string(),
            ));
        }
        let issue = request.issue.as_str();

        if let Some(user) = request.assignee.as_deref() {
            if let Some(account_id) = self.soft_account_id(user, "", report).await? {
                self.jira.assign(issue, Some(&account_id)).await?;
                report.completed("assign");
                report.emit(format!("Assigned {issue} to {user}"));
            }
        }

        if let Some(summary) = request.summary.as_deref() {
            self.jira
                .update_fields(issue, json!({"summary": summary}))
                .await?;
            report.completed("update_summary");
            report.emit(format!("Updated summary of {issue}"));
        }

        match (request.transition.as_deref(), request.comment.as_deref()) {
            (Some(name), comment) => self.transition(issue, name, comment, report).await?,
            (None, Some(text)) => {
                self.jira.add_comment(issue, text).await?;
                report.completed("comment");
                report.emit(format!("Comment added to {issue}"));
            }
            (None, None) => {}
        }

        Ok(())
    }

    /// Take the first transition whose name contains a reopen alias
    pub async fn unresolve(&mut self, issue: &str, report: &mut Report) -> Result<()> {
        let transitions = self.jira.transitions(issue).await?;
        report.completed("fetch_transitions");

        let transition = first_match(&transitions, |t| self.aliases.matches(&t.name))
            .ok_or_else(|| ToolsError::NoReopenTransition {
                available: transitions.iter().map(|t| t.name.clone()).collect(),
            })?;

        self.jira.do_transition(issue, &transition.id).await?;
        report.completed("transition");
        report.emit(format!("Reopened {issue} → {}", transition.name));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::mock::MockTransport;
    use crate::client::{Auth, Method, ServiceClient};
    use crate::config::Service;
    use std::sync::Arc;

    const TRANSITIONS: &str = "/rest/api/3/issue/PROJ-1/transitions";
    const USER_SEARCH: &str = "/rest/api/3/user/search";

    fn jira(transport: &Arc<MockTransport>) -> JiraClient {
        JiraClient::new(ServiceClient::new(
            Service::Jira,
            "https://example.atlassian.net",
            Auth::Basic {
                username: "dev@example.com".into(),
                password: "token".into(),
            },
            transport.clone(),
        ))
    }

    fn transitions_body() -> serde_json::Value {
        json!({"transitions": [
            {"id": "11", "name": "To Do"},
            {"id": "21", "name": "In Progress"},
            {"id": "31", "name": "Done"}
        ]})
    }

    #[tokio::test]
    async fn test_create_with_unknown_assignee() {
        let transport = Arc::new(
            MockTransport::new()
                .on_json(Method::GET, USER_SEARCH, 200, json!([]))
                .on_json(
                    Method::POST,
                    "/rest/api/3/issue",
                    201,
                    json!({"id": "10001", "key": "PROJ-9"}),
                ),
        );
        let client = jira(&transport);
        let mut workflow = JiraWorkflow::new(&client, TransitionAliases::default());
        let mut report = Report::new();

        let created = workflow
            .create_issue(
                CreateIssue {
                    project: "PROJ".into(),
                    issue_type: "Task".into(),
                    summary: "Ship it".into(),
                    assignee: Some("ghost".into()),
                    ..Default::default()
                },
                &mut report,
            )
            .await
            .unwrap();

        assert_eq!(created.key, "PROJ-9");
        assert_eq!(report.lines, vec!["Created: PROJ-9"]);
        assert_eq!(
            report.warnings,
            vec!["User 'ghost' not found, creating without assignee"]
        );
        let body = transport
            .last_body(Method::POST, "/rest/api/3/issue")
            .unwrap();
        assert!(body["fields"].get("assignee").is_none());
    }

    #[tokio::test]
    async fn test_create_keeps_created_line_when_epic_link_fails() {
        let transport = Arc::new(
            MockTransport::new()
                .on_json(
                    Method::POST,
                    "/rest/api/3/issue",
                    201,
                    json!({"id": "10001", "key": "PROJ-9"}),
                )
                .on(Method::PUT, "/rest/api/3/issue/PROJ-9", 400, "bad parent"),
        );
        let client = jira(&transport);
        let mut workflow = JiraWorkflow::new(&client, TransitionAliases::default());
        let mut report = Report::new();

        let err = workflow
            .create_issue(
                CreateIssue {
                    project: "PROJ".into(),
                    issue_type: "Story".into(),
                    summary: "Child".into(),
                    epic: Some("PROJ-1".into()),
                    ..Default::default()
                },
                &mut report,
            )
            .await
            .unwrap_err();

        assert!(matches!(err, ToolsError::Remote { status: 400, .. }));
        assert_eq!(report.lines, vec!["Created: PROJ-9"]);
        assert_eq!(report.steps, vec!["create_issue"]);
    }

    #[tokio::test]
    async fn test_unknown_transition_makes_no_post() {
        let transport =
            Arc::new(MockTransport::new().on_json(Method::GET, TRANSITIONS, 200, transitions_body()));
        let client = jira(&transport);
        let mut workflow = JiraWorkflow::new(&client, TransitionAliases::default());
        let mut report = Report::new();

        let err = workflow
            .transition("PROJ-1", "Shipped", Some("done"), &mut report)
            .await
            .unwrap_err();

        assert_eq!(
            err.to_string(),
            "Transition 'Shipped' not found. Available: To Do, In Progress, Done"
        );
        assert_eq!(transport.count(Method::POST, TRANSITIONS), 0);
        assert_eq!(
            transport.count(Method::POST, "/rest/api/3/issue/PROJ-1/comment"),
            0
        );
    }

    #[tokio::test]
    async fn test_transition_then_comment() {
        let transport = Arc::new(
            MockTransport::new()
                .on_json(Method::GET, TRANSITIONS, 200, transitions_body())
                .on(Method::POST, TRANSITIONS, 204, "")
                .on_json(
                    Method::POST,
                    "/rest/api/3/issue/PROJ-1/comment",
                    201,
                    json!({"id": "1"}),
                ),
        );
        let client = jira(&transport);
        let mut workflow = JiraWorkflow::new(&client, TransitionAliases::default());
        let mut report = Report::new();

        workflow
            .transition("PROJ-1", "done", Some("Released"), &mut report)
            .await
            .unwrap();

        assert_eq!(
            report.steps,
            vec!["fetch_transitions", "transition", "comment"]
        );
        assert_eq!(
            transport.last_body(Method::POST, TRANSITIONS).unwrap(),
            json!({"transition": {"id": "31"}})
        );
        assert_eq!(report.lines, vec!["Transitioned PROJ-1 to Done"]);
    }

    #[tokio::test]
    async fn test_assign_none_skips_resolver() {
        let transport = Arc::new(MockTransport::new().on(
            Method::PUT,
            "/rest/api/3/issue/PROJ-1/assignee",
            204,
            "",
        ));
        let client = jira(&transport);
        let mut workflow = JiraWorkflow::new(&client, TransitionAliases::default());
        let mut report = Report::new();

        workflow.assign("PROJ-1", "NONE", &mut report).await.unwrap();

        assert_eq!(transport.count(Method::GET, USER_SEARCH), 0);
        assert!(workflow
            .resolver()
            .cached(IdentifierKind::JiraUser, "NONE")
            .is_none());
        assert_eq!(
            transport
                .last_body(Method::PUT, "/rest/api/3/issue/PROJ-1/assignee")
                .unwrap(),
            json!({"accountId": null})
        );
        assert_eq!(report.lines, vec!["Unassigned PROJ-1"]);
    }

    #[tokio::test]
    async fn test_assign_unknown_user_is_fatal() {
        let transport = Arc::new(MockTransport::new().on_json(Method::GET, USER_SEARCH, 200, json!([])));
        let client = jira(&transport);
        let mut workflow = JiraWorkflow::new(&client, TransitionAliases::default());

        let err = workflow
            .assign("PROJ-1", "ghost", &mut Report::new())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "User 'ghost' not found");
    }

    #[tokio::test]
    async fn test_update_requires_a_change() {
        let transport = Arc::new(MockTransport::new());
        let client = jira(&transport);
        let mut workflow = JiraWorkflow::new(&client, TransitionAliases::default());

        let err = workflow
            .update(
                UpdateIssue {
                    issue: "PROJ-1".into(),
                    ..Default::default()
                },
                &mut Report::new(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, ToolsError::Validation(_)));
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn test_update_with_only_blank_values_is_rejected() {
        let transport = Arc::new(MockTransport::new());
        let client = jira(&transport);
        let mut workflow = JiraWorkflow::new(&client, TransitionAliases::default());

        let err = workflow
            .update(
                UpdateIssue {
                    issue: "PROJ-1".into(),
                    summary: Some(String::new()),
                    comment: Some("  ".into()),
                    ..Default::default()
                },
                &mut Report::new(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, ToolsError::Validation(_)));
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn test_create_ignores_blank_epic() {
        let transport = Arc::new(MockTransport::new().on_json(
            Method::POST,
            "/rest/api/3/issue",
            201,
            json!({"id": "10001", "key": "PROJ-9"}),
        ));
        let client = jira(&transport);
        let mut workflow = JiraWorkflow::new(&client, TransitionAliases::default());
        let mut report = Report::new();

        workflow
            .create_issue(
                CreateIssue {
                    project: "PROJ".into(),
                    issue_type: "Task".into(),
                    summary: "Write docs".into(),
                    epic: Some(String::new()),
                    assignee: Some(String::new()),
                    ..Default::default()
                },
                &mut report,
            )
            .await
            .unwrap();

        assert_eq!(report.steps, vec!["create_issue"]);
        assert_eq!(transport.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_update_resolves_assignee_once() {
        let transport = Arc::new(
            MockTransport::new()
                .on_json(
                    Method::GET,
                    USER_SEARCH,
                    200,
                    json!([{"accountId": "acc-1", "displayName": "Jane"}]),
                )
                .on(Method::PUT, "/rest/api/3/issue/PROJ-1/assignee", 204, "")
                .on(Method::PUT, "/rest/api/3/issue/PROJ-2/assignee", 204, ""),
        );
        let client = jira(&transport);
        let mut workflow = JiraWorkflow::new(&client, TransitionAliases::default());
        let mut report = Report::new();

        for issue in ["PROJ-1", "PROJ-2"] {
            workflow
                .update(
                    UpdateIssue {
                        issue: issue.into(),
                        assignee: Some("jane".into()),
                        ..Default::default()
                    },
                    &mut report,
                )
                .await
                .unwrap();
        }

        assert_eq!(transport.count(Method::GET, USER_SEARCH), 1);
        assert_eq!(
            report.lines,
            vec!["Assigned PROJ-1 to jane", "Assigned PROJ-2 to jane"]
        );
    }

    #[tokio::test]
    async fn test_update_order_and_soft_assignee() {
        let transport = Arc::new(
            MockTransport::new()
                .on_json(Method::GET, USER_SEARCH, 200, json!([]))
                .on(Method::PUT, "/rest/api/3/issue/PROJ-1", 204, "")
                .on_json(
                    Method::POST,
                    "/rest/api/3/issue/PROJ-1/comment",
                    201,
                    json!({}),
                ),
        );
        let client = jira(&transport);
        let mut workflow = JiraWorkflow::new(&client, TransitionAliases::default());
        let mut report = Report::new();

        workflow
            .update(
                UpdateIssue {
                    issue: "PROJ-1".into(),
                    assignee: Some("ghost".into()),
                    summary: Some("New title".into()),
                    comment: Some("Renamed".into()),
                    ..Default::default()
                },
                &mut report,
            )
            .await
            .unwrap();

        assert_eq!(report.warnings, vec!["User 'ghost' not found"]);
        assert_eq!(report.steps, vec!["update_summary", "comment"]);
        assert_eq!(
            report.lines,
            vec!["Updated summary of PROJ-1", "Comment added to PROJ-1"]
        );
    }

    #[tokio::test]
    async fn test_unresolve_with_aliases() {
        let transport = Arc::new(
            MockTransport::new()
                .on_json(
                    Method::GET,
                    TRANSITIONS,
                    200,
                    json!({"transitions": [{"id": "5", "name": "Close"}, {"id": "7", "name": "해야 할 일"}]}),
                )
                .on(Method::POST, TRANSITIONS, 204, ""),
        );
        let client = jira(&transport);
        let mut workflow = JiraWorkflow::new(&client, TransitionAliases::parse("해야 할 일, Reopen"));
        let mut report = Report::new();

        workflow.unresolve("PROJ-1", &mut report).await.unwrap();
        assert_eq!(
            transport.last_body(Method::POST, TRANSITIONS).unwrap(),
            json!({"transition": {"id": "7"}})
        );
        assert_eq!(report.lines, vec!["Reopened PROJ-1 → 해야 할 일"]);
    }

    #[tokio::test]
    async fn test_unresolve_without_match() {
        let transport =
            Arc::new(MockTransport::new().on_json(Method::GET, TRANSITIONS, 200, json!({"transitions": [{"id": "5", "name": "Close"}]})));
        let client = jira(&transport);
        let mut workflow = JiraWorkflow::new(&client, TransitionAliases::default());

        let err = workflow
            .unresolve("PROJ-1", &mut Report::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ToolsError::NoReopenTransition { ref available } if available == &["Close"]));
        assert_eq!(transport.count(Method::POST, TRANSITIONS), 0);
    }
}
