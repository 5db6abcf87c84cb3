//! Confluence page update (read version, write version + 1)

use super::Report;
use crate::integrations::ConfluenceClient;
use crate::Result;

/// Replace a page's body, bumping its version by one
///
/// The current title is kept unless `title` is given. A concurrent edit makes
/// the write fail with the server's status; it is not retried.
pub async fn update_page(
    confluence: &ConfluenceClient,
    page_id: &str,
    content: &str,
    title: Option<&str>,
    report: &mut Report,
) -> Result<u64> {
    let current = confluence.page(page_id).await?;
    report.completed("read_version");

    let version = current.version + 1;
    let title = title.unwrap_or(&current.title);

    confluence.put_page(page_id, title, content, version).await?;
    report.completed("write_page");
    report.emit(format!("Updated page {page_id} to version {version}"));

    Ok(version)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::mock::MockTransport;
    use crate::client::{Auth, Method, ServiceClient};
    use crate::config::Service;
    use crate::ToolsError;
    use serde_json::json;
    use std::sync::Arc;

    const PAGE: &str = "/wiki/rest/api/content/123";

    fn confluence(transport: &Arc<MockTransport>) -> ConfluenceClient {
        ConfluenceClient::new(ServiceClient::new(
            Service::Confluence,
            "https://example.atlassian.net",
            Auth::Basic {
                username: "dev@example.com".into(),
                password: "token".into(),
            },
            transport.clone(),
        ))
    }

    fn current_page() -> serde_json::Value {
        json!({"id": "123", "title": "Runbook", "version": {"number": 4},
               "body": {"storage": {"value": "<p>old</p>"}}})
    }

    #[tokio::test]
    async fn test_update_bumps_version_and_keeps_title() {
        let transport = Arc::new(
            MockTransport::new()
                .on_json(Method::GET, PAGE, 200, current_page())
                .on_json(Method::PUT, PAGE, 200, json!({"id": "123"})),
        );
        let client = confluence(&transport);
        let mut report = Report::new();

        let version = update_page(&client, "123", "<p>new</p>", None, &mut report)
            .await
            .unwrap();

        assert_eq!(version, 5);
        let body = transport.last_body(Method::PUT, PAGE).unwrap();
        assert_eq!(body["version"]["number"], 5);
        assert_eq!(body["title"], "Runbook");
        assert_eq!(body["body"]["storage"]["value"], "<p>new</p>");
        assert_eq!(report.lines, vec!["Updated page 123 to version 5"]);
    }

    #[tokio::test]
    async fn test_conflict_is_not_retried() {
        let transport = Arc::new(
            MockTransport::new()
                .on_json(Method::GET, PAGE, 200, current_page())
                .on(Method::PUT, PAGE, 409, "Version must be incremented"),
        );
        let client = confluence(&transport);
        let mut report = Report::new();

        let err = update_page(&client, "123", "<p>new</p>", Some("Renamed"), &mut report)
            .await
            .unwrap_err();

        assert!(matches!(err, ToolsError::Remote { status: 409, .. }));
        assert_eq!(transport.count(Method::PUT, PAGE), 1);
        assert_eq!(transport.count(Method::GET, PAGE), 1);
        assert!(report.lines.is_empty());
    }
}
