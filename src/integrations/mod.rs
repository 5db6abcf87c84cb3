//! Platform integrations
//!
//! One typed client per platform, each wrapping a [`ServiceClient`]:
//!
//! - **Jira**: issues, transitions, users, agile boards (`/rest/api/3`)
//! - **Confluence**: pages and spaces (`/wiki/rest/api`)
//! - **GitLab**: merge requests, pipelines, branches (`/api/v4`)
//! - **Slack**: Web API methods; `ok: false` replies become errors
//!
//! Jira and Slack also implement [`crate::resolve::Directory`] so the
//! identifier resolver can look up users and channels through them.
//!
//! [`ServiceClient`]: crate::client::ServiceClient

pub mod confluence;
pub mod gitlab;
pub mod jira;
pub mod slack;

pub use confluence::ConfluenceClient;
pub use gitlab::GitLabClient;
pub use jira::JiraClient;
pub use slack::SlackClient;

use crate::client::Auth;
use crate::config::Credentials;
use crate::Result;

/// Basic auth from an Atlassian email + API token pair
pub(crate) fn atlassian_auth(credentials: &Credentials) -> Result<Auth> {
    Ok(Auth::Basic {
        username: credentials.identity()?.to_string(),
        password: credentials.secret().to_string(),
    })
}
