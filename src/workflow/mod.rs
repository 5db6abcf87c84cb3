//! Compound operations
//!
//! A workflow strings several single calls into one user-facing action. Steps
//! run strictly in order, each awaited before the next starts; the first
//! failing step aborts the run and nothing already done is rolled back.
//! Progress is recorded in a [`Report`] so the dispatcher can still print what
//! succeeded before a later step failed.

pub mod confluence;
pub mod jira;
pub mod slack;

pub use confluence::update_page;
pub use jira::{CreateIssue, JiraWorkflow, UpdateIssue};
pub use slack::SlackWorkflow;

use tracing::debug;

/// Treat a blank flag value as if the flag was not given
pub(crate) fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Output and progress of one run
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Report {
    /// Lines for stdout
    pub lines: Vec<String>,
    /// Lines for stderr, printed as `WARNING: ...`
    pub warnings: Vec<String>,
    /// Names of completed steps, in execution order
    pub steps: Vec<&'static str>,
}

impl Report {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn completed(&mut self, step: &'static str) {
        debug!(step, "Workflow step completed");
        self.steps.push(step);
    }

    pub fn emit(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_records_in_order() {
        let mut report = Report::new();
        report.completed("create_issue");
        report.emit("Created: PROJ-1");
        report.warn("User 'x' not found");
        report.completed("link_epic");

        assert_eq!(report.steps, vec!["create_issue", "link_epic"]);
        assert_eq!(report.lines, vec!["Created: PROJ-1"]);
        assert_eq!(report.warnings.len(), 1);
    }

    #[test]
    fn test_blank_values_are_absent() {
        assert_eq!(present(Some("  ".into())), None);
        assert_eq!(present(Some(String::new())), None);
        assert_eq!(present(Some("x".into())), Some("x".to_string()));
        assert_eq!(present(None), None);
    }
}
