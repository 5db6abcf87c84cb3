//! CLI command definitions
//!
//! All CLI structs and subcommand enums are defined here.

use crate::integrations::jira::DEFAULT_SEARCH_FIELDS;
use crate::output::{
    format_parser, Format, ISSUE_FORMATS, LIST_FORMATS, PAGE_FORMATS, SINGLE_FORMATS,
};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Command-line clients for Jira, Confluence, GitLab and Slack
#[derive(Parser, Debug)]
#[command(name = "etools")]
#[command(version, about, long_about = None)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// Path to the credentials file (default: ~/.enterprise-tools/credentials.env)
    #[arg(short, long, global = true, env = "ETOOLS_CREDENTIALS")]
    pub config: Option<PathBuf>,

    /// Enable debug logging on stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Jira issues, transitions, sprints and boards
    #[command(subcommand)]
    Jira(JiraCommands),

    /// Confluence pages and spaces
    #[command(subcommand)]
    Confluence(ConfluenceCommands),

    /// GitLab merge requests, pipelines and branches
    #[command(subcommand, name = "gitlab")]
    GitLab(GitLabCommands),

    /// Slack messages, DMs and channels
    #[command(subcommand)]
    Slack(SlackCommands),

    /// Test connectivity to every configured service
    Check,
}

#[derive(Subcommand, Debug)]
pub enum JiraCommands {
    /// Search issues with JQL
    Search {
        /// JQL query (e.g., "project = PROJ AND status = Open")
        #[arg(long)]
        jql: String,

        /// Comma-separated fields to fetch
        #[arg(long, default_value = DEFAULT_SEARCH_FIELDS)]
        fields: String,

        #[arg(long, default_value_t = 50)]
        max_results: u32,

        #[arg(long, default_value = "summary", value_parser = format_parser(ISSUE_FORMATS))]
        format: Format,
    },

    /// Show one issue
    Get {
        /// Issue key (e.g., PROJ-123)
        #[arg(long)]
        issue: String,

        #[arg(long, default_value = "summary", value_parser = format_parser(SINGLE_FORMATS))]
        format: Format,
    },

    /// Create an issue, optionally assigned and linked to an epic
    Create {
        /// Project key
        #[arg(long)]
        project: String,

        /// Issue type (Task, Bug, Story, ...)
        #[arg(long = "type")]
        issue_type: String,

        #[arg(long)]
        summary: String,

        #[arg(long)]
        description: Option<String>,

        /// Comma-separated labels
        #[arg(long)]
        labels: Option<String>,

        /// Display name, email or account ID
        #[arg(long)]
        assignee: Option<String>,

        /// Epic key to set as parent
        #[arg(long)]
        epic: Option<String>,
    },

    /// Transition, comment, reassign or rename an issue
    Update {
        #[arg(long)]
        issue: String,

        /// Transition name (case-insensitive)
        #[arg(long)]
        transition: Option<String>,

        #[arg(long)]
        comment: Option<String>,

        #[arg(long)]
        assignee: Option<String>,

        #[arg(long)]
        summary: Option<String>,
    },

    /// List the transitions available for an issue
    Transitions {
        #[arg(long)]
        issue: String,
    },

    /// Assign an issue ("none" unassigns)
    Assign {
        #[arg(long)]
        issue: String,

        #[arg(long)]
        user: String,
    },

    /// Set an issue's parent epic
    LinkEpic {
        #[arg(long)]
        issue: String,

        #[arg(long)]
        epic: String,
    },

    /// Find users by name or email
    Users {
        #[arg(long)]
        query: String,

        #[arg(long, default_value = "summary", value_parser = format_parser(LIST_FORMATS))]
        format: Format,
    },

    /// List projects
    Projects {
        #[arg(long, default_value = "summary", value_parser = format_parser(LIST_FORMATS))]
        format: Format,
    },

    /// Set start and/or due date (YYYY-MM-DD)
    Dates {
        #[arg(long)]
        issue: String,

        #[arg(long)]
        start: Option<String>,

        #[arg(long)]
        due: Option<String>,
    },

    /// Reopen a resolved issue
    Unresolve {
        #[arg(long)]
        issue: String,
    },

    /// Show the latest comments on an issue
    Comments {
        #[arg(long)]
        issue: String,

        #[arg(long, default_value_t = 20)]
        max_results: u32,
    },

    /// Add and/or remove labels
    Labels {
        #[arg(long)]
        issue: String,

        /// Comma-separated labels to add
        #[arg(long)]
        add: Option<String>,

        /// Comma-separated labels to remove
        #[arg(long)]
        remove: Option<String>,
    },

    /// List priorities, or set one on an issue
    Priority {
        #[arg(long)]
        issue: Option<String>,

        /// Priority name (e.g., High)
        #[arg(long)]
        set: Option<String>,
    },

    /// Link two issues, or list link types
    Link {
        /// Outward issue key
        #[arg(long)]
        from: Option<String>,

        /// Inward issue key
        #[arg(long)]
        to: Option<String>,

        /// Link type name (e.g., Blocks)
        #[arg(long = "type")]
        link_type: Option<String>,

        #[arg(long)]
        list_types: bool,
    },

    /// List active and future sprints, or move an issue into one
    Sprints {
        /// Board ID (default: first board)
        #[arg(long)]
        board: Option<u64>,

        /// Issue key to move
        #[arg(long = "move", requires = "to")]
        move_issue: Option<String>,

        /// Target sprint ID
        #[arg(long, requires = "move_issue")]
        to: Option<u64>,
    },

    /// List agile boards
    Boards {
        #[arg(long, default_value = "summary", value_parser = format_parser(LIST_FORMATS))]
        format: Format,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfluenceCommands {
    /// Search content with CQL
    Search {
        /// CQL query (e.g., "space = ENG AND text ~ deploy")
        #[arg(long)]
        cql: String,

        #[arg(long, default_value_t = 25)]
        limit: u32,

        #[arg(long, default_value = "summary", value_parser = format_parser(LIST_FORMATS))]
        format: Format,
    },

    /// Show one page
    Get {
        #[arg(long)]
        page_id: String,

        #[arg(long, default_value = "summary", value_parser = format_parser(PAGE_FORMATS))]
        format: Format,
    },

    /// Create a page
    Create {
        /// Space key
        #[arg(long)]
        space: String,

        #[arg(long)]
        title: String,

        /// Body in storage format (XHTML)
        #[arg(long)]
        content: String,

        #[arg(long)]
        parent_id: Option<String>,
    },

    /// Replace a page's body, bumping its version
    Update {
        #[arg(long)]
        page_id: String,

        #[arg(long)]
        content: String,

        /// New title (default: keep the current one)
        #[arg(long)]
        title: Option<String>,
    },

    /// List spaces
    Spaces {
        #[arg(long, default_value_t = 50)]
        limit: u32,

        #[arg(long, default_value = "summary", value_parser = format_parser(LIST_FORMATS))]
        format: Format,
    },
}

#[derive(Subcommand, Debug)]
pub enum GitLabCommands {
    /// List merge requests
    Mrs {
        /// Project path or ID (e.g., group/project)
        #[arg(long)]
        project: String,

        #[arg(long, default_value = "opened", value_parser = ["opened", "closed", "merged", "all"])]
        state: String,

        #[arg(long, default_value_t = 20)]
        limit: u32,

        #[arg(long, default_value = "summary", value_parser = format_parser(LIST_FORMATS))]
        format: Format,
    },

    /// Show one merge request
    Mr {
        #[arg(long)]
        project: String,

        #[arg(long)]
        mr_id: u64,

        #[arg(long, default_value = "summary", value_parser = format_parser(SINGLE_FORMATS))]
        format: Format,
    },

    /// Open a merge request
    CreateMr {
        #[arg(long)]
        project: String,

        /// Source branch
        #[arg(long)]
        source: String,

        /// Target branch
        #[arg(long)]
        target: String,

        #[arg(long)]
        title: String,

        #[arg(long, default_value = "")]
        description: String,
    },

    /// Merge a merge request
    Merge {
        #[arg(long)]
        project: String,

        #[arg(long)]
        mr_id: u64,

        #[arg(long)]
        squash: bool,

        /// Remove the source branch after merging
        #[arg(long)]
        delete_source: bool,
    },

    /// List pipelines
    Pipelines {
        #[arg(long)]
        project: String,

        /// Filter by status (running, pending, success, failed, ...)
        #[arg(long)]
        status: Option<String>,

        /// Filter by branch or tag
        #[arg(long = "ref")]
        git_ref: Option<String>,

        #[arg(long, default_value_t = 20)]
        limit: u32,

        #[arg(long, default_value = "summary", value_parser = format_parser(LIST_FORMATS))]
        format: Format,
    },

    /// Show one pipeline as raw JSON
    Pipeline {
        #[arg(long)]
        project: String,

        #[arg(long)]
        pipeline_id: u64,
    },

    /// List a pipeline's jobs
    Jobs {
        #[arg(long)]
        project: String,

        #[arg(long)]
        pipeline_id: u64,

        /// Filter by job status
        #[arg(long)]
        status: Option<String>,

        #[arg(long, default_value = "summary", value_parser = format_parser(LIST_FORMATS))]
        format: Format,
    },

    /// Retry the failed jobs of a pipeline
    Retry {
        #[arg(long)]
        project: String,

        #[arg(long)]
        pipeline_id: u64,
    },

    /// List branches
    Branches {
        #[arg(long)]
        project: String,

        #[arg(long, default_value_t = 20)]
        limit: u32,

        #[arg(long, default_value = "summary", value_parser = format_parser(LIST_FORMATS))]
        format: Format,
    },
}

#[derive(Subcommand, Debug)]
pub enum SlackCommands {
    /// Post a message to a channel
    Send {
        /// Channel name or ID (e.g., #general)
        #[arg(long)]
        channel: String,

        #[arg(long)]
        message: String,

        /// Reply in this thread
        #[arg(long)]
        thread_ts: Option<String>,

        /// Block Kit JSON array
        #[arg(long)]
        blocks: Option<String>,
    },

    /// Send a direct message
    Dm {
        /// User name, display name or ID
        #[arg(long)]
        user: String,

        #[arg(long)]
        message: String,
    },

    /// List channels
    Channels {
        #[arg(long, default_value_t = 100)]
        limit: u32,

        #[arg(long, default_value = "summary", value_parser = format_parser(LIST_FORMATS))]
        format: Format,
    },

    /// Show recent messages in a channel
    History {
        #[arg(long)]
        channel: String,

        #[arg(long, default_value_t = 20)]
        limit: u32,

        #[arg(long, default_value = "summary", value_parser = format_parser(LIST_FORMATS))]
        format: Format,
    },

    /// Search messages
    Search {
        #[arg(long)]
        query: String,

        /// Restrict to one channel
        #[arg(long)]
        in_channel: Option<String>,

        #[arg(long, default_value_t = 20)]
        limit: u32,

        #[arg(long, default_value = "summary", value_parser = format_parser(LIST_FORMATS))]
        format: Format,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_jira_search_defaults() {
        let cli = Cli::try_parse_from(["etools", "jira", "search", "--jql", "project = X"]).unwrap();
        match cli.command {
            Commands::Jira(JiraCommands::Search {
                max_results,
                format,
                fields,
                ..
            }) => {
                assert_eq!(max_results, 50);
                assert_eq!(format, Format::Summary);
                assert_eq!(fields, DEFAULT_SEARCH_FIELDS);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_reserved_word_flags() {
        let cli = Cli::try_parse_from([
            "etools", "jira", "sprints", "--move", "PROJ-1", "--to", "42",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Commands::Jira(JiraCommands::Sprints {
                move_issue: Some(_),
                to: Some(42),
                ..
            })
        ));

        let cli = Cli::try_parse_from([
            "etools", "gitlab", "pipelines", "--project", "g/p", "--ref", "main",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Commands::GitLab(GitLabCommands::Pipelines { git_ref: Some(_), .. })
        ));
    }

    #[test]
    fn test_move_requires_target_sprint() {
        let err = Cli::try_parse_from(["etools", "jira", "sprints", "--move", "PROJ-1"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn test_missing_subcommand_shows_help() {
        let err = Cli::try_parse_from(["etools"]).unwrap_err();
        assert_eq!(
            err.kind(),
            clap::error::ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
        );

        let err = Cli::try_parse_from(["etools", "slack"]).unwrap_err();
        assert_eq!(
            err.kind(),
            clap::error::ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
        );
    }

    #[test]
    fn test_format_limited_to_applicable_modes() {
        let err = Cli::try_parse_from(["etools", "jira", "search", "--jql", "x", "--format", "markdown"])
            .unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::InvalidValue);

        let err = Cli::try_parse_from(["etools", "slack", "channels", "--format", "table"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::InvalidValue);

        let cli = Cli::try_parse_from(["etools", "confluence", "get", "--page-id", "1", "--format", "markdown"])
            .unwrap();
        assert!(matches!(
            cli.command,
            Commands::Confluence(ConfluenceCommands::Get {
                format: Format::Markdown,
                ..
            })
        ));

        let cli = Cli::try_parse_from(["etools", "jira", "search", "--jql", "x", "--format", "keys"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Jira(JiraCommands::Search {
                format: Format::Keys,
                ..
            })
        ));
    }

    #[test]
    fn test_invalid_format_rejected() {
        let err = Cli::try_parse_from(["etools", "jira", "projects", "--format", "xml"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::InvalidValue);
    }
}
