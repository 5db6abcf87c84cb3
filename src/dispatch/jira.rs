use super::Context;
use crate::commands::JiraCommands;
use crate::config::{Service, TransitionAliases};
use crate::integrations::jira::{parse_date, split_list, START_DATE_FIELD_KEY};
use crate::integrations::JiraClient;
use crate::output::{format_list, format_one, Format, Record};
use crate::workflow::{CreateIssue, JiraWorkflow, Report, UpdateIssue};
use crate::{Result, ToolsError};

fn client(ctx: &Context) -> Result<JiraClient> {
    let jira = JiraClient::connect(&ctx.credentials(Service::Jira)?, ctx.transport())?;
    Ok(match ctx.store().lookup(START_DATE_FIELD_KEY) {
        Some(field) => jira.with_start_date_field(field),
        None => jira,
    })
}

pub(super) async fn run(cmd: JiraCommands, ctx: &Context, report: &mut Report) -> Result<()> {
    let jira = client(ctx)?;
    let mut workflow = JiraWorkflow::new(&jira, TransitionAliases::from_store(ctx.store()));

    match cmd {
        JiraCommands::Search {
            jql,
            fields,
            max_results,
            format,
        } => {
            let issues = jira.search(&jql, &split_list(&fields), max_results).await?;
            report.emit(format_list(&issues, format)?);
        }

        JiraCommands::Get { issue, format } => {
            let detail = jira.issue(&issue).await?;
            report.emit(format_one(&detail, format)?);
        }

        JiraCommands::Create {
            project,
            issue_type,
            summary,
            description,
            labels,
            assignee,
            epic,
        } => {
            let request = CreateIssue {
                project,
                issue_type,
                summary,
                description,
                labels: labels.as_deref().map(split_list).unwrap_or_default(),
                assignee,
                epic,
            };
            workflow.create_issue(request, report).await?;
        }

        JiraCommands::Update {
            issue,
            transition,
            comment,
            assignee,
            summary,
        } => {
            let request = UpdateIssue {
                issue,
                transition,
                comment,
                assignee,
                summary,
            };
            workflow.update(request, report).await?;
        }

        JiraCommands::Transitions { issue } => {
            let transitions = jira.transitions(&issue).await?;
            report.emit(format_list(&transitions, Format::Summary)?);
        }

        JiraCommands::Assign { issue, user } => {
            workflow.assign(&issue, &user, report).await?;
        }

        JiraCommands::LinkEpic { issue, epic } => {
            jira.set_parent(&issue, &epic).await?;
            report.emit(format!("Linked {issue} to epic {epic}"));
        }

        JiraCommands::Users { query, format } => {
            let users = jira.search_users(&query, 50).await?;
            report.emit(format_list(&users, format)?);
        }

        JiraCommands::Projects { format } => {
            let projects = jira.projects().await?;
            report.emit(format_list(&projects, format)?);
        }

        JiraCommands::Dates { issue, start, due } => {
            let start_date = start.as_deref().map(parse_date).transpose()?;
            let due_date = due.as_deref().map(parse_date).transpose()?;

            jira.set_dates(&issue, start_date, due_date).await?;

            let mut changes = Vec::new();
            if let Some(date) = start_date {
                changes.push(format!("start={date}"));
            }
            if let Some(date) = due_date {
                changes.push(format!("due={date}"));
            }
            report.emit(format!("Updated {issue}: {}", changes.join(", ")));
        }

        JiraCommands::Unresolve { issue } => {
            workflow.unresolve(&issue, report).await?;
        }

        JiraCommands::Comments { issue, max_results } => {
            let comments = jira.comments(&issue, max_results).await?;
            if comments.is_empty() {
                report.emit("No comments found");
            } else {
                report.emit(format_list(&comments, Format::Summary)?);
            }
        }

        JiraCommands::Labels { issue, add, remove } => {
            let add = add.as_deref().map(split_list).unwrap_or_default();
            let remove = remove.as_deref().map(split_list).unwrap_or_default();
            if add.is_empty() && remove.is_empty() {
                return Err(ToolsError::Validation(
                    "Specify --add and/or --remove labels".to_string(),
                ));
            }

            jira.update_labels(&issue, &add, &remove).await?;

            let mut changes = Vec::new();
            if !add.is_empty() {
                changes.push(format!("added: {}", add.join(", ")));
            }
            if !remove.is_empty() {
                changes.push(format!("removed: {}", remove.join(", ")));
            }
            report.emit(format!("Updated {issue} labels: {}", changes.join("; ")));
        }

        JiraCommands::Priority { issue, set } => match (issue, set) {
            (Some(issue), Some(priority)) => {
                jira.set_priority(&issue, &priority).await?;
                report.emit(format!("Set {issue} priority to {priority}"));
            }
            (Some(_), None) => {
                return Err(ToolsError::Validation(
                    "Specify --set with the priority name".to_string(),
                ));
            }
            (None, _) => {
                let priorities = jira.priorities().await?;
                report.emit("Available priorities:");
                for priority in priorities {
                    report.emit(format!("  {}", priority.name));
                }
            }
        },

        JiraCommands::Link {
            from,
            to,
            link_type,
            list_types,
        } => {
            if list_types {
                let types = jira.link_types().await?;
                report.emit("Available link types:");
                for link_type in &types {
                    report.emit(format!("  {}", link_type.summary_line()));
                }
                return Ok(());
            }

            let (Some(from), Some(to), Some(link_type)) = (from, to, link_type) else {
                return Err(ToolsError::Validation(
                    "Specify --from, --to and --type, or use --list-types".to_string(),
                ));
            };
            jira.link_issues(&from, &to, &link_type).await?;
            report.emit(format!("Linked {from} → {to} ({link_type})"));
        }

        JiraCommands::Sprints {
            board,
            move_issue,
            to,
        } => {
            if let (Some(issue), Some(sprint_id)) = (move_issue, to) {
                jira.move_to_sprint(&issue, sprint_id).await?;
                report.emit(format!("Moved {issue} to sprint {sprint_id}"));
                return Ok(());
            }

            let sprints = jira.sprints(board).await?;
            if sprints.is_empty() {
                report.emit("No active/future sprints found");
            } else {
                report.emit(format_list(&sprints, Format::Summary)?);
            }
        }

        JiraCommands::Boards { format } => {
            let boards = jira.boards().await?;
            report.emit(format_list(&boards, format)?);
        }
    }

    Ok(())
}
