use super::Context;
use crate::commands::GitLabCommands;
use crate::config::Service;
use crate::integrations::gitlab::NewMergeRequest;
use crate::integrations::GitLabClient;
use crate::output::{format_list, format_one};
use crate::workflow::Report;
use crate::Result;

pub(super) async fn run(cmd: GitLabCommands, ctx: &Context, report: &mut Report) -> Result<()> {
    let gitlab = GitLabClient::connect(&ctx.credentials(Service::GitLab)?, ctx.transport())?;

    match cmd {
        GitLabCommands::Mrs {
            project,
            state,
            limit,
            format,
        } => {
            let mrs = gitlab.merge_requests(&project, &state, limit).await?;
            report.emit(format_list(&mrs, format)?);
        }

        GitLabCommands::Mr {
            project,
            mr_id,
            format,
        } => {
            let mr = gitlab.merge_request(&project, mr_id).await?;
            report.emit(format_one(&mr, format)?);
        }

        GitLabCommands::CreateMr {
            project,
            source,
            target,
            title,
            description,
        } => {
            let request = NewMergeRequest {
                source,
                target,
                title,
                description,
            };
            let mr = gitlab.create_merge_request(&project, &request).await?;
            report.emit(format!("Created !{}: {}", mr.iid, mr.title));
            report.emit(mr.web_url);
        }

        GitLabCommands::Merge {
            project,
            mr_id,
            squash,
            delete_source,
        } => {
            gitlab.merge(&project, mr_id, squash, delete_source).await?;
            report.emit(format!("Merged !{mr_id}"));
        }

        GitLabCommands::Pipelines {
            project,
            status,
            git_ref,
            limit,
            format,
        } => {
            let pipelines = gitlab
                .pipelines(&project, status.as_deref(), git_ref.as_deref(), limit)
                .await?;
            report.emit(format_list(&pipelines, format)?);
        }

        GitLabCommands::Pipeline {
            project,
            pipeline_id,
        } => {
            let pipeline = gitlab.pipeline(&project, pipeline_id).await?;
            report.emit(serde_json::to_string_pretty(&pipeline)?);
        }

        GitLabCommands::Jobs {
            project,
            pipeline_id,
            status,
            format,
        } => {
            let jobs = gitlab.jobs(&project, pipeline_id, status.as_deref()).await?;
            report.emit(format_list(&jobs, format)?);
        }

        GitLabCommands::Retry {
            project,
            pipeline_id,
        } => {
            gitlab.retry_pipeline(&project, pipeline_id).await?;
            report.emit(format!("Retrying pipeline #{pipeline_id}"));
        }

        GitLabCommands::Branches {
            project,
            limit,
            format,
        } => {
            let branches = gitlab.branches(&project, limit).await?;
            report.emit(format_list(&branches, format)?);
        }
    }

    Ok(())
}
