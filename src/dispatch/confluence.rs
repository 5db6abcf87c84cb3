use super::Context;
use crate::commands::ConfluenceCommands;
use crate::config::Service;
use crate::integrations::ConfluenceClient;
use crate::output::{format_list, format_one};
use crate::workflow::{update_page, Report};
use crate::Result;

pub(super) async fn run(cmd: ConfluenceCommands, ctx: &Context, report: &mut Report) -> Result<()> {
    let confluence =
        ConfluenceClient::connect(&ctx.credentials(Service::Confluence)?, ctx.transport())?;

    match cmd {
        ConfluenceCommands::Search { cql, limit, format } => {
            let pages = confluence.search(&cql, limit).await?;
            report.emit(format_list(&pages, format)?);
        }

        ConfluenceCommands::Get { page_id, format } => {
            let page = confluence.page(&page_id).await?;
            report.emit(format_one(&page, format)?);
        }

        ConfluenceCommands::Create {
            space,
            title,
            content,
            parent_id,
        } => {
            let page = confluence
                .create_page(&space, &title, &content, parent_id.as_deref())
                .await?;
            report.emit(format!("Created: [{}] {} in {}", page.id, page.title, space));
        }

        ConfluenceCommands::Update {
            page_id,
            content,
            title,
        } => {
            update_page(&confluence, &page_id, &content, title.as_deref(), report).await?;
        }

        ConfluenceCommands::Spaces { limit, format } => {
            let spaces = confluence.spaces(limit).await?;
            report.emit(format_list(&spaces, format)?);
        }
    }

    Ok(())
}
