//! log command - Show recent commits

use anyhow::Result;

use super::Session;
use crate::cli::Context;
use crate::ui::output;

/// Print the latest `count` commits on HEAD.
pub async fn log(ctx: &Context, count: usize) -> Result<()> {
    let session = Session::open(ctx).await?;
    for commit in session.sync.recent_commits(count).await {
        output::print(output::format_commit(&commit), session.verbosity);
    }
    Ok(())
}
