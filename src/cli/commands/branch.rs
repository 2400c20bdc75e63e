//! Branch commands: switch, abort-merge, ensure-dev, publish, diff

use anyhow::{bail, Context as _, Result};

use super::{ensure, Session};
use crate::cli::Context;
use crate::core::types::BranchName;
use crate::ui::output;

/// Switch to another branch.
pub async fn switch(ctx: &Context, branch: &str) -> Result<()> {
    let branch = BranchName::new(branch).context("Invalid branch name")?;
    let session = Session::open(ctx).await?;

    if session.sync.state().is_on(&branch) {
        output::print(format!("Already on '{}'", branch), session.verbosity);
        return Ok(());
    }
    ensure(session.sync.switch_branch(&branch).await, "Switch")?;
    output::print(format!("Switched to '{}'", branch), session.verbosity);
    Ok(())
}

/// Abort an in-progress merge.
pub async fn abort_merge(ctx: &Context) -> Result<()> {
    let session = Session::open(ctx).await?;
    if !session.sync.state().has_merge_conflict {
        bail!("No merge in progress");
    }
    ensure(session.sync.abort_merge().await, "Abort merge")?;
    output::print("Merge aborted", session.verbosity);
    Ok(())
}

/// Create the dev branch if needed.
pub async fn ensure_dev(ctx: &Context) -> Result<()> {
    let session = Session::open(ctx).await?;
    let workflow = session.workflow();
    ensure(workflow.ensure_dev_branch().await, "Creating the dev branch")?;
    output::print(
        format!("On '{}'", session.sync.state().current_branch),
        session.verbosity,
    );
    Ok(())
}

/// Fast-forward main to dev.
pub async fn publish(ctx: &Context) -> Result<()> {
    let session = Session::open(ctx).await?;
    if !session.sync.state().has_local_branch(&BranchName::dev()) {
        bail!("There is no dev branch to publish; run `reposync ensure-dev` first");
    }
    ensure(session.workflow().merge_dev_into_main().await, "Publish")
}

/// Show commit and record differences between dev and main.
pub async fn diff(ctx: &Context) -> Result<()> {
    let session = Session::open(ctx).await?;
    let workflow = session.workflow();

    let Some(diff) = workflow.refresh_branch_diff().await else {
        bail!("There is no dev branch");
    };
    output::print(output::format_branch_diff(&diff), session.verbosity);

    if let Some(delta) = workflow.refresh_branch_delta().await {
        output::print(output::format_branch_delta(&delta), session.verbosity);
    }
    Ok(())
}
