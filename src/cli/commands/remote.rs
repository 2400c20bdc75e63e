//! fetch, pull and push commands

use anyhow::{bail, Result};

use super::{ensure, Session};
use crate::cli::Context;
use crate::ui::output;

fn require_remote(session: &Session) -> Result<()> {
    if !session.sync.state().has_remote() {
        bail!("No remote configured for {}", session.root.display());
    }
    Ok(())
}

/// Fetch and report what changed.
pub async fn fetch(ctx: &Context) -> Result<()> {
    let session = Session::open(ctx).await?;
    require_remote(&session)?;

    if !session.sync.fetch().await {
        if session.sync.state().is_offline {
            bail!("The remote could not be reached");
        }
        bail!("Fetch did not complete");
    }
    let state = session.sync.state();
    output::print(
        format!("Fetched: {} ahead, {} behind", state.ahead, state.behind),
        session.verbosity,
    );
    Ok(())
}

/// Fast-forward pull.
pub async fn pull(ctx: &Context) -> Result<()> {
    let session = Session::open(ctx).await?;
    require_remote(&session)?;

    let state = session.sync.state();
    if state.behind == 0 {
        output::print("Already up to date", session.verbosity);
        return Ok(());
    }
    ensure(session.sync.pull().await, "Pull")?;
    output::print("Pulled latest changes", session.verbosity);
    Ok(())
}

/// Push the current branch.
pub async fn push(ctx: &Context) -> Result<()> {
    let session = Session::open(ctx).await?;
    require_remote(&session)?;

    let state = session.sync.state();
    if state.is_diverged() {
        bail!(
            "Local and remote have diverged ({} ahead, {} behind); push to another branch and open a pull request",
            state.ahead,
            state.behind
        );
    }
    ensure(session.sync.push().await, "Push")
}
