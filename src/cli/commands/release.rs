//! release command - List and create releases on the hosting forge

use anyhow::{bail, Result};

use super::Session;
use crate::cli::Context;
use crate::core::types::{ReleaseTag, VersionBump};
use crate::ui::output;
use crate::workflow::BranchWorkflow;

fn workflow_with_host(session: &Session) -> Result<BranchWorkflow> {
    let workflow = session.workflow();
    if !workflow.has_release_host() {
        bail!("Releases need a remote on a supported forge (github)");
    }
    Ok(workflow)
}

/// List releases, newest first.
pub async fn list(ctx: &Context) -> Result<()> {
    let session = Session::open(ctx).await?;
    let workflow = workflow_with_host(&session)?;

    let releases = workflow.load_releases().await;
    if releases.is_empty() {
        output::print("No releases", session.verbosity);
    }
    for release in &releases {
        output::print(output::format_release(release), session.verbosity);
    }
    Ok(())
}

/// Create a release, defaulting the tag to the next version.
pub async fn create(
    ctx: &Context,
    name: &str,
    body: &str,
    tag: Option<&str>,
    bump: VersionBump,
) -> Result<()> {
    let session = Session::open(ctx).await?;
    let workflow = workflow_with_host(&session)?;
    workflow.load_releases().await;

    let tag = match tag {
        Some(tag) => tag.parse::<ReleaseTag>()?.to_string(),
        None => workflow.next_release_version(bump).to_string(),
    };

    match workflow.create_release(&tag, name, body).await {
        Some(release) => {
            output::print(release.html_url, session.verbosity);
            Ok(())
        }
        None => bail!("Release {tag} was not created"),
    }
}

/// Print the next version.
pub async fn next(ctx: &Context, bump: VersionBump) -> Result<()> {
    let session = Session::open(ctx).await?;
    let workflow = workflow_with_host(&session)?;
    workflow.load_releases().await;
    println!("{}", workflow.next_release_version(bump));
    Ok(())
}
