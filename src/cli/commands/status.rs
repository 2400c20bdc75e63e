//! status command - Show sync state of the working copy

use anyhow::{Context as _, Result};

use super::Session;
use crate::cli::Context;
use crate::ui::output;

/// Print branch, ahead/behind and working tree state.
pub async fn status(ctx: &Context, fetch: bool, json: bool) -> Result<()> {
    let session = Session::open(ctx).await?;
    if fetch && session.sync.state().has_remote() {
        session.sync.fetch().await;
    }
    let state = session.sync.state();

    if json {
        let text = serde_json::to_string_pretty(&state).context("Failed to serialize status")?;
        println!("{}", text);
    } else {
        output::print(output::format_status(&state), session.verbosity);
    }
    Ok(())
}
