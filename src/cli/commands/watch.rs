//! watch command - Poll the remote until interrupted

use std::time::Duration;

use anyhow::{bail, Context as _, Result};

use super::Session;
use crate::cli::Context;
use crate::ui::output;

/// Run the background poller until Ctrl-C.
pub async fn watch(ctx: &Context, interval: Option<u64>) -> Result<()> {
    let session = Session::open(ctx).await?;
    if !session.sync.state().has_remote() {
        bail!("No remote configured; nothing to watch");
    }

    let period = match interval {
        Some(0) => bail!("--interval must be greater than zero"),
        Some(secs) => Duration::from_secs(secs),
        None => session.config.poll_interval(),
    };

    session.sync.start_background_fetch(period);
    output::print(
        format!(
            "Watching {} every {}s (Ctrl-C to stop)",
            session.root.display(),
            period.as_secs()
        ),
        session.verbosity,
    );

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;
    session.sync.stop_background_fetch();
    output::print(
        output::format_status(&session.sync.state()),
        session.verbosity,
    );
    Ok(())
}
