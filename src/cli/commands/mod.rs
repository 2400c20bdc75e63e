//! cli::commands
//!
//! Command dispatch and handlers.
//!
//! # Architecture
//!
//! Each handler opens a [`Session`] for the working copy, calls the
//! coordinator or workflow, and turns a refused or failed action into an
//! error. The details of a failure have already been shown by the console
//! notifier by then.

mod branch;
mod config_cmd;
mod log_cmd;
mod release;
mod remote;
mod status;
mod watch;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context as _, Result};

use crate::cli::args::{Command, ConfigAction, ReleaseAction};
use crate::cli::Context;
use crate::core::config::Config;
use crate::forge::{create_release_host, token_from_env};
use crate::git::{discover_workdir, Git};
use crate::project::DetachedProject;
use crate::sync::SyncCoordinator;
use crate::ui::output::{ConsoleNotifier, Verbosity};
use crate::workflow::BranchWorkflow;

/// Dispatch a command to its handler.
pub async fn dispatch(command: Command, ctx: &Context) -> Result<()> {
    match command {
        Command::Status { fetch, json } => status::status(ctx, fetch, json).await,
        Command::Fetch => remote::fetch(ctx).await,
        Command::Pull => remote::pull(ctx).await,
        Command::Push => remote::push(ctx).await,
        Command::Switch { branch } => branch::switch(ctx, &branch).await,
        Command::AbortMerge => branch::abort_merge(ctx).await,
        Command::EnsureDev => branch::ensure_dev(ctx).await,
        Command::Publish => branch::publish(ctx).await,
        Command::Diff => branch::diff(ctx).await,
        Command::Log { count } => log_cmd::log(ctx, count).await,
        Command::Release { action } => match action {
            ReleaseAction::List => release::list(ctx).await,
            ReleaseAction::Create {
                name,
                body,
                tag,
                bump,
            } => release::create(ctx, &name, &body, tag.as_deref(), bump.into()).await,
            ReleaseAction::Next { bump } => release::next(ctx, bump.into()).await,
        },
        Command::Watch { interval } => watch::watch(ctx, interval).await,
        Command::Config { action } => match action {
            ConfigAction::Get { key } => config_cmd::get(ctx, &key),
            ConfigAction::Set { key, value } => config_cmd::set(ctx, &key, &value),
        },
    }
}

/// An open project: configuration plus its coordinator.
pub(crate) struct Session {
    pub config: Config,
    pub root: PathBuf,
    pub sync: Arc<SyncCoordinator>,
    pub verbosity: Verbosity,
}

impl Session {
    /// Discover the working copy, load config and populate sync state.
    pub async fn open(ctx: &Context) -> Result<Self> {
        let cwd = ctx.cwd()?;
        let root = discover_workdir(&cwd)
            .with_context(|| format!("'{}' is not inside a git working copy", cwd.display()))?;
        let config = Config::load(Some(&root)).context("Failed to load config")?;

        let project_id = root
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "project".to_string());
        let verbosity = ctx.verbosity();

        let sync = SyncCoordinator::new(
            project_id,
            root.clone(),
            Arc::new(Git::new(config.remote())),
            Arc::new(DetachedProject),
            Arc::new(ConsoleNotifier::new(verbosity)),
        );
        sync.set_auto_save(config.auto_save());
        sync.initialize().await;

        Ok(Self {
            config,
            root,
            sync,
            verbosity,
        })
    }

    /// Branch workflow, with a release host when the remote is on a known forge.
    pub fn workflow(&self) -> BranchWorkflow {
        let host = self.sync.state().remote_url.and_then(|url| {
            create_release_host(
                &url,
                token_from_env(),
                self.config.forge_provider(),
                self.config.forge_api_base(),
            )
            .map_err(|err| tracing::debug!(%err, "no release host"))
            .ok()
        });
        BranchWorkflow::new(Arc::clone(&self.sync), host)
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.sync.close();
    }
}

/// Turn a refused action into an error.
pub(crate) fn ensure(ok: bool, what: &str) -> Result<()> {
    if !ok {
        bail!("{what} did not complete");
    }
    Ok(())
}
