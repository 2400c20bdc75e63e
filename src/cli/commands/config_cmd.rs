//! config command - Get or set configuration values

use anyhow::{Context as _, Result};

use crate::cli::Context;
use crate::core::config::Config;
use crate::git::discover_workdir;
use crate::ui::output;

/// Print the effective value of a key.
pub fn get(ctx: &Context, key: &str) -> Result<()> {
    let root = discover_workdir(&ctx.cwd()?).ok();
    let config = Config::load(root.as_deref()).context("Failed to load config")?;
    let value = config.get(key)?;
    if !value.is_empty() {
        println!("{}", value);
    }
    Ok(())
}

/// Set a key in the repository config.
pub fn set(ctx: &Context, key: &str, value: &str) -> Result<()> {
    let cwd = ctx.cwd()?;
    let root = discover_workdir(&cwd)
        .with_context(|| format!("'{}' is not inside a git working copy", cwd.display()))?;
    let path = Config::set_repo_value(&root, key, value)?;
    output::print(
        format!("Set {} = {} ({})", key, value, path.display()),
        ctx.verbosity(),
    );
    Ok(())
}
