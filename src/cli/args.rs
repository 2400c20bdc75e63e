//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Global Flags
//!
//! These flags are available on all commands:
//! - `--help` / `-h`: Show help
//! - `--version`: Show version
//! - `--cwd <path>`: Run as if in that directory
//! - `--debug`: Enable debug logging
//! - `--quiet` / `-q`: Minimal output

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::core::types::VersionBump;

/// reposync - keep a shared project repository in sync
#[derive(Parser, Debug)]
#[command(name = "reposync")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Run as if reposync was started in this directory
    #[arg(long, global = true)]
    pub cwd: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Minimal output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }
}

/// Which part of a release version to bump.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BumpArg {
    Minor,
    Major,
}

impl From<BumpArg> for VersionBump {
    fn from(bump: BumpArg) -> Self {
        match bump {
            BumpArg::Minor => VersionBump::Minor,
            BumpArg::Major => VersionBump::Major,
        }
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show branch, ahead/behind counts and working tree state
    Status {
        /// Fetch before reporting
        #[arg(long)]
        fetch: bool,

        /// Print machine-readable JSON
        #[arg(long)]
        json: bool,
    },

    /// Fetch from the remote
    Fetch,

    /// Fast-forward the current branch to the remote
    Pull,

    /// Push the current branch
    Push,

    /// Switch branches (refused with uncommitted changes)
    Switch {
        /// Branch to check out
        branch: String,
    },

    /// Abort an in-progress merge
    AbortMerge,

    /// Create the dev branch from main if it does not exist
    EnsureDev,

    /// Fast-forward main to dev and push it
    #[command(
        long_about = "Fast-forward main to dev and push it.\n\n\
            Checks out main, merges dev with --ff-only, pushes main when a remote \
            exists and checks dev out again. If the fast-forward is impossible, dev \
            is checked out again before the error is reported."
    )]
    Publish,

    /// Compare dev and main
    Diff,

    /// Show recent commits
    Log {
        /// Number of commits
        #[arg(short = 'n', long, default_value_t = 10)]
        count: usize,
    },

    /// Manage releases on the hosting forge
    Release {
        #[command(subcommand)]
        action: ReleaseAction,
    },

    /// Poll the remote in the background until interrupted
    Watch {
        /// Poll interval in seconds (default: config `poll_interval_secs`)
        #[arg(long)]
        interval: Option<u64>,
    },

    /// Get or set configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Release subcommands.
#[derive(Subcommand, Debug)]
pub enum ReleaseAction {
    /// List releases, newest first
    List,

    /// Create a release of main
    Create {
        /// Release title
        #[arg(long)]
        name: String,

        /// Release notes
        #[arg(long, default_value = "")]
        body: String,

        /// Tag to create (default: the next version)
        #[arg(long)]
        tag: Option<String>,

        /// Version component to bump when no tag is given
        #[arg(long, value_enum, default_value_t = BumpArg::Minor)]
        bump: BumpArg,
    },

    /// Print the next release version
    Next {
        #[arg(long, value_enum, default_value_t = BumpArg::Minor)]
        bump: BumpArg,
    },
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the effective value of a key
    Get { key: String },

    /// Set a key in the repository config
    Set { key: String, value: String },
}
