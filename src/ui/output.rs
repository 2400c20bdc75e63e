//! ui::output
//!
//! Output formatting and display.
//!
//! # Design
//!
//! Formatting functions return strings so they can be tested; the `print`
//! family writes them out and respects the quiet flag. Errors always go to
//! stderr.

use std::fmt::Display;

use crate::forge::Release;
use crate::git::CommitInfo;
use crate::project::BranchDelta;
use crate::sync::{Level, Notification, Notifier, SyncState};
use crate::workflow::BranchDiff;

/// Output verbosity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    /// Quiet mode - minimal output
    Quiet,
    /// Normal mode - standard output
    Normal,
    /// Debug mode - verbose output
    Debug,
}

impl Verbosity {
    /// Create verbosity from flags.
    pub fn from_flags(quiet: bool, debug: bool) -> Self {
        if quiet {
            Verbosity::Quiet
        } else if debug {
            Verbosity::Debug
        } else {
            Verbosity::Normal
        }
    }
}

/// Print a message (respects quiet mode).
pub fn print(message: impl Display, verbosity: Verbosity) {
    if verbosity != Verbosity::Quiet {
        println!("{}", message);
    }
}

/// Print an error message (always shown).
pub fn error(message: impl Display) {
    eprintln!("error: {}", message);
}

/// Print a warning message (respects quiet mode).
pub fn warn(message: impl Display, verbosity: Verbosity) {
    if verbosity != Verbosity::Quiet {
        eprintln!("warning: {}", message);
    }
}

/// Renders notifications on the terminal.
#[derive(Debug, Clone, Copy)]
pub struct ConsoleNotifier {
    verbosity: Verbosity,
}

impl ConsoleNotifier {
    pub fn new(verbosity: Verbosity) -> Self {
        Self { verbosity }
    }
}

impl Notifier for ConsoleNotifier {
    fn notify(&self, notification: Notification) {
        match notification.level {
            Level::Error => error(format_notification(&notification)),
            Level::Warning => warn(format_notification(&notification), self.verbosity),
            Level::Info | Level::Success => {
                print(format_notification(&notification), self.verbosity)
            }
        }
    }
}

/// `Title: message`, or just the title when there is no message.
pub fn format_notification(notification: &Notification) -> String {
    if notification.message.is_empty() {
        notification.title.clone()
    } else {
        format!("{}: {}", notification.title, notification.message)
    }
}

/// Multi-line summary of the sync state.
pub fn format_status(state: &SyncState) -> String {
    let mut lines = vec![format!("On branch {}", state.current_branch)];

    match &state.remote_url {
        None => lines.push("No remote configured".to_string()),
        Some(url) => {
            lines.push(format!("Remote: {}", url));
            lines.push(match (state.ahead, state.behind) {
                (0, 0) => "Up to date with the remote".to_string(),
                (a, 0) => format!("{} commit(s) to push", a),
                (0, b) => format!("{} commit(s) to pull", b),
                (a, b) => format!(
                    "Diverged: {} local and {} remote commit(s); push to a branch or open a pull request",
                    a, b
                ),
            });
        }
    }

    if state.is_clean {
        lines.push("Working tree clean".to_string());
    } else {
        lines.push(format!(
            "{} uncommitted change(s)",
            state.uncommitted_changes
        ));
    }
    if state.has_merge_conflict {
        lines.push("Merge in progress (run `reposync abort-merge` to abort)".to_string());
    }
    if state.is_offline {
        lines.push("Offline: the remote could not be reached".to_string());
    }
    if let Some(commit) = &state.last_commit {
        lines.push(format!("Last commit: {}", format_commit(commit)));
    }
    lines.join("\n")
}

/// `abcd1234 summary (author, date)`.
pub fn format_commit(commit: &CommitInfo) -> String {
    format!(
        "{} {} ({}, {})",
        commit.short_hash,
        commit.summary(),
        commit.author,
        commit.timestamp.as_datetime().format("%Y-%m-%d %H:%M")
    )
}

/// `v1.2  name  created_at`.
pub fn format_release(release: &Release) -> String {
    format!(
        "{}  {}  {}",
        release.tag_name, release.name, release.created_at
    )
}

pub fn format_branch_diff(diff: &BranchDiff) -> String {
    if diff.in_sync() {
        "dev and main are in sync".to_string()
    } else {
        format!(
            "dev is {} commit(s) ahead of main, main is {} commit(s) ahead of dev",
            diff.dev_ahead_of_main, diff.main_ahead_of_dev
        )
    }
}

pub fn format_branch_delta(delta: &BranchDelta) -> String {
    let mut lines = vec![format!(
        "{} new, {} changed, {} removed record(s)",
        delta.new_records, delta.changed_records, delta.removed_records
    )];
    for stage in &delta.by_stage {
        lines.push(format!(
            "  {}: +{} ~{} -{}",
            stage.stage, stage.new, stage.changed, stage.removed
        ));
    }
    lines.join("\n")
}
