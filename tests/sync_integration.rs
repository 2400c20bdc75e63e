//! Integration tests for the sync coordinator and its background poller.

mod support;

use std::time::Duration;

use reposync::core::types::{BranchName, UtcTimestamp};
use reposync::git::mock::{MockOperation, MockVcs, OpKind};
use reposync::git::{CommitInfo, VcsError};
use reposync::guard::OperationGuard;
use reposync::project::mock::ProjectCall;
use reposync::project::ProjectError;
use reposync::sync::{Level, SyncState};

use support::{Harness, REMOTE};

fn commit(short: &str, message: &str) -> CommitInfo {
    CommitInfo {
        hash: format!("{short}0000000000000000000000000000000"),
        short_hash: short.to_string(),
        message: message.to_string(),
        author: "Ada".to_string(),
        email: "ada@example.org".to_string(),
        timestamp: UtcTimestamp::now(),
    }
}

// =============================================================================
// Initialization and refresh
// =============================================================================

#[tokio::test]
async fn initialize_populates_status_and_branches() {
    let vcs = MockVcs::new().with_remote(REMOTE).with_branch("dev");
    vcs.set_counts(1, 0);
    vcs.set_merge_conflict(true);
    let h = Harness::new(vcs).await;

    let state = h.sync.state();
    assert_eq!(state.current_branch, "main");
    assert_eq!(state.ahead, 1);
    assert_eq!(state.remote_url.as_deref(), Some(REMOTE));
    assert!(state.has_merge_conflict);
    assert!(state.has_local_branch(&BranchName::dev()));
    assert!(state.branches.iter().any(|b| b.is_remote));
}

#[tokio::test]
async fn failed_status_refresh_leaves_state_untouched() {
    let h = Harness::with_remote(0, 1).await;
    let before = h.sync.state();

    h.vcs.set_counts(4, 4);
    h.vcs
        .fail(OpKind::Status, VcsError::Other("index corrupt".into()));

    assert!(!h.sync.refresh_status().await);
    assert_eq!(h.sync.state(), before);
}

#[tokio::test]
async fn refresh_mirrors_status_into_project() {
    let h = Harness::local().await;
    h.sync.refresh_status().await;
    assert!(h.project.calls().contains(&ProjectCall::RefreshGitStatus {
        branch: "main".into()
    }));
}

// =============================================================================
// Fetch
// =============================================================================

#[tokio::test]
async fn fetch_updates_counts_and_timestamp() {
    let h = Harness::with_remote(0, 0).await;
    h.vcs.set_incoming(2);
    assert!(h.sync.state().last_fetch_time.is_none());

    assert!(h.sync.fetch().await);

    let state = h.sync.state();
    assert_eq!(state.behind, 2);
    assert!(state.last_fetch_time.is_some());
    assert!(!state.is_offline);
}

#[tokio::test]
async fn unreachable_remote_sets_offline_silently() {
    let h = Harness::with_remote(0, 0).await;
    h.vcs.fail(
        OpKind::Fetch,
        VcsError::Network("Could not resolve host: github.com".into()),
    );

    assert!(!h.sync.fetch().await);
    assert!(h.sync.state().is_offline);
    assert!(h.notifier.notifications().is_empty());

    h.vcs.clear_failure(OpKind::Fetch);
    assert!(h.sync.fetch().await);
    assert!(!h.sync.state().is_offline);
}

#[tokio::test]
async fn other_fetch_failures_notify() {
    let h = Harness::with_remote(0, 0).await;
    h.vcs.fail(
        OpKind::Fetch,
        VcsError::Other("Permission denied (publickey)".into()),
    );

    assert!(!h.sync.fetch().await);
    assert!(!h.sync.state().is_offline);
    let errors = h.notifier.errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].title, "Fetch failed");
    assert!(errors[0].message.contains("publickey"));
}

// =============================================================================
// Pull
// =============================================================================

#[tokio::test]
async fn pull_fast_forwards() {
    let h = Harness::with_remote(0, 3).await;
    assert!(h.sync.pull().await);
    assert_eq!(h.sync.state().behind, 0);
    assert_eq!(h.vcs.mutations(), vec![MockOperation::Pull { ff_only: true }]);
}

#[tokio::test]
async fn diverged_pull_changes_nothing() {
    let h = Harness::with_remote(2, 3).await;
    let before = h.sync.state();

    assert!(!h.sync.pull().await);

    assert_eq!(h.sync.state(), before);
    assert_eq!(h.vcs.count(OpKind::Status), 0);
    let errors = h.notifier.errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].title, "Cannot pull");
}

#[tokio::test]
async fn concurrent_pull_is_rejected() {
    let h = Harness::with_remote(0, 1).await;
    let gate = h.vcs.hold(OpKind::Pull);

    let first = tokio::spawn({
        let sync = h.sync.clone();
        async move { sync.pull().await }
    });
    while h.vcs.count(OpKind::Pull) == 0 {
        tokio::task::yield_now().await;
    }

    assert!(h.sync.is_pulling());
    assert!(!h.sync.pull().await);
    assert!(!h.sync.auto_sync_if_safe().await);

    gate.notify_one();
    assert!(first.await.unwrap());
    assert!(!h.sync.is_pulling());
    assert_eq!(h.vcs.count(OpKind::Pull), 1);
}

// =============================================================================
// Push
// =============================================================================

#[tokio::test]
async fn push_sends_local_commits() {
    let h = Harness::with_remote(2, 0).await;

    assert!(h.sync.push().await);

    assert_eq!(h.sync.state().ahead, 0);
    let last = h.notifier.notifications().pop().unwrap();
    assert_eq!(last.level, Level::Success);
    assert_eq!(last.title, "Changes pushed");
}

#[tokio::test]
async fn diverged_push_is_refused_before_git() {
    let h = Harness::with_remote(1, 1).await;

    assert!(!h.sync.push().await);

    assert_eq!(h.vcs.count(OpKind::Push), 0);
    assert_eq!(h.notifier.titles(), vec!["Cannot push"]);
}

#[tokio::test]
async fn concurrent_push_is_rejected() {
    let h = Harness::with_remote(1, 0).await;
    let _gate = h.vcs.hold(OpKind::Push);

    let first = tokio::spawn({
        let sync = h.sync.clone();
        async move { sync.push().await }
    });
    while h.vcs.count(OpKind::Push) == 0 {
        tokio::task::yield_now().await;
    }

    assert!(h.sync.is_pushing());
    assert!(!h.sync.push().await);

    h.vcs.release(OpKind::Push);
    assert!(first.await.unwrap());
    assert_eq!(h.vcs.count(OpKind::Push), 1);
}

// =============================================================================
// Branch switching
// =============================================================================

#[tokio::test]
async fn dirty_switch_is_refused_without_checkout() {
    let h = Harness::new(MockVcs::new().with_branch("dev")).await;
    h.vcs.set_clean(false);

    assert!(!h.sync.switch_branch(&BranchName::dev()).await);

    assert_eq!(h.vcs.count(OpKind::Checkout), 0);
    assert_eq!(h.vcs.current_branch(), "main");
    assert_eq!(h.project.reloads(), 0);
    assert_eq!(h.notifier.titles(), vec!["Cannot switch branch"]);
}

#[tokio::test]
async fn clean_switch_checks_out_and_reloads() {
    let h = Harness::new(MockVcs::new().with_branch("dev")).await;

    assert!(h.sync.switch_branch(&BranchName::dev()).await);

    assert_eq!(h.vcs.current_branch(), "dev");
    assert!(h.sync.state().is_on(&BranchName::dev()));
    assert_eq!(h.project.reloads(), 1);
    assert!(h.project.calls().contains(&ProjectCall::LoadProject {
        project_id: "review".into()
    }));
}

#[tokio::test]
async fn switch_to_unknown_branch_fails() {
    let h = Harness::local().await;
    let branch = BranchName::new("screening").unwrap();

    assert!(!h.sync.switch_branch(&branch).await);

    assert_eq!(h.sync.state().current_branch, "main");
    assert_eq!(h.project.reloads(), 0);
    assert_eq!(h.notifier.titles(), vec!["Switch failed"]);
}

#[tokio::test]
async fn failed_reload_warns_but_switch_succeeds() {
    let h = Harness::new(MockVcs::new().with_branch("dev")).await;
    h.project
        .set_load_error(Some(ProjectError::Failed("records.bib unreadable".into())));

    assert!(h.sync.switch_branch(&BranchName::dev()).await);

    let notes = h.notifier.notifications();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].level, Level::Warning);
}

// =============================================================================
// Auto-sync
// =============================================================================

#[tokio::test]
async fn auto_sync_pulls_when_safe() {
    let h = Harness::with_remote(0, 2).await;
    assert!(h.sync.auto_sync_if_safe().await);
    assert_eq!(h.sync.state().behind, 0);
}

#[tokio::test]
async fn auto_sync_declines_when_unsafe() {
    let dirty = Harness::with_remote(0, 2).await;
    dirty.vcs.set_clean(false);
    dirty.sync.refresh_status().await;
    dirty.vcs.clear_operations();
    assert!(!dirty.sync.auto_sync_if_safe().await);
    assert_eq!(dirty.vcs.count(OpKind::Pull), 0);

    let ahead = Harness::with_remote(1, 0).await;
    assert!(!ahead.sync.auto_sync_if_safe().await);

    let diverged = Harness::with_remote(1, 2).await;
    assert!(!diverged.sync.auto_sync_if_safe().await);
    assert_eq!(diverged.vcs.count(OpKind::Pull), 0);

    let local = Harness::local().await;
    assert!(!local.sync.auto_sync_if_safe().await);
}

#[tokio::test]
async fn auto_sync_stands_down_during_guarded_operation() {
    let h = Harness::with_remote(0, 0).await;
    let guard = OperationGuard::new(h.sync.clone());

    let sync = h.sync.clone();
    let vcs = h.vcs.clone();
    let outcome = guard
        .run(move || async move {
            vcs.set_counts(0, 2);
            sync.refresh_status().await;
            let pulled = sync.auto_sync_if_safe().await;

            let fetches = vcs.count(OpKind::Fetch);
            sync.poll_once().await;
            Ok::<_, anyhow::Error>((pulled, vcs.count(OpKind::Fetch) - fetches))
        })
        .await
        .unwrap();

    assert_eq!(outcome, Some((false, 0)));
    assert_eq!(h.vcs.count(OpKind::Pull), 0);
}

// =============================================================================
// Poller
// =============================================================================

#[tokio::test(start_paused = true)]
async fn poller_fetches_each_period_then_auto_syncs() {
    let h = Harness::with_remote(0, 0).await;
    h.vcs.set_incoming(2);

    h.sync.start_background_fetch(Duration::from_secs(60));
    assert!(h.sync.is_polling());

    tokio::time::sleep(Duration::from_secs(59)).await;
    assert_eq!(h.vcs.count(OpKind::Fetch), 0);

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(h.vcs.count(OpKind::Fetch), 1);
    assert_eq!(h.vcs.count(OpKind::Pull), 1);
    assert_eq!(h.sync.state().behind, 0);

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(h.vcs.count(OpKind::Fetch), 2);
    assert_eq!(h.vcs.count(OpKind::Pull), 1);
}

#[tokio::test(start_paused = true)]
async fn poller_leaves_dirty_tree_alone() {
    let h = Harness::with_remote(0, 0).await;
    h.vcs.set_clean(false);
    h.vcs.set_incoming(1);

    h.sync.start_background_fetch(Duration::from_secs(30));
    tokio::time::sleep(Duration::from_secs(31)).await;

    assert_eq!(h.vcs.count(OpKind::Fetch), 1);
    assert_eq!(h.vcs.count(OpKind::Pull), 0);
    assert_eq!(h.sync.state().behind, 1);
}

#[tokio::test(start_paused = true)]
async fn stopped_poller_does_nothing() {
    let h = Harness::with_remote(0, 0).await;

    h.sync.start_background_fetch(Duration::from_secs(10));
    h.sync.stop_background_fetch();
    assert!(!h.sync.is_polling());

    tokio::time::sleep(Duration::from_secs(120)).await;
    assert_eq!(h.vcs.count(OpKind::Fetch), 0);
}

#[tokio::test(start_paused = true)]
async fn restarting_poller_replaces_previous_one() {
    let h = Harness::with_remote(0, 0).await;

    h.sync.start_background_fetch(Duration::from_secs(10));
    h.sync.start_background_fetch(Duration::from_secs(10));
    tokio::time::sleep(Duration::from_secs(11)).await;

    assert_eq!(h.vcs.count(OpKind::Fetch), 1);
}

#[tokio::test]
async fn poll_once_skips_local_projects() {
    let h = Harness::local().await;
    h.sync.poll_once().await;
    assert!(h.vcs.operations().is_empty());
}

// =============================================================================
// Merge state, log and lifecycle
// =============================================================================

#[tokio::test]
async fn abort_merge_clears_conflict() {
    let vcs = MockVcs::new().with_remote(REMOTE);
    vcs.set_merge_conflict(true);
    let h = Harness::new(vcs).await;
    assert!(h.sync.state().has_merge_conflict);

    assert!(h.sync.abort_merge().await);

    assert!(!h.sync.state().has_merge_conflict);
    assert_eq!(h.vcs.count(OpKind::AbortMerge), 1);
}

#[tokio::test]
async fn recent_commits_are_newest_first_and_empty_on_failure() {
    let h = Harness::local().await;
    h.vcs.set_commits(vec![
        commit("c3", "Screen batch 3"),
        commit("c2", "Screen batch 2"),
        commit("c1", "Import records"),
    ]);

    let commits = h.sync.recent_commits(2).await;
    let hashes: Vec<_> = commits.iter().map(|c| c.short_hash.as_str()).collect();
    assert_eq!(hashes, vec!["c3", "c2"]);

    h.vcs.fail(OpKind::Log, VcsError::Other("bad object".into()));
    assert!(h.sync.recent_commits(5).await.is_empty());
}

#[tokio::test]
async fn close_resets_state_and_disables_everything() {
    let vcs = MockVcs::new().with_remote(REMOTE).with_branch("dev");
    vcs.set_counts(1, 0);
    let h = Harness::new(vcs).await;
    h.sync.set_auto_save(true);
    h.sync.start_background_fetch(Duration::from_secs(60));

    h.sync.close();

    assert!(h.sync.is_closed());
    assert!(h.sync.path().is_none());
    assert!(!h.sync.is_polling());
    assert_eq!(h.sync.state(), SyncState::new(true));

    assert!(!h.sync.fetch().await);
    assert!(!h.sync.pull().await);
    assert!(!h.sync.push().await);
    assert!(!h.sync.refresh_status().await);
    assert!(!h.sync.refresh_branches().await);
    assert!(!h.sync.switch_branch(&BranchName::dev()).await);
    assert!(!h.sync.auto_sync_if_safe().await);
    assert!(h.sync.recent_commits(3).await.is_empty());
    h.sync.poll_once().await;

    assert!(h.vcs.operations().is_empty());
    assert!(h.notifier.notifications().is_empty());
}
