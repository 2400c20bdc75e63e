//! Integration tests for the dev/main workflow and releases.

mod support;

use std::sync::Arc;

use reposync::core::types::{BranchName, ReleaseTag, VersionBump};
use reposync::forge::mock::{self as forge_mock, FailOn, MockReleaseHost};
use reposync::forge::{ForgeError, ReleaseHost};
use reposync::git::mock::{MockOperation, MockVcs, OpKind};
use reposync::git::VcsError;
use reposync::project::mock::ProjectCall;
use reposync::project::{BranchDelta, ProjectError, StageDelta};
use reposync::sync::Level;
use reposync::workflow::{BranchDiff, BranchWorkflow};

use support::{Harness, REMOTE};

/// A working copy on `dev`, with `main` and a remote.
async fn on_dev() -> Harness {
    let vcs = MockVcs::new().with_remote(REMOTE).with_branch("dev");
    vcs.set_current("dev");
    Harness::new(vcs).await
}

fn workflow(h: &Harness) -> BranchWorkflow {
    BranchWorkflow::new(h.sync.clone(), None)
}

fn workflow_with_host(h: &Harness, host: &MockReleaseHost) -> BranchWorkflow {
    let host: Arc<dyn ReleaseHost> = Arc::new(host.clone());
    BranchWorkflow::new(h.sync.clone(), Some(host))
}

fn checkout(branch: &str) -> MockOperation {
    MockOperation::Checkout {
        branch: branch.into(),
    }
}

// =============================================================================
// ensure_dev_branch
// =============================================================================

#[tokio::test]
async fn ensure_dev_creates_once() {
    let h = Harness::local().await;
    let wf = workflow(&h);

    assert!(wf.ensure_dev_branch().await);
    assert!(wf.ensure_dev_branch().await);

    assert_eq!(h.vcs.count(OpKind::CreateBranch), 1);
    assert_eq!(h.vcs.current_branch(), "dev");
    assert!(h.sync.state().is_on(&BranchName::dev()));
    assert!(h.sync.state().has_local_branch(&BranchName::dev()));
}

#[tokio::test]
async fn ensure_dev_pushes_new_branch_with_remote() {
    let h = Harness::with_remote(0, 0).await;
    let wf = workflow(&h);

    assert!(wf.ensure_dev_branch().await);

    assert_eq!(
        h.vcs.mutations(),
        vec![
            MockOperation::Fetch,
            MockOperation::CreateBranch {
                name: "dev".into(),
                base: "main".into()
            },
            checkout("dev"),
            MockOperation::Push {
                branch: "dev".into()
            },
        ]
    );
    let state = h.sync.state();
    assert!(state
        .branches
        .iter()
        .any(|b| b.is_remote && b.name.as_str() == "origin/dev"));
}

#[tokio::test]
async fn ensure_dev_tracks_the_remote_dev_branch() {
    let vcs = MockVcs::new().with_remote(REMOTE).with_remote_branch("dev");
    let h = Harness::new(vcs).await;
    let wf = workflow(&h);

    assert!(wf.ensure_dev_branch().await);

    assert_eq!(
        h.vcs.mutations(),
        vec![
            MockOperation::Fetch,
            MockOperation::CheckoutTracking {
                branch: "dev".into()
            },
        ]
    );
    assert_eq!(h.vcs.count(OpKind::CreateBranch), 0);
    assert_eq!(h.vcs.count(OpKind::Push), 0);
    assert!(h.sync.state().is_on(&BranchName::dev()));
    assert!(h.sync.state().has_local_branch(&BranchName::dev()));
    assert_eq!(h.project.reloads(), 1);
    assert!(h.notifier.errors().is_empty());
}

#[tokio::test]
async fn ensure_dev_fails_when_new_branch_is_not_pushed() {
    let h = Harness::with_remote(0, 0).await;
    h.vcs.fail(
        OpKind::Push,
        VcsError::Other("! [rejected] dev -> dev (fetch first)".into()),
    );
    let wf = workflow(&h);

    assert!(!wf.ensure_dev_branch().await);

    assert!(h.sync.state().has_local_branch(&BranchName::dev()));
    assert_eq!(h.notifier.titles(), vec!["Push failed"]);
}

#[tokio::test]
async fn ensure_dev_is_a_no_op_when_present() {
    let h = on_dev().await;
    let wf = workflow(&h);

    assert!(wf.ensure_dev_branch().await);
    assert!(h.vcs.mutations().is_empty());
}

#[tokio::test]
async fn ensure_dev_reports_creation_failure() {
    let h = Harness::local().await;
    h.vcs.fail(
        OpKind::CreateBranch,
        VcsError::Other("cannot lock ref 'refs/heads/dev'".into()),
    );
    let wf = workflow(&h);

    assert!(!wf.ensure_dev_branch().await);
    assert_eq!(h.vcs.count(OpKind::Checkout), 0);
    assert_eq!(h.notifier.titles(), vec!["Could not create dev branch"]);
}

// =============================================================================
// merge_dev_into_main
// =============================================================================

#[tokio::test]
async fn publish_fast_forwards_pushes_and_returns_to_dev() {
    let h = on_dev().await;
    h.vcs.set_rev_count("main", "dev", 0);
    let wf = workflow(&h);

    assert!(wf.merge_dev_into_main().await);

    assert_eq!(
        h.vcs.mutations(),
        vec![
            checkout("main"),
            MockOperation::Merge {
                branch: "dev".into(),
                ff_only: true
            },
            MockOperation::Push {
                branch: "main".into()
            },
            checkout("dev"),
        ]
    );
    assert_eq!(h.vcs.current_branch(), "dev");
    assert!(h.sync.state().is_on(&BranchName::dev()));
    assert_eq!(h.project.reloads(), 1);
    assert_eq!(wf.branch_diff(), Some(BranchDiff::default()));

    let last = h.notifier.notifications().pop().unwrap();
    assert_eq!(last.level, Level::Success);
    assert_eq!(last.title, "Published");
}

#[tokio::test]
async fn failed_publish_returns_to_dev_before_reporting() {
    let h = on_dev().await;
    h.vcs.fail(OpKind::Merge, VcsError::Diverged);
    let wf = workflow(&h);

    assert!(!wf.merge_dev_into_main().await);

    let mutations = h.vcs.mutations();
    assert_eq!(
        mutations,
        vec![
            checkout("main"),
            MockOperation::Merge {
                branch: "dev".into(),
                ff_only: true
            },
            checkout("dev"),
        ]
    );
    assert_eq!(h.vcs.current_branch(), "dev");
    assert_eq!(h.sync.state().current_branch, "dev");
    assert_eq!(h.vcs.count(OpKind::Push), 0);
    assert_eq!(h.project.reloads(), 0);

    let errors = h.notifier.errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].title, "Publish failed");
}

#[tokio::test]
async fn publish_fails_when_main_push_is_rejected() {
    let h = on_dev().await;
    h.vcs.fail(
        OpKind::Push,
        VcsError::Other("! [rejected] main -> main (fetch first)".into()),
    );
    let wf = workflow(&h);

    assert!(!wf.merge_dev_into_main().await);

    assert_eq!(h.vcs.current_branch(), "dev");
    assert_eq!(h.vcs.count(OpKind::Push), 1);
    assert_eq!(h.notifier.titles(), vec!["Push failed"]);
}

#[tokio::test]
async fn publish_fails_when_remote_main_has_moved_on() {
    let h = on_dev().await;
    h.vcs.set_counts(1, 1);
    let wf = workflow(&h);

    assert!(!wf.merge_dev_into_main().await);

    assert_eq!(h.vcs.count(OpKind::Push), 0);
    assert_eq!(h.vcs.current_branch(), "dev");
    assert_eq!(h.notifier.titles(), vec!["Cannot push"]);
}

#[tokio::test]
async fn local_publish_skips_push() {
    let vcs = MockVcs::new().with_branch("dev");
    vcs.set_current("dev");
    let h = Harness::new(vcs).await;
    let wf = workflow(&h);

    assert!(wf.merge_dev_into_main().await);
    assert_eq!(h.vcs.count(OpKind::Push), 0);
    assert_eq!(h.vcs.current_branch(), "dev");
}

// =============================================================================
// Branch diff and record delta
// =============================================================================

#[tokio::test]
async fn branch_diff_counts_both_directions() {
    let h = on_dev().await;
    h.vcs.set_rev_count("main", "dev", 4);
    h.vcs.set_rev_count("dev", "main", 1);
    let wf = workflow(&h);

    let diff = wf.refresh_branch_diff().await.unwrap();

    assert_eq!(diff.dev_ahead_of_main, 4);
    assert_eq!(diff.main_ahead_of_dev, 1);
    assert!(!diff.in_sync());
}

#[tokio::test]
async fn branch_diff_keeps_cache_on_failure() {
    let h = on_dev().await;
    h.vcs.set_rev_count("main", "dev", 2);
    let wf = workflow(&h);
    let first = wf.refresh_branch_diff().await;

    h.vcs.set_rev_count("main", "dev", 9);
    h.vcs
        .fail(OpKind::RevListCount, VcsError::Other("bad revision".into()));

    assert_eq!(wf.refresh_branch_diff().await, first);
    assert_eq!(wf.branch_diff().unwrap().dev_ahead_of_main, 2);
}

#[tokio::test]
async fn initialize_fills_diff_and_releases() {
    let h = on_dev().await;
    h.vcs.set_rev_count("main", "dev", 3);
    let host = MockReleaseHost::with_releases(vec![forge_mock::release("v1.0", "First round")]);
    let wf = workflow_with_host(&h, &host);

    wf.initialize().await;

    assert_eq!(wf.branch_diff().unwrap().dev_ahead_of_main, 3);
    assert_eq!(wf.releases().len(), 1);
    assert_eq!(host.operations(), vec![forge_mock::MockOperation::ListReleases]);
}

#[tokio::test]
async fn branch_diff_needs_dev() {
    let h = Harness::local().await;
    let wf = workflow(&h);

    assert_eq!(wf.refresh_branch_diff().await, None);
    assert_eq!(h.vcs.count(OpKind::RevListCount), 0);
}

#[tokio::test]
async fn branch_delta_only_on_dev_and_kept_on_error() {
    let h = on_dev().await;
    let delta = BranchDelta {
        new_records: 12,
        changed_records: 3,
        removed_records: 0,
        by_stage: vec![StageDelta {
            stage: "rev_included".into(),
            new: 12,
            changed: 3,
            removed: 0,
        }],
    };
    h.project.set_delta(delta.clone());
    let wf = workflow(&h);

    assert_eq!(wf.refresh_branch_delta().await, Some(delta.clone()));
    assert!(!wf.is_loading_delta());

    h.project
        .set_delta_error(Some(ProjectError::Failed("dataset locked".into())));
    assert_eq!(wf.refresh_branch_delta().await, Some(delta.clone()));

    h.project.set_delta_error(None);
    assert!(h.sync.switch_branch(&BranchName::main()).await);
    h.project.set_delta(BranchDelta::default());
    assert_eq!(wf.refresh_branch_delta().await, Some(delta));
}

#[tokio::test]
async fn overlapping_delta_refreshes_stay_loading_until_both_finish() {
    let h = on_dev().await;
    let gate = h.project.hold_delta();
    let wf = Arc::new(workflow(&h));

    let spawn_refresh = || {
        let wf = Arc::clone(&wf);
        tokio::spawn(async move { wf.refresh_branch_delta().await })
    };
    let first = spawn_refresh();
    let second = spawn_refresh();

    let delta_calls = || {
        h.project
            .calls()
            .iter()
            .filter(|c| matches!(c, ProjectCall::BranchDelta { .. }))
            .count()
    };
    while delta_calls() < 2 {
        tokio::task::yield_now().await;
    }
    assert!(wf.is_loading_delta());

    gate.notify_one();
    while !first.is_finished() && !second.is_finished() {
        tokio::task::yield_now().await;
    }
    assert!(wf.is_loading_delta());

    gate.notify_one();
    first.await.unwrap();
    second.await.unwrap();
    assert!(!wf.is_loading_delta());
}

// =============================================================================
// Releases
// =============================================================================

#[tokio::test]
async fn releases_load_and_new_release_is_prepended() {
    let h = on_dev().await;
    let host = MockReleaseHost::with_releases(vec![
        forge_mock::release("v1.1", "Second round"),
        forge_mock::release("v1.0", "First round"),
    ]);
    let wf = workflow_with_host(&h, &host);

    let releases = wf.load_releases().await;
    assert_eq!(releases.len(), 2);
    assert_eq!(
        wf.next_release_version(VersionBump::Minor),
        ReleaseTag { major: 1, minor: 2 }
    );

    let created = wf
        .create_release("v1.2", "Third round", "Screening complete")
        .await
        .unwrap();
    assert_eq!(created.tag_name, "v1.2");

    let tags: Vec<_> = wf.releases().into_iter().map(|r| r.tag_name).collect();
    assert_eq!(tags, vec!["v1.2", "v1.1", "v1.0"]);
    assert_eq!(
        wf.next_release_version(VersionBump::Major).to_string(),
        "v2.0"
    );
    assert!(host
        .operations()
        .contains(&forge_mock::MockOperation::CreateRelease {
            tag_name: "v1.2".into(),
            target: "main".into()
        }));
    assert_eq!(h.notifier.titles(), vec!["Release created"]);
}

#[tokio::test]
async fn release_list_failure_keeps_cache() {
    let h = Harness::with_remote(0, 0).await;
    let host = MockReleaseHost::with_releases(vec![forge_mock::release("v2.3", "Update")]);
    let wf = workflow_with_host(&h, &host);
    wf.load_releases().await;

    let host = host.fail_on(FailOn::ListReleases(ForgeError::RateLimited));
    let releases = wf.load_releases().await;

    assert_eq!(releases.len(), 1);
    assert_eq!(
        wf.next_release_version(VersionBump::Minor).to_string(),
        "v2.4"
    );
    host.clear_fail_on();
}

#[tokio::test]
async fn failed_release_creation_notifies() {
    let h = Harness::with_remote(0, 0).await;
    let host = MockReleaseHost::new().fail_on(FailOn::CreateRelease(ForgeError::AuthRequired));
    let wf = workflow_with_host(&h, &host);

    assert!(wf.create_release("v1.0", "First", "").await.is_none());
    assert!(wf.releases().is_empty());
    assert_eq!(h.notifier.titles(), vec!["Release failed"]);
}

#[tokio::test]
async fn no_release_host() {
    let h = Harness::local().await;
    let wf = workflow(&h);

    assert!(!wf.has_release_host());
    assert!(wf.load_releases().await.is_empty());
    assert!(wf.create_release("v1.0", "First", "").await.is_none());
    assert_eq!(h.notifier.titles(), vec!["Releases unavailable"]);
    assert_eq!(wf.next_release_version(VersionBump::Minor), ReleaseTag::INITIAL);
}

#[tokio::test]
async fn next_version_from_unrecognized_tag_starts_over() {
    let h = Harness::with_remote(0, 0).await;
    let host = MockReleaseHost::with_releases(vec![forge_mock::release("release-7", "Old")]);
    let wf = workflow_with_host(&h, &host);
    wf.load_releases().await;

    assert_eq!(
        wf.next_release_version(VersionBump::Minor).to_string(),
        "v1.0"
    );
}
