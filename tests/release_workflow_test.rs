// tests/release_workflow_test.rs
use chrono::NaiveDate;
use std::fs;
use tempfile::TempDir;

use cut_release::boundary::BoundaryWarning;
use cut_release::cli::{ReleaseOrchestrator, RunOutcome, NONE_CHOICE};
use cut_release::config::{RunConfig, Settings};
use cut_release::git::mock::MockFailure;
use cut_release::git::{MockRepository, Repository};
use cut_release::tools::{MockToolRunner, PackageManager};
use cut_release::ui::{Answer, ScriptedSink, SinkEvent};
use cut_release::ReleaseError;

const RELEASE_BRANCH: &str = "release/7Mar24";
const ORG_URL: &str = "https://dev.azure.com/dw-front-end-engineering/_git/storefront";

fn release_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 7).unwrap()
}

fn project(manifest: &str) -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("package.json"), manifest).unwrap();
    dir
}

fn project_with_org_deps() -> TempDir {
    project(
        r#"{
            "name": "storefront",
            "version": "1.4.0",
            "dependencies": {
                "react": "^18.2.0",
                "ui-kit": "git+https://dev.azure.com/dw-front-end-engineering/ui-kit#1.2.0"
            },
            "devDependencies": {
                "lint-config": "git+https://dev.azure.com/dw-front-end-engineering/lint-config#2.0.0"
            }
        }"#,
    )
}

fn repo_with_origin() -> MockRepository {
    let repo = MockRepository::new();
    repo.add_remote("origin", ORG_URL);
    repo
}

fn config(upgrade_dependencies: bool, dry_run: bool) -> RunConfig {
    RunConfig {
        upgrade_dependencies,
        dry_run,
        ..RunConfig::default()
    }
}

fn run(
    repo: &MockRepository,
    tools: &MockToolRunner,
    sink: &ScriptedSink,
    config: RunConfig,
    dir: &TempDir,
) -> Result<RunOutcome, ReleaseError> {
    let settings = Settings::default();
    ReleaseOrchestrator::new(repo, tools, sink, &settings, config, dir.path())
        .on_date(release_date())
        .run()
}

#[test]
fn test_existing_release_branch_aborts_without_changes() {
    let dir = project_with_org_deps();
    let repo = repo_with_origin();
    repo.add_branch(RELEASE_BRANCH);
    let tools = MockToolRunner::new();
    let sink = ScriptedSink::new();

    let result = run(&repo, &tools, &sink, config(true, false), &dir);

    match result {
        Err(ReleaseError::BranchExists(branch)) => assert_eq!(branch, RELEASE_BRANCH),
        other => panic!("expected BranchExists, got {:?}", other),
    }
    assert!(repo.mutations().is_empty());
    assert!(tools.bumps().is_empty());
    assert!(sink.prompts().is_empty());
}

#[test]
fn test_successful_release_pushes_branch() {
    let dir = project_with_org_deps();
    let repo = repo_with_origin();
    let tools = MockToolRunner::new();
    let sink = ScriptedSink::new();
    let branches_before = repo.list_branches().unwrap().len();

    let outcome = run(&repo, &tools, &sink, config(false, false), &dir).unwrap();

    match outcome {
        RunOutcome::Pushed {
            branch,
            remote,
            pull_request_url,
            ..
        } => {
            assert_eq!(branch, RELEASE_BRANCH);
            assert_eq!(remote, "origin");
            let url = pull_request_url.expect("remote response carries a link");
            assert!(url.ends_with("sourceRef=release%2F7Mar24"));
        }
        other => panic!("expected a push, got {:?}", other),
    }

    assert_eq!(repo.current(), RELEASE_BRANCH);
    assert_eq!(repo.list_branches().unwrap().len(), branches_before + 1);
    assert_eq!(
        repo.pushed(),
        vec![(RELEASE_BRANCH.to_string(), "origin".to_string())]
    );
    assert_eq!(tools.bumps(), vec![false]);
    assert!(sink.mentions("targetBranch=refs%2Fheads%2Fmaster"));
    assert!(sink.mentions("targetBranch=refs%2Fheads%2Fdevelop"));
}

#[test]
fn test_steps_run_in_order() {
    let dir = project_with_org_deps();
    let repo = repo_with_origin();
    let tools = MockToolRunner::new();
    let sink = ScriptedSink::new();

    run(&repo, &tools, &sink, config(false, false), &dir).unwrap();

    assert_eq!(
        repo.mutations(),
        vec![
            "checkout_and_rebase_pull(develop, origin, false)".to_string(),
            format!("create_local_branch({})", RELEASE_BRANCH),
            format!("push({}, origin)", RELEASE_BRANCH),
        ]
    );

    let started: Vec<String> = sink
        .events()
        .into_iter()
        .filter_map(|event| match event {
            SinkEvent::Started(label) => Some(label),
            _ => None,
        })
        .collect();
    assert_eq!(started[0], "Verifying local branches");
    assert_eq!(started[1], "Getting the latest from develop");
    assert_eq!(started.last().map(String::as_str), Some("Pushing release branch"));
}

#[test]
fn test_dry_run_restores_initial_state() {
    let dir = project_with_org_deps();
    let repo = repo_with_origin();
    repo.set_current("feature/checkout");
    let tools = MockToolRunner::new();
    let sink = ScriptedSink::new();
    let branches_before = repo.list_branches().unwrap();

    let outcome = run(&repo, &tools, &sink, config(false, true), &dir).unwrap();

    assert_eq!(
        outcome,
        RunOutcome::DryRunComplete {
            branch: RELEASE_BRANCH.to_string()
        }
    );
    assert_eq!(repo.current(), "feature/checkout");
    assert!(!repo.branch_exists(RELEASE_BRANCH).unwrap());
    assert_eq!(repo.list_branches().unwrap(), branches_before);
    assert!(repo.pushed().is_empty());
    assert_eq!(tools.bumps(), vec![true]);
    assert!(repo
        .calls()
        .contains(&"checkout_and_rebase_pull(develop, origin, true)".to_string()));
}

#[test]
fn test_selected_dependencies_upgraded_in_order() {
    let dir = project_with_org_deps();
    let repo = repo_with_origin();
    let tools = MockToolRunner::new();
    let sink = ScriptedSink::with_answers([
        Answer::Confirm(true),
        Answer::MultiSelect(vec!["ui-kit".to_string(), "lint-config".to_string()]),
    ]);

    run(&repo, &tools, &sink, config(true, true), &dir).unwrap();

    assert_eq!(
        tools.upgrades(),
        vec![
            ("ui-kit".to_string(), PackageManager::Yarn),
            ("lint-config".to_string(), PackageManager::Yarn),
        ]
    );
    assert!(sink.mentions("Successfully upgraded 2 dependencies with yarn"));
    assert_eq!(sink.unused_answers(), 0);
}

#[test]
fn test_npm_used_without_alternate_manager() {
    let dir = project_with_org_deps();
    let repo = repo_with_origin();
    let tools = MockToolRunner::new();
    let sink = ScriptedSink::with_answers([
        Answer::Confirm(true),
        Answer::MultiSelect(vec!["ui-kit".to_string()]),
    ]);
    let config = RunConfig {
        use_alternate_package_manager: false,
        ..config(true, true)
    };

    run(&repo, &tools, &sink, config, &dir).unwrap();

    assert_eq!(
        tools.upgrades(),
        vec![("ui-kit".to_string(), PackageManager::Npm)]
    );
}

#[test]
fn test_failed_upgrade_rolls_back() {
    let dir = project_with_org_deps();
    let repo = repo_with_origin();
    repo.set_current("feature/checkout");
    let tools = MockToolRunner::new().failing_upgrade("lint-config");
    let sink = ScriptedSink::with_answers([
        Answer::Confirm(true),
        Answer::MultiSelect(vec!["ui-kit".to_string(), "lint-config".to_string()]),
    ]);

    let result = run(&repo, &tools, &sink, config(true, false), &dir);

    match result {
        Err(ReleaseError::DependencyUpgrade { dependency, .. }) => {
            assert_eq!(dependency, "lint-config")
        }
        other => panic!("expected DependencyUpgrade, got {:?}", other),
    }
    assert_eq!(repo.current(), "feature/checkout");
    assert!(!repo.branch_exists(RELEASE_BRANCH).unwrap());
    assert!(!repo
        .mutations()
        .iter()
        .any(|call| call.starts_with("create_local_branch")));
    assert!(tools.bumps().is_empty());
    assert!(sink
        .events()
        .iter()
        .any(|event| matches!(event, SinkEvent::Failed(label, _) if label == "Upgrading lint-config")));
}

#[test]
fn test_no_owned_dependencies_skips_prompts() {
    let dir = project(r#"{"dependencies": {"react": "^18.2.0"}}"#);
    let repo = repo_with_origin();
    let tools = MockToolRunner::new();
    let sink = ScriptedSink::new();

    let outcome = run(&repo, &tools, &sink, config(true, true), &dir).unwrap();

    assert!(matches!(outcome, RunOutcome::DryRunComplete { .. }));
    assert!(sink.prompts().is_empty());
    assert!(tools.upgrades().is_empty());
    assert_eq!(
        sink.warnings(),
        vec![BoundaryWarning::NoOwnedDependencies {
            filter: "dw-front-end-engineering".to_string()
        }]
    );
}

#[test]
fn test_none_choice_upgrades_nothing() {
    let dir = project_with_org_deps();
    let repo = repo_with_origin();
    let tools = MockToolRunner::new();
    let sink = ScriptedSink::with_answers([
        Answer::Confirm(true),
        Answer::MultiSelect(vec!["ui-kit".to_string(), NONE_CHOICE.to_string()]),
    ]);

    run(&repo, &tools, &sink, config(true, true), &dir).unwrap();

    assert!(tools.upgrades().is_empty());
    assert!(sink.mentions("No dependencies selected"));
}

#[test]
fn test_declined_upgrade_continues_release() {
    let dir = project_with_org_deps();
    let repo = repo_with_origin();
    let tools = MockToolRunner::new();
    let sink = ScriptedSink::with_answers([Answer::Confirm(false)]);

    run(&repo, &tools, &sink, config(true, false), &dir).unwrap();

    assert!(tools.upgrades().is_empty());
    assert_eq!(repo.pushed().len(), 1);
}

#[test]
fn test_missing_preferred_remote_prompts() {
    let dir = project_with_org_deps();
    let repo = MockRepository::new();
    repo.add_remote("upstream", ORG_URL);
    repo.add_remote("fork", format!("{}-fork", ORG_URL));
    repo.add_remote("mirror", "https://github.com/someone/storefront.git");
    let tools = MockToolRunner::new();
    let sink = ScriptedSink::with_answers([Answer::Select("upstream".to_string())]);

    let outcome = run(&repo, &tools, &sink, config(false, false), &dir).unwrap();

    assert!(matches!(outcome, RunOutcome::Pushed { ref remote, .. } if remote == "upstream"));
    assert_eq!(
        sink.warnings(),
        vec![BoundaryWarning::PreferredRemoteMissing {
            preferred: "origin".to_string()
        }]
    );
    assert!(repo
        .calls()
        .contains(&"checkout_and_rebase_pull(develop, upstream, false)".to_string()));
}

#[test]
fn test_no_organization_remote() {
    let dir = project_with_org_deps();
    let repo = MockRepository::new();
    repo.add_remote("origin", "https://github.com/someone/storefront.git");
    let tools = MockToolRunner::new();
    let sink = ScriptedSink::new();

    let result = run(&repo, &tools, &sink, config(true, false), &dir);

    assert!(matches!(result, Err(ReleaseError::NoRemote(_))));
    assert!(repo.mutations().is_empty());
}

#[test]
fn test_not_a_repository() {
    let dir = project_with_org_deps();
    let repo = MockRepository::not_a_repo();
    let tools = MockToolRunner::new();
    let sink = ScriptedSink::new();

    let result = run(&repo, &tools, &sink, config(true, false), &dir);

    assert!(matches!(result, Err(ReleaseError::Precondition(_))));
    assert!(repo.mutations().is_empty());
}

#[test]
fn test_missing_manifest() {
    let dir = TempDir::new().unwrap();
    let repo = repo_with_origin();
    let tools = MockToolRunner::new();
    let sink = ScriptedSink::new();

    let result = run(&repo, &tools, &sink, config(true, false), &dir);

    match result {
        Err(ReleaseError::Precondition(message)) => assert!(message.contains("package.json")),
        other => panic!("expected Precondition, got {:?}", other),
    }
    assert!(repo.calls().is_empty());
}

#[test]
fn test_dirty_work_tree_declined() {
    let dir = project_with_org_deps();
    let repo = repo_with_origin();
    repo.set_dirty(true);
    let tools = MockToolRunner::new();
    let sink = ScriptedSink::with_answers([Answer::Confirm(false)]);

    let result = run(&repo, &tools, &sink, config(true, false), &dir);

    assert!(matches!(result, Err(ReleaseError::Precondition(_))));
    assert!(repo.is_dirty());
    assert!(repo.mutations().is_empty());
}

#[test]
fn test_dirty_work_tree_accepted() {
    let dir = project_with_org_deps();
    let repo = repo_with_origin();
    repo.set_dirty(true);
    let tools = MockToolRunner::new();
    let sink = ScriptedSink::with_answers([Answer::Confirm(true)]);

    run(&repo, &tools, &sink, config(false, true), &dir).unwrap();

    assert_eq!(
        sink.warnings(),
        vec![BoundaryWarning::UncommittedChanges {
            branch: "develop".to_string()
        }]
    );
    assert!(!repo.is_dirty());
}

#[test]
fn test_pull_failure_rolls_back() {
    let dir = project_with_org_deps();
    let repo = repo_with_origin();
    repo.set_current("feature/checkout");
    repo.fail_on(MockFailure::Pull);
    let tools = MockToolRunner::new();
    let sink = ScriptedSink::new();

    let result = run(&repo, &tools, &sink, config(true, false), &dir);

    assert!(matches!(result, Err(ReleaseError::Sync { .. })));
    assert!(repo
        .calls()
        .contains(&"hard_reset_and_checkout(feature/checkout)".to_string()));
    assert_eq!(repo.current(), "feature/checkout");
}

#[test]
fn test_staging_failure_reported_as_staging() {
    let dir = project_with_org_deps();
    let repo = repo_with_origin();
    repo.fail_on(MockFailure::CreateBranch);
    let tools = MockToolRunner::new();
    let sink = ScriptedSink::new();

    let result = run(&repo, &tools, &sink, config(false, false), &dir);

    assert!(matches!(result, Err(ReleaseError::Staging(_))));
    assert!(tools.bumps().is_empty());
    assert_eq!(repo.current(), "develop");
}

#[test]
fn test_bump_failure_removes_release_branch() {
    let dir = project_with_org_deps();
    let repo = repo_with_origin();
    let tools = MockToolRunner::new().failing_bump();
    let sink = ScriptedSink::new();

    let result = run(&repo, &tools, &sink, config(false, false), &dir);

    assert!(matches!(result, Err(ReleaseError::VersionBump(_))));
    assert_eq!(repo.current(), "develop");
    assert!(!repo.branch_exists(RELEASE_BRANCH).unwrap());
    assert!(repo.pushed().is_empty());
}

#[test]
fn test_failed_rollback_keeps_primary_error() {
    let dir = project_with_org_deps();
    let repo = repo_with_origin();
    repo.fail_on(MockFailure::Push);
    repo.fail_on(MockFailure::Reset);
    let tools = MockToolRunner::new();
    let sink = ScriptedSink::new();

    let error = run(&repo, &tools, &sink, config(false, false), &dir).unwrap_err();

    assert!(matches!(error, ReleaseError::Rollback { .. }));
    assert!(matches!(error.primary(), ReleaseError::Push { .. }));
    assert_eq!(error.step(), "push");
    assert!(error.to_string().contains("rollback also failed"));
}

#[test]
fn test_dry_run_rollback_failure_is_reported() {
    let dir = project_with_org_deps();
    let repo = repo_with_origin();
    repo.fail_on(MockFailure::DeleteBranch);
    let tools = MockToolRunner::new();
    let sink = ScriptedSink::new();

    let error = run(&repo, &tools, &sink, config(false, true), &dir).unwrap_err();

    match &error {
        ReleaseError::RestoreFailed(cause) => assert!(matches!(**cause, ReleaseError::Git(_))),
        other => panic!("expected RestoreFailed, got {:?}", other),
    }
    assert_eq!(error.step(), "rollback");
    assert_eq!(repo.current(), "develop");
}

#[test]
fn test_failed_dry_run_not_reported_as_complete() {
    let dir = project_with_org_deps();
    let repo = repo_with_origin();
    let tools = MockToolRunner::new().failing_bump();
    let sink = ScriptedSink::new();

    let result = run(&repo, &tools, &sink, config(false, true), &dir);

    assert!(matches!(result, Err(ReleaseError::VersionBump(_))));
    assert!(sink
        .events()
        .contains(&SinkEvent::Started("Restoring develop".to_string())));
    assert!(!sink.mentions("Dry run complete"));
}

#[test]
fn test_successful_dry_run_announces_restore() {
    let dir = project_with_org_deps();
    let repo = repo_with_origin();
    let tools = MockToolRunner::new();
    let sink = ScriptedSink::new();

    run(&repo, &tools, &sink, config(false, true), &dir).unwrap();

    assert!(sink.events().contains(&SinkEvent::Started(
        "Dry run complete. Restoring initial state".to_string()
    )));
}

#[test]
fn test_second_run_does_not_inherit_staged_branch() {
    let dir = project_with_org_deps();
    let repo = repo_with_origin();
    let tools = MockToolRunner::new();
    let sink = ScriptedSink::new();
    let settings = Settings::default();
    let orchestrator =
        ReleaseOrchestrator::new(&repo, &tools, &sink, &settings, config(false, true), dir.path())
            .on_date(release_date());

    orchestrator.run().unwrap();
    repo.fail_on(MockFailure::Pull);
    let calls_before = repo.calls().len();

    let result = orchestrator.run();

    assert!(matches!(result, Err(ReleaseError::Sync { .. })));
    let second_run = &repo.calls()[calls_before..];
    let reset = second_run
        .iter()
        .position(|call| call.starts_with("hard_reset_and_checkout"))
        .expect("rollback resets the work tree");
    // Nothing was staged, so rollback has no release branch to look for
    assert!(!second_run[reset..]
        .iter()
        .any(|call| call.starts_with("branch_exists")));
}
