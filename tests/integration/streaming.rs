//! Streaming, hibernation and checkpoint/resume tests

mod common;

use tempfile::TempDir;

use shotness::app::{self, AnalysisOptions};
use shotness::pipeline::{CancellationFlag, StreamingDriver};
use shotness::scanner::HistoryWalker;
use shotness::shotness::{CheckpointManager, ShotnessConfig, ShotnessEngine};

use common::{three_function_repo, go_source};

fn full_run(config: &ShotnessConfig, repo_path: &std::path::Path) -> shotness::shotness::RawReport {
    app::analyze_repository(repo_path, config, &AnalysisOptions::default(), &CancellationFlag::new()).unwrap()
}

#[test]
fn test_tiny_budget_hibernates_without_changing_results() {
    let repo = three_function_repo();
    let baseline = full_run(&ShotnessConfig::default(), &repo.path());

    let constrained = ShotnessConfig {
        chunk_size: 1,
        max_memory_bytes: 1,
        ..ShotnessConfig::default()
    };
    let report = full_run(&constrained, &repo.path());

    assert_eq!(report.nodes, baseline.nodes);
    assert_eq!(report.counters, baseline.counters);
}

#[test]
fn test_checkpoint_cleared_after_success() {
    let repo = three_function_repo();
    let checkpoints = TempDir::new().unwrap();
    let config = ShotnessConfig {
        chunk_size: 2,
        checkpoint_dir: Some(checkpoints.path().to_path_buf()),
        ..ShotnessConfig::default()
    };

    full_run(&config, &repo.path());
    assert!(!CheckpointManager::new(checkpoints.path(), repo.path()).exists());
}

#[test]
fn test_resume_continues_after_checkpoint() {
    let repo = three_function_repo();
    let repo_path = repo.path();
    let checkpoints = TempDir::new().unwrap();
    let config = ShotnessConfig {
        chunk_size: 2,
        checkpoint_dir: Some(checkpoints.path().to_path_buf()),
        ..ShotnessConfig::default()
    };
    let baseline = full_run(&ShotnessConfig::default(), &repo_path);

    // an interrupted run that only got through the first chunk
    let ids = HistoryWalker::commit_ids(&repo_path).unwrap();
    let manager = CheckpointManager::new(checkpoints.path(), &repo_path);
    let mut partial = ShotnessEngine::from_config(&config).unwrap();
    let stats = StreamingDriver::new(config.chunk_size, config.max_memory_bytes)
        .with_checkpoints(&manager)
        .run(&mut partial, &ids[..2], |chunk| HistoryWalker::for_commits(&repo_path, chunk))
        .unwrap();
    assert_eq!(stats.checkpoints_saved, 1);
    assert_eq!(manager.load_metadata().unwrap().commits_processed, 2);

    let options = AnalysisOptions {
        resume: true,
        ..AnalysisOptions::default()
    };
    let resumed = app::analyze_repository(&repo_path, &config, &options, &CancellationFlag::new()).unwrap();

    assert_eq!(resumed.nodes, baseline.nodes);
    assert_eq!(resumed.counters, baseline.counters);
    assert!(!manager.exists());
}

#[test]
fn test_stale_checkpoint_is_discarded() {
    let repo = three_function_repo();
    let repo_path = repo.path();
    let checkpoints = TempDir::new().unwrap();
    let config = ShotnessConfig {
        checkpoint_dir: Some(checkpoints.path().to_path_buf()),
        ..ShotnessConfig::default()
    };

    let ids = HistoryWalker::commit_ids(&repo_path).unwrap();
    let manager = CheckpointManager::new(checkpoints.path(), &repo_path);
    let mut partial = ShotnessEngine::from_config(&config).unwrap();
    StreamingDriver::new(10, usize::MAX)
        .with_checkpoints(&manager)
        .run(&mut partial, &ids[..2], |chunk| HistoryWalker::for_commits(&repo_path, chunk))
        .unwrap();

    // history rewritten underneath the checkpoint: one more commit, and a
    // --limit that shifts every position
    repo.commit_file("a.go", &go_source(4, 4, 4), "edit all");
    let options = AnalysisOptions {
        resume: true,
        limit: Some(2),
    };
    let resumed = app::analyze_repository(&repo_path, &config, &options, &CancellationFlag::new()).unwrap();

    // only the two most recent commits: foo+baz, then all three
    let counts: Vec<usize> = (0..resumed.nodes.len()).map(|i| resumed.count(i)).collect();
    assert_eq!(counts, vec![1, 2, 2]);
}

#[test]
fn test_checkpoint_for_other_repository_is_rejected() {
    let repo = three_function_repo();
    let checkpoints = TempDir::new().unwrap();
    let ids = HistoryWalker::commit_ids(&repo.path()).unwrap();

    let manager = CheckpointManager::new(checkpoints.path(), repo.path());
    let mut engine = ShotnessEngine::from_config(&ShotnessConfig::default()).unwrap();
    StreamingDriver::new(4, usize::MAX)
        .with_checkpoints(&manager)
        .run(&mut engine, &ids, |chunk| HistoryWalker::for_commits(&repo.path(), chunk))
        .unwrap();

    let mut metadata = manager.load_metadata().unwrap();
    metadata.repo_path = "/somewhere/else".to_string();
    assert!(manager.validate(&metadata).is_err());
}
