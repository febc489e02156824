//! End-to-End Integration Tests
//!
//! Real git repositories through history walking, the engine, metrics and
//! every output format.

mod common;

use clap::Parser;
use tempfile::TempDir;

use shotness::app::{self, AnalysisOptions};
use shotness::cli::Args;
use shotness::config::ConfigManager;
use shotness::metrics::{self, RiskLevel};
use shotness::output::{decode_report, render_metrics, DecodedReport, OutputFormat, TextOptions};
use shotness::pipeline::CancellationFlag;
use shotness::scanner::HistoryWalker;
use shotness::shotness::{RawReport, ShotnessConfig};

use common::{go_source, three_function_repo, TestRepo};

fn analyze(repo: &TestRepo, config: &ShotnessConfig, options: &AnalysisOptions) -> RawReport {
    app::analyze_repository(&repo.path(), config, options, &CancellationFlag::new())
        .expect("Analysis failed")
}

fn names(report: &RawReport) -> Vec<&str> {
    report.nodes.iter().map(|n| n.name.as_str()).collect()
}

#[test]
fn test_history_walker_sees_every_commit() {
    let repo = three_function_repo();
    let ids = HistoryWalker::commit_ids(&repo.path()).unwrap();
    assert_eq!(ids.len(), 4);

    let commits: Vec<_> = HistoryWalker::open(&repo.path())
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    assert_eq!(commits.len(), 4);
    assert_eq!(commits[0].hash, ids[0]);
    assert_eq!(commits[0].parent_count, 0);
    assert!(commits[1..].iter().all(|c| c.changes.len() == 1 && c.changes[0].diff.is_some()));
}

#[test]
fn test_three_function_history() {
    let repo = three_function_repo();
    let report = analyze(&repo, &ShotnessConfig::default(), &AnalysisOptions::default());

    assert_eq!(names(&report), vec!["bar", "baz", "foo"]);
    assert!(report.nodes.iter().all(|n| n.node_type == "Function" && n.file == "a.go"));
    for index in 0..3 {
        assert_eq!(report.count(index), 3);
        for peer in (0..3).filter(|&p| p != index) {
            assert_eq!(report.counters[index][&peer], 2);
        }
    }
    assert_eq!(report.commit_stats.len(), 4);

    let computed = metrics::compute(&report);
    assert_eq!(computed.node_coupling.len(), 3);
    for coupling in &computed.node_coupling {
        assert_eq!(coupling.co_changes, 2);
        assert!((coupling.coupling_strength - 2.0 / 3.0).abs() < 1e-9);
    }
    assert!(computed.hotspot_nodes.is_empty());
    assert!(computed.node_hotness.iter().all(|h| h.coupled_nodes == 2 && h.hotness_score == 1.0));
    assert_eq!(computed.aggregate.total_nodes, 3);
    assert_eq!(computed.aggregate.total_changes, 9);
    assert_eq!(RiskLevel::classify(3), RiskLevel::Low);
}

#[test]
fn test_limit_keeps_recent_commits() {
    let repo = three_function_repo();
    let options = AnalysisOptions {
        limit: Some(2),
        ..AnalysisOptions::default()
    };
    let report = analyze(&repo, &ShotnessConfig::default(), &options);

    // bar+baz then foo+baz
    let counts: Vec<usize> = (0..report.nodes.len()).map(|i| report.count(i)).collect();
    assert_eq!(names(&report), vec!["bar", "baz", "foo"]);
    assert_eq!(counts, vec![1, 2, 1]);
}

#[test]
fn test_sharded_run_matches_sequential() {
    let repo = three_function_repo();
    let sequential = analyze(&repo, &ShotnessConfig::default(), &AnalysisOptions::default());

    let sharded_config = ShotnessConfig {
        shards: 2,
        ..ShotnessConfig::default()
    };
    let sharded = analyze(&repo, &sharded_config, &AnalysisOptions::default());

    assert_eq!(sharded.nodes, sequential.nodes);
    assert_eq!(sharded.counters, sequential.counters);
}

#[test]
fn test_deleted_file_drops_its_units() {
    let repo = three_function_repo();
    repo.commit_file("b.go", "package main\n\nfunc other() {\n}\n", "add b.go");

    let path = repo.dir.path().join("a.go");
    std::fs::remove_file(&path).unwrap();
    let mut index = repo.repo.index().unwrap();
    index.remove_path(std::path::Path::new("a.go")).unwrap();
    index.write().unwrap();
    let tree = repo.repo.find_tree(index.write_tree().unwrap()).unwrap();
    let signature = git2::Signature::now("Test User", "test@example.com").unwrap();
    let head = repo.repo.head().unwrap().peel_to_commit().unwrap();
    repo.repo
        .commit(Some("HEAD"), &signature, &signature, "remove a.go", &tree, &[&head])
        .unwrap();

    let report = analyze(&repo, &ShotnessConfig::default(), &AnalysisOptions::default());
    assert_eq!(names(&report), vec!["other"]);
    assert_eq!(report.count(0), 1);
    assert_eq!(report.counters[0].len(), 1);
}

#[test]
fn test_unsupported_files_are_ignored() {
    let repo = TestRepo::new();
    repo.commit_file("README.md", "# readme\n", "docs");
    repo.commit_file("a.go", &go_source(1, 1, 1), "code");

    let report = analyze(&repo, &ShotnessConfig::default(), &AnalysisOptions::default());
    assert_eq!(report.nodes.len(), 3);
    assert_eq!(report.commit_stats.len(), 1);
}

#[test]
fn test_custom_struct_query() {
    let repo = three_function_repo();
    let config = ShotnessConfig {
        dsl_struct: r#"rfilter(.props.name == "foo")"#.to_string(),
        ..ShotnessConfig::default()
    };
    let report = analyze(&repo, &config, &AnalysisOptions::default());
    assert_eq!(names(&report), vec!["foo"]);
    assert_eq!(report.count(0), 3);
}

#[test]
fn test_reports_round_trip_through_every_format() {
    let repo = three_function_repo();
    let computed = metrics::compute(&analyze(&repo, &ShotnessConfig::default(), &AnalysisOptions::default()));
    let options = TextOptions::default();

    for format in [OutputFormat::Json, OutputFormat::Yaml, OutputFormat::Binary] {
        let bytes = render_metrics(&computed, format, &options).unwrap();
        match decode_report(&bytes).unwrap() {
            DecodedReport::Metrics(decoded) => assert_eq!(decoded, computed, "format {}", format),
            DecodedReport::Generic(_) => panic!("{} report decoded as a generic document", format),
        }
    }

    let text = String::from_utf8(render_metrics(&computed, OutputFormat::Text, &options).unwrap()).unwrap();
    assert!(text.contains("Hottest Functions"));
    assert!(text.contains("foo"));
}

#[test]
fn test_run_writes_report_and_rerenders_it() {
    let repo = three_function_repo();
    let out = TempDir::new().unwrap();
    let report_path = out.path().join("report.bin");
    let repo_arg = repo.path().to_string_lossy().into_owned();
    let report_arg = report_path.to_string_lossy().into_owned();

    let args = Args::try_parse_from(["shotness", "--repo", repo_arg.as_str(), "-f", "binary", "-o", report_arg.as_str()]).unwrap();
    app::run(&args, &ConfigManager::default()).unwrap();
    assert!(std::fs::read(&report_path).unwrap().starts_with(b"SHOT"));

    let rendered = app::rerender_report(&report_path, OutputFormat::Json, &TextOptions::default()).unwrap();
    let value: serde_json::Value = serde_json::from_slice(&rendered).unwrap();
    assert_eq!(value["aggregate"]["total_nodes"], 3);
}

#[test]
fn test_raw_output_serializes_counters() {
    let repo = three_function_repo();
    let out = TempDir::new().unwrap();
    let report_path = out.path().join("raw.json");
    let repo_arg = repo.path().to_string_lossy().into_owned();
    let report_arg = report_path.to_string_lossy().into_owned();

    let args = Args::try_parse_from(["shotness", "-r", repo_arg.as_str(), "--raw", "-f", "json", "-o", report_arg.as_str()]).unwrap();
    app::run(&args, &ConfigManager::default()).unwrap();

    let raw: RawReport = serde_json::from_slice(&std::fs::read(&report_path).unwrap()).unwrap();
    assert_eq!(raw.nodes.len(), 3);
    assert_eq!(raw.count(2), 3);
}
