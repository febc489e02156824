//! Sharded processing tests
//!
//! Partitioning history into parallel shards must not change the result
//! when no file is deleted, and coupling counts stay symmetric however the
//! work is split.

mod common;

use proptest::prelude::*;
use std::collections::HashMap;

use shotness::pipeline::{partition, run_sharded, CancellationFlag};
use shotness::scanner::{Commit, ScanError, ScanResult};
use shotness::shotness::{NodeExtractor, RawReport, ShotnessEngine};

use common::{synthetic_commit, SYNTHETIC_LINES};

fn engine() -> ShotnessEngine {
    ShotnessEngine::new(NodeExtractor::with_defaults().unwrap(), 0)
}

/// Commits keyed by id, in history order
fn history(edits: &[(usize, Vec<usize>)]) -> (Vec<String>, HashMap<String, Commit>) {
    let files = ["a.rs", "b.rs", "c.rs"];
    let mut ids = Vec::new();
    let mut commits = HashMap::new();
    for (index, (file, lines)) in edits.iter().enumerate() {
        let id = format!("{:040x}", index + 1);
        commits.insert(id.clone(), synthetic_commit(&id, files[file % files.len()], lines));
        ids.push(id);
    }
    (ids, commits)
}

fn stream_for<'a>(
    commits: &'a HashMap<String, Commit>,
) -> impl Fn(&[String]) -> ScanResult<std::vec::IntoIter<ScanResult<Commit>>> + Sync + 'a {
    move |slice| {
        let batch = slice
            .iter()
            .map(|id| {
                commits
                    .get(id)
                    .cloned()
                    .ok_or_else(|| ScanError::repository(format!("unknown commit {}", id)))
            })
            .collect::<Vec<_>>();
        Ok(batch.into_iter())
    }
}

fn run(ids: &[String], commits: &HashMap<String, Commit>, shards: usize) -> RawReport {
    let mut engine = engine();
    let consumed = run_sharded(&mut engine, ids, shards, &CancellationFlag::new(), stream_for(commits)).unwrap();
    assert_eq!(consumed, ids.len());
    engine.finalize()
}

fn assert_symmetric(report: &RawReport) {
    for (i, row) in report.counters.iter().enumerate() {
        for (&j, &count) in row {
            assert_eq!(report.counters[j].get(&i), Some(&count), "counters[{}][{}]", i, j);
        }
    }
}

fn edit_strategy() -> impl Strategy<Value = Vec<(usize, Vec<usize>)>> {
    prop::collection::vec(
        (0usize..3, prop::collection::vec(1usize..=SYNTHETIC_LINES, 1..6)),
        1..24,
    )
}

#[test]
fn test_partition_covers_history() {
    let ranges = partition(10, 3);
    assert_eq!(ranges.len(), 3);
    assert_eq!(ranges.first().unwrap().start, 0);
    assert_eq!(ranges.last().unwrap().end, 10);
    assert!(ranges.windows(2).all(|w| w[0].end == w[1].start));
}

#[test]
fn test_more_shards_than_commits() {
    let (ids, commits) = history(&[(0, vec![5]), (1, vec![15])]);
    let report = run(&ids, &commits, 8);
    assert_eq!(report.nodes.len(), 2);
}

#[test]
fn test_cancelled_run_fails() {
    let (ids, commits) = history(&[(0, vec![5]), (1, vec![15]), (2, vec![25])]);
    let cancel = CancellationFlag::new();
    cancel.cancel();

    let mut engine = engine();
    let err = run_sharded(&mut engine, &ids, 2, &cancel, stream_for(&commits)).unwrap_err();
    assert!(err.is_cancelled());
}

proptest! {
    #[test]
    fn prop_sharded_matches_sequential(edits in edit_strategy(), shards in 2usize..6) {
        let (ids, commits) = history(&edits);
        let sequential = run(&ids, &commits, 1);
        let sharded = run(&ids, &commits, shards);

        prop_assert_eq!(&sharded.nodes, &sequential.nodes);
        prop_assert_eq!(&sharded.counters, &sequential.counters);
    }

    #[test]
    fn prop_couplings_are_symmetric(edits in edit_strategy(), shards in 1usize..4) {
        let (ids, commits) = history(&edits);
        let report = run(&ids, &commits, shards);
        assert_symmetric(&report);

        for (i, row) in report.counters.iter().enumerate() {
            prop_assert!(row[&i] >= 1);
            prop_assert!(row.iter().all(|(&j, &c)| j == i || c <= row[&i]));
        }
    }
}
