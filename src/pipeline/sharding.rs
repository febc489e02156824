//! Sharded History Execution
//!
//! The commit list is split into contiguous ranges. Each range is consumed
//! by its own fork of the analyzer on a rayon pool, with its own commit
//! stream (and so its own repository handle). Forks share no mutable state;
//! they are merged back on the calling thread in shard order once every
//! shard has finished.

use log::{debug, info};
use rayon::prelude::*;
use std::ops::Range;

use crate::scanner::{CommitStream, ScanError, ScanResult};
use crate::shotness::HistoryAnalyzer;

use super::{drive, CancellationFlag};

/// Split `len` items into at most `shards` contiguous, non-empty ranges whose
/// sizes differ by at most one
pub fn partition(len: usize, shards: usize) -> Vec<Range<usize>> {
    let shards = shards.max(1).min(len.max(1));
    let base = len / shards;
    let extra = len % shards;

    let mut ranges = Vec::with_capacity(shards);
    let mut start = 0;
    for shard in 0..shards {
        let size = base + usize::from(shard < extra);
        if size > 0 {
            ranges.push(start..start + size);
        }
        start += size;
    }
    ranges
}

/// Run `analyzer` over `commit_ids` split into `shards` parallel ranges.
///
/// `open_stream` builds the commit stream for one range; it is called on the
/// worker thread that consumes the range. Returns the number of commits
/// consumed.
pub fn run_sharded<F, S>(
    analyzer: &mut dyn HistoryAnalyzer,
    commit_ids: &[String],
    shards: usize,
    cancel: &CancellationFlag,
    open_stream: F,
) -> ScanResult<usize>
where
    F: Fn(&[String]) -> ScanResult<S> + Sync,
    S: CommitStream,
{
    let ranges = partition(commit_ids.len(), shards);
    if ranges.len() <= 1 {
        debug!("Running {} commits on a single shard", commit_ids.len());
        let stream = open_stream(commit_ids)?;
        return drive(analyzer, stream, cancel);
    }

    let threads = ranges.len().min(num_cpus::get()).max(1);
    info!(
        "Processing {} commits in {} shards on {} threads",
        commit_ids.len(),
        ranges.len(),
        threads
    );

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .thread_name(|i| format!("shotness-shard-{}", i))
        .build()
        .map_err(|e| ScanError::worker(format!("rayon pool: {e}")))?;

    let branches = analyzer.fork(ranges.len());
    let open_stream = &open_stream;

    let results: Vec<ScanResult<(Box<dyn HistoryAnalyzer>, usize)>> = pool.install(|| {
        branches
            .into_par_iter()
            .zip(ranges.into_par_iter())
            .enumerate()
            .map(|(shard, (mut branch, range))| {
                debug!("Shard {} consuming commits {:?}", shard, range);
                let stream = open_stream(&commit_ids[range])?;
                let consumed = drive(branch.as_mut(), stream, cancel)?;
                Ok((branch, consumed))
            })
            .collect()
    });

    let mut merged = Vec::with_capacity(results.len());
    let mut consumed = 0;
    for result in results {
        let (branch, count) = result?;
        consumed += count;
        merged.push(branch);
    }

    analyzer.merge(merged);
    Ok(consumed)
}
