//! Analysis execution
//!
//! ```text
//! --input FILE ───────────────> decode_report ──> render
//! repository ─> commit ids ─┬─> shards > 1:  run_sharded ───┐
//!                           └─> otherwise:   StreamingDriver ┴─> finalize ─> compute ─> render
//! ```

use anyhow::{Context, Result};
use log::{debug, info, warn};
use std::fs;
use std::io::{IsTerminal, Write};
use std::path::Path;

use super::initialization::{build_shotness_config, colours_enabled, resolve_output_format};
use crate::cli::Args;
use crate::config::ConfigManager;
use crate::git;
use crate::metrics;
use crate::output::{decode_report, render_decoded, render_metrics, serialize_document, OutputFormat, TextOptions};
use crate::pipeline::{run_sharded, CancellationFlag, StreamingDriver};
use crate::scanner::HistoryWalker;
use crate::shotness::{CheckpointManager, RawReport, ShotnessConfig, ShotnessEngine};

/// How a repository analysis is run
#[derive(Debug, Clone, Default)]
pub struct AnalysisOptions {
    /// Keep only the most recent N commits
    pub limit: Option<usize>,
    /// Continue from a saved checkpoint
    pub resume: bool,
}

/// Entry point once arguments, configuration and logging are set up
pub fn run(args: &Args, config: &ConfigManager) -> Result<()> {
    let format = resolve_output_format(args, config)?;
    let options = TextOptions {
        limit: args.top,
        colours: format == OutputFormat::Text && colours_enabled(args, config, std::io::stdout().is_terminal()),
    };

    let rendered = match &args.input {
        Some(input) => rerender_report(input, format, &options)?,
        None => {
            let repo_path = git::resolve_repository_path(args.repository.as_deref())?;
            let shotness_config = build_shotness_config(args, config)?;
            let analysis = AnalysisOptions {
                limit: args.limit,
                resume: args.resume,
            };
            let report = analyze_repository(&repo_path, &shotness_config, &analysis, &CancellationFlag::new())?;

            if args.raw {
                serialize_document(&report, format)?
            } else {
                render_metrics(&metrics::compute(&report), format, &options)?
            }
        }
    };

    write_output(args.output.as_deref(), &rendered)
}

/// Decode a saved report (binary, JSON or YAML) and render it again
pub fn rerender_report(input: &Path, format: OutputFormat, options: &TextOptions) -> Result<Vec<u8>> {
    let bytes = fs::read(input).with_context(|| format!("Failed to read report: {}", input.display()))?;
    let report = decode_report(&bytes).with_context(|| format!("Failed to decode report: {}", input.display()))?;
    Ok(render_decoded(&report, format, options)?)
}

/// Run the engine over the repository's history and return the raw report
pub fn analyze_repository(
    repo_path: &Path,
    config: &ShotnessConfig,
    options: &AnalysisOptions,
    cancel: &CancellationFlag,
) -> Result<RawReport> {
    let ids = select_commits(HistoryWalker::commit_ids(repo_path)?, options.limit);
    let mut engine = ShotnessEngine::from_config(config)?;
    info!("Analyzing {} commits in {}", ids.len(), repo_path.display());

    if config.shards > 1 {
        let consumed = run_sharded(&mut engine, &ids, config.shards, cancel, |slice| {
            HistoryWalker::for_commits(repo_path, slice)
        })?;
        debug!("Sharded run consumed {} commits", consumed);
        return Ok(engine.finalize());
    }

    let manager = checkpoint_manager(repo_path, config, options.resume);
    let start = match (&manager, options.resume) {
        (Some(manager), true) => resume_position(manager, &mut engine, &ids)?,
        _ => 0,
    };

    let mut driver = StreamingDriver::new(config.chunk_size, config.max_memory_bytes).with_cancellation(cancel.clone());
    if let Some(manager) = &manager {
        driver = driver.with_checkpoints(manager);
    }

    let stats = driver.run(&mut engine, &ids[start..], |chunk| {
        HistoryWalker::for_commits(repo_path, chunk)
    })?;
    info!(
        "Processed {} commits in {} chunks ({} hibernations, {} checkpoints)",
        stats.commits, stats.chunks, stats.hibernations, stats.checkpoints_saved
    );

    if let Some(manager) = &manager {
        manager.clear()?;
    }
    Ok(engine.finalize())
}

/// Oldest-first ids, cut down to the most recent `limit`
fn select_commits(mut ids: Vec<String>, limit: Option<usize>) -> Vec<String> {
    if let Some(limit) = limit {
        if ids.len() > limit {
            let skipped = ids.len() - limit;
            debug!("Skipping {} older commits", skipped);
            ids.drain(..skipped);
        }
    }
    ids
}

/// Checkpointing is on when a directory is configured, or when resuming
/// (which then uses the default cache directory)
fn checkpoint_manager(repo_path: &Path, config: &ShotnessConfig, resume: bool) -> Option<CheckpointManager> {
    match &config.checkpoint_dir {
        Some(dir) => Some(CheckpointManager::new(dir.clone(), repo_path)),
        None if resume => Some(CheckpointManager::new(CheckpointManager::default_dir(), repo_path)),
        None => None,
    }
}

/// Restore the checkpoint into `engine` and return the index of the first
/// commit still to process
fn resume_position(manager: &CheckpointManager, engine: &mut ShotnessEngine, ids: &[String]) -> Result<usize> {
    let Some(metadata) = manager.resume(engine)? else {
        info!("No checkpoint found, starting from the first commit");
        return Ok(0);
    };

    let position = metadata.commits_processed;
    let matches_history = match (&metadata.last_commit, position.checked_sub(1)) {
        (Some(last), Some(index)) => ids.get(index) == Some(last),
        (None, None) => true,
        _ => false,
    };
    if !matches_history {
        warn!("Checkpoint does not line up with the selected history, discarding it");
        manager.clear()?;
        engine.reset();
        return Ok(0);
    }

    info!(
        "Resuming after commit {} ({} already processed, checkpoint from {})",
        metadata.last_commit.as_deref().unwrap_or("-"),
        position,
        metadata.created_at
    );
    Ok(position)
}

fn write_output(path: Option<&Path>, rendered: &[u8]) -> Result<()> {
    match path {
        Some(path) => {
            fs::write(path, rendered).with_context(|| format!("Failed to write report: {}", path.display()))?;
            info!("Report written to {}", path.display());
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(rendered).context("Failed to write report to stdout")?;
            stdout.flush().context("Failed to flush stdout")?;
        }
    }
    Ok(())
}
