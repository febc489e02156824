use clap::Parser;
use anyhow::{Context, Result};
use std::path::PathBuf;
use log::debug;

use super::memory_parser::parse_memory_size;
use crate::logging::{parse_log_level, LogFormat};
use crate::output::OutputFormat;

/// Structural hotness analysis of git history
#[derive(Parser, Debug, Clone)]
#[command(name = "shotness")]
#[command(about = "Mines git history for how often each function changes and which functions change together")]
#[command(version)]
pub struct Args {
    /// Repository to analyze (the current directory when omitted)
    #[arg(short = 'r', long = "repo", alias = "repository", value_name = "PATH")]
    pub repository: Option<String>,

    /// Log at debug level
    #[arg(short, long)]
    pub verbose: bool,

    /// Log errors only
    #[arg(short, long)]
    pub quiet: bool,

    /// Log at trace level
    #[arg(long)]
    pub debug: bool,

    /// Log line format (text or json)
    #[arg(long, value_name = "FORMAT", default_value = "text")]
    pub log_format: String,

    /// Also append log lines to this file
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// Level for the log file (defaults to the console level)
    #[arg(long, value_name = "LEVEL")]
    pub log_file_level: Option<String>,

    /// Read configuration from this TOML file
    #[arg(long, value_name = "FILE")]
    pub config_file: Option<PathBuf>,

    /// Configuration section whose keys take precedence
    #[arg(long, value_name = "SECTION")]
    pub config_name: Option<String>,

    // ============ ANALYSIS ============

    /// Structural query selecting the tracked units
    #[arg(long = "dsl-struct", value_name = "QUERY")]
    pub dsl_struct: Option<String>,

    /// Name query applied to each selected unit
    #[arg(long = "dsl-name", value_name = "QUERY")]
    pub dsl_name: Option<String>,

    /// Skip coupling updates for commits touching more units than this (0 disables)
    #[arg(long = "max-coupling-nodes", value_name = "N")]
    pub max_coupling_nodes: Option<usize>,

    /// Only analyze the most recent N commits (processed oldest first)
    #[arg(short = 'L', long = "limit", value_name = "N")]
    pub limit: Option<usize>,

    // ============ EXECUTION ============

    /// Number of history shards processed in parallel
    #[arg(long = "shards", value_name = "N")]
    pub shards: Option<usize>,

    /// Commits per streaming chunk
    #[arg(long = "chunk-size", value_name = "N")]
    pub chunk_size: Option<usize>,

    /// Estimated engine size that triggers hibernation (supports units: MB, GB, K, T, etc.)
    #[arg(long = "max-memory", value_name = "SIZE")]
    pub max_memory: Option<String>,

    /// Directory for resumable checkpoints
    #[arg(long = "checkpoint-dir", value_name = "DIR")]
    pub checkpoint_dir: Option<PathBuf>,

    /// Resume from the repository's checkpoint if one exists
    #[arg(long)]
    pub resume: bool,

    // ============ OUTPUT ============

    /// Output format: text, json, yaml or binary
    #[arg(short = 'f', long = "format", value_name = "FORMAT")]
    pub format: Option<String>,

    /// Write the report to a file instead of stdout
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Emit the raw per-unit counters instead of computed metrics
    #[arg(long)]
    pub raw: bool,

    /// Rows per section in text output
    #[arg(long = "top", value_name = "N", default_value_t = crate::output::DEFAULT_SECTION_LIMIT)]
    pub top: usize,

    /// Disable coloured text output
    #[arg(long = "no-color")]
    pub no_color: bool,

    /// Re-render a previously saved report instead of analyzing a repository
    #[arg(long, value_name = "FILE")]
    pub input: Option<PathBuf>,
}

pub fn parse_args() -> Args {
    let args = Args::parse();
    debug!("Command line: {:?}", args);
    args
}

/// Reject flag values and combinations the run cannot honour
pub fn validate_args(args: &Args) -> Result<()> {
    if [args.verbose, args.quiet, args.debug].into_iter().filter(|&set| set).count() > 1 {
        anyhow::bail!("Only one of --verbose, --quiet and --debug may be given");
    }

    args.log_format
        .parse::<LogFormat>()
        .map_err(|e| anyhow::anyhow!(e))?;

    match (&args.log_file_level, &args.log_file) {
        (Some(_), None) => anyhow::bail!("--log-file-level needs a --log-file to apply to"),
        (Some(level), Some(_)) => {
            parse_log_level(level).context("Invalid --log-file-level")?;
        }
        _ => {}
    }

    if let Some(ref format) = args.format {
        format.parse::<OutputFormat>().map_err(|e| anyhow::anyhow!(e))?;
    }

    if let Some(ref size) = args.max_memory {
        parse_memory_size(size)
            .map_err(|e| anyhow::anyhow!("Invalid --max-memory value '{}': {}", size, e))?;
    }

    if args.shards == Some(0) {
        return Err(anyhow::anyhow!("--shards must be greater than zero"));
    }

    if args.chunk_size == Some(0) {
        return Err(anyhow::anyhow!("--chunk-size must be greater than zero"));
    }

    if args.resume && args.shards.is_some_and(|shards| shards > 1) {
        return Err(anyhow::anyhow!(
            "--resume cannot be combined with --shards greater than 1"
        ));
    }

    if args.input.is_some() && (args.resume || args.repository.is_some()) {
        return Err(anyhow::anyhow!(
            "--input re-renders a saved report and cannot be combined with --repo or --resume"
        ));
    }

    if args.raw && args.input.is_some() {
        return Err(anyhow::anyhow!("--raw cannot be combined with --input"));
    }

    Ok(())
}
