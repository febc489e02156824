//! Application initialization and configuration

use anyhow::{Context, Result};
use log::{debug, error, LevelFilter};
use std::str::FromStr;

use crate::cli::memory_parser::parse_memory_size;
use crate::config::{ConfigManager, SHOTNESS_SECTION};
use crate::output::OutputFormat;
use crate::shotness::ShotnessConfig;
use crate::{cli, logging};

pub fn load_configuration(args: &cli::Args) -> Result<ConfigManager> {
    let mut manager = if let Some(config_file) = &args.config_file {
        debug!("Loading configuration from explicit file: {}", config_file.display());
        ConfigManager::load_from_file(config_file.clone())?
    } else {
        ConfigManager::load()?
    };

    if let Some(section_name) = &args.config_name {
        manager.select_section(section_name.clone());
    }

    Ok(manager)
}

pub fn configure_logging(args: &cli::Args, config: &ConfigManager) -> Result<logging::LogConfig> {
    let console_level = if args.debug {
        LevelFilter::Trace
    } else if args.verbose {
        LevelFilter::Debug
    } else if args.quiet {
        LevelFilter::Error
    } else {
        match config.get_log_level("base", "console-level") {
            Ok(Some(level)) => level,
            Ok(None) => LevelFilter::Info,
            Err(e) => {
                debug!("Invalid console-level in config, using default: {}", e);
                LevelFilter::Info
            }
        }
    };

    let format = if args.log_format != "text" {
        logging::LogFormat::from_str(&args.log_format).map_err(|e| anyhow::anyhow!(e))?
    } else {
        config
            .get_value("base", "log-format")
            .and_then(|value| logging::LogFormat::from_str(value).ok())
            .unwrap_or(logging::LogFormat::Text)
    };

    let log_file_path = args.log_file.clone().or_else(|| config.get_path("base", "log-file"));

    let file_log_level = match &args.log_file_level {
        Some(level_str) => Some(logging::parse_log_level(level_str)?),
        None => match config.get_log_level("base", "file-log-level") {
            Ok(level) => level,
            Err(e) => {
                debug!("Invalid file-log-level in config, ignoring: {}", e);
                None
            }
        },
    };

    let (destination, file_level) = match (log_file_path, file_log_level) {
        (Some(path), level) => {
            let level = level.unwrap_or(console_level);
            debug!("File logging enabled: {} (level: {:?})", path.display(), level);
            (logging::LogDestination::Both(path), Some(level))
        }
        (None, None) => (logging::LogDestination::Console, None),
        (None, Some(_)) => {
            error!("Log file level specified without log file");
            return Err(anyhow::anyhow!("Log file level specified without log file"));
        }
    };

    Ok(logging::LogConfig {
        console_level,
        file_level,
        format,
        destination,
    })
}

/// Engine configuration from the config file, with command line values
/// taking precedence
pub fn build_shotness_config(args: &cli::Args, config: &ConfigManager) -> Result<ShotnessConfig> {
    let mut shotness = config.get_shotness_config()?;

    if let Some(query) = &args.dsl_struct {
        shotness.dsl_struct = query.clone();
    }
    if let Some(query) = &args.dsl_name {
        shotness.dsl_name = query.clone();
    }
    if let Some(cap) = args.max_coupling_nodes {
        shotness.max_coupling_nodes = cap;
    }
    if let Some(shards) = args.shards {
        shotness.shards = shards;
    }
    if let Some(chunk_size) = args.chunk_size {
        shotness.chunk_size = chunk_size;
    }
    if let Some(size) = &args.max_memory {
        shotness.max_memory_bytes = parse_memory_size(size)
            .with_context(|| format!("Invalid --max-memory value: {}", size))?;
    }
    if let Some(dir) = &args.checkpoint_dir {
        shotness.checkpoint_dir = Some(dir.clone());
    }

    shotness
        .validate()
        .with_context(|| "Shotness configuration validation failed")?;

    debug!(
        "Shotness config: shards={}, chunk_size={}, budget={}, cap={}",
        shotness.shards,
        shotness.chunk_size,
        shotness.memory_display(),
        shotness.max_coupling_nodes
    );
    Ok(shotness)
}

/// `--format`, then `[shotness] format`, then text
pub fn resolve_output_format(args: &cli::Args, config: &ConfigManager) -> Result<OutputFormat> {
    if let Some(format) = &args.format {
        return format.parse::<OutputFormat>().map_err(|e| anyhow::anyhow!(e));
    }
    Ok(config.get_output_format()?.unwrap_or_default())
}

/// Colours are off for `--no-color`, for `color = false` in the config,
/// and whenever the report is not headed for a terminal
pub fn colours_enabled(args: &cli::Args, config: &ConfigManager, stdout_is_terminal: bool) -> bool {
    if args.no_color || args.output.is_some() {
        return false;
    }
    match config.get_bool(SHOTNESS_SECTION, "color") {
        Ok(Some(false)) => false,
        _ => stdout_is_terminal,
    }
}
