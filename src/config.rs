//! Configuration file discovery and typed access
//!
//! TOML tables are flattened into `section -> key -> value` string maps.
//! Lookups fall back from the `--config-name` section to the requested
//! section and finally to `[base]`.
//!
//! ```toml
//! [base]
//! console-level = "warn"
//!
//! [shotness]
//! max-memory = "512MB"
//! shards = 4
//!
//! [ci]          # selected with --config-name ci
//! shards = 16
//! ```

use anyhow::{Context, Result};
use log::{debug, info};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;
use toml::Value;

use crate::cli::memory_parser::parse_memory_size;
use crate::output::OutputFormat;
use crate::shotness::ShotnessConfig;

/// Environment variable naming an explicit configuration file
pub const CONFIG_ENV_VAR: &str = "SHOTNESS_CONFIG";

/// Section holding engine and pipeline settings
pub const SHOTNESS_SECTION: &str = "shotness";

const BASE_SECTION: &str = "base";

/// Flattened settings: section -> key -> raw value
pub type Configuration = HashMap<String, HashMap<String, String>>;

#[derive(Debug, Default)]
pub struct ConfigManager {
    config: Configuration,
    config_file_path: Option<PathBuf>,
    selected_section: Option<String>,
}

impl ConfigManager {
    pub fn from_config(config: Configuration) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Load the first configuration file found during discovery, or an
    /// empty configuration when there is none
    pub fn load() -> Result<Self> {
        match discover_config_files().into_iter().find(|path| path.is_file()) {
            Some(path) => Self::load_from_file(path),
            None => {
                info!("No configuration file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn load_from_file(path: PathBuf) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config = parse_toml_config(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        info!("Loaded configuration from: {}", path.display());
        Ok(Self {
            config,
            config_file_path: Some(path),
            selected_section: None,
        })
    }

    pub fn config_file_path(&self) -> Option<&PathBuf> {
        self.config_file_path.as_ref()
    }

    /// Raw value of `key`, searching the selected section, then `section`,
    /// then `[base]`
    pub fn get_value(&self, section: &str, key: &str) -> Option<&String> {
        self.selected_section
            .as_deref()
            .into_iter()
            .chain([section, BASE_SECTION])
            .find_map(|name| self.config.get(name)?.get(key))
    }

    /// Give `section` priority over every other section (`--config-name`)
    pub fn select_section(&mut self, section: String) {
        debug!("Selecting configuration section: {}", section);
        self.selected_section = Some(section);
    }

    /// Parse a value with `FromStr`, naming the key on failure
    fn get_parsed<T>(&self, section: &str, key: &str) -> Result<Option<T>>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        self.get_value(section, key)
            .map(|raw| {
                raw.parse::<T>()
                    .map_err(|e| anyhow::anyhow!("Invalid value for {}.{} ({}): {}", section, key, raw, e))
            })
            .transpose()
    }

    pub fn get_bool(&self, section: &str, key: &str) -> Result<Option<bool>> {
        self.get_value(section, key)
            .map(|raw| match raw.to_ascii_lowercase().as_str() {
                "true" | "yes" | "on" => Ok(true),
                "false" | "no" | "off" => Ok(false),
                _ => Err(anyhow::anyhow!("Invalid boolean value for {}.{}: {}", section, key, raw)),
            })
            .transpose()
    }

    pub fn get_log_level(&self, section: &str, key: &str) -> Result<Option<log::LevelFilter>> {
        self.get_value(section, key)
            .map(|raw| crate::logging::parse_log_level(raw))
            .transpose()
    }

    pub fn get_path(&self, section: &str, key: &str) -> Option<PathBuf> {
        self.get_value(section, key).map(PathBuf::from)
    }

    pub fn get_usize(&self, section: &str, key: &str) -> Result<Option<usize>> {
        self.get_parsed(section, key)
    }

    /// Output format from `[shotness] format`, if configured
    pub fn get_output_format(&self) -> Result<Option<OutputFormat>> {
        self.get_parsed(SHOTNESS_SECTION, "format")
    }

    /// Engine configuration from the `[shotness]` section over defaults
    pub fn get_shotness_config(&self) -> Result<ShotnessConfig> {
        let defaults = ShotnessConfig::default();
        let text = |key: &str| self.get_value(SHOTNESS_SECTION, key).cloned();

        let max_memory_bytes = match self.get_value(SHOTNESS_SECTION, "max-memory") {
            Some(raw) => parse_memory_size(raw)
                .with_context(|| format!("Invalid max-memory value in config: {}", raw))?,
            None => defaults.max_memory_bytes,
        };

        let config = ShotnessConfig {
            dsl_struct: text("dsl-struct").unwrap_or(defaults.dsl_struct),
            dsl_name: text("dsl-name").unwrap_or(defaults.dsl_name),
            max_coupling_nodes: self
                .get_usize(SHOTNESS_SECTION, "max-coupling-nodes")?
                .unwrap_or(defaults.max_coupling_nodes),
            shards: self.get_usize(SHOTNESS_SECTION, "shards")?.unwrap_or(defaults.shards),
            chunk_size: self.get_usize(SHOTNESS_SECTION, "chunk-size")?.unwrap_or(defaults.chunk_size),
            max_memory_bytes,
            checkpoint_dir: self.get_path(SHOTNESS_SECTION, "checkpoint-dir").or(defaults.checkpoint_dir),
        };

        config
            .validate()
            .context("Shotness configuration validation failed")?;
        Ok(config)
    }
}

/// Candidate configuration files, highest precedence first:
/// `$SHOTNESS_CONFIG`, the user config dir, `~/.shotness.toml`, then
/// `./.shotness.toml`
fn discover_config_files() -> Vec<PathBuf> {
    let candidates: Vec<PathBuf> = env::var_os(CONFIG_ENV_VAR)
        .map(PathBuf::from)
        .into_iter()
        .chain(dirs::config_dir().map(|dir| dir.join("shotness").join("config.toml")))
        .chain(dirs::home_dir().map(|dir| dir.join(".shotness.toml")))
        .chain(std::iter::once(PathBuf::from(".shotness.toml")))
        .collect();

    debug!("Config discovery paths: {:?}", candidates);
    candidates
}

fn parse_toml_config(content: &str) -> Result<Configuration> {
    let table: toml::Table = content.parse().context("Failed to parse TOML content")?;

    let mut config = Configuration::new();
    flatten_toml_table(&table, None, &mut config);
    debug!("Parsed configuration sections: {:?}", config.keys().collect::<Vec<_>>());
    Ok(config)
}

/// Leaf tables become sections named by their dotted path; tables holding
/// further tables are descended into. A scalar outside any table is stored
/// as `[name] value`.
fn flatten_toml_table(table: &toml::Table, prefix: Option<&str>, config: &mut Configuration) {
    for (key, value) in table {
        let name = prefix.map_or_else(|| key.clone(), |p| format!("{}.{}", p, key));

        match value {
            Value::Table(nested) if nested.values().any(Value::is_table) => {
                flatten_toml_table(nested, Some(&name), config);
            }
            Value::Table(leaf) => {
                let section = config.entry(name).or_default();
                section.extend(leaf.iter().map(|(k, v)| (k.clone(), toml_value_to_string(v))));
            }
            scalar => {
                config
                    .entry(name)
                    .or_default()
                    .insert("value".to_string(), toml_value_to_string(scalar));
            }
        }
    }
}

fn toml_value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Integer(i) => i.to_string(),
        Value::Float(f) => f.to_string(),
        Value::Boolean(b) => b.to_string(),
        Value::Datetime(d) => d.to_string(),
        Value::Array(_) | Value::Table(_) => value.to_string(),
    }
}
