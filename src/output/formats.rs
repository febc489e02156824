//! Report Formats
//!
//! Computed metrics serialize to JSON, YAML, text, or a binary envelope:
//!
//! ```text
//! +--------+----------------+---------------------------+
//! | "SHOT" | version u32 LE | bincode(ComputedMetrics)  |
//! +--------+----------------+---------------------------+
//! ```
//!
//! Decoding accepts any of the serialized forms. A JSON or YAML document that
//! does not have the computed-metrics shape is still returned, as a generic
//! value, so that it can be shown as a key/value table.

use log::{debug, warn};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::metrics::ComputedMetrics;
use crate::shotness::{ShotnessError, ShotnessResult};
use crate::version::{self, FORMAT_VERSION};

use super::reports::{render_generic, render_text, TextOptions};

/// Leading bytes of a binary report
pub const REPORT_MAGIC: &[u8; 4] = b"SHOT";

const HEADER_LEN: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Yaml,
    Binary,
}

impl OutputFormat {
    pub fn is_binary(&self) -> bool {
        matches!(self, OutputFormat::Binary)
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "yaml" | "yml" => Ok(OutputFormat::Yaml),
            "binary" | "bin" => Ok(OutputFormat::Binary),
            other => Err(format!(
                "Unknown output format '{}'. Expected one of: text, json, yaml, binary",
                other
            )),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OutputFormat::Text => "text",
            OutputFormat::Json => "json",
            OutputFormat::Yaml => "yaml",
            OutputFormat::Binary => "binary",
        };
        write!(f, "{}", name)
    }
}

/// A report read back from disk
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedReport {
    Metrics(ComputedMetrics),
    /// Any other document, kept as a loosely typed value
    Generic(serde_json::Value),
}

/// Wrap computed metrics in the binary envelope
pub fn encode_binary(metrics: &ComputedMetrics) -> ShotnessResult<Vec<u8>> {
    let payload = bincode::serialize(metrics).map_err(|e| ShotnessError::codec(e.to_string()))?;
    let mut bytes = Vec::with_capacity(HEADER_LEN + payload.len());
    bytes.extend_from_slice(REPORT_MAGIC);
    bytes.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    bytes.extend_from_slice(&payload);
    Ok(bytes)
}

/// Unwrap a binary envelope, checking magic and major version
pub fn decode_binary(bytes: &[u8]) -> ShotnessResult<ComputedMetrics> {
    if bytes.len() < HEADER_LEN || &bytes[..4] != REPORT_MAGIC {
        return Err(ShotnessError::envelope("missing SHOT magic header"));
    }
    let mut raw_version = [0u8; 4];
    raw_version.copy_from_slice(&bytes[4..HEADER_LEN]);
    let report_version = u32::from_le_bytes(raw_version);
    if !version::is_compatible(report_version) {
        return Err(ShotnessError::UnsupportedVersion(report_version));
    }
    bincode::deserialize(&bytes[HEADER_LEN..]).map_err(|e| ShotnessError::codec(e.to_string()))
}

pub fn is_binary_report(bytes: &[u8]) -> bool {
    bytes.starts_with(REPORT_MAGIC)
}

/// Decode a previously written report in any supported format
pub fn decode_report(bytes: &[u8]) -> ShotnessResult<DecodedReport> {
    if is_binary_report(bytes) {
        return decode_binary(bytes).map(DecodedReport::Metrics);
    }

    let value: serde_json::Value = match serde_json::from_slice(bytes) {
        Ok(value) => value,
        Err(json_err) => {
            debug!("Report is not JSON ({}), trying YAML", json_err);
            serde_yaml::from_slice(bytes).map_err(|e| ShotnessError::codec(e.to_string()))?
        }
    };

    match serde_json::from_value::<ComputedMetrics>(value.clone()) {
        Ok(metrics) => Ok(DecodedReport::Metrics(metrics)),
        Err(e) => {
            warn!("Report does not match the metrics layout ({}), showing it as a generic table", e);
            Ok(DecodedReport::Generic(value))
        }
    }
}

/// Serialize any report document to a textual format
pub fn serialize_document<T: Serialize>(document: &T, format: OutputFormat) -> ShotnessResult<Vec<u8>> {
    match format {
        OutputFormat::Json => {
            let mut json =
                serde_json::to_string_pretty(document).map_err(|e| ShotnessError::codec(e.to_string()))?;
            json.push('\n');
            Ok(json.into_bytes())
        }
        OutputFormat::Yaml => serde_yaml::to_string(document)
            .map(String::into_bytes)
            .map_err(|e| ShotnessError::codec(e.to_string())),
        OutputFormat::Text | OutputFormat::Binary => {
            let value = serde_json::to_value(document).map_err(|e| ShotnessError::codec(e.to_string()))?;
            Ok(render_generic(&value, false).into_bytes())
        }
    }
}

/// Render computed metrics in the requested format
pub fn render_metrics(metrics: &ComputedMetrics, format: OutputFormat, options: &TextOptions) -> ShotnessResult<Vec<u8>> {
    match format {
        OutputFormat::Text => Ok(render_text(metrics, options).into_bytes()),
        OutputFormat::Binary => encode_binary(metrics),
        OutputFormat::Json | OutputFormat::Yaml => serialize_document(metrics, format),
    }
}

/// Render a decoded report; generic documents always become a table
pub fn render_decoded(report: &DecodedReport, format: OutputFormat, options: &TextOptions) -> ShotnessResult<Vec<u8>> {
    match report {
        DecodedReport::Metrics(metrics) => render_metrics(metrics, format, options),
        DecodedReport::Generic(value) => Ok(render_generic(value, options.colours).into_bytes()),
    }
}
