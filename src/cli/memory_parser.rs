//! Memory budget parsing
//!
//! Turns `--max-memory` / `max-memory` values such as `512MB`, `0.5G` or a
//! bare byte count into bytes, and formats byte counts back for log output.
//! Units are binary (1K = 1024 bytes).

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum MemoryParseError {
    #[error("Invalid memory size format: '{input}'. Expected something like '512MB', '1GB' or '2048K'")]
    InvalidFormat { input: String },

    #[error("Invalid memory unit: '{unit}'. Supported units: B, K, M, G, T (optionally followed by B or iB)")]
    InvalidUnit { unit: String },

    #[error("Invalid memory value: '{value}'. Must be a non-negative number")]
    InvalidValue { value: String },

    #[error("Memory size too large: {size} bytes")]
    SizeTooLarge { size: f64 },
}

const UNITS: [(&str, u32); 5] = [("B", 0), ("K", 1), ("M", 2), ("G", 3), ("T", 4)];

/// Parse a memory size string into bytes
///
/// ```
/// use shotness::cli::memory_parser::parse_memory_size;
///
/// assert_eq!(parse_memory_size("4096").unwrap(), 4096);
/// assert_eq!(parse_memory_size("2K").unwrap(), 2048);
/// assert_eq!(parse_memory_size("512MB").unwrap(), 512 * 1024 * 1024);
/// assert_eq!(parse_memory_size("0.5G").unwrap(), 512 * 1024 * 1024);
/// ```
pub fn parse_memory_size(input: &str) -> Result<usize, MemoryParseError> {
    let normalized = input.trim().to_uppercase();
    let split = normalized
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(normalized.len());
    let (number, unit) = normalized.split_at(split);

    if number.is_empty() {
        return Err(if normalized.starts_with('-') {
            MemoryParseError::InvalidValue { value: input.trim().to_string() }
        } else {
            MemoryParseError::InvalidFormat { input: input.to_string() }
        });
    }

    let value: f64 = number
        .parse()
        .map_err(|_| MemoryParseError::InvalidFormat { input: input.to_string() })?;

    let bytes = value * unit_multiplier(unit.trim())?;
    if bytes >= usize::MAX as f64 {
        return Err(MemoryParseError::SizeTooLarge { size: bytes });
    }
    Ok(bytes as usize)
}

fn unit_multiplier(unit: &str) -> Result<f64, MemoryParseError> {
    if unit.is_empty() || unit == "BYTES" {
        return Ok(1.0);
    }
    let prefix = unit
        .strip_suffix("IB")
        .or_else(|| unit.strip_suffix('B').filter(|p| !p.is_empty()))
        .unwrap_or(unit);

    UNITS
        .iter()
        .find(|(name, _)| *name == prefix)
        .map(|(_, power)| 1024f64.powi(*power as i32))
        .ok_or_else(|| MemoryParseError::InvalidUnit { unit: unit.to_string() })
}

/// Human readable byte count, e.g. `1.5 GB`
pub fn format_memory_size(bytes: usize) -> String {
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }

    let label = match UNITS[unit].0 {
        "B" => "B".to_string(),
        prefix => format!("{}B", prefix),
    };
    if unit == 0 || size.fract() == 0.0 {
        format!("{:.0} {}", size, label)
    } else {
        format!("{:.1} {}", size, label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_bytes() {
        assert_eq!(parse_memory_size("1024").unwrap(), 1024);
        assert_eq!(parse_memory_size("1024B").unwrap(), 1024);
        assert_eq!(parse_memory_size("1024 bytes").unwrap(), 1024);
    }

    #[test]
    fn test_unit_spellings() {
        assert_eq!(parse_memory_size("1K").unwrap(), 1024);
        assert_eq!(parse_memory_size("1KB").unwrap(), 1024);
        assert_eq!(parse_memory_size("1KiB").unwrap(), 1024);
        assert_eq!(parse_memory_size("512mb").unwrap(), 512 * 1024 * 1024);
        assert_eq!(parse_memory_size("  1GB  ").unwrap(), 1024 * 1024 * 1024);
        assert_eq!(parse_memory_size("512 MB").unwrap(), 512 * 1024 * 1024);
        assert_eq!(parse_memory_size("1T").unwrap(), 1024_usize.pow(4));
    }

    #[test]
    fn test_decimal_values() {
        assert_eq!(parse_memory_size("0.5G").unwrap(), 512 * 1024 * 1024);
        assert_eq!(parse_memory_size("2.5K").unwrap(), 2560);
    }

    #[test]
    fn test_errors() {
        assert!(matches!(parse_memory_size(""), Err(MemoryParseError::InvalidFormat { .. })));
        assert!(matches!(parse_memory_size("abc"), Err(MemoryParseError::InvalidFormat { .. })));
        assert!(matches!(parse_memory_size("1.2.3GB"), Err(MemoryParseError::InvalidFormat { .. })));
        assert!(matches!(parse_memory_size("1X"), Err(MemoryParseError::InvalidUnit { .. })));
        assert!(matches!(parse_memory_size("1ZB"), Err(MemoryParseError::InvalidUnit { .. })));
        assert!(matches!(parse_memory_size("-1GB"), Err(MemoryParseError::InvalidValue { .. })));
    }

    #[test]
    fn test_format_memory_size() {
        assert_eq!(format_memory_size(1023), "1023 B");
        assert_eq!(format_memory_size(1024), "1 KB");
        assert_eq!(format_memory_size(512 * 1024 * 1024), "512 MB");
        assert_eq!(format_memory_size(1536 * 1024 * 1024), "1.5 GB");
    }
}
