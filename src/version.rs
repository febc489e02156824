//! Format Version
//!
//! Version stamped into checkpoints and binary reports, encoded as
//! `major * 10000 + minor * 100 + patch`. The value comes from
//! `[package.metadata.shotness]` in Cargo.toml.

include!(concat!(env!("OUT_DIR"), "/format_version.rs"));

/// Major component of a packed format version
pub fn major(version: u32) -> u32 {
    version / 10000
}

/// Whether data written with `version` can be read by this build
pub fn is_compatible(version: u32) -> bool {
    major(version) == major(FORMAT_VERSION)
}

/// Crate version from Cargo.toml
pub fn crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_compatibility() {
        assert!(is_compatible(FORMAT_VERSION));
        assert!(is_compatible(major(FORMAT_VERSION) * 10000 + 99));
        assert!(!is_compatible(FORMAT_VERSION + 10000));
        assert_eq!(major(1_02_03), 1);
    }
}
