//! Generates `FORMAT_VERSION` from `[package.metadata.shotness] format_version`

use std::env;
use std::fs;
use std::path::PathBuf;

fn read_format_version(manifest: &PathBuf) -> Result<i64, String> {
    let content = fs::read_to_string(manifest).map_err(|e| format!("reading {}: {}", manifest.display(), e))?;
    let value: toml::Value = content.parse().map_err(|e| format!("parsing Cargo.toml: {}", e))?;

    ["package", "metadata", "shotness", "format_version"]
        .iter()
        .try_fold(&value, |node, key| node.get(key).ok_or(*key))
        .map_err(|key| format!("Cargo.toml is missing '{}' under package.metadata.shotness.format_version", key))?
        .as_integer()
        .ok_or_else(|| "package.metadata.shotness.format_version must be an integer".to_string())
}

fn main() {
    let manifest = PathBuf::from(env::var("CARGO_MANIFEST_DIR").unwrap_or_default()).join("Cargo.toml");
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap_or_default());

    let version = match read_format_version(&manifest) {
        Ok(version) => version,
        Err(e) => panic!("format version: {}", e),
    };

    let generated = format!(
        "/// On-disk layout version of reports and checkpoints (major * 10000 + minor * 100 + patch)\n\
         pub const FORMAT_VERSION: u32 = {};\n",
        version
    );
    if let Err(e) = fs::write(out_dir.join("format_version.rs"), generated) {
        panic!("writing format_version.rs: {}", e);
    }

    println!("cargo:rerun-if-changed=Cargo.toml");
}
