//! Repository location helpers

use anyhow::{Context, Result};
use git2::Repository;
use log::{debug, info};
use std::path::{Path, PathBuf};

/// Open the repository at `path`, failing early when the path is missing
pub fn open_repository(path: &Path) -> Result<Repository> {
    if !path.exists() {
        anyhow::bail!("Path does not exist: {}", path.display());
    }

    let repo = Repository::open(path)
        .with_context(|| format!("{} is not a git repository", path.display()))?;
    debug!(
        "Opened {} repository at {}",
        if repo.is_bare() { "bare" } else { "working" },
        path.display()
    );
    Ok(repo)
}

/// Canonical working directory, or the git directory of a bare repository
pub fn repository_root(repo: &Repository) -> Result<PathBuf> {
    let root = repo.workdir().unwrap_or_else(|| repo.path());
    root.canonicalize()
        .with_context(|| format!("Cannot canonicalize {}", root.display()))
}

/// Resolve `--repo`, defaulting to the current directory
pub fn resolve_repository_path(repository_arg: Option<&str>) -> Result<PathBuf> {
    let repo = match repository_arg {
        Some(path) => open_repository(Path::new(path))?,
        None => {
            let cwd = std::env::current_dir().context("Cannot read the current directory")?;
            let repo = Repository::open(&cwd).with_context(|| {
                format!(
                    "{} is not a git repository; run from inside one or pass --repo",
                    cwd.display()
                )
            })?;
            info!("Analyzing repository in the current directory: {}", cwd.display());
            repo
        }
    };
    repository_root(&repo)
}
