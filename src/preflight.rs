use std::path::{Path, PathBuf};

use anyhow::{Result, bail};
use tracing::debug;

/// Tools the deployment needs on `PATH`.
pub const REQUIRED_BINARIES: [&str; 2] = ["docker", "kubectl"];

pub const PROJECT_DESCRIPTOR: &str = "package.json";

/// Resolves executables by name.
pub trait BinaryLookup {
    fn find(&self, name: &str) -> Option<PathBuf>;
}

/// Looks binaries up on the current `PATH`.
#[derive(Debug, Default, Clone, Copy)]
pub struct PathLookup;

impl BinaryLookup for PathLookup {
    fn find(&self, name: &str) -> Option<PathBuf> {
        which::which(name).ok()
    }
}

/// Fails on the first binary that cannot be resolved.
pub fn check_binaries(lookup: &dyn BinaryLookup, names: &[&str]) -> Result<()> {
    for name in names {
        match lookup.find(name) {
            Some(path) => debug!(binary = name, path = %path.display(), "found required binary"),
            None => bail!("You need to install {name}!"),
        }
    }
    Ok(())
}

pub fn check_project(project_root: &Path) -> Result<()> {
    if !project_root.join(PROJECT_DESCRIPTOR).exists() {
        bail!("This doesn't appear to be a Node.js application - run 'npm init'?");
    }
    Ok(())
}
