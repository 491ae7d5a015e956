use std::ffi::OsString;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use anyhow::{Context, Result};

/// A program and its arguments. Spawned children get no stdio.
pub struct CommandSpec {
    pub program: PathBuf,
    pub args: Vec<OsString>,
}

impl CommandSpec {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }
}

/// Start `spec` without waiting for it to finish.
///
/// The child is reaped on a background thread so launchers that outlive the
/// call do not linger as zombies.
pub fn spawn_detached(spec: CommandSpec) -> Result<()> {
    let mut child = Command::new(&spec.program)
        .args(&spec.args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .with_context(|| format!("failed to spawn `{}`", spec.program.display()))?;
    std::thread::spawn(move || {
        let _ = child.wait();
    });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_program_is_named_in_the_error() {
        let spec = CommandSpec::new("/nonexistent/opener").arg("https://example.test");
        let err = spawn_detached(spec).unwrap_err();
        assert!(format!("{err:#}").contains("/nonexistent/opener"));
    }

    #[cfg(unix)]
    #[test]
    fn chatty_child_spawns_without_a_terminal() {
        let spec = CommandSpec::new("/bin/sh")
            .arg("-c")
            .arg("echo out; echo err >&2");
        spawn_detached(spec).unwrap();
    }
}
