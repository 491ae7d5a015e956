use anyhow::{Context, Result};

use crate::util::process::{self, CommandSpec};

/// Opens a URL in the user's browser.
pub trait BrowserLauncher: Send + Sync {
    fn open(&self, url: &str) -> Result<()>;
}

/// Hands the URL to the platform's opener (`open`, `xdg-open` or `start`).
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemBrowser;

impl BrowserLauncher for SystemBrowser {
    fn open(&self, url: &str) -> Result<()> {
        process::spawn_detached(opener_command(url)?)
    }
}

#[cfg(target_os = "macos")]
fn opener_command(url: &str) -> Result<CommandSpec> {
    let opener = which::which("open").context("failed to find `open` in PATH")?;
    Ok(CommandSpec::new(opener).arg(url))
}

#[cfg(windows)]
fn opener_command(url: &str) -> Result<CommandSpec> {
    let shell = which::which("cmd").context("failed to find `cmd` in PATH")?;
    Ok(CommandSpec::new(shell)
        .arg("/C")
        .arg("start")
        .arg("")
        .arg(url.replace('&', "^&")))
}

#[cfg(all(unix, not(target_os = "macos")))]
fn opener_command(url: &str) -> Result<CommandSpec> {
    let opener = which::which("xdg-open")
        .context("failed to find `xdg-open` in PATH; open the registration URL manually")?;
    Ok(CommandSpec::new(opener).arg(url))
}
