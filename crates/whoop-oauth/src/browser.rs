//! Opening the authorization URL in the user's browser.

use std::process::{Child, Command, Stdio};

/// Something that can show a URL to the user.
pub trait BrowserLauncher: Send + Sync + std::fmt::Debug {
    fn open(&self, url: &str) -> std::io::Result<()>;
}

/// Launches the platform's default browser without waiting for it.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemBrowser;

impl BrowserLauncher for SystemBrowser {
    fn open(&self, url: &str) -> std::io::Result<()> {
        let mut command = browser_command(url)?;
        // stdout may be the MCP transport; keep the child off it.
        let child = command
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;
        reap(child);
        Ok(())
    }
}

/// Wait for the launcher in the background so it does not linger as a zombie
/// in a long-running server.
fn reap(mut child: Child) {
    let pid = child.id();
    let spawned = std::thread::Builder::new()
        .name("browser-reaper".to_string())
        .spawn(move || match child.wait() {
            Ok(status) => tracing::debug!(pid, %status, "Browser launcher exited"),
            Err(e) => tracing::debug!(pid, error = %e, "Failed to wait for browser launcher"),
        });
    if let Err(e) = spawned {
        tracing::warn!(pid, error = %e, "Could not start browser reaper thread");
    }
}

#[cfg(target_os = "macos")]
fn browser_command(url: &str) -> std::io::Result<Command> {
    let mut cmd = Command::new("open");
    cmd.arg(url);
    Ok(cmd)
}

#[cfg(target_os = "linux")]
fn browser_command(url: &str) -> std::io::Result<Command> {
    let mut cmd = Command::new("xdg-open");
    cmd.arg(url);
    Ok(cmd)
}

#[cfg(target_os = "windows")]
fn browser_command(url: &str) -> std::io::Result<Command> {
    let mut cmd = Command::new("rundll32");
    cmd.args(["url.dll,FileProtocolHandler", url]);
    Ok(cmd)
}

#[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
fn browser_command(_url: &str) -> std::io::Result<Command> {
    Err(std::io::Error::new(
        std::io::ErrorKind::Unsupported,
        format!("unsupported platform: {}", std::env::consts::OS),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(target_os = "linux")]
    #[test]
    fn test_reap_collects_exited_child() {
        let child = Command::new("true").spawn().unwrap();
        let proc_entry = std::path::PathBuf::from(format!("/proc/{}", child.id()));
        reap(child);

        // A zombie keeps its /proc entry until it is waited on.
        let reaped = (0..250).any(|_| {
            if !proc_entry.exists() {
                return true;
            }
            std::thread::sleep(std::time::Duration::from_millis(20));
            false
        });
        assert!(reaped, "{} still present", proc_entry.display());
    }
}
