use std::process::{Command, Stdio};
use std::sync::{Mutex, PoisonError};

use anyhow::{Context, Result};

/// Side effect fired when a workspace becomes reachable.
pub trait UrlOpener: Send + Sync {
    fn open(&self, url: &str) -> Result<()>;
}

/// Hands the URL to the platform's default browser.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemBrowser;

impl UrlOpener for SystemBrowser {
    fn open(&self, url: &str) -> Result<()> {
        #[cfg(target_os = "macos")]
        let mut command = {
            let mut cmd = Command::new("open");
            cmd.arg(url);
            cmd
        };

        #[cfg(target_os = "windows")]
        let mut command = {
            let mut cmd = Command::new("cmd");
            cmd.args(["/C", "start", url]);
            cmd
        };

        #[cfg(not(any(target_os = "macos", target_os = "windows")))]
        let mut command = {
            let mut cmd = Command::new("xdg-open");
            cmd.arg(url);
            cmd
        };

        command
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .with_context(|| format!("launch browser for {}", url))?;
        Ok(())
    }
}

/// Remembers every URL instead of opening it.
#[derive(Debug, Default)]
pub struct RecordingOpener {
    opened: Mutex<Vec<String>>,
}

impl RecordingOpener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn opened(&self) -> Vec<String> {
        self.opened
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl UrlOpener for RecordingOpener {
    fn open(&self, url: &str) -> Result<()> {
        self.opened
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(url.to_string());
        Ok(())
    }
}

/// Prints the URL instead of launching anything (headless use).
#[derive(Clone, Copy, Debug, Default)]
pub struct PrintOpener;

impl UrlOpener for PrintOpener {
    fn open(&self, url: &str) -> Result<()> {
        println!("workspace ready: {}", url);
        Ok(())
    }
}
