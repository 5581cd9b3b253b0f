// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image acquisition — the scanner seen as a black box that hands back
// encoded image bytes or a message explaining why it could not.
//
// `CommandAcquirer` drives any scanner CLI. Arguments may contain the
// `{output}` placeholder, which is replaced with a staging file path the
// command is expected to write; without it, the image is read from stdout.
//
//   ["scanimage", "--format=png", "--resolution=300", "-o", "{output}"]

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use folio_core::config::ScannerConfig;
use folio_core::error::{FolioError, Result};
use tokio::process::Command;
use tracing::{debug, info, instrument, warn};

/// Placeholder replaced with the staging file path.
pub const OUTPUT_PLACEHOLDER: &str = "{output}";

/// Message used when a failed scan printed nothing at all.
pub const NO_OUTPUT_MESSAGE: &str = "Scan cancelled or failed (no output from scanner).";

/// Source of raw spread images.
///
/// On failure, return [`FolioError::Acquisition`] carrying the device's own
/// message; it is shown to the operator verbatim. Dropping the future must
/// abandon the acquisition.
#[async_trait]
pub trait Acquirer: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    async fn acquire(&self) -> Result<Vec<u8>>;
}

/// Acquirer for a session without a scanner. Every scan fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnconfiguredAcquirer;

#[async_trait]
impl Acquirer for UnconfiguredAcquirer {
    fn name(&self) -> &str {
        "unconfigured"
    }

    async fn acquire(&self) -> Result<Vec<u8>> {
        warn!("Scan requested but no scanner command is configured");
        Err(FolioError::Acquisition(
            "No scanner configured. Set scanner.command in the configuration file.".into(),
        ))
    }
}

/// Acquirer that runs an external scanner command.
#[derive(Debug, Clone)]
pub struct CommandAcquirer {
    program: String,
    args: Vec<String>,
    staging_dir: PathBuf,
}

impl CommandAcquirer {
    /// Build from a full command line. Returns `None` for an empty command.
    pub fn new(command: &[String], staging_dir: impl Into<PathBuf>) -> Option<Self> {
        let (program, args) = command.split_first()?;
        Some(Self {
            program: program.clone(),
            args: args.to_vec(),
            staging_dir: staging_dir.into(),
        })
    }

    fn writes_to_file(&self) -> bool {
        self.args.iter().any(|arg| arg.contains(OUTPUT_PLACEHOLDER))
    }
}

/// The configured scanner, or [`UnconfiguredAcquirer`] when no command is set.
pub fn acquirer_from_config(config: &ScannerConfig, staging_dir: impl Into<PathBuf>) -> Arc<dyn Acquirer> {
    match CommandAcquirer::new(&config.command, staging_dir) {
        Some(acquirer) => Arc::new(acquirer),
        None => Arc::new(UnconfiguredAcquirer),
    }
}

#[async_trait]
impl Acquirer for CommandAcquirer {
    fn name(&self) -> &str {
        &self.program
    }

    #[instrument(skip(self), fields(program = %self.program))]
    async fn acquire(&self) -> Result<Vec<u8>> {
        tokio::fs::create_dir_all(&self.staging_dir).await?;
        // Removed on drop, including when a timeout or cancel drops this future.
        let output_path = tempfile::Builder::new()
            .prefix(".acquire-")
            .suffix(".png")
            .tempfile_in(&self.staging_dir)?
            .into_temp_path();
        let output_str = output_path.to_string_lossy();
        let args: Vec<String> = self
            .args
            .iter()
            .map(|arg| arg.replace(OUTPUT_PLACEHOLDER, &output_str))
            .collect();

        info!(args = ?args, "Starting scanner command");
        let result = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await;

        let output = match result {
            Ok(output) => output,
            Err(err) => {
                return Err(FolioError::Acquisition(format!(
                    "Could not start scanner command '{}': {}",
                    self.program, err
                )));
            }
        };

        let image = if self.writes_to_file() {
            tokio::fs::read(&output_path).await.ok()
        } else {
            Some(output.stdout.clone())
        };

        match image {
            Some(bytes) if output.status.success() && !bytes.is_empty() => {
                debug!(len = bytes.len(), "Scanner produced an image");
                Ok(bytes)
            }
            _ => {
                let message = failure_message(&output.stderr, &output.stdout);
                warn!(status = ?output.status.code(), %message, "Scanner command failed");
                Err(FolioError::Acquisition(message))
            }
        }
    }
}

/// Device message for a failed scan: stderr, else stdout, else a fixed text.
pub fn failure_message(stderr: &[u8], stdout: &[u8]) -> String {
    for stream in [stderr, stdout] {
        let text = String::from_utf8_lossy(stream);
        let text = text.trim();
        if !text.is_empty() {
            return text.to_string();
        }
    }
    NO_OUTPUT_MESSAGE.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn failure_message_prefers_stderr() {
        assert_eq!(failure_message(b"  device offline\n", b"ignored"), "device offline");
        assert_eq!(failure_message(b"", b"busy"), "busy");
        assert_eq!(failure_message(b" \n", b""), NO_OUTPUT_MESSAGE);
    }

    #[test]
    fn empty_command_is_unconfigured() {
        assert!(CommandAcquirer::new(&[], "/tmp").is_none());
        let acquirer = acquirer_from_config(&ScannerConfig::default(), "/tmp");
        assert_eq!(acquirer.name(), "unconfigured");
    }

    #[tokio::test]
    async fn unconfigured_always_fails() {
        let err = UnconfiguredAcquirer.acquire().await.unwrap_err();
        assert!(matches!(err, FolioError::Acquisition(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn reads_image_from_output_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let acquirer = CommandAcquirer::new(
            &command(&["sh", "-c", "printf PNGDATA > \"$1\"", "scanner", "{output}"]),
            dir.path(),
        )
        .expect("command");
        let bytes = acquirer.acquire().await.expect("acquire");
        assert_eq!(bytes, b"PNGDATA");

        // The staging file is cleaned up.
        let leftovers = std::fs::read_dir(dir.path()).expect("read dir").count();
        assert_eq!(leftovers, 0);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn reads_image_from_stdout_without_placeholder() {
        let dir = tempfile::tempdir().expect("tempdir");
        let acquirer = CommandAcquirer::new(&command(&["sh", "-c", "printf RAW"]), dir.path())
            .expect("command");
        assert_eq!(acquirer.acquire().await.expect("acquire"), b"RAW");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failing_command_reports_stderr_verbatim() {
        let dir = tempfile::tempdir().expect("tempdir");
        let acquirer = CommandAcquirer::new(
            &command(&["sh", "-c", "echo 'device offline' >&2; exit 3"]),
            dir.path(),
        )
        .expect("command");
        let err = acquirer.acquire().await.unwrap_err();
        assert_eq!(err.to_string(), "device offline");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn silent_failure_uses_fixed_message() {
        let dir = tempfile::tempdir().expect("tempdir");
        let acquirer =
            CommandAcquirer::new(&command(&["sh", "-c", "exit 1"]), dir.path()).expect("command");
        let err = acquirer.acquire().await.unwrap_err();
        assert_eq!(err.to_string(), NO_OUTPUT_MESSAGE);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn abandoned_scan_leaves_no_staging_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let acquirer = CommandAcquirer::new(
            &command(&["sh", "-c", "printf PARTIAL > \"$1\"; sleep 5", "scanner", "{output}"]),
            dir.path(),
        )
        .expect("command");

        let outcome =
            tokio::time::timeout(std::time::Duration::from_millis(500), acquirer.acquire()).await;
        assert!(outcome.is_err(), "scanner should still be running");

        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .expect("read dir")
            .map(|entry| entry.expect("entry").file_name())
            .collect();
        assert!(leftovers.is_empty(), "staging files left behind: {leftovers:?}");
    }

    #[tokio::test]
    async fn missing_program_is_an_acquisition_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let acquirer = CommandAcquirer::new(&command(&["/nonexistent/folio-scanner"]), dir.path())
            .expect("command");
        assert!(matches!(
            acquirer.acquire().await,
            Err(FolioError::Acquisition(_))
        ));
    }
}
