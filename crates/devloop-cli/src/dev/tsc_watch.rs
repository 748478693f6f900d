//! Long-lived `tsc --watch` companion.
//!
//! Each line the type checker prints is classified and forwarded to
//! browsers. Errors become `error` messages, shown in the page's diagnostic
//! panel; a clean pass can trigger a reload.

use crate::dev::state::{publish_message, Broadcaster};
use crate::error::{CliError, Result};
use devloop_hmr::HmrMessage;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::process::Child;
use tokio::task::JoinHandle;

static ERRORS_FOUND: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"Found [1-9]\d* errors?\.")
        .unwrap_or_else(|e| panic!("BUG: Invalid error count pattern: {}", e))
});
static NO_ERRORS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"Found 0 errors?\.")
        .unwrap_or_else(|e| panic!("BUG: Invalid success pattern: {}", e))
});
static ERROR_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"error TS\d*").unwrap_or_else(|e| panic!("BUG: Invalid diagnostic pattern: {}", e))
});

/// What a line of `tsc --watch` output means.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TscLine {
    Error,
    Success,
    Info,
}

pub fn classify_tsc_line(line: &str) -> TscLine {
    if ERRORS_FOUND.is_match(line) || ERROR_LINE.is_match(line) {
        TscLine::Error
    } else if NO_ERRORS.is_match(line) {
        TscLine::Success
    } else {
        TscLine::Info
    }
}

/// Forward classified lines to the bus until the reader is exhausted.
pub async fn forward_lines<R>(reader: R, bus: &dyn Broadcaster, reload_on_change: bool)
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                tracing::warn!("tsc output unreadable: {}", e);
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        match classify_tsc_line(&line) {
            TscLine::Error => {
                tracing::error!("{}", line);
                publish_message(bus, &HmrMessage::Error { message: line });
            }
            TscLine::Success => {
                crate::ui::success(line.trim());
                publish_message(bus, &HmrMessage::info(line));
                if reload_on_change {
                    publish_message(bus, &HmrMessage::Reload);
                }
            }
            TscLine::Info => {
                tracing::info!("{}", line);
                publish_message(bus, &HmrMessage::info(line));
            }
        }
    }
}

/// Running `tsc --watch` process. Killed on drop.
pub struct TscWatcher {
    child: Child,
    task: JoinHandle<()>,
}

impl TscWatcher {
    /// Start the watcher.
    ///
    /// `command` is the configured type-checker command; `--watch` and
    /// `--project <tsconfig>` are appended.
    ///
    /// # Errors
    ///
    /// Returns error if the command is empty or cannot be started.
    pub fn spawn(
        command: &[String],
        tsconfig: &Path,
        cwd: &Path,
        bus: Arc<dyn Broadcaster>,
        reload_on_change: bool,
    ) -> Result<Self> {
        let Some((program, rest)) = command.split_first() else {
            return Err(CliError::InvalidArgument(
                "tscCommand is empty".to_string(),
            ));
        };

        tracing::info!("Starting TypeScript watcher in {}", cwd.display());

        let mut child = tokio::process::Command::new(program)
            .args(rest)
            .arg("--watch")
            .arg("--project")
            .arg(tsconfig)
            .current_dir(cwd)
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                CliError::Custom(format!(
                    "Failed to start '{}': {}\n\nHint: Is the TypeScript compiler installed?",
                    program, e
                ))
            })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| CliError::Custom("tsc stdout was not captured".to_string()))?;

        let task = tokio::spawn(async move {
            forward_lines(BufReader::new(stdout), bus.as_ref(), reload_on_change).await;
            tracing::debug!("TypeScript watcher exited");
        });

        Ok(Self { child, task })
    }

    /// Stop the watcher process.
    pub async fn stop(mut self) {
        let _ = self.child.kill().await;
        self.task.abort();
    }
}

impl Drop for TscWatcher {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<String>>);

    impl Broadcaster for Recorder {
        fn publish(&self, _topic: &str, payload: &str) {
            self.0.lock().push(payload.to_string());
        }
    }

    impl Recorder {
        fn kinds(&self) -> Vec<String> {
            self.0
                .lock()
                .iter()
                .filter_map(|raw| HmrMessage::parse(raw))
                .map(|m| m.kind().to_string())
                .collect()
        }
    }

    #[test]
    fn test_classify() {
        assert_eq!(
            classify_tsc_line("src/a.ts(3,5): error TS2322: Type 'string' is not assignable"),
            TscLine::Error
        );
        assert_eq!(
            classify_tsc_line("12:00:01 - Found 2 errors. Watching for file changes."),
            TscLine::Error
        );
        assert_eq!(
            classify_tsc_line("12:00:01 - Found 1 error. Watching for file changes."),
            TscLine::Error
        );
        assert_eq!(
            classify_tsc_line("12:00:01 - Found 0 errors. Watching for file changes."),
            TscLine::Success
        );
        assert_eq!(
            classify_tsc_line("12:00:00 - Starting compilation in watch mode..."),
            TscLine::Info
        );
        assert_eq!(classify_tsc_line("Found 10 errors."), TscLine::Error);
    }

    #[tokio::test]
    async fn test_forward_lines() {
        let output = b"Starting compilation\n\nsrc/a.ts(1,1): error TS1005\nFound 1 error.\nFound 0 errors.\n";
        let bus = Recorder::default();

        forward_lines(&output[..], &bus, true).await;

        assert_eq!(
            bus.kinds(),
            ["message", "error", "error", "message", "reload"]
        );
    }

    #[tokio::test]
    async fn test_no_reload_unless_enabled() {
        let bus = Recorder::default();
        forward_lines(&b"Found 0 errors.\n"[..], &bus, false).await;
        assert_eq!(bus.kinds(), ["message"]);
    }

    #[tokio::test]
    async fn test_spawn_empty_command() {
        let bus: Arc<dyn Broadcaster> = Arc::new(Recorder::default());
        let result = TscWatcher::spawn(&[], Path::new("tsconfig.json"), Path::new("."), bus, false);
        assert!(matches!(result, Err(CliError::InvalidArgument(_))));
    }
}
