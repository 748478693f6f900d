//! Type-checker gate.
//!
//! Runs the configured type checker once per build. Failure is a value,
//! never an error: the pipeline decides what a failed check means for
//! reloads and diagnostics.

use crate::config::{DevConfig, ResolvedPaths};
use std::path::PathBuf;

/// Outcome of one type-checker run. The default means "disabled or passed".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TscCheckResult {
    pub error: bool,
    pub message: String,
}

impl TscCheckResult {
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            error: true,
            message: message.into(),
        }
    }
}

/// Runs `tscCommand --project <tsconfig>` in the project root.
#[derive(Debug, Clone)]
pub struct TypeChecker {
    enabled: bool,
    command: Vec<String>,
    tsconfig: PathBuf,
    cwd: PathBuf,
}

impl TypeChecker {
    pub fn new(enabled: bool, command: Vec<String>, tsconfig: PathBuf, cwd: PathBuf) -> Self {
        Self {
            enabled,
            command,
            tsconfig,
            cwd,
        }
    }

    pub fn from_config(config: &DevConfig, paths: &ResolvedPaths) -> Self {
        Self::new(
            config.enable_tsc,
            config.tsc_command.clone(),
            paths.tsconfig.clone(),
            paths.root.clone(),
        )
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Run the checker and report diagnostics.
    pub async fn check(&self) -> TscCheckResult {
        if !self.enabled {
            return TscCheckResult::default();
        }
        let Some((program, rest)) = self.command.split_first() else {
            return TscCheckResult::default();
        };

        tracing::debug!("Type checking with {}", self.tsconfig.display());

        let output = tokio::process::Command::new(program)
            .args(rest)
            .arg("--project")
            .arg(&self.tsconfig)
            .current_dir(&self.cwd)
            .kill_on_drop(true)
            .output()
            .await;

        match output {
            Ok(output) if output.status.success() => TscCheckResult::default(),
            Ok(output) => {
                let stdout = String::from_utf8_lossy(&output.stdout);
                let message = if stdout.trim().is_empty() {
                    String::from_utf8_lossy(&output.stderr).into_owned()
                } else {
                    stdout.into_owned()
                };
                TscCheckResult::failed(message)
            }
            Err(e) => TscCheckResult::failed(format!("Failed to start '{}': {}", program, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checker(enabled: bool, script: &str) -> TypeChecker {
        // `--project <path>` lands in $1/$2 of the script
        TypeChecker::new(
            enabled,
            vec!["sh".into(), "-c".into(), script.into(), "sh".into()],
            PathBuf::from("tsconfig.json"),
            std::env::temp_dir(),
        )
    }

    #[tokio::test]
    async fn test_disabled_is_default() {
        let result = checker(false, "exit 1").check().await;
        assert_eq!(result, TscCheckResult::default());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_success() {
        let result = checker(true, "test \"$1\" = --project").check().await;
        assert_eq!(result, TscCheckResult::default());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failure_carries_stdout() {
        let result = checker(true, "echo 'src/a.ts(1,7): error TS2322'; exit 2")
            .check()
            .await;
        assert!(result.error);
        assert!(result.message.contains("TS2322"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failure_falls_back_to_stderr() {
        let result = checker(true, "echo broken >&2; exit 1").check().await;
        assert!(result.error);
        assert_eq!(result.message.trim(), "broken");
    }

    #[tokio::test]
    async fn test_missing_program_is_a_failure_not_an_error() {
        let checker = TypeChecker::new(
            true,
            vec!["devloop-test-no-such-tsc".into()],
            PathBuf::from("tsconfig.json"),
            std::env::temp_dir(),
        );
        let result = checker.check().await;
        assert!(result.error);
        assert!(result.message.contains("devloop-test-no-such-tsc"));
    }
}
