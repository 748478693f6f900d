//! Error handling for the devloop CLI.
//!
//! A `thiserror` hierarchy: [`CliError`] for broad categories, with
//! [`ConfigError`] and [`BuildError`] carrying the detail. Conversions are
//! automatic via `#[from]`, and [`ResultExt`] attaches paths and hints.
//!
//! Inside a dev session, build and hook failures never escape the build
//! pipeline: they are logged at its single catch boundary and the session
//! keeps running. The one-shot `build` command propagates them instead.
//!
//! # Example
//!
//! ```rust,no_run
//! use devloop_cli::error::{Result, ResultExt};
//! use std::path::Path;
//!
//! fn read_template(path: &Path) -> Result<String> {
//!     std::fs::read_to_string(path)
//!         .with_path(path)
//!         .with_hint("Check the 'indexTemplate' field in devloop.config.json")
//! }
//! ```

mod miette;

pub use self::miette::cli_error_to_miette;

use std::path::PathBuf;
use thiserror::Error;

/// Top-level CLI error type.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration-related errors (invalid values, unreadable file, etc.)
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Build failures (bundler command, hooks)
    #[error("Build error: {0}")]
    Build(#[from] BuildError),

    /// Invalid command-line arguments or options
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// File or directory not found
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// I/O errors from file system operations
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Development server errors
    #[error("Server error: {0}")]
    Server(String),

    /// File watching errors
    #[error("File watcher error: {0}")]
    Watch(#[from] notify::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Index document template errors
    #[error("Template error: {0}")]
    Template(#[from] minijinja::Error),

    /// Generic errors with custom messages
    #[error("{0}")]
    Custom(String),
}

/// Configuration-specific errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file passed with --config doesn't exist
    #[error("Config file not found: {}\n\nHint: Create a devloop.config.json file or specify --config <path>", .0.display())]
    NotFound(PathBuf),

    /// Config sources could not be merged into a valid configuration
    #[error("Invalid configuration: {0}\n\nHint: Check devloop.config.json syntax and field types")]
    Invalid(String),

    /// Missing required configuration field
    #[error("Missing required field: {field}\n\nHint: {hint}")]
    MissingField {
        /// Name of the missing field
        field: String,
        /// Helpful hint for providing the field
        hint: String,
    },

    /// Invalid value for a configuration option
    #[error("Invalid value for '{field}': {value}\n\nHint: {hint}")]
    InvalidValue {
        /// Name of the field with invalid value
        field: String,
        /// The invalid value
        value: String,
        /// Helpful hint for correct values
        hint: String,
    },

    /// I/O error while preparing directories named in the config
    #[error("Failed to prepare {}: {source}", .path.display())]
    Io {
        /// Directory that could not be created or read
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
}

/// Build process errors.
#[derive(Debug, Error)]
pub enum BuildError {
    /// No bundler command configured
    #[error("No build command configured\n\nHint: Set 'build.command' in devloop.config.json")]
    EmptyCommand,

    /// Bundler process could not be started
    #[error("Failed to start '{program}': {source}\n\nHint: Check that the bundler is installed and on PATH")]
    Spawn {
        /// Program that failed to start
        program: String,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Bundler exited unsuccessfully
    #[error("Build command failed with {status}:\n{output}")]
    CommandFailed {
        /// Exit status description
        status: String,
        /// Captured stderr/stdout
        output: String,
    },

    /// A before/after build hook failed
    #[error("{stage} hook failed: {message}")]
    HookFailed {
        /// "beforeBuild" or "afterBuild"
        stage: &'static str,
        /// What went wrong
        message: String,
    },

    /// Type checker reported diagnostics during a one-shot build
    #[error("Type check failed:\n{0}")]
    TypeCheckFailed(String),

    /// Generic build error
    #[error("{0}")]
    Custom(String),
}

/// Result type alias using `CliError` as the default error type.
pub type Result<T, E = CliError> = std::result::Result<T, E>;

/// Extension trait for adding context to `Result` types.
pub trait ResultExt<T> {
    /// Map `NotFound` I/O errors to [`CliError::FileNotFound`] for `path`.
    fn with_path(self, path: impl AsRef<std::path::Path>) -> Result<T>;

    /// Append a hint to the error message.
    fn with_hint(self, hint: impl std::fmt::Display) -> Result<T>;

    /// Prefix the error message.
    fn context(self, msg: impl std::fmt::Display) -> Result<T>;
}

impl<T, E: Into<CliError>> ResultExt<T> for std::result::Result<T, E> {
    fn with_path(self, path: impl AsRef<std::path::Path>) -> Result<T> {
        self.map_err(|e| {
            let err: CliError = e.into();
            match err {
                CliError::Io(io_err) if io_err.kind() == std::io::ErrorKind::NotFound => {
                    CliError::FileNotFound(path.as_ref().to_path_buf())
                }
                other => other,
            }
        })
    }

    fn with_hint(self, hint: impl std::fmt::Display) -> Result<T> {
        self.map_err(|e| {
            let err: CliError = e.into();
            CliError::Custom(format!("{}\n\nHint: {}", err, hint))
        })
    }

    fn context(self, msg: impl std::fmt::Display) -> Result<T> {
        self.map_err(|e| {
            let err: CliError = e.into();
            CliError::Custom(format!("{}: {}", msg, err))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_not_found() {
        let err = ConfigError::NotFound(PathBuf::from("devloop.config.json"));
        let msg = err.to_string();
        assert!(msg.contains("Config file not found"));
        assert!(msg.contains("devloop.config.json"));
        assert!(msg.contains("Hint:"));
    }

    #[test]
    fn test_build_error_command_failed() {
        let err = BuildError::CommandFailed {
            status: "exit status: 1".to_string(),
            output: "error: Could not resolve \"./missing\"".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("exit status: 1"));
        assert!(msg.contains("Could not resolve"));
    }

    #[test]
    fn test_hook_failed_names_stage() {
        let err = BuildError::HookFailed {
            stage: "beforeBuild",
            message: "exited with 2".to_string(),
        };
        assert_eq!(err.to_string(), "beforeBuild hook failed: exited with 2");
    }

    #[test]
    fn test_cli_error_from_domain_errors() {
        let cli_err: CliError = ConfigError::Invalid("bad".to_string()).into();
        assert!(matches!(cli_err, CliError::Config(_)));

        let cli_err: CliError = BuildError::EmptyCommand.into();
        assert!(matches!(cli_err, CliError::Build(_)));
    }

    #[test]
    fn test_result_ext_with_path() {
        let result: std::io::Result<()> = Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "file not found",
        ));

        let err = result.with_path("/test/index.html.j2").unwrap_err();
        assert!(matches!(err, CliError::FileNotFound(_)));
    }

    #[test]
    fn test_result_ext_with_hint() {
        let result: std::result::Result<(), ConfigError> =
            Err(ConfigError::NotFound(PathBuf::from("test.json")));

        let err = result.with_hint("Try creating the file").unwrap_err();
        assert!(err.to_string().contains("Hint: Try creating the file"));
    }

    #[test]
    fn test_result_ext_context() {
        let result: std::result::Result<(), BuildError> = Err(BuildError::EmptyCommand);

        let err = result.context("Initial build").unwrap_err();
        assert!(err.to_string().starts_with("Initial build: "));
    }
}
