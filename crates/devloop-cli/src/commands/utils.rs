//! Shared utilities for command implementations.

use crate::config::{ConfigOverrides, DevConfig, ResolvedPaths};
use crate::error::{CliError, Result};
use std::path::{Path, PathBuf};

/// Get the current working directory.
///
/// # Errors
///
/// Returns I/O error if current directory cannot be determined.
pub fn get_cwd() -> Result<PathBuf> {
    std::env::current_dir().map_err(|e| {
        CliError::Io(std::io::Error::new(
            e.kind(),
            format!("Failed to get current directory: {}", e),
        ))
    })
}

/// Directory config files and relative paths are resolved against:
/// `--cwd` when given (relative to the current directory), else the current directory.
pub fn project_dir(cwd: Option<&Path>) -> Result<PathBuf> {
    let current = get_cwd()?;
    let dir = match cwd {
        Some(dir) if dir.is_absolute() => dir.to_path_buf(),
        Some(dir) => current.join(dir),
        None => current,
    };
    if !dir.is_dir() {
        return Err(CliError::FileNotFound(dir));
    }
    Ok(dir)
}

/// Load, validate and resolve the config for a command.
pub fn prepare_config(
    cwd: Option<&Path>,
    config_path: Option<&Path>,
    overrides: &ConfigOverrides,
) -> Result<(DevConfig, ResolvedPaths)> {
    let project_dir = project_dir(cwd)?;
    let config = DevConfig::load(&project_dir, config_path, overrides)?;
    config.validate()?;
    let paths = config.resolve_paths(&project_dir)?;
    Ok((config, paths))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    #[test]
    fn test_get_cwd() {
        assert!(get_cwd().unwrap().is_absolute());
    }

    #[test]
    fn test_project_dir_absolute() {
        let temp = TempDir::new().unwrap();
        assert_eq!(project_dir(Some(temp.path())).unwrap(), temp.path());
    }

    #[test]
    fn test_project_dir_missing() {
        assert!(matches!(
            project_dir(Some(Path::new("/definitely/not/a/project"))),
            Err(CliError::FileNotFound(_))
        ));
    }

    #[test]
    #[serial]
    fn test_prepare_config_reads_project_file() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join("src")).unwrap();
        std::fs::write(
            temp.path().join("devloop.config.json"),
            r#"{"watchDelay": 250, "build": {"outdir": "public"}}"#,
        )
        .unwrap();

        let (config, paths) =
            prepare_config(Some(temp.path()), None, &ConfigOverrides::default()).unwrap();
        assert_eq!(config.watch_delay, 250);
        assert!(paths.out_dir.ends_with("public"));
        assert!(paths.out_dir.is_dir());
    }
}
