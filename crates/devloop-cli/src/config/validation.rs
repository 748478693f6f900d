use crate::config::{default_out_dir, DevConfig, HookCommand};
use crate::error::{CliError, ConfigError, Result};
use std::path::{Component, Path, PathBuf};

/// Absolute locations derived from a [`DevConfig`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPaths {
    /// Project root
    pub root: PathBuf,
    /// Directory the watcher observes
    pub watch_dir: PathBuf,
    /// Output directory, created if it was missing
    pub out_dir: PathBuf,
    /// tsconfig handed to the type checker
    pub tsconfig: PathBuf,
    /// Watcher ignore patterns, including the output directory when it sits
    /// inside the watch directory
    pub ignore_patterns: Vec<String>,
}

/// Join `rel` onto `base`, dropping `.` components. Absolute `rel` wins.
pub(crate) fn join_clean(base: &Path, rel: &Path) -> PathBuf {
    if rel.is_absolute() {
        return rel.to_path_buf();
    }
    rel.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .fold(base.to_path_buf(), |acc, c| acc.join(c))
}

fn validate_hooks(field: &str, hooks: &[HookCommand]) -> Result<()> {
    for (i, hook) in hooks.iter().enumerate() {
        if hook.command.first().map_or(true, |program| program.is_empty()) {
            return Err(ConfigError::InvalidValue {
                field: format!("{}[{}].command", field, i),
                value: "[]".to_string(),
                hint: "Hook commands need a program, e.g. [\"npm\", \"run\", \"codegen\"]"
                    .to_string(),
            }
            .into());
        }
    }
    Ok(())
}

impl DevConfig {
    /// Validate configuration for logical consistency.
    pub fn validate(&self) -> Result<()> {
        if self.build.entrypoints.is_empty() {
            return Err(ConfigError::MissingField {
                field: "build.entrypoints".to_string(),
                hint: "Provide at least one entry point".to_string(),
            }
            .into());
        }

        if self.build.command.is_empty() {
            return Err(ConfigError::MissingField {
                field: "build.command".to_string(),
                hint: "Set the bundler command, e.g. [\"bun\", \"build\", \"--outdir\", \"$DEVLOOP_OUT_DIR\"]"
                    .to_string(),
            }
            .into());
        }

        if (self.enable_tsc || self.enable_tsc_watch) && self.tsc_command.is_empty() {
            return Err(ConfigError::MissingField {
                field: "tscCommand".to_string(),
                hint: "Type checking is enabled but no type-checker command is set".to_string(),
            }
            .into());
        }

        if self.manifest_name.is_empty()
            || self.manifest_name.contains('/')
            || self.manifest_name.contains('\\')
        {
            return Err(ConfigError::InvalidValue {
                field: "manifestName".to_string(),
                value: self.manifest_name.clone(),
                hint: "Use a plain file name; the manifest is written into the output directory"
                    .to_string(),
            }
            .into());
        }

        let ws_path = devloop_hmr::endpoint::normalize_path(&self.websocket_path);
        if ws_path == devloop_hmr::CLIENT_SCRIPT_PATH || ws_path == "/favicon.ico" {
            return Err(ConfigError::InvalidValue {
                field: "websocketPath".to_string(),
                value: self.websocket_path.clone(),
                hint: "This path is already served by the dev server".to_string(),
            }
            .into());
        }

        if let Some(pattern) = self.watch_ignore.iter().find(|p| p.trim().is_empty()) {
            return Err(ConfigError::InvalidValue {
                field: "watchIgnore".to_string(),
                value: format!("{:?}", pattern),
                hint: "Empty patterns would ignore every file".to_string(),
            }
            .into());
        }

        validate_hooks("beforeBuild", &self.before_build)?;
        validate_hooks("afterBuild", &self.after_build)?;

        Ok(())
    }

    /// Output directory as configured: `build.outdir`, then `servePath`, then `./dist`.
    pub fn out_dir(&self) -> PathBuf {
        self.build
            .outdir
            .clone()
            .or_else(|| self.serve_path.clone())
            .unwrap_or_else(default_out_dir)
    }

    /// Resolve every configured path against `project_dir`.
    ///
    /// The project root must exist. The output directory is created when
    /// missing and may not be the watch directory itself.
    pub fn resolve_paths(&self, project_dir: &Path) -> Result<ResolvedPaths> {
        let root = join_clean(project_dir, &self.root);
        let root = root
            .canonicalize()
            .map_err(|_| CliError::FileNotFound(root.clone()))?;

        let out_dir = join_clean(&root, &self.out_dir());
        std::fs::create_dir_all(&out_dir).map_err(|source| ConfigError::Io {
            path: out_dir.clone(),
            source,
        })?;
        let out_dir = out_dir.canonicalize().unwrap_or(out_dir);

        let watch_dir = join_clean(&root, &self.watch_dir);
        let watch_dir = watch_dir.canonicalize().unwrap_or(watch_dir);

        // Every build would write into the watched tree and trigger the next one
        if watch_dir == out_dir {
            return Err(ConfigError::InvalidValue {
                field: "watchDir".to_string(),
                value: self.watch_dir.display().to_string(),
                hint: "watchDir and the output directory must differ. Point build.outdir outside the sources".to_string(),
            }
            .into());
        }

        let tsconfig = join_clean(&root, &self.tsc_config_path);

        let mut ignore_patterns = self.watch_ignore.clone();
        if let Ok(rel) = out_dir.strip_prefix(&watch_dir) {
            let rel = rel.to_string_lossy().replace('\\', "/");
            if !rel.is_empty() && !ignore_patterns.contains(&rel) {
                ignore_patterns.push(rel);
            }
        }

        Ok(ResolvedPaths {
            root,
            watch_dir,
            out_dir,
            tsconfig,
            ignore_patterns,
        })
    }
}
