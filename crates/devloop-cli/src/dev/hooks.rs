//! Before/after build hooks.
//!
//! Hooks see the per-build [`BuildEnvironment`]. An error from either hook
//! aborts the build and surfaces at the pipeline's catch boundary.

use crate::config::{DevConfig, HookCommand};
use crate::dev::builder::{resolve_args, BuildOutput};
use crate::dev::pipeline::BuildEnvironment;
use crate::error::{BuildError, Result};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Optional strategy run around every build.
#[async_trait]
pub trait BuildHooks: Send + Sync {
    /// Runs before the bundler. An error skips the build.
    async fn before_build(&self, _env: &BuildEnvironment) -> Result<()> {
        Ok(())
    }

    /// Runs after the manifest is written, before any reload is sent.
    async fn after_build(&self, _output: &BuildOutput, _env: &BuildEnvironment) -> Result<()> {
        Ok(())
    }
}

/// Empties the output directory before each build.
#[derive(Debug, Default)]
pub struct CleanOutputDir;

#[async_trait]
impl BuildHooks for CleanOutputDir {
    async fn before_build(&self, env: &BuildEnvironment) -> Result<()> {
        let mut entries = match tokio::fs::read_dir(&env.out_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tokio::fs::create_dir_all(&env.out_dir).await?;
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if entry.file_type().await?.is_dir() {
                tokio::fs::remove_dir_all(&path).await?;
            } else {
                tokio::fs::remove_file(&path).await?;
            }
        }
        tracing::debug!("Cleaned {}", env.out_dir.display());
        Ok(())
    }
}

/// Runs the `beforeBuild` / `afterBuild` commands from the config.
#[derive(Debug, Default)]
pub struct CommandHooks {
    before: Vec<HookCommand>,
    after: Vec<HookCommand>,
}

impl CommandHooks {
    pub fn new(before: Vec<HookCommand>, after: Vec<HookCommand>) -> Self {
        Self { before, after }
    }

    pub fn is_empty(&self) -> bool {
        self.before.is_empty() && self.after.is_empty()
    }
}

/// Project paths. Substituted into hook arguments and exported.
fn path_vars(env: &BuildEnvironment) -> BTreeMap<String, String> {
    let mut vars = BTreeMap::new();
    vars.insert(
        "DEVLOOP_OUT_DIR".to_string(),
        env.out_dir.display().to_string(),
    );
    vars.insert("DEVLOOP_ROOT".to_string(), env.spec.cwd.display().to_string());
    vars
}

/// Details of the triggering change. File names come from disk, so these are
/// only ever exported, never spliced into argv.
fn change_vars(env: &BuildEnvironment) -> BTreeMap<String, String> {
    let mut vars = BTreeMap::new();
    vars.insert("DEVLOOP_CHANGED_FILE".to_string(), env.event.file_name.clone());
    vars.insert("DEVLOOP_CHANGE_KIND".to_string(), env.event.kind.to_string());
    vars
}

async fn run_hook(hook: &HookCommand, env: &BuildEnvironment, stage: &'static str) -> Result<()> {
    let paths = path_vars(env);
    let args = resolve_args(&hook.command, &paths);
    let Some((program, rest)) = args.split_first() else {
        return Ok(());
    };

    if !hook.quiet {
        tracing::info!("[{}] `{}` running", stage, args.join(" "));
    }

    let output = tokio::process::Command::new(program)
        .args(rest)
        .current_dir(&env.spec.cwd)
        .envs(&paths)
        .envs(change_vars(env))
        .output()
        .await
        .map_err(|e| BuildError::HookFailed {
            stage,
            message: format!("failed to start '{}': {}", program, e),
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(BuildError::HookFailed {
            stage,
            message: format!("`{}` exited with {}: {}", args.join(" "), output.status, stderr.trim()),
        }
        .into());
    }

    if !hook.quiet {
        let stdout = String::from_utf8_lossy(&output.stdout);
        for line in stdout.lines().filter(|l| !l.trim().is_empty()) {
            tracing::info!("[{}] {}", stage, line);
        }
    }
    Ok(())
}

#[async_trait]
impl BuildHooks for CommandHooks {
    async fn before_build(&self, env: &BuildEnvironment) -> Result<()> {
        for hook in &self.before {
            run_hook(hook, env, "beforeBuild").await?;
        }
        Ok(())
    }

    async fn after_build(&self, _output: &BuildOutput, env: &BuildEnvironment) -> Result<()> {
        for hook in &self.after {
            run_hook(hook, env, "afterBuild").await?;
        }
        Ok(())
    }
}

/// Runs several hooks in order, stopping at the first error.
#[derive(Default)]
pub struct HookChain {
    hooks: Vec<Arc<dyn BuildHooks>>,
}

impl HookChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, hook: Arc<dyn BuildHooks>) -> Self {
        self.hooks.push(hook);
        self
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }
}

#[async_trait]
impl BuildHooks for HookChain {
    async fn before_build(&self, env: &BuildEnvironment) -> Result<()> {
        for hook in &self.hooks {
            hook.before_build(env).await?;
        }
        Ok(())
    }

    async fn after_build(&self, output: &BuildOutput, env: &BuildEnvironment) -> Result<()> {
        for hook in &self.hooks {
            hook.after_build(output, env).await?;
        }
        Ok(())
    }
}

/// Hooks implied by the config, if any.
pub fn from_config(config: &DevConfig) -> Option<Arc<dyn BuildHooks>> {
    let mut chain = HookChain::new();
    if config.clean_serve_path {
        chain = chain.with(Arc::new(CleanOutputDir));
    }

    let commands = CommandHooks::new(config.before_build.clone(), config.after_build.clone());
    if !commands.is_empty() {
        chain = chain.with(Arc::new(commands));
    }

    if chain.is_empty() {
        None
    } else {
        Some(Arc::new(chain))
    }
}
