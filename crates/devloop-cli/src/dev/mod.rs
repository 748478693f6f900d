//! Development loop.
//!
//! - Throttled single-slot build queue
//! - File watching that feeds the queue
//! - Build pipeline: bundler, output table, index document, manifest, hooks
//! - Type-checker gate and an optional `tsc --watch` companion
//! - HMR broadcast bus and the axum dev server

pub mod builder;
pub mod hooks;
pub mod index_html;
pub mod manifest;
pub mod pipeline;
pub mod queue;
pub mod server;
pub mod state;
pub mod tsc;
pub mod tsc_watch;
pub mod watcher;

pub use builder::{ArtifactKind, BuildArtifact, BuildOutput, BuildSpec, Builder, CommandBuilder};
pub use hooks::{BuildHooks, CleanOutputDir, CommandHooks, HookChain};
pub use pipeline::{BuildEnvironment, BuildPipeline, BuildReport};
pub use queue::{EnqueueOutcome, QueueState, QueueTask, ThrottledQueue};
pub use server::DevServer;
pub use state::{Broadcaster, HmrBus};
pub use tsc::{TscCheckResult, TypeChecker};
pub use tsc_watch::TscWatcher;
pub use watcher::{run_watch_loop, FileWatcher};

use crate::config::{DevConfig, HotReloadMode, ResolvedPaths};
use devloop_hmr::HmrEndpoint;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// What happened to a watched file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    /// Contents or metadata changed
    Change,
    /// Created, removed or renamed
    Rename,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeKind::Change => f.write_str("change"),
            ChangeKind::Rename => f.write_str("rename"),
        }
    }
}

/// One detected filesystem mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    /// Path relative to the watch root, `/`-separated
    pub file_name: String,
    /// Kind of change
    pub kind: ChangeKind,
}

impl ChangeEvent {
    pub fn new(file_name: impl Into<String>, kind: ChangeKind) -> Self {
        Self {
            file_name: file_name.into(),
            kind,
        }
    }

    /// Synthetic event for the build that runs at startup.
    pub fn initial() -> Self {
        Self::new("Initial", ChangeKind::Change)
    }
}

/// Wire a pipeline from a loaded config.
///
/// `endpoint` is the HMR endpoint browsers connect to; `None` (one-shot
/// builds) injects no client.
pub fn assemble_pipeline(
    config: Arc<DevConfig>,
    paths: ResolvedPaths,
    bus: Arc<dyn Broadcaster>,
    endpoint: Option<&HmrEndpoint>,
) -> BuildPipeline {
    let footer = match (config.hot_reload, endpoint) {
        (HotReloadMode::Footer, Some(endpoint)) => Some(endpoint.footer()),
        _ => None,
    };
    let script = match (config.hot_reload, endpoint) {
        (HotReloadMode::Script, Some(_)) => Some(devloop_hmr::CLIENT_SCRIPT_PATH.to_string()),
        _ => None,
    };

    let spec = Arc::new(BuildSpec::from_config(&config, &paths, footer));
    let builder: Arc<dyn Builder> = Arc::new(CommandBuilder::new());
    let hooks = hooks::from_config(&config);

    let mut pipeline = BuildPipeline::new(config, paths, spec, builder, bus).with_client_script(script);
    if let Some(hooks) = hooks {
        pipeline = pipeline.with_hooks(hooks);
    }
    pipeline
}
