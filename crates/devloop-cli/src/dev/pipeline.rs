//! Build-and-notify pipeline.
//!
//! One call to [`BuildPipeline::run`] takes a change event through the
//! fixed sequence: before hook, bundler, logs and change notice, output
//! table, index document, manifest, after hook, immediate reload, type
//! check, deferred reload, type errors. Any error ends the cycle early;
//! [`BuildPipeline::build_and_notify`] is the place those errors are caught.

use crate::config::{join_clean, DevConfig, ResolvedPaths};
use crate::dev::builder::{ArtifactKind, BuildArtifact, BuildOutput, BuildSpec, Builder};
use crate::dev::hooks::BuildHooks;
use crate::dev::index_html::{load_template, write_index, IndexContext};
use crate::dev::manifest::write_manifest;
use crate::dev::state::{publish_message, Broadcaster};
use crate::dev::tsc::{TscCheckResult, TypeChecker};
use crate::dev::ChangeEvent;
use crate::error::Result;
use crate::ui;
use devloop_hmr::{HmrMessage, OutputRow};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

/// Everything a single build sees. Built fresh for each cycle.
#[derive(Clone)]
pub struct BuildEnvironment {
    pub config: Arc<DevConfig>,
    /// Absolute output directory
    pub out_dir: PathBuf,
    pub spec: Arc<BuildSpec>,
    pub bus: Arc<dyn Broadcaster>,
    /// Change that triggered this build
    pub event: ChangeEvent,
}

/// What a successful cycle did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildReport {
    pub artifacts: Vec<BuildArtifact>,
    /// A `reload` message went out during this cycle
    pub reload_published: bool,
    pub tsc: TscCheckResult,
}

pub struct BuildPipeline {
    config: Arc<DevConfig>,
    paths: ResolvedPaths,
    spec: Arc<BuildSpec>,
    builder: Arc<dyn Builder>,
    bus: Arc<dyn Broadcaster>,
    hooks: Option<Arc<dyn BuildHooks>>,
    checker: TypeChecker,
    client_script: Option<String>,
}

impl BuildPipeline {
    pub fn new(
        config: Arc<DevConfig>,
        paths: ResolvedPaths,
        spec: Arc<BuildSpec>,
        builder: Arc<dyn Builder>,
        bus: Arc<dyn Broadcaster>,
    ) -> Self {
        let checker = TypeChecker::from_config(&config, &paths);
        Self {
            config,
            paths,
            spec,
            builder,
            bus,
            hooks: None,
            checker,
            client_script: None,
        }
    }

    pub fn with_hooks(mut self, hooks: Arc<dyn BuildHooks>) -> Self {
        self.hooks = Some(hooks);
        self
    }

    pub fn with_type_checker(mut self, checker: TypeChecker) -> Self {
        self.checker = checker;
        self
    }

    /// URL of the HMR client script referenced from the index document.
    pub fn with_client_script(mut self, script: Option<String>) -> Self {
        self.client_script = script;
        self
    }

    pub fn config(&self) -> &DevConfig {
        &self.config
    }

    pub fn paths(&self) -> &ResolvedPaths {
        &self.paths
    }

    /// Per-build environment for `event`.
    pub fn environment(&self, event: ChangeEvent) -> BuildEnvironment {
        BuildEnvironment {
            config: Arc::clone(&self.config),
            out_dir: self.paths.out_dir.clone(),
            spec: Arc::clone(&self.spec),
            bus: Arc::clone(&self.bus),
            event,
        }
    }

    /// Run one full cycle for `event`.
    ///
    /// # Errors
    ///
    /// Bundler, hook, index document and manifest failures. Nothing after
    /// the failing step runs, so a failed build never triggers a reload.
    pub async fn run(&self, event: ChangeEvent) -> Result<BuildReport> {
        let env = self.environment(event);
        let config = &env.config;
        let bus = env.bus.as_ref();
        let started = Instant::now();

        if let Some(hooks) = &self.hooks {
            hooks.before_build(&env).await?;
        }

        let output = self.builder.build(&env.spec).await?;

        for line in &output.logs {
            tracing::info!("{}", line);
        }
        publish_message(
            bus,
            &HmrMessage::info(format!("[HMR] {} {}", env.event.file_name, env.event.kind)),
        );

        let rows = self.output_rows(&output);
        if config.broadcast_build_output_to_console {
            ui::print_build_output(&rows);
        }
        if config.broadcast_build_output_to_client {
            publish_message(bus, &HmrMessage::Output { message: rows });
        }

        if config.create_index_html {
            let template_path = config
                .index_template
                .as_ref()
                .map(|p| join_clean(&self.paths.root, p));
            let template = load_template(template_path.as_deref()).await?;
            let ctx = IndexContext::from_output(&output, &env.out_dir, self.client_script.clone());
            write_index(&template, &ctx, &env.out_dir).await?;
        }

        if config.write_manifest {
            write_manifest(
                &output,
                &env.out_dir,
                &config.manifest_name,
                config.manifest_with_hash,
            )
            .await?;
        }

        if let Some(hooks) = &self.hooks {
            hooks.after_build(&output, &env).await?;
        }

        let mut reload_published = false;
        if config.reload_on_change && !config.wait_for_tsc_success_before_reload {
            publish_message(bus, &HmrMessage::Reload);
            reload_published = true;
        }

        let tsc = self.checker.check().await;

        if config.reload_on_change && config.wait_for_tsc_success_before_reload && !tsc.error {
            publish_message(bus, &HmrMessage::Reload);
            reload_published = true;
        }

        if tsc.error {
            tracing::error!("Type check failed:\n{}", tsc.message.trim_end());
            if config.broadcast_tsc_error_to_client {
                publish_message(
                    bus,
                    &HmrMessage::TscError {
                        message: tsc.message.clone(),
                    },
                );
            }
        }

        tracing::debug!(
            "Build for {} finished in {}ms",
            env.event.file_name,
            started.elapsed().as_millis()
        );

        Ok(BuildReport {
            artifacts: output.outputs,
            reload_published,
            tsc,
        })
    }

    /// Run a cycle, logging any failure instead of returning it.
    ///
    /// The dev session keeps going after a failed build; the next change
    /// simply tries again.
    pub async fn build_and_notify(&self, event: ChangeEvent) -> Option<BuildReport> {
        match self.run(event).await {
            Ok(report) => Some(report),
            Err(e) => {
                tracing::error!("Build failed: {}", e);
                ui::error(&format!("Build failed: {}", e));
                None
            }
        }
    }

    /// Output table rows for every artifact except sourcemaps.
    fn output_rows(&self, output: &BuildOutput) -> Vec<OutputRow> {
        let dir_name = self
            .paths
            .out_dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        output
            .outputs
            .iter()
            .filter(|a| a.kind != ArtifactKind::Sourcemap)
            .map(|a| {
                let rel = a.relative_path(&self.paths.out_dir);
                let path = if dir_name.is_empty() {
                    rel
                } else {
                    format!("{}/{}", dir_name, rel)
                };
                OutputRow {
                    name: a.file_name(),
                    path,
                    size: ui::convert_bytes(a.size_bytes),
                }
            })
            .collect()
    }
}
