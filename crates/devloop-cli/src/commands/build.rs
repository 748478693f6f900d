//! One-shot build command.
//!
//! Runs the same pipeline as a dev rebuild without the server, watcher or
//! browser client, then exits.

use crate::cli::BuildArgs;
use crate::commands::utils::prepare_config;
use crate::config::ConfigOverrides;
use crate::dev::{assemble_pipeline, BuildReport, ChangeEvent, HmrBus};
use crate::error::{BuildError, Result};
use crate::ui;
use std::sync::Arc;
use std::time::Instant;

/// Execute the build command.
///
/// # Errors
///
/// Returns errors for invalid configuration, a failing bundler or hook, and
/// type-check failures when the type checker is enabled.
pub async fn execute(args: BuildArgs) -> Result<()> {
    let started = Instant::now();
    ui::info("Building...");

    let report = run(&args).await?;

    ui::success(&format!(
        "Build completed: {} files in {:.2}s",
        report.artifacts.len(),
        started.elapsed().as_secs_f64()
    ));
    Ok(())
}

/// Run one build and return its report.
pub async fn run(args: &BuildArgs) -> Result<BuildReport> {
    let (config, paths) = prepare_config(
        args.cwd.as_deref(),
        args.config.as_deref(),
        &ConfigOverrides::default(),
    )?;

    // Nobody is listening; messages go nowhere
    let bus = Arc::new(HmrBus::new());
    let pipeline = assemble_pipeline(Arc::new(config), paths, bus, None);

    let report = pipeline.run(ChangeEvent::initial()).await?;
    if report.tsc.error {
        return Err(BuildError::TypeCheckFailed(report.tsc.message.trim_end().to_string()).into());
    }
    Ok(report)
}
