//! Development server command implementation.
//!
//! Orchestrates the dev session:
//! - Config loading and path resolution
//! - HTTP + HMR server on the first free port
//! - Initial build through the throttled queue
//! - Optional `tsc --watch` companion
//! - File watching feeding rebuilds until Ctrl+C

use crate::cli::DevArgs;
use crate::commands::utils::prepare_config;
use crate::config::ConfigOverrides;
use crate::dev::server::bind_available;
use crate::dev::{
    assemble_pipeline, run_watch_loop, Broadcaster, ChangeEvent, DevServer, FileWatcher, HmrBus,
    ThrottledQueue, TscWatcher,
};
use crate::error::{Result, ResultExt};
use crate::ui;
use devloop_hmr::HmrEndpoint;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;

/// Execute the dev command.
///
/// # Process Flow
///
/// 1. Load, validate and resolve the configuration
/// 2. Bind the server port and start serving
/// 3. Run the initial build while holding the queue's running slot
/// 4. Start the type-checker watcher if enabled
/// 5. Watch for changes and enqueue rebuilds until Ctrl+C
///
/// # Errors
///
/// Returns errors for invalid configuration, an unusable port or a watcher
/// that cannot start. Build failures are reported and never end the session.
pub async fn execute(args: DevArgs) -> Result<()> {
    run(args, async {
        let _ = signal::ctrl_c().await;
    })
    .await
}

/// Run a dev session until `shutdown` completes.
pub async fn run<F>(args: DevArgs, shutdown: F) -> Result<()>
where
    F: Future<Output = ()>,
{
    ui::info("Starting development server...");

    // Step 1: Configuration
    let overrides = ConfigOverrides {
        port: args.port,
        watch_dir: args.watch_dir.clone(),
    };
    let (config, paths) = prepare_config(args.cwd.as_deref(), args.config.as_deref(), &overrides)?;
    let config = Arc::new(config);

    ui::info(&format!("Project root: {}", paths.root.display()));
    ui::info(&format!("Serving: {}", paths.out_dir.display()));

    // Step 2: Server
    let listener = bind_available(config.port).await?;
    let addr = listener
        .local_addr()
        .context("Dev server listener has no local address")?;
    let endpoint = HmrEndpoint::new(addr.port(), &config.websocket_path);
    let bus = Arc::new(HmrBus::new());

    let server = DevServer::new(paths.out_dir.clone(), endpoint.clone(), Arc::clone(&bus))
        .with_request_log(config.log_requests);
    let mut server_handle = tokio::spawn(async move {
        if let Err(e) = server.serve(listener).await {
            ui::error(&format!("Server error: {}", e));
        }
    });

    let server_url = format!("http://localhost:{}", addr.port());
    ui::success(&format!("Development server running at {}", server_url));
    tracing::debug!("HMR endpoint: {}", endpoint.url());

    // Step 3: Initial build
    let broadcaster: Arc<dyn Broadcaster> = bus.clone();
    let pipeline = Arc::new(assemble_pipeline(
        Arc::clone(&config),
        paths.clone(),
        Arc::clone(&broadcaster),
        Some(&endpoint),
    ));
    let queue = ThrottledQueue::new(Duration::from_millis(config.watch_delay));

    ui::info("Performing initial build...");
    let initial = Arc::clone(&pipeline);
    queue
        .run_now(Box::pin(async move {
            if initial.build_and_notify(ChangeEvent::initial()).await.is_some() {
                ui::success("Initial build completed");
            }
        }))
        .await;

    // Step 4: Type-checker watcher
    let tsc_watcher = if config.enable_tsc_watch {
        match TscWatcher::spawn(
            &config.tsc_command,
            &paths.tsconfig,
            &paths.root,
            Arc::clone(&broadcaster),
            config.reload_on_change,
        ) {
            Ok(watcher) => Some(watcher),
            Err(e) => {
                ui::warning(&format!("TypeScript watcher not started: {}", e));
                None
            }
        }
    } else {
        None
    };

    // Step 5: File watcher
    let (watcher, change_rx) =
        FileWatcher::new(paths.watch_dir.clone(), paths.ignore_patterns.clone())?;
    ui::info(&format!(
        "Watching for changes in: {}",
        watcher.root().display()
    ));

    if args.open {
        open_browser(&server_url);
    }
    ui::info("Press Ctrl+C to stop");

    let watch_pipeline = Arc::clone(&pipeline);
    let watch_loop = run_watch_loop(change_rx, &queue, move |event| {
        let pipeline = Arc::clone(&watch_pipeline);
        async move {
            ui::info(&format!("File changed: {} ({})", event.file_name, event.kind));
            pipeline.build_and_notify(event).await;
        }
    });

    tokio::select! {
        _ = watch_loop => {
            ui::warning("File watcher stopped");
        }
        _ = shutdown => {
            ui::info("Shutting down development server...");
        }
        _ = &mut server_handle => {
            ui::warning("Server task completed unexpectedly");
        }
    }

    queue.close();
    server_handle.abort();
    if let Some(tsc) = tsc_watcher {
        tsc.stop().await;
    }
    drop(watcher);

    ui::success("Development server stopped");
    Ok(())
}

/// Open the server URL in the default browser.
///
/// Uses platform-specific commands:
/// - macOS: `open`
/// - Windows: `start`
/// - Linux: `xdg-open`
fn open_browser(url: &str) {
    use std::process::Command;

    let result = if cfg!(target_os = "macos") {
        Command::new("open").arg(url).spawn()
    } else if cfg!(target_os = "windows") {
        Command::new("cmd").args(["/C", "start", url]).spawn()
    } else {
        Command::new("xdg-open").arg(url).spawn()
    };

    match result {
        Ok(_) => ui::info(&format!("Opened browser at {}", url)),
        Err(e) => ui::warning(&format!("Failed to open browser: {}", e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[tokio::test]
    async fn test_missing_project_dir_fails_before_serving() {
        let args = DevArgs {
            cwd: Some(PathBuf::from("/definitely/not/a/project")),
            ..DevArgs::default()
        };
        assert!(run(args, async {}).await.is_err());
    }

    #[tokio::test]
    async fn test_invalid_config_is_reported() {
        let temp = tempfile::TempDir::new().unwrap();
        std::fs::write(
            temp.path().join("devloop.config.json"),
            r#"{"build": {"entrypoints": []}}"#,
        )
        .unwrap();

        let args = DevArgs {
            cwd: Some(temp.path().to_path_buf()),
            ..DevArgs::default()
        };
        assert!(matches!(
            run(args, async {}).await,
            Err(crate::error::CliError::Config(_))
        ));
    }
}
