//! Configuration for devloop, loaded from `devloop.config.json`.
//!
//! Sources are merged with figment. Priority: CLI > Environment > File > Defaults.
//! Field defaults live in [`defaults`] and are applied by serde, so a missing
//! file or an empty object yields a fully populated config.

mod defaults;
mod loading;
mod validation;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

pub use defaults::*;
pub use loading::{ConfigOverrides, CONFIG_FILE_NAME, ENV_PREFIX};
pub(crate) use validation::join_clean;
pub use validation::ResolvedPaths;

/// How the HMR client reaches the browser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HotReloadMode {
    /// Served at a fixed URL and referenced from the generated index document
    #[default]
    Script,
    /// Appended to every entry-point bundle
    Footer,
    /// No client is injected
    #[serde(rename = "none")]
    Disabled,
}

/// Bundler invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildConfig {
    /// Entry points, relative to the project root
    #[serde(default = "default_entrypoints")]
    pub entrypoints: Vec<String>,

    /// Output directory; falls back to `servePath`, then `./dist`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outdir: Option<PathBuf>,

    /// Bundler command line. `$DEVLOOP_OUT_DIR` and `$DEVLOOP_ROOT` are
    /// substituted and the entry points are appended.
    #[serde(default = "default_build_command")]
    pub command: Vec<String>,

    /// Extra environment for the bundler process
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            entrypoints: default_entrypoints(),
            outdir: None,
            command: default_build_command(),
            env: BTreeMap::new(),
        }
    }
}

/// A shell-free command run before or after each build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HookCommand {
    /// Program and arguments
    pub command: Vec<String>,

    /// Discard the command's output instead of logging it
    #[serde(default)]
    pub quiet: bool,
}

/// Devloop configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DevConfig {
    /// Project root, relative to the directory devloop runs in
    #[serde(default = "default_root")]
    pub root: PathBuf,

    /// Dev server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Path of the HMR WebSocket
    #[serde(default = "default_websocket_path")]
    pub websocket_path: String,

    /// Directory watched for changes
    #[serde(default = "default_watch_dir")]
    pub watch_dir: PathBuf,

    /// Minimum milliseconds between a change and the build it triggers
    #[serde(default = "default_watch_delay")]
    pub watch_delay: u64,

    /// Ignore patterns for the watcher (`name` prefix or `*.ext`)
    #[serde(default = "default_watch_ignore")]
    pub watch_ignore: Vec<String>,

    /// Directory served over HTTP when `build.outdir` is unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serve_path: Option<PathBuf>,

    /// Empty the output directory before every build
    #[serde(default)]
    pub clean_serve_path: bool,

    /// How the HMR client is delivered
    #[serde(default)]
    pub hot_reload: HotReloadMode,

    /// Log every HTTP request
    #[serde(default)]
    pub log_requests: bool,

    /// Bundler invocation
    #[serde(default)]
    pub build: BuildConfig,

    /// Run the type-checker gate after each build
    #[serde(default, alias = "enableTSC")]
    pub enable_tsc: bool,

    /// tsconfig passed to the type checker
    #[serde(default = "default_tsc_config_path")]
    pub tsc_config_path: PathBuf,

    /// Type-checker command; `--project <tscConfigPath>` is appended
    #[serde(default = "default_tsc_command")]
    pub tsc_command: Vec<String>,

    /// Run a long-lived `tsc --watch` alongside the server
    #[serde(default)]
    pub enable_tsc_watch: bool,

    /// Send type-check failures to browsers as `tscerror`
    #[serde(default, alias = "broadcastTSCErrorToClient")]
    pub broadcast_tsc_error_to_client: bool,

    /// Hold the reload until the type checker passes
    #[serde(default, alias = "waitForTSCSuccessBeforeReload")]
    pub wait_for_tsc_success_before_reload: bool,

    /// Write the server manifest after each build
    #[serde(default)]
    pub write_manifest: bool,

    /// Manifest file name inside the output directory
    #[serde(default = "default_manifest_name")]
    pub manifest_name: String,

    /// Append `?<hash>` to manifest entries
    #[serde(default)]
    pub manifest_with_hash: bool,

    /// Tell browsers to reload after a build
    #[serde(default)]
    pub reload_on_change: bool,

    /// Print the output table in the terminal
    #[serde(default = "default_true")]
    pub broadcast_build_output_to_console: bool,

    /// Send the output table to browsers
    #[serde(default = "default_true")]
    pub broadcast_build_output_to_client: bool,

    /// Generate `index.html` in the output directory
    #[serde(default = "default_true", alias = "createIndexHTML")]
    pub create_index_html: bool,

    /// Custom minijinja template for the index document
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index_template: Option<PathBuf>,

    /// Commands run before each build
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub before_build: Vec<HookCommand>,

    /// Commands run after each successful build
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub after_build: Vec<HookCommand>,
}

impl Default for DevConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            port: default_port(),
            websocket_path: default_websocket_path(),
            watch_dir: default_watch_dir(),
            watch_delay: default_watch_delay(),
            watch_ignore: default_watch_ignore(),
            serve_path: None,
            clean_serve_path: false,
            hot_reload: HotReloadMode::default(),
            log_requests: false,
            build: BuildConfig::default(),
            enable_tsc: false,
            tsc_config_path: default_tsc_config_path(),
            tsc_command: default_tsc_command(),
            enable_tsc_watch: false,
            broadcast_tsc_error_to_client: false,
            wait_for_tsc_success_before_reload: false,
            write_manifest: false,
            manifest_name: default_manifest_name(),
            manifest_with_hash: false,
            reload_on_change: false,
            broadcast_build_output_to_console: true,
            broadcast_build_output_to_client: true,
            create_index_html: true,
            index_template: None,
            before_build: Vec::new(),
            after_build: Vec::new(),
        }
    }
}

impl DevConfig {
    /// Example `devloop.config.json` content.
    pub fn example_config() -> String {
        let example = Self {
            reload_on_change: true,
            enable_tsc: true,
            broadcast_tsc_error_to_client: true,
            write_manifest: true,
            ..Self::default()
        };
        serde_json::to_string_pretty(&example).unwrap_or_else(|_| "{}".to_string())
    }
}
