use crate::config::{DevConfig, HotReloadMode};
use crate::error::{ConfigError, Result};
use figment::{
    providers::{Env, Format as _, Json, Serialized},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Config file looked up in the project directory.
pub const CONFIG_FILE_NAME: &str = "devloop.config.json";

/// Prefix of environment variables that override config values.
pub const ENV_PREFIX: &str = "DEVLOOP_";

/// Values taken from command-line flags. Only `Some` fields override.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub watch_dir: Option<PathBuf>,
}

/// Scalar settings readable from `DEVLOOP_*` variables.
///
/// figment lowercases environment keys, so they are read as snake_case and
/// written back as the camelCase names the config file uses.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all(serialize = "camelCase"))]
struct EnvOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    websocket_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    watch_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    watch_delay: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    serve_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    clean_serve_path: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    hot_reload: Option<HotReloadMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    log_requests: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    enable_tsc: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tsc_config_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    enable_tsc_watch: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    broadcast_tsc_error_to_client: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    wait_for_tsc_success_before_reload: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    write_manifest: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    manifest_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    manifest_with_hash: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reload_on_change: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    broadcast_build_output_to_console: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    broadcast_build_output_to_client: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    create_index_html: Option<bool>,
}

impl DevConfig {
    /// Load configuration from multiple sources.
    ///
    /// Priority: CLI overrides > `DEVLOOP_*` environment > config file > defaults.
    /// Without `config_path`, `devloop.config.json` in `project_dir` is used
    /// when it exists. An explicit path is relative to `project_dir` and must
    /// exist.
    pub fn load(
        project_dir: &Path,
        config_path: Option<&Path>,
        overrides: &ConfigOverrides,
    ) -> Result<Self> {
        let config_file = match config_path.map(|path| super::join_clean(project_dir, path)) {
            Some(path) if !path.exists() => return Err(ConfigError::NotFound(path).into()),
            Some(path) => Some(path),
            None => {
                let default_path = project_dir.join(CONFIG_FILE_NAME);
                default_path.exists().then_some(default_path)
            }
        };

        let mut figment = Figment::new();

        if let Some(path) = config_file {
            // Absolute, so figment doesn't search parent directories
            let path = path.canonicalize().map_err(|source| ConfigError::Io {
                path: path.clone(),
                source,
            })?;
            tracing::debug!("Loading config from {}", path.display());
            figment = figment.merge(Json::file(path));
        }

        let env: EnvOverrides = Figment::from(Env::prefixed(ENV_PREFIX))
            .extract()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;

        figment
            .merge(Serialized::defaults(env))
            .merge(Serialized::defaults(overrides))
            .extract()
            .map_err(|e| ConfigError::Invalid(e.to_string()).into())
    }
}
