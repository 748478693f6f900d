use std::path::PathBuf;

pub fn default_root() -> PathBuf {
    PathBuf::from(".")
}

pub fn default_port() -> u16 {
    3000
}

pub fn default_websocket_path() -> String {
    devloop_hmr::DEFAULT_HMR_PATH.to_string()
}

pub fn default_watch_dir() -> PathBuf {
    PathBuf::from("./src")
}

pub fn default_watch_delay() -> u64 {
    1000
}

pub fn default_watch_ignore() -> Vec<String> {
    vec![
        "node_modules".to_string(),
        ".git".to_string(),
        "*.log".to_string(),
    ]
}

pub fn default_out_dir() -> PathBuf {
    PathBuf::from("./dist")
}

pub fn default_entrypoints() -> Vec<String> {
    vec!["./src/index.ts".to_string()]
}

pub fn default_build_command() -> Vec<String> {
    ["bun", "build", "--outdir", "$DEVLOOP_OUT_DIR"]
        .into_iter()
        .map(String::from)
        .collect()
}

pub fn default_tsc_config_path() -> PathBuf {
    PathBuf::from("./tsconfig.json")
}

pub fn default_tsc_command() -> Vec<String> {
    vec!["tsc".to_string(), "--noEmit".to_string()]
}

pub fn default_manifest_name() -> String {
    "bun_server_manifest.json".to_string()
}

pub fn default_true() -> bool {
    true
}
