//! Builder capability and the command-line bundler implementation.
//!
//! The pipeline only knows the [`Builder`] trait. [`CommandBuilder`] runs an
//! external bundler, then inventories what that run wrote to the output
//! directory so the rest of the pipeline sees typed artifacts with content
//! hashes. Files left over from earlier builds are not reported.

use crate::config::{join_clean, DevConfig, ResolvedPaths};
use crate::error::{BuildError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use walkdir::WalkDir;

/// Name of the generated index document.
pub const INDEX_HTML: &str = "index.html";

/// Role of a produced file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArtifactKind {
    EntryPoint,
    Chunk,
    Sourcemap,
    Asset,
}

/// One file written by the bundler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildArtifact {
    /// Absolute path inside the output directory
    pub path: PathBuf,
    pub kind: ArtifactKind,
    /// First 16 hex chars of the BLAKE3 digest
    pub content_hash: String,
    pub size_bytes: u64,
}

impl BuildArtifact {
    /// Path relative to `out_dir`, `/`-separated.
    pub fn relative_path(&self, out_dir: &Path) -> String {
        let rel = self.path.strip_prefix(out_dir).unwrap_or(&self.path);
        rel.to_string_lossy().replace('\\', "/")
    }

    /// File name without directories.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    pub fn is_css(&self) -> bool {
        self.path.extension().is_some_and(|ext| ext == "css")
    }
}

/// Result of a successful build.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildOutput {
    pub outputs: Vec<BuildArtifact>,
    /// Bundler log lines, in the order they were produced
    pub logs: Vec<String>,
}

impl BuildOutput {
    /// Iterate entry-point artifacts.
    pub fn entry_points(&self) -> impl Iterator<Item = &BuildArtifact> {
        self.outputs
            .iter()
            .filter(|a| a.kind == ArtifactKind::EntryPoint)
    }
}

/// Immutable description of how to build, shared by every build of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildSpec {
    /// Absolute entry point paths
    pub entrypoints: Vec<PathBuf>,
    pub outdir: PathBuf,
    /// Working directory for the bundler
    pub cwd: PathBuf,
    /// Bundler program and arguments, before substitution
    pub command: Vec<String>,
    pub env: BTreeMap<String, String>,
    /// Appended to every entry-point bundle after the build
    pub footer: Option<String>,
    /// Files in `outdir` written by devloop itself, never reported as artifacts
    pub reserved_outputs: Vec<String>,
}

impl BuildSpec {
    pub fn from_config(config: &DevConfig, paths: &ResolvedPaths, footer: Option<String>) -> Self {
        let entrypoints = config
            .build
            .entrypoints
            .iter()
            .map(|entry| join_clean(&paths.root, Path::new(entry)))
            .collect();

        Self {
            entrypoints,
            outdir: paths.out_dir.clone(),
            cwd: paths.root.clone(),
            command: config.build.command.clone(),
            env: config.build.env.clone(),
            footer,
            reserved_outputs: vec![INDEX_HTML.to_string(), config.manifest_name.clone()],
        }
    }

    /// Substitution variables for the bundler command line.
    pub fn vars(&self) -> BTreeMap<String, String> {
        let mut vars = BTreeMap::new();
        vars.insert(
            "DEVLOOP_OUT_DIR".to_string(),
            self.outdir.display().to_string(),
        );
        vars.insert("DEVLOOP_ROOT".to_string(), self.cwd.display().to_string());
        vars
    }

    /// Command line with variables substituted and entry points appended.
    pub fn command_line(&self) -> Vec<String> {
        let vars = self.vars();
        let mut args = resolve_args(&self.command, &vars);
        args.extend(self.entrypoints.iter().map(|p| p.display().to_string()));
        args
    }

    fn entry_stems(&self) -> Vec<String> {
        self.entrypoints
            .iter()
            .filter_map(|p| p.file_stem())
            .map(|s| s.to_string_lossy().into_owned())
            .collect()
    }
}

/// Replace `$NAME` occurrences with values from `vars`.
pub fn resolve_args(args: &[String], vars: &BTreeMap<String, String>) -> Vec<String> {
    args.iter()
        .map(|arg| {
            vars.iter().fold(arg.clone(), |acc, (key, value)| {
                acc.replace(&format!("${}", key), value)
            })
        })
        .collect()
}

/// Anything that can turn a [`BuildSpec`] into artifacts.
#[async_trait]
pub trait Builder: Send + Sync {
    async fn build(&self, spec: &BuildSpec) -> Result<BuildOutput>;
}

/// Runs the configured bundler command as a child process.
#[derive(Debug, Clone, Default)]
pub struct CommandBuilder;

impl CommandBuilder {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Builder for CommandBuilder {
    async fn build(&self, spec: &BuildSpec) -> Result<BuildOutput> {
        let args = spec.command_line();
        let Some((program, rest)) = args.split_first() else {
            return Err(BuildError::EmptyCommand.into());
        };

        let outdir = spec.outdir.clone();
        let before = run_blocking(move || OutputSnapshot::capture(&outdir)).await?;

        tracing::debug!("Running bundler: {}", args.join(" "));

        let output = tokio::process::Command::new(program)
            .args(rest)
            .current_dir(&spec.cwd)
            .envs(&spec.env)
            .envs(spec.vars())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| BuildError::Spawn {
                program: program.clone(),
                source,
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);

        if !output.status.success() {
            let detail = if stderr.trim().is_empty() {
                stdout.trim()
            } else {
                stderr.trim()
            };
            return Err(BuildError::CommandFailed {
                status: output.status.to_string(),
                output: detail.to_string(),
            }
            .into());
        }

        let logs = stdout
            .lines()
            .chain(stderr.lines())
            .map(str::trim_end)
            .filter(|line| !line.is_empty())
            .map(String::from)
            .collect();

        let scan_spec = spec.clone();
        let outputs = run_blocking(move || collect_artifacts(&scan_spec, &before)).await?;
        Ok(BuildOutput { outputs, logs })
    }
}

/// Run filesystem work off the async runtime.
async fn run_blocking<T, F>(work: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| BuildError::Custom(format!("Output scan failed: {}", e)))?
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct FileStamp {
    modified: Option<SystemTime>,
    hash: String,
}

/// State of the output directory before a build.
///
/// A file counts as written by the build when it is new, or when its
/// modification time or contents differ from the snapshot.
#[derive(Debug, Clone, Default)]
pub struct OutputSnapshot {
    files: HashMap<PathBuf, FileStamp>,
}

impl OutputSnapshot {
    /// Record every file under `dir`. A missing directory gives an empty snapshot.
    pub fn capture(dir: &Path) -> Result<Self> {
        let mut files = HashMap::new();
        if !dir.is_dir() {
            return Ok(Self { files });
        }

        for entry in WalkDir::new(dir) {
            let entry = entry.map_err(|e| BuildError::Custom(format!("Failed to scan output: {}", e)))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let contents = std::fs::read(entry.path())?;
            let stamp = FileStamp {
                modified: modified(&entry),
                hash: content_hash(&contents),
            };
            files.insert(entry.path().to_path_buf(), stamp);
        }
        Ok(Self { files })
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    fn unchanged(&self, path: &Path, stamp: &FileStamp) -> bool {
        self.files.get(path) == Some(stamp)
    }
}

fn modified(entry: &walkdir::DirEntry) -> Option<SystemTime> {
    entry.metadata().ok().and_then(|m| m.modified().ok())
}

/// Walk the output directory and describe every file the build wrote.
///
/// Files identical to their entry in `before` are skipped. Entry-point
/// bundles get the configured footer appended first, so hashes and sizes
/// reflect what is served.
pub fn collect_artifacts(spec: &BuildSpec, before: &OutputSnapshot) -> Result<Vec<BuildArtifact>> {
    let stems = spec.entry_stems();
    let mut artifacts = Vec::new();

    for entry in WalkDir::new(&spec.outdir).sort_by_file_name() {
        let entry = entry.map_err(|e| BuildError::Custom(format!("Failed to scan output: {}", e)))?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let rel = path
            .strip_prefix(&spec.outdir)
            .unwrap_or(path)
            .to_string_lossy()
            .replace('\\', "/");
        if spec.reserved_outputs.contains(&rel) {
            continue;
        }

        let mut contents = std::fs::read(path)?;
        let stamp = FileStamp {
            modified: modified(&entry),
            hash: content_hash(&contents),
        };
        if before.unchanged(path, &stamp) {
            continue;
        }

        let kind = classify(path, &stems);

        if kind == ArtifactKind::EntryPoint {
            if let Some(footer) = &spec.footer {
                if !contents.ends_with(footer.as_bytes()) {
                    contents.extend_from_slice(footer.as_bytes());
                    std::fs::write(path, &contents)?;
                }
            }
        }

        artifacts.push(BuildArtifact {
            path: path.to_path_buf(),
            kind,
            content_hash: content_hash(&contents),
            size_bytes: contents.len() as u64,
        });
    }

    Ok(artifacts)
}

/// Decide an output file's role from its name.
fn classify(path: &Path, entry_stems: &[String]) -> ArtifactKind {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default();

    match ext {
        "map" => ArtifactKind::Sourcemap,
        "js" | "mjs" | "cjs" => {
            let stem = path
                .file_stem()
                .map(|s| s.to_string_lossy())
                .unwrap_or_default();
            let is_entry = entry_stems.iter().any(|entry| {
                stem == entry.as_str()
                    || stem
                        .strip_prefix(entry.as_str())
                        .is_some_and(|rest| rest.starts_with('-') || rest.starts_with('.'))
            });
            if is_entry {
                ArtifactKind::EntryPoint
            } else {
                ArtifactKind::Chunk
            }
        }
        _ => ArtifactKind::Asset,
    }
}

/// Short content hash used for cache busting.
pub fn content_hash(bytes: &[u8]) -> String {
    let hex = blake3::hash(bytes).to_hex();
    hex.as_str()[..16].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn spec_in(dir: &Path) -> BuildSpec {
        let outdir = dir.join("dist");
        std::fs::create_dir_all(&outdir).unwrap();
        BuildSpec {
            entrypoints: vec![dir.join("src/main.ts")],
            outdir,
            cwd: dir.to_path_buf(),
            command: vec![],
            env: BTreeMap::new(),
            footer: None,
            reserved_outputs: vec![INDEX_HTML.to_string(), "manifest.json".to_string()],
        }
    }

    #[test]
    fn test_classify() {
        let stems = vec!["main".to_string()];
        let kind = |name: &str| classify(Path::new(name), &stems);

        assert_eq!(kind("dist/main.js"), ArtifactKind::EntryPoint);
        assert_eq!(kind("dist/main-a1b2c3.js"), ArtifactKind::EntryPoint);
        assert_eq!(kind("dist/main.a1b2c3.mjs"), ArtifactKind::EntryPoint);
        assert_eq!(kind("dist/mainframe.js"), ArtifactKind::Chunk);
        assert_eq!(kind("dist/chunk-xyz.js"), ArtifactKind::Chunk);
        assert_eq!(kind("dist/main.js.map"), ArtifactKind::Sourcemap);
        assert_eq!(kind("dist/main.css"), ArtifactKind::Asset);
        assert_eq!(kind("dist/logo.svg"), ArtifactKind::Asset);
    }

    #[test]
    fn test_content_hash_is_short_and_stable() {
        let a = content_hash(b"console.log(1)");
        assert_eq!(a.len(), 16);
        assert_eq!(a, content_hash(b"console.log(1)"));
        assert_ne!(a, content_hash(b"console.log(2)"));
    }

    #[test]
    fn test_resolve_args() {
        let mut vars = BTreeMap::new();
        vars.insert("DEVLOOP_OUT_DIR".to_string(), "/tmp/out".to_string());
        let args = vec!["--outdir".to_string(), "$DEVLOOP_OUT_DIR".to_string()];
        assert_eq!(resolve_args(&args, &vars), vec!["--outdir", "/tmp/out"]);
    }

    #[test]
    fn test_command_line_appends_entries() {
        let temp = TempDir::new().unwrap();
        let mut spec = spec_in(temp.path());
        spec.command = vec!["bun".into(), "build".into(), "--outdir".into(), "$DEVLOOP_OUT_DIR".into()];

        let line = spec.command_line();
        assert_eq!(line[3], spec.outdir.display().to_string());
        assert!(line[4].ends_with("main.ts"));
    }

    #[test]
    fn test_collect_skips_reserved_and_appends_footer() {
        let temp = TempDir::new().unwrap();
        let mut spec = spec_in(temp.path());
        spec.footer = Some("\n;/*hmr*/".to_string());

        std::fs::write(spec.outdir.join("main.js"), "run()").unwrap();
        std::fs::write(spec.outdir.join("chunk-1.js"), "x").unwrap();
        std::fs::write(spec.outdir.join(INDEX_HTML), "<html>").unwrap();
        std::fs::write(spec.outdir.join("manifest.json"), "{}").unwrap();

        let artifacts = collect_artifacts(&spec, &OutputSnapshot::default()).unwrap();
        let names: Vec<_> = artifacts.iter().map(|a| a.file_name()).collect();
        assert_eq!(names, vec!["chunk-1.js", "main.js"]);

        let main = std::fs::read_to_string(spec.outdir.join("main.js")).unwrap();
        assert_eq!(main, "run()\n;/*hmr*/");
        assert_eq!(artifacts[1].size_bytes, main.len() as u64);

        // A second pass over unchanged output doesn't stack footers
        collect_artifacts(&spec, &OutputSnapshot::default()).unwrap();
        let again = std::fs::read_to_string(spec.outdir.join("main.js")).unwrap();
        assert_eq!(again, main);
    }

    #[test]
    fn test_nested_relative_path() {
        let temp = TempDir::new().unwrap();
        let spec = spec_in(temp.path());
        std::fs::create_dir_all(spec.outdir.join("assets")).unwrap();
        std::fs::write(spec.outdir.join("assets/app.css"), "body{}").unwrap();

        let artifacts = collect_artifacts(&spec, &OutputSnapshot::default()).unwrap();
        assert_eq!(artifacts[0].relative_path(&spec.outdir), "assets/app.css");
        assert!(artifacts[0].is_css());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_builder_runs_bundler() {
        let temp = TempDir::new().unwrap();
        let mut spec = spec_in(temp.path());
        spec.command = vec![
            "sh".into(),
            "-c".into(),
            "echo bundling $1; printf 'app' > \"$DEVLOOP_OUT_DIR/main.js\"".into(),
            "sh".into(),
        ];

        let output = CommandBuilder::new().build(&spec).await.unwrap();
        assert_eq!(output.entry_points().count(), 1);
        assert_eq!(output.outputs[0].size_bytes, 3);
        assert!(output.logs[0].starts_with("bundling "));
        assert!(output.logs[0].ends_with("main.ts"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_builder_failure() {
        let temp = TempDir::new().unwrap();
        let mut spec = spec_in(temp.path());
        spec.command = vec!["sh".into(), "-c".into(), "echo boom >&2; exit 3".into(), "sh".into()];

        let err = CommandBuilder::new().build(&spec).await.unwrap_err();
        assert!(matches!(
            err,
            crate::error::CliError::Build(BuildError::CommandFailed { ref output, .. }) if output == "boom"
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_rebuild_reports_only_new_outputs() {
        let temp = TempDir::new().unwrap();
        let mut spec = spec_in(temp.path());
        // First run writes main-aaaa.js, every later run main-bbbb.js
        spec.command = vec![
            "sh".into(),
            "-c".into(),
            concat!(
                "if [ -f \"$DEVLOOP_OUT_DIR/main-aaaa.js\" ]; ",
                "then printf b > \"$DEVLOOP_OUT_DIR/main-bbbb.js\"; ",
                "else printf a > \"$DEVLOOP_OUT_DIR/main-aaaa.js\"; fi"
            )
            .into(),
            "sh".into(),
        ];

        let first = CommandBuilder::new().build(&spec).await.unwrap();
        let names: Vec<_> = first.entry_points().map(|a| a.file_name()).collect();
        assert_eq!(names, vec!["main-aaaa.js"]);

        let second = CommandBuilder::new().build(&spec).await.unwrap();
        let names: Vec<_> = second.entry_points().map(|a| a.file_name()).collect();
        assert_eq!(names, vec!["main-bbbb.js"]);

        let manifest = crate::dev::manifest::Manifest::from_output(&second, &spec.outdir, false);
        assert_eq!(manifest.js, vec!["main-bbbb.js"]);
    }

    #[test]
    fn test_snapshot_skips_untouched_files() {
        let temp = TempDir::new().unwrap();
        let spec = spec_in(temp.path());
        std::fs::write(spec.outdir.join("stale.js"), "old").unwrap();
        std::fs::write(spec.outdir.join("main.js"), "v1").unwrap();

        let before = OutputSnapshot::capture(&spec.outdir).unwrap();
        assert_eq!(before.len(), 2);

        std::fs::write(spec.outdir.join("main.js"), "v2").unwrap();
        std::fs::write(spec.outdir.join("extra.css"), "a{}").unwrap();

        let artifacts = collect_artifacts(&spec, &before).unwrap();
        let names: Vec<_> = artifacts.iter().map(|a| a.file_name()).collect();
        assert_eq!(names, vec!["extra.css", "main.js"]);
    }

    #[test]
    fn test_snapshot_of_missing_dir_is_empty() {
        let temp = TempDir::new().unwrap();
        let snapshot = OutputSnapshot::capture(&temp.path().join("nope")).unwrap();
        assert!(snapshot.is_empty());
    }

    #[tokio::test]
    async fn test_command_builder_missing_program() {
        let temp = TempDir::new().unwrap();
        let mut spec = spec_in(temp.path());
        spec.command = vec!["devloop-test-no-such-bundler".into()];

        let err = CommandBuilder::new().build(&spec).await.unwrap_err();
        assert!(matches!(
            err,
            crate::error::CliError::Build(BuildError::Spawn { .. })
        ));
    }

    #[tokio::test]
    async fn test_empty_command() {
        let temp = TempDir::new().unwrap();
        let mut spec = spec_in(temp.path());
        spec.entrypoints.clear();

        let err = CommandBuilder::new().build(&spec).await.unwrap_err();
        assert!(matches!(
            err,
            crate::error::CliError::Build(BuildError::EmptyCommand)
        ));
    }
}
