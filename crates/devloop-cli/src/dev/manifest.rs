//! Server manifest listing the entry-point bundles.

use crate::dev::builder::BuildOutput;
use crate::error::{Result, ResultExt};
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct Manifest {
    pub js: Vec<String>,
}

impl Manifest {
    /// One entry per entry-point artifact, relative to `out_dir`.
    pub fn from_output(output: &BuildOutput, out_dir: &Path, with_hash: bool) -> Self {
        let js = output
            .entry_points()
            .map(|artifact| {
                let rel = artifact.relative_path(out_dir);
                if with_hash {
                    format!("{}?{}", rel, artifact.content_hash)
                } else {
                    rel
                }
            })
            .collect();
        Self { js }
    }
}

/// Write `<out_dir>/<name>` and return its path.
pub async fn write_manifest(
    output: &BuildOutput,
    out_dir: &Path,
    name: &str,
    with_hash: bool,
) -> Result<PathBuf> {
    let manifest = Manifest::from_output(output, out_dir, with_hash);
    let path = out_dir.join(name);
    let json = serde_json::to_string(&manifest)?;
    tokio::fs::write(&path, json).await.with_path(&path)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dev::builder::{ArtifactKind, BuildArtifact};
    use tempfile::TempDir;

    fn output(out_dir: &Path) -> BuildOutput {
        let artifact = |name: &str, kind| BuildArtifact {
            path: out_dir.join(name),
            kind,
            content_hash: "abc123".to_string(),
            size_bytes: 10,
        };
        BuildOutput {
            outputs: vec![
                artifact("main.js", ArtifactKind::EntryPoint),
                artifact("chunk-1.js", ArtifactKind::Chunk),
                artifact("main.js.map", ArtifactKind::Sourcemap),
            ],
            logs: vec![],
        }
    }

    #[tokio::test]
    async fn test_manifest_with_hash() {
        let temp = TempDir::new().unwrap();
        let path = write_manifest(&output(temp.path()), temp.path(), "bun_server_manifest.json", true)
            .await
            .unwrap();

        let written = std::fs::read_to_string(path).unwrap();
        assert_eq!(written, r#"{"js":["main.js?abc123"]}"#);
    }

    #[tokio::test]
    async fn test_manifest_without_hash() {
        let temp = TempDir::new().unwrap();
        let path = write_manifest(&output(temp.path()), temp.path(), "m.json", false)
            .await
            .unwrap();

        assert!(path.ends_with("m.json"));
        let written = std::fs::read_to_string(path).unwrap();
        assert_eq!(written, r#"{"js":["main.js"]}"#);
    }

    #[test]
    fn test_nested_entries_use_forward_slashes() {
        let out = PathBuf::from("/out");
        let output = BuildOutput {
            outputs: vec![BuildArtifact {
                path: out.join("pages").join("home.js"),
                kind: ArtifactKind::EntryPoint,
                content_hash: "h".to_string(),
                size_bytes: 1,
            }],
            logs: vec![],
        };
        assert_eq!(
            Manifest::from_output(&output, &out, false).js,
            vec!["pages/home.js"]
        );
    }
}
