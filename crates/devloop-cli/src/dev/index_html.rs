//! Index document generation.
//!
//! Renders a minijinja template into `<out>/index.html` so every build
//! references the current, cache-busted bundles.

use crate::dev::builder::{BuildOutput, INDEX_HTML};
use crate::error::{Result, ResultExt};
use minijinja::{context, Environment};
use std::path::{Path, PathBuf};

/// Built-in template used when `indexTemplate` is unset.
pub const DEFAULT_TEMPLATE: &str = include_str!("../../assets/index.html.j2");

/// Template variables for one build.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct IndexContext {
    /// `/<rel>?<hash>` per entry point
    pub hashed_imports: Vec<String>,
    /// `/<rel>?<hash>` per stylesheet
    pub css_files: Vec<String>,
    /// URL of the HMR client script, if it should be referenced
    pub hmr_client: Option<String>,
}

impl IndexContext {
    pub fn from_output(output: &BuildOutput, out_dir: &Path, hmr_client: Option<String>) -> Self {
        let url = |rel: String, hash: &str| format!("/{}?{}", rel, hash);

        let hashed_imports = output
            .entry_points()
            .map(|a| url(a.relative_path(out_dir), &a.content_hash))
            .collect();
        let css_files = output
            .outputs
            .iter()
            .filter(|a| a.is_css())
            .map(|a| url(a.relative_path(out_dir), &a.content_hash))
            .collect();

        Self {
            hashed_imports,
            css_files,
            hmr_client,
        }
    }
}

/// Render `template` with `ctx`.
pub fn render_index(template: &str, ctx: &IndexContext) -> Result<String> {
    let env = Environment::new();
    let html = env.render_str(
        template,
        context! {
            hashed_imports => ctx.hashed_imports,
            css_files => ctx.css_files,
            hmr_client => ctx.hmr_client,
        },
    )?;
    Ok(html)
}

/// Load the template at `path`, or the built-in one.
pub async fn load_template(path: Option<&Path>) -> Result<String> {
    match path {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .with_path(path)
            .with_hint("Check the 'indexTemplate' field in devloop.config.json"),
        None => Ok(DEFAULT_TEMPLATE.to_string()),
    }
}

/// Render and write `<out_dir>/index.html`.
pub async fn write_index(template: &str, ctx: &IndexContext, out_dir: &Path) -> Result<PathBuf> {
    let html = render_index(template, ctx)?;
    let path = out_dir.join(INDEX_HTML);
    tokio::fs::write(&path, html).await.with_path(&path)?;
    Ok(path)
}
