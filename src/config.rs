use std::path::{Path, PathBuf};

use anyhow::Context as _;
use serde::Deserialize;

use crate::layout::{ImageFilter, DEFAULT_EXTENSIONS};

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub split: SplitConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("read {}", path.display()))?;
        let cfg: Config =
            toml::from_str(&raw).with_context(|| format!("parse {}", path.display()))?;
        cfg.validate()
            .with_context(|| format!("validate {}", path.display()))?;
        Ok(cfg)
    }

    /// The ratio itself is not bounded here: values outside `[0, 1]` give degenerate but
    /// well-defined sample sizes.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.split.extensions.is_empty() {
            anyhow::bail!("invalid split.extensions: must list at least one extension");
        }
        if let Some(bad) = self
            .split
            .extensions
            .iter()
            .find(|e| e.trim().trim_start_matches('.').is_empty())
        {
            anyhow::bail!("invalid split.extensions entry {bad:?}: must not be blank");
        }
        check_distinct_outputs(
            self.output.manifest_csv.as_deref(),
            self.output.report_json.as_deref(),
        )
        .context("invalid output section")?;
        Ok(())
    }

    pub fn image_filter(&self) -> anyhow::Result<ImageFilter> {
        ImageFilter::new(&self.split.extensions).context("split.extensions")
    }
}

/// The manifest CSV and the JSON report must not land on the same file.
pub fn check_distinct_outputs(
    manifest_csv: Option<&Path>,
    report_json: Option<&Path>,
) -> anyhow::Result<()> {
    if let (Some(m), Some(r)) = (manifest_csv, report_json) {
        if m == r {
            anyhow::bail!(
                "manifest csv and report json both point at {}; they must differ",
                m.display()
            );
        }
    }
    Ok(())
}

#[derive(Clone, Debug, Deserialize)]
pub struct SplitConfig {
    /// Fraction of every class moved into the test tree.
    #[serde(default = "default_test_ratio")]
    pub test_ratio: f64,
    /// Accepted image extensions, matched case-insensitively.
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            test_ratio: default_test_ratio(),
            extensions: default_extensions(),
        }
    }
}

pub fn default_test_ratio() -> f64 {
    0.2
}

fn default_extensions() -> Vec<String> {
    DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect()
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct OutputConfig {
    /// Optional CSV listing every attempted move.
    #[serde(default)]
    pub manifest_csv: Option<PathBuf>,
    /// Optional JSON dump of the split report.
    #[serde(default)]
    pub report_json: Option<PathBuf>,
}
