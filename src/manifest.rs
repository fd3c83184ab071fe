use std::path::Path;

use anyhow::Context as _;

use crate::splitter::SplitReport;

pub const MANIFEST_HEADER: [&str; 6] = [
    "class",
    "file",
    "source",
    "destination",
    "status",
    "error",
];

pub const STATUS_MOVED: &str = "moved";
pub const STATUS_FAILED: &str = "failed";

/// One row per attempted move (and per class folder that could not be listed).
pub fn write_manifest_csv(path: &Path, report: &SplitReport) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create {}", parent.display()))?;
    }

    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .with_context(|| format!("open {}", path.display()))?;
    wtr.write_record(MANIFEST_HEADER)
        .context("write manifest header")?;

    for class in &report.classes {
        for m in &class.moved {
            wtr.write_record([
                class.class.clone(),
                m.file.clone(),
                m.source.display().to_string(),
                m.destination.display().to_string(),
                STATUS_MOVED.to_string(),
                String::new(),
            ])
            .context("write manifest row")?;
        }
        for f in &class.failures {
            wtr.write_record([
                class.class.clone(),
                f.file.clone().unwrap_or_default(),
                f.source.display().to_string(),
                f.destination
                    .as_ref()
                    .map(|d| d.display().to_string())
                    .unwrap_or_default(),
                STATUS_FAILED.to_string(),
                f.error.clone(),
            ])
            .context("write manifest row")?;
        }
    }

    wtr.flush()
        .with_context(|| format!("flush {}", path.display()))?;
    Ok(())
}

pub fn write_report_json(path: &Path, report: &SplitReport) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create {}", parent.display()))?;
    }
    let json = serde_json::to_vec_pretty(report).context("serialize split report")?;
    std::fs::write(path, json).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manifest_header_is_frozen() {
        assert_eq!(
            MANIFEST_HEADER.join(","),
            "class,file,source,destination,status,error"
        );
    }
}
