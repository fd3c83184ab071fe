//! Source-tree layout: class discovery, the image-pool filter and destination mirroring.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

pub const DEFAULT_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// Case-insensitive file-name suffix filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageFilter {
    suffixes: Vec<String>,
}

impl Default for ImageFilter {
    fn default() -> Self {
        Self {
            suffixes: DEFAULT_EXTENSIONS.iter().map(|e| format!(".{e}")).collect(),
        }
    }
}

impl ImageFilter {
    /// Builds a filter from extensions given with or without the leading dot.
    pub fn new<S: AsRef<str>>(extensions: &[S]) -> anyhow::Result<Self> {
        if extensions.is_empty() {
            anyhow::bail!("image extension list is empty");
        }
        let mut suffixes = Vec::with_capacity(extensions.len());
        for ext in extensions {
            let ext = ext.as_ref().trim().trim_start_matches('.').to_lowercase();
            if ext.is_empty() {
                anyhow::bail!("blank image extension in {:?}", extensions_debug(extensions));
            }
            let suffix = format!(".{ext}");
            if !suffixes.contains(&suffix) {
                suffixes.push(suffix);
            }
        }
        Ok(Self { suffixes })
    }

    pub fn matches(&self, file_name: &str) -> bool {
        let lower = file_name.to_lowercase();
        self.suffixes.iter().any(|s| lower.ends_with(s.as_str()))
    }

    pub fn suffixes(&self) -> &[String] {
        &self.suffixes
    }
}

fn extensions_debug<S: AsRef<str>>(extensions: &[S]) -> Vec<&str> {
    extensions.iter().map(|e| e.as_ref()).collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassDir {
    pub name: String,
    pub file_name: OsString,
    pub path: PathBuf,
}

/// Immediate subdirectories of `root`, sorted by name.
pub fn discover_classes(root: &Path) -> std::io::Result<Vec<ClassDir>> {
    let mut out = Vec::new();
    for entry in std::fs::read_dir(root)? {
        let entry = entry?;
        let file_name = entry.file_name();
        if file_name == "." || file_name == ".." {
            continue;
        }
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        out.push(ClassDir {
            name: file_name.to_string_lossy().into_owned(),
            file_name,
            path,
        });
    }
    out.sort_by(|a, b| a.file_name.cmp(&b.file_name));
    Ok(out)
}

/// Regular files in `class_dir` accepted by `filter`, sorted by name.
pub fn image_pool(class_dir: &Path, filter: &ImageFilter) -> std::io::Result<Vec<OsString>> {
    let mut out = Vec::new();
    for entry in std::fs::read_dir(class_dir)? {
        let entry = entry?;
        let file_name = entry.file_name();
        if !filter.matches(&file_name.to_string_lossy()) {
            continue;
        }
        if !entry.path().is_file() {
            continue;
        }
        out.push(file_name);
    }
    out.sort();
    Ok(out)
}

/// Creates `dest` (with parents) when missing. Returns whether anything was created.
pub fn ensure_dir(dest: &Path) -> std::io::Result<bool> {
    if dest.exists() {
        return Ok(false);
    }
    std::fs::create_dir_all(dest)?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tmp_dir(name: &str) -> PathBuf {
        let p = std::env::temp_dir().join(format!(
            "holdout_layout_{name}_{}_{}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_nanos()
        ));
        std::fs::create_dir_all(&p).expect("create tmp dir");
        p
    }

    #[test]
    fn default_filter_is_case_insensitive() {
        let f = ImageFilter::default();
        assert!(f.matches("a.png"));
        assert!(f.matches("B.JPG"));
        assert!(f.matches("c.JpEg"));
        assert!(!f.matches("notes.txt"));
        assert!(!f.matches("archive.png.zip"));
        assert!(!f.matches("jpeg"));
    }

    #[test]
    fn custom_extensions_are_normalized() {
        let f = ImageFilter::new(&[".WEBP", " bmp ", "webp"]).expect("filter");
        assert_eq!(f.suffixes(), &[".webp".to_string(), ".bmp".to_string()]);
        assert!(f.matches("x.Webp"));
        assert!(!f.matches("x.png"));
    }

    #[test]
    fn empty_or_blank_extensions_are_rejected() {
        let none: [&str; 0] = [];
        assert!(ImageFilter::new(&none).is_err());
        assert!(ImageFilter::new(&["png", "  "]).is_err());
    }

    #[test]
    fn classes_are_directories_only() {
        let root = tmp_dir("classes");
        std::fs::create_dir_all(root.join("dog")).unwrap();
        std::fs::create_dir_all(root.join("cat")).unwrap();
        std::fs::write(root.join("README.md"), b"x").unwrap();

        let names: Vec<String> = discover_classes(&root)
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["cat", "dog"]);
    }

    #[test]
    fn pool_skips_non_images_and_directories() {
        let dir = tmp_dir("pool");
        std::fs::write(dir.join("a.png"), b"x").unwrap();
        std::fs::write(dir.join("b.JPEG"), b"x").unwrap();
        std::fs::write(dir.join("labels.txt"), b"x").unwrap();
        std::fs::create_dir_all(dir.join("nested.jpg")).unwrap();

        let pool = image_pool(&dir, &ImageFilter::default()).unwrap();
        assert_eq!(pool, vec![OsString::from("a.png"), OsString::from("b.JPEG")]);
    }

    #[test]
    fn ensure_dir_is_idempotent() {
        let root = tmp_dir("ensure");
        let dest = root.join("deep").join("cat");
        assert!(ensure_dir(&dest).unwrap());
        assert!(!ensure_dir(&dest).unwrap());
        assert!(dest.is_dir());
    }
}
