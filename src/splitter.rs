//! Moves a random fraction of every class folder into a mirrored held-out tree.
//!
//! The run is a single linear pass with two fatal checkpoints (missing source root,
//! destination class directory that cannot be created) and one fault-tolerant inner loop
//! (individual file moves).

use std::fmt;
use std::path::{Path, PathBuf};

use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;

use crate::layout::{discover_classes, ensure_dir, image_pool, ImageFilter};
use crate::split_log::SplitLog;

/// Errors that stop the whole run.
#[derive(Debug)]
pub enum SplitError {
    /// The source root does not exist. Nothing was touched.
    SourceMissing { path: PathBuf },
    /// The source root exists but is not a directory. Nothing was touched.
    SourceNotDirectory { path: PathBuf },
    /// The source root exists but its entries could not be listed. Nothing was touched.
    SourceUnreadable {
        path: PathBuf,
        source: std::io::Error,
    },
    /// A destination class directory could not be created. Directories created before the
    /// failure are left in place and no file has moved.
    MirrorFailed {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl SplitError {
    pub fn path(&self) -> &Path {
        match self {
            SplitError::SourceMissing { path }
            | SplitError::SourceNotDirectory { path }
            | SplitError::SourceUnreadable { path, .. }
            | SplitError::MirrorFailed { path, .. } => path,
        }
    }
}

impl fmt::Display for SplitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SplitError::SourceMissing { path } => {
                write!(f, "train folder {} does not exist", path.display())
            }
            SplitError::SourceNotDirectory { path } => {
                write!(f, "train folder {} is not a directory", path.display())
            }
            SplitError::SourceUnreadable { path, source } => {
                write!(f, "cannot list train folder {}: {source}", path.display())
            }
            SplitError::MirrorFailed { path, source } => {
                write!(f, "error creating directory {}: {source}", path.display())
            }
        }
    }
}

impl std::error::Error for SplitError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SplitError::SourceMissing { .. } | SplitError::SourceNotDirectory { .. } => None,
            SplitError::SourceUnreadable { source, .. }
            | SplitError::MirrorFailed { source, .. } => Some(source),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MovedFile {
    pub file: String,
    pub source: PathBuf,
    pub destination: PathBuf,
}

/// A non-fatal failure: one file that could not be moved, or a class folder whose entries
/// could not be listed (`file` is `None` and `destination` is `None` then).
#[derive(Debug, Clone, Serialize)]
pub struct MoveFailure {
    pub class: String,
    pub file: Option<String>,
    pub source: PathBuf,
    pub destination: Option<PathBuf>,
    pub error: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClassSplit {
    pub class: String,
    /// Number of image files in the class when it was processed.
    pub pool_size: usize,
    /// `floor(pool_size * ratio)`, clamped to `[0, pool_size]`.
    pub requested: usize,
    pub moved: Vec<MovedFile>,
    pub failures: Vec<MoveFailure>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitOutcome {
    /// Every requested move succeeded.
    Complete,
    /// The run finished but at least one file or class folder failed.
    Partial,
}

impl SplitOutcome {
    pub const fn as_str(self) -> &'static str {
        match self {
            SplitOutcome::Complete => "complete",
            SplitOutcome::Partial => "partial",
        }
    }
}

impl fmt::Display for SplitOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SplitReport {
    pub source_root: PathBuf,
    pub dest_root: PathBuf,
    pub ratio: f64,
    /// Destination class directories this run created (pre-existing ones are not listed).
    pub created_dirs: Vec<PathBuf>,
    pub classes: Vec<ClassSplit>,
}

impl SplitReport {
    pub fn outcome(&self) -> SplitOutcome {
        if self.failures().next().is_some() {
            SplitOutcome::Partial
        } else {
            SplitOutcome::Complete
        }
    }

    pub fn total_moved(&self) -> usize {
        self.classes.iter().map(|c| c.moved.len()).sum()
    }

    pub fn total_requested(&self) -> usize {
        self.classes.iter().map(|c| c.requested).sum()
    }

    pub fn total_failed(&self) -> usize {
        self.classes.iter().map(|c| c.failures.len()).sum()
    }

    pub fn failures(&self) -> impl Iterator<Item = &MoveFailure> {
        self.classes.iter().flat_map(|c| c.failures.iter())
    }

    pub fn moved(&self) -> impl Iterator<Item = &MovedFile> {
        self.classes.iter().flat_map(|c| c.moved.iter())
    }

    pub fn class(&self, name: &str) -> Option<&ClassSplit> {
        self.classes.iter().find(|c| c.class == name)
    }
}

/// `floor(pool_size * ratio)` truncated toward zero. Negative and NaN products give 0,
/// products above `pool_size` are clamped to `pool_size`.
pub fn sample_count(pool_size: usize, ratio: f64) -> usize {
    let k = (pool_size as f64 * ratio).trunc();
    if k.is_nan() || k <= 0.0 {
        return 0;
    }
    // `as` saturates on overflow.
    (k as usize).min(pool_size)
}

/// Creates `dest_root/<class>` for every class folder of `source_root`, then moves
/// `floor(N * ratio)` randomly chosen images of each class into it.
pub fn create_test_folders<R, L>(
    source_root: &Path,
    dest_root: &Path,
    ratio: f64,
    filter: &ImageFilter,
    rng: &mut R,
    log: &L,
) -> Result<SplitReport, SplitError>
where
    R: Rng + ?Sized,
    L: SplitLog + ?Sized,
{
    if !source_root.is_dir() {
        let path = source_root.to_path_buf();
        let err = if source_root.exists() {
            SplitError::SourceNotDirectory { path }
        } else {
            SplitError::SourceMissing { path }
        };
        log.error_at(None, source_root, &format!("Error: {err}"));
        return Err(err);
    }

    let classes = match discover_classes(source_root) {
        Ok(v) => v,
        Err(source) => {
            let err = SplitError::SourceUnreadable {
                path: source_root.to_path_buf(),
                source,
            };
            log.error_at(None, source_root, &format!("Error: {err}"));
            return Err(err);
        }
    };

    let mut created_dirs = Vec::new();
    for class in &classes {
        let dest = dest_root.join(&class.file_name);
        match ensure_dir(&dest) {
            Ok(true) => created_dirs.push(dest),
            Ok(false) => {}
            Err(source) => {
                log.error_at(
                    Some(&class.name),
                    &dest,
                    &format!("Error creating directory {}: {source}", dest.display()),
                );
                return Err(SplitError::MirrorFailed { path: dest, source });
            }
        }
    }

    let mut report = SplitReport {
        source_root: source_root.to_path_buf(),
        dest_root: dest_root.to_path_buf(),
        ratio,
        created_dirs,
        classes: Vec::with_capacity(classes.len()),
    };

    for class in &classes {
        let dest_dir = dest_root.join(&class.file_name);
        let mut split = ClassSplit {
            class: class.name.clone(),
            pool_size: 0,
            requested: 0,
            moved: Vec::new(),
            failures: Vec::new(),
        };

        let mut pool = match image_pool(&class.path, filter) {
            Ok(v) => v,
            Err(e) => {
                log.error_at(
                    Some(&class.name),
                    &class.path,
                    &format!("Error listing class folder {}: {e}", class.path.display()),
                );
                split.failures.push(MoveFailure {
                    class: class.name.clone(),
                    file: None,
                    source: class.path.clone(),
                    destination: None,
                    error: e.to_string(),
                });
                report.classes.push(split);
                continue;
            }
        };

        split.pool_size = pool.len();
        split.requested = sample_count(pool.len(), ratio);
        if split.requested == 0 {
            report.classes.push(split);
            continue;
        }

        pool.shuffle(rng);
        for file_name in pool.iter().take(split.requested) {
            let file = file_name.to_string_lossy().into_owned();
            let source = class.path.join(file_name);
            let destination = dest_dir.join(file_name);
            match move_file(&source, &destination) {
                Ok(()) => {
                    log.info_at(
                        Some(&class.name),
                        &destination,
                        &format!(
                            "Moved {file} from {} to {}",
                            source.display(),
                            destination.display()
                        ),
                    );
                    split.moved.push(MovedFile {
                        file,
                        source,
                        destination,
                    });
                }
                Err(e) => {
                    log.error_at(
                        Some(&class.name),
                        &source,
                        &format!(
                            "Error moving {file} from {} to {}: {e}",
                            source.display(),
                            destination.display()
                        ),
                    );
                    split.failures.push(MoveFailure {
                        class: class.name.clone(),
                        file: Some(file),
                        source,
                        destination: Some(destination),
                        error: e.to_string(),
                    });
                }
            }
        }

        report.classes.push(split);
    }

    Ok(report)
}

/// Renames `src` onto `dest`, replacing an existing file. Falls back to copy + remove when
/// the rename fails (e.g. the trees live on different filesystems).
pub fn move_file(src: &Path, dest: &Path) -> std::io::Result<()> {
    move_file_with(
        src,
        dest,
        |s, d| std::fs::rename(s, d),
        |p| std::fs::remove_file(p),
    )
}

/// `move_file` with the rename and the source removal supplied by the caller. If the source
/// cannot be removed after the copy, the copy at `dest` is deleted again.
pub fn move_file_with<F, G>(
    src: &Path,
    dest: &Path,
    rename: F,
    remove_src: G,
) -> std::io::Result<()>
where
    F: FnOnce(&Path, &Path) -> std::io::Result<()>,
    G: FnOnce(&Path) -> std::io::Result<()>,
{
    let rename_err = match rename(src, dest) {
        Ok(()) => return Ok(()),
        Err(e) => e,
    };
    if !src.is_file() {
        return Err(rename_err);
    }
    if let Err(copy_err) = std::fs::copy(src, dest) {
        return Err(std::io::Error::new(
            copy_err.kind(),
            format!("rename failed ({rename_err}); copy failed ({copy_err})"),
        ));
    }
    if let Err(remove_err) = remove_src(src) {
        let _ = std::fs::remove_file(dest);
        return Err(std::io::Error::new(
            remove_err.kind(),
            format!("copied but could not remove source ({remove_err})"),
        ));
    }
    Ok(())
}
