//! Temporary artifact store.
//!
//! Rendered carousels are kept on disk for a limited time so clients can
//! fetch slides by URL after the render call returns:
//!
//! ```text
//! carousel-store/
//! ├── 3f2c…e1/               # carousel id (UUID v4, simple form)
//! │   ├── slide_1.png
//! │   └── slide_2.png
//! ├── .staging-…/            # namespace being written
//! └── .trash-…/              # namespace being removed
//! ```
//!
//! ## Atomicity
//!
//! `save` writes every file into a hidden staging directory and renames it
//! into place, so readers never observe a half-written namespace. `sweep`
//! renames an expired namespace to a hidden trash directory before deleting
//! it, so readers never observe a half-deleted one.
//!
//! ## Access control
//!
//! Carousel ids and filenames come from clients. Both are checked against a
//! strict character whitelist before any path is built, which rules out
//! separators, `..`, and hidden names. Shape violations are
//! [`StoreError::Forbidden`]; a well-formed name that does not exist is
//! [`StoreError::NotFound`].

use crate::types::CarouselArtifactSet;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use thiserror::Error;

const STAGING_PREFIX: &str = ".staging-";
const TRASH_PREFIX: &str = ".trash-";
const MAX_ID_LEN: usize = 64;
const MAX_FILENAME_LEN: usize = 128;
/// Staging directories younger than this are assumed to belong to a running save.
const STAGING_GRACE: Duration = Duration::from_secs(600);

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("carousel {0} already exists")]
    Conflict(String),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("failed to encode slide: {0}")]
    Encode(#[from] image::ImageError),
}

/// A file written by [`ArtifactStore::save`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub carousel_id: String,
    pub filename: String,
    pub path: PathBuf,
    pub bytes: u64,
}

/// Result of one [`ArtifactStore::sweep_expired`] pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SweepReport {
    /// Ids of removed namespaces.
    pub removed: Vec<String>,
    /// Ids of expired namespaces that could not be removed.
    pub failed: Vec<String>,
    /// Namespaces younger than the TTL.
    pub kept: usize,
}

impl fmt::Display for SweepReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} removed, {} kept", self.removed.len(), self.kept)?;
        if !self.failed.is_empty() {
            write!(f, ", {} failed", self.failed.len())?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    /// Open the store at `root`, creating the directory if needed.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Persist every file of `set` under its carousel id.
    ///
    /// Fails with [`StoreError::Conflict`] if the namespace already exists;
    /// stored carousels are never modified.
    pub fn save(&self, set: &CarouselArtifactSet) -> Result<Vec<StoredFile>, StoreError> {
        let id = &set.carousel_id;
        check_id(id)?;
        for file in &set.files {
            check_filename(&file.filename)?;
        }

        let target = self.root.join(id);
        if target.exists() {
            return Err(StoreError::Conflict(id.clone()));
        }

        let staging = self.root.join(format!("{STAGING_PREFIX}{id}"));
        if staging.exists() {
            fs::remove_dir_all(&staging)?;
        }
        fs::create_dir(&staging)?;

        let written = set
            .files
            .iter()
            .map(|file| fs::write(staging.join(&file.filename), &file.bytes))
            .collect::<io::Result<Vec<()>>>()
            .and_then(|_| fs::rename(&staging, &target));
        if let Err(e) = written {
            fs::remove_dir_all(&staging).ok();
            return Err(e.into());
        }

        tracing::info!(carousel = %id, files = set.files.len(), "stored carousel");
        Ok(set
            .files
            .iter()
            .map(|file| StoredFile {
                carousel_id: id.clone(),
                filename: file.filename.clone(),
                path: target.join(&file.filename),
                bytes: file.bytes.len() as u64,
            })
            .collect())
    }

    /// Read one stored file.
    pub fn get(&self, carousel_id: &str, filename: &str) -> Result<Vec<u8>, StoreError> {
        check_id(carousel_id)?;
        check_filename(filename)?;
        fs::read(self.root.join(carousel_id).join(filename))
            .map_err(|e| not_found_or_io(e, format!("{carousel_id}/{filename}")))
    }

    /// Filenames stored under `carousel_id`, in slide order.
    pub fn list(&self, carousel_id: &str) -> Result<Vec<String>, StoreError> {
        check_id(carousel_id)?;
        let entries = fs::read_dir(self.root.join(carousel_id))
            .map_err(|e| not_found_or_io(e, carousel_id.to_string()))?;
        let mut names = Vec::new();
        for entry in entries {
            let entry = entry?;
            if let Some(name) = entry.file_name().to_str()
                && check_filename(name).is_ok()
            {
                names.push(name.to_string());
            }
        }
        names.sort_by_key(|name| (slide_number(name), name.clone()));
        Ok(names)
    }

    /// Remove every namespace at least `ttl` old.
    ///
    /// Namespaces are removed independently: a failure is logged and counted
    /// in [`SweepReport::failed`], and the sweep moves on. A namespace that a
    /// concurrent sweep already removed is skipped. Only failing to read the
    /// store root is an error.
    #[tracing::instrument(skip(self), fields(root = %self.root.display()))]
    pub fn sweep_expired(&self, ttl: Duration) -> Result<SweepReport, StoreError> {
        self.sweep_with(ttl, |id| self.remove_namespace(id))
    }

    fn sweep_with(
        &self,
        ttl: Duration,
        mut remove: impl FnMut(&str) -> io::Result<Removal>,
    ) -> Result<SweepReport, StoreError> {
        let now = SystemTime::now();
        let mut report = SweepReport::default();

        for entry in fs::read_dir(&self.root)? {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!(error = %e, "skipping unreadable store entry");
                    continue;
                }
            };
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }

            if name.starts_with(TRASH_PREFIX) {
                if let Err(e) = fs::remove_dir_all(&path) {
                    tracing::warn!(path = %path.display(), error = %e, "failed to remove leftover trash");
                }
                continue;
            }
            if name.starts_with(STAGING_PREFIX) {
                if age(&path, now) >= ttl.max(STAGING_GRACE) {
                    tracing::debug!(path = %path.display(), "removing stale staging directory");
                    fs::remove_dir_all(&path).ok();
                }
                continue;
            }
            if check_id(&name).is_err() {
                continue;
            }

            if age(&path, now) < ttl {
                report.kept += 1;
                continue;
            }
            match remove(&name) {
                Ok(Removal::Removed) => {
                    tracing::debug!(carousel = %name, "removed expired carousel");
                    report.removed.push(name);
                }
                Ok(Removal::AlreadyGone) => {
                    tracing::debug!(carousel = %name, "carousel already removed");
                }
                Err(e) => {
                    tracing::warn!(carousel = %name, error = %e, "failed to remove expired carousel");
                    report.failed.push(name);
                }
            }
        }

        tracing::info!(
            removed = report.removed.len(),
            failed = report.failed.len(),
            kept = report.kept,
            "sweep finished"
        );
        Ok(report)
    }

    /// Move a namespace out of sight, then delete it.
    ///
    /// Once the rename succeeds the namespace is gone for readers, even if
    /// deleting the trash directory fails.
    fn remove_namespace(&self, id: &str) -> io::Result<Removal> {
        let trash = self
            .root
            .join(format!("{TRASH_PREFIX}{id}-{}", uuid::Uuid::new_v4().simple()));
        match fs::rename(self.root.join(id), &trash) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Removal::AlreadyGone),
            Err(e) => return Err(e),
        }
        if let Err(e) = fs::remove_dir_all(&trash) {
            tracing::warn!(path = %trash.display(), error = %e, "trash left for the next sweep");
        }
        Ok(Removal::Removed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Removal {
    Removed,
    AlreadyGone,
}

/// A fresh carousel id.
pub fn new_carousel_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// MIME type for a stored filename, by extension.
pub fn content_type(filename: &str) -> &'static str {
    let ext = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

fn check_id(id: &str) -> Result<(), StoreError> {
    if id.is_empty() || id.len() > MAX_ID_LEN || !id.chars().all(is_name_char) {
        return Err(StoreError::Forbidden(format!("invalid carousel id {id:?}")));
    }
    Ok(())
}

fn check_filename(filename: &str) -> Result<(), StoreError> {
    let valid = filename.len() <= MAX_FILENAME_LEN
        && filename.split_once('.').is_some_and(|(stem, ext)| {
            !stem.is_empty()
                && stem.chars().all(is_name_char)
                && !ext.is_empty()
                && ext.chars().all(|c| c.is_ascii_alphanumeric())
        });
    if valid {
        Ok(())
    } else {
        Err(StoreError::Forbidden(format!("invalid filename {filename:?}")))
    }
}

fn not_found_or_io(e: io::Error, what: String) -> StoreError {
    match e.kind() {
        io::ErrorKind::NotFound | io::ErrorKind::NotADirectory | io::ErrorKind::IsADirectory => {
            StoreError::NotFound(what)
        }
        _ => StoreError::Io(e),
    }
}

/// Trailing number of `slide_12.png`, for ordering listings.
fn slide_number(filename: &str) -> Option<u64> {
    let stem = filename.split_once('.').map_or(filename, |(stem, _)| stem);
    let digits = stem.rsplit(|c: char| !c.is_ascii_digit()).next()?;
    digits.parse().ok()
}

/// Age from creation time, falling back to modification time.
fn age(path: &Path, now: SystemTime) -> Duration {
    fs::metadata(path)
        .and_then(|m| m.created().or_else(|_| m.modified()))
        .ok()
        .and_then(|t| now.duration_since(t).ok())
        .unwrap_or(Duration::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ArtifactFile;
    use tempfile::TempDir;

    fn artifact_set(id: &str, names: &[&str]) -> CarouselArtifactSet {
        CarouselArtifactSet {
            carousel_id: id.to_string(),
            files: names
                .iter()
                .map(|n| ArtifactFile {
                    filename: n.to_string(),
                    bytes: n.as_bytes().to_vec(),
                })
                .collect(),
        }
    }

    fn store() -> (TempDir, ArtifactStore) {
        let tmp = TempDir::new().unwrap();
        let store = ArtifactStore::open(tmp.path().join("store")).unwrap();
        (tmp, store)
    }

    // =========================================================================
    // save / get / list
    // =========================================================================

    #[test]
    fn save_then_get() {
        let (_tmp, store) = store();
        let stored = store
            .save(&artifact_set("abc", &["slide_1.png", "slide_2.png"]))
            .unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[1].path, store.root().join("abc/slide_2.png"));
        assert_eq!(stored[1].bytes, "slide_2.png".len() as u64);
        assert_eq!(store.get("abc", "slide_1.png").unwrap(), b"slide_1.png");
    }

    #[test]
    fn save_leaves_no_staging_directory() {
        let (_tmp, store) = store();
        store.save(&artifact_set("abc", &["slide_1.png"])).unwrap();
        let names: Vec<String> = fs::read_dir(store.root())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["abc"]);
    }

    #[test]
    fn save_refuses_existing_namespace() {
        let (_tmp, store) = store();
        store.save(&artifact_set("abc", &["slide_1.png"])).unwrap();
        let err = store
            .save(&artifact_set("abc", &["slide_9.png"]))
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
        assert!(matches!(
            store.get("abc", "slide_9.png"),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn save_rejects_bad_names() {
        let (_tmp, store) = store();
        assert!(matches!(
            store.save(&artifact_set("../up", &["slide_1.png"])),
            Err(StoreError::Forbidden(_))
        ));
        assert!(matches!(
            store.save(&artifact_set("abc", &["../slide_1.png"])),
            Err(StoreError::Forbidden(_))
        ));
        assert!(!store.root().join("abc").exists());
    }

    #[test]
    fn get_missing_is_not_found() {
        let (_tmp, store) = store();
        store.save(&artifact_set("abc", &["slide_1.png"])).unwrap();
        assert!(matches!(
            store.get("nope", "slide_1.png"),
            Err(StoreError::NotFound(_))
        ));
        assert!(matches!(
            store.get("abc", "slide_7.png"),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn get_rejects_traversal() {
        let (tmp, store) = store();
        fs::write(tmp.path().join("secret.txt"), "x").unwrap();
        for (id, file) in [
            ("..", "secret.txt"),
            ("abc", "../../secret.txt"),
            ("abc/..", "secret.txt"),
            ("abc", ".hidden"),
            ("", "slide_1.png"),
            ("abc", "slide_1"),
            ("abc", "slide 1.png"),
        ] {
            assert!(
                matches!(store.get(id, file), Err(StoreError::Forbidden(_))),
                "{id:?} {file:?}"
            );
        }
    }

    #[test]
    fn get_on_a_file_namespace_is_not_found() {
        let (_tmp, store) = store();
        fs::write(store.root().join("plain"), "x").unwrap();
        assert!(matches!(
            store.get("plain", "slide_1.png"),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn list_in_slide_order() {
        let (_tmp, store) = store();
        store
            .save(&artifact_set(
                "abc",
                &["slide_10.png", "slide_2.png", "slide_1.png"],
            ))
            .unwrap();
        assert_eq!(
            store.list("abc").unwrap(),
            ["slide_1.png", "slide_2.png", "slide_10.png"]
        );
        assert!(matches!(store.list("nope"), Err(StoreError::NotFound(_))));
    }

    // =========================================================================
    // sweep
    // =========================================================================

    #[test]
    fn sweep_zero_ttl_removes_everything() {
        let (_tmp, store) = store();
        store.save(&artifact_set("one", &["slide_1.png"])).unwrap();
        store.save(&artifact_set("two", &["slide_1.png"])).unwrap();

        let report = store.sweep_expired(Duration::ZERO).unwrap();
        let mut removed = report.removed.clone();
        removed.sort();
        assert_eq!(removed, ["one", "two"]);
        assert_eq!(report.kept, 0);
        assert!(matches!(
            store.get("one", "slide_1.png"),
            Err(StoreError::NotFound(_))
        ));
        assert_eq!(fs::read_dir(store.root()).unwrap().count(), 0);
    }

    #[test]
    fn sweep_keeps_fresh_namespaces() {
        let (_tmp, store) = store();
        store.save(&artifact_set("fresh", &["slide_1.png"])).unwrap();
        let report = store.sweep_expired(Duration::from_secs(3600)).unwrap();
        assert!(report.removed.is_empty());
        assert_eq!(report.kept, 1);
        assert!(store.get("fresh", "slide_1.png").is_ok());
    }

    #[test]
    fn sweep_cleans_leftover_trash_and_ignores_foreign_entries() {
        let (_tmp, store) = store();
        fs::create_dir(store.root().join(".trash-old")).unwrap();
        fs::write(store.root().join("README"), "x").unwrap();
        fs::create_dir(store.root().join("has.dot")).unwrap();

        let report = store.sweep_expired(Duration::ZERO).unwrap();
        assert!(report.removed.is_empty());
        assert!(!store.root().join(".trash-old").exists());
        assert!(store.root().join("README").exists());
        assert!(store.root().join("has.dot").exists());
    }

    #[test]
    fn sweep_keeps_recent_staging_directories() {
        let (_tmp, store) = store();
        fs::create_dir(store.root().join(".staging-busy")).unwrap();
        store.sweep_expired(Duration::ZERO).unwrap();
        assert!(store.root().join(".staging-busy").exists());
    }

    #[test]
    fn sweep_continues_past_a_failed_removal() {
        let (_tmp, store) = store();
        store.save(&artifact_set("stuck", &["slide_1.png"])).unwrap();
        store.save(&artifact_set("gone", &["slide_1.png"])).unwrap();

        let report = store
            .sweep_with(Duration::ZERO, |id| {
                if id == "stuck" {
                    Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied"))
                } else {
                    store.remove_namespace(id)
                }
            })
            .unwrap();

        assert_eq!(report.removed, ["gone"]);
        assert_eq!(report.failed, ["stuck"]);
        assert_eq!(report.kept, 0);
        assert_eq!(store.get("stuck", "slide_1.png").unwrap(), b"slide_1.png");
        assert!(matches!(
            store.get("gone", "slide_1.png"),
            Err(StoreError::NotFound(_))
        ));
        assert_eq!(report.to_string(), "1 removed, 0 kept, 1 failed");
    }

    #[test]
    fn sweep_skips_namespace_removed_concurrently() {
        let (_tmp, store) = store();
        store.save(&artifact_set("raced", &["slide_1.png"])).unwrap();

        // Another sweep wins the race between listing and removal
        let report = store
            .sweep_with(Duration::ZERO, |id| {
                fs::remove_dir_all(store.root().join(id))?;
                store.remove_namespace(id)
            })
            .unwrap();

        assert!(report.removed.is_empty());
        assert!(report.failed.is_empty());
        assert_eq!(
            store.remove_namespace("raced").unwrap(),
            Removal::AlreadyGone
        );
    }

    #[test]
    fn sweep_report_display() {
        let report = SweepReport {
            removed: vec!["a".into(), "b".into()],
            failed: vec![],
            kept: 3,
        };
        assert_eq!(report.to_string(), "2 removed, 3 kept");
        let report = SweepReport {
            failed: vec!["c".into()],
            ..report
        };
        assert_eq!(report.to_string(), "2 removed, 3 kept, 1 failed");
    }

    // =========================================================================
    // helpers
    // =========================================================================

    #[test]
    fn content_types() {
        assert_eq!(content_type("slide_1.png"), "image/png");
        assert_eq!(content_type("x.JPG"), "image/jpeg");
        assert_eq!(content_type("x.jpeg"), "image/jpeg");
        assert_eq!(content_type("x.gif"), "image/gif");
        assert_eq!(content_type("x.webp"), "image/webp");
        assert_eq!(content_type("x.bin"), "application/octet-stream");
        assert_eq!(content_type("noext"), "application/octet-stream");
    }

    #[test]
    fn carousel_ids_are_valid_and_unique() {
        let a = new_carousel_id();
        let b = new_carousel_id();
        assert_eq!(a.len(), 32);
        assert_ne!(a, b);
        assert!(check_id(&a).is_ok());
    }

    #[test]
    fn id_and_filename_shapes() {
        assert!(check_id("abc-DEF_123").is_ok());
        assert!(check_id(&"a".repeat(64)).is_ok());
        assert!(check_id(&"a".repeat(65)).is_err());
        assert!(check_filename("slide_1.png").is_ok());
        assert!(check_filename("a.b.png").is_err());
        assert!(check_filename(".png").is_err());
        assert!(check_filename(&format!("{}.png", "a".repeat(130))).is_err());
    }

    #[test]
    fn slide_numbers() {
        assert_eq!(slide_number("slide_12.png"), Some(12));
        assert_eq!(slide_number("cover.png"), None);
    }
}
