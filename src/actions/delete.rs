//! Per-file delete and quarantine primitives.
//!
//! # Overview
//!
//! Each function here touches exactly one file and either fully succeeds or
//! leaves the source in place:
//! - Permanent deletion
//! - Move into a quarantine directory, never overwriting
//! - TOCTOU verification against the scanned size and mtime
//!
//! # Example
//!
//! ```no_run
//! use dupeguard::actions::delete::move_to_quarantine;
//! use std::path::Path;
//!
//! let moved_to = move_to_quarantine(
//!     Path::new("/data/photos/dup.jpg"),
//!     Path::new("/data"),
//!     Path::new("/quarantine"),
//! );
//! match moved_to {
//!     Ok(dest) => println!("Quarantined at {}", dest.display()),
//!     Err(e) => eprintln!("Failed: {}", e),
//! }
//! ```

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use thiserror::Error;

use crate::scanner::FileRecord;

/// Error for a single delete or move.
#[derive(Debug, Error)]
pub enum ActionError {
    /// File was not found (may have been deleted or moved).
    #[error("file not found: {0}")]
    NotFound(PathBuf),

    /// Permission denied when attempting the action.
    #[error("permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// File was modified since scan (TOCTOU protection).
    #[error("file modified since scan: {0}")]
    Modified(PathBuf),

    /// A file already exists at the quarantine destination.
    #[error("destination already exists: {0}")]
    DestinationExists(PathBuf),

    /// The file does not lie under the scanned root.
    #[error("path is outside the scanned root: {0}")]
    OutsideRoot(PathBuf),

    /// The group's keeper no longer matches its scan snapshot.
    #[error("keeper missing or changed since scan: {0}")]
    KeeperChanged(PathBuf),

    /// General I/O error.
    #[error("I/O error for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ActionError {
    /// Get the path associated with this error.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::NotFound(p)
            | Self::PermissionDenied(p)
            | Self::Modified(p)
            | Self::DestinationExists(p)
            | Self::OutsideRoot(p)
            | Self::KeeperChanged(p)
            | Self::Io { path: p, .. } => p,
        }
    }

    fn from_io(path: &Path, e: io::Error) -> Self {
        match e.kind() {
            io::ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            io::ErrorKind::AlreadyExists => Self::DestinationExists(path.to_path_buf()),
            _ => Self::Io {
                path: path.to_path_buf(),
                source: e,
            },
        }
    }
}

/// File metadata snapshot for TOCTOU verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSnapshot {
    /// Path to the file.
    pub path: PathBuf,
    /// File size in bytes.
    pub size: u64,
    /// Last modification time.
    pub mtime: Option<SystemTime>,
    /// Stat through a symlink instead of the link itself.
    pub follow_links: bool,
}

impl FileSnapshot {
    /// Snapshot taken by the scanner.
    #[must_use]
    pub fn from_record(record: &FileRecord) -> Self {
        Self {
            path: record.path.clone(),
            size: record.size,
            mtime: Some(record.modified),
            follow_links: record.is_symlink,
        }
    }

    /// Create a snapshot of a file's current state.
    ///
    /// # Errors
    ///
    /// Returns error if file doesn't exist or can't be accessed.
    pub fn capture(path: &Path) -> Result<Self, ActionError> {
        Self::stat(path, false)
    }

    fn stat(path: &Path, follow_links: bool) -> Result<Self, ActionError> {
        let metadata = if follow_links {
            fs::metadata(path)
        } else {
            fs::symlink_metadata(path)
        }
        .map_err(|e| ActionError::from_io(path, e))?;

        Ok(Self {
            path: path.to_path_buf(),
            size: metadata.len(),
            mtime: metadata.modified().ok(),
            follow_links,
        })
    }

    /// Verify that the file still matches this snapshot.
    ///
    /// # Errors
    ///
    /// Returns error if file was modified, deleted, or can't be accessed.
    pub fn verify(&self) -> Result<(), ActionError> {
        let current = Self::stat(&self.path, self.follow_links)?;

        if let (Some(orig), Some(curr)) = (self.mtime, current.mtime) {
            if orig != curr {
                log::warn!(
                    "File modified since scan: {} (mtime changed)",
                    self.path.display()
                );
                return Err(ActionError::Modified(self.path.clone()));
            }
        }

        if self.size != current.size {
            log::warn!(
                "File modified since scan: {} (size changed from {} to {})",
                self.path.display(),
                self.size,
                current.size
            );
            return Err(ActionError::Modified(self.path.clone()));
        }

        Ok(())
    }
}

/// Permanently delete a single file.
///
/// # Errors
///
/// - `NotFound` if the file doesn't exist
/// - `PermissionDenied` if deletion is not allowed
/// - `Io` for any other failure
pub fn delete_file(path: &Path) -> Result<(), ActionError> {
    fs::remove_file(path).map_err(|e| {
        log::error!("Delete failed for {}: {}", path.display(), e);
        ActionError::from_io(path, e)
    })?;

    log::info!("Deleted: {}", path.display());
    Ok(())
}

/// Where `path` lands inside the quarantine directory.
///
/// The destination mirrors the file's location relative to `root`, so the
/// same plan always maps to the same destination.
///
/// # Errors
///
/// Returns `OutsideRoot` if `path` is not under `root`.
pub fn quarantine_destination(
    path: &Path,
    root: &Path,
    quarantine: &Path,
) -> Result<PathBuf, ActionError> {
    let relative = path
        .strip_prefix(root)
        .map_err(|_| ActionError::OutsideRoot(path.to_path_buf()))?;
    if relative.as_os_str().is_empty() {
        return Err(ActionError::OutsideRoot(path.to_path_buf()));
    }
    Ok(quarantine.join(relative))
}

/// Move a file into the quarantine directory without overwriting.
///
/// Parent directories are created as needed. When the quarantine directory
/// is on another filesystem the file is copied to a freshly created
/// destination and the source removed afterwards.
///
/// # Errors
///
/// - `DestinationExists` if a file is already present at the destination
/// - `OutsideRoot` if `path` is not under `root`
/// - `NotFound`, `PermissionDenied`, `Io` for filesystem failures
///
/// On error the source file is left in place.
pub fn move_to_quarantine(
    path: &Path,
    root: &Path,
    quarantine: &Path,
) -> Result<PathBuf, ActionError> {
    let dest = quarantine_destination(path, root, quarantine)?;

    if fs::symlink_metadata(&dest).is_ok() {
        return Err(ActionError::DestinationExists(dest));
    }
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).map_err(|e| ActionError::from_io(parent, e))?;
    }

    // A hard link never replaces an existing entry, which makes the
    // no-overwrite check atomic on filesystems that support it.
    match fs::hard_link(path, &dest) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            return Err(ActionError::DestinationExists(dest));
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound && fs::symlink_metadata(path).is_err() => {
            return Err(ActionError::NotFound(path.to_path_buf()));
        }
        Err(e) => {
            log::debug!(
                "Hard link to {} unavailable ({e}), copying instead",
                dest.display()
            );
            copy_no_clobber(path, &dest)?;
        }
    }

    if let Err(e) = fs::remove_file(path) {
        // Undo the new entry so the file is not left in two places.
        if let Err(cleanup) = fs::remove_file(&dest) {
            log::warn!(
                "Failed to remove {} after aborted move: {cleanup}",
                dest.display()
            );
        }
        return Err(ActionError::from_io(path, e));
    }

    log::info!("Moved: {} -> {}", path.display(), dest.display());
    Ok(dest)
}

fn copy_no_clobber(src: &Path, dest: &Path) -> Result<(), ActionError> {
    let mut reader = File::open(src).map_err(|e| ActionError::from_io(src, e))?;
    let mut writer = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(dest)
        .map_err(|e| ActionError::from_io(dest, e))?;

    if let Err(e) = io::copy(&mut reader, &mut writer).and_then(|_| writer.sync_all()) {
        drop(writer);
        let _ = fs::remove_file(dest);
        return Err(ActionError::from_io(dest, e));
    }

    if let Ok(modified) = fs::metadata(src).and_then(|m| m.modified()) {
        let _ = writer.set_modified(modified);
    }
    Ok(())
}
