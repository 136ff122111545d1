//! Alias detection for hard links and followed symlinks.
//!
//! Two paths that resolve to the same `(device, inode)` pair are one file on
//! disk, not two copies. Unlinking a hard link frees nothing, and deleting the
//! target of a followed symlink leaves the link dangling. [`collapse_aliases`]
//! keeps one record per identity before size bucketing so aliases never end
//! up in the same duplicate group.
//!
//! # Platform Support
//!
//! - **Unix**: `(dev, ino)` from file metadata
//! - **Other**: no identity, every record is treated as distinct

use std::collections::HashMap;
use std::fs::Metadata;

use super::FileRecord;

/// On-disk identity of a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileIdentity {
    /// Device id
    pub dev: u64,
    /// Inode number
    pub ino: u64,
}

impl FileIdentity {
    /// Identity from metadata, `None` where the platform has no inode.
    #[cfg(unix)]
    #[must_use]
    pub fn from_metadata(metadata: &Metadata) -> Option<Self> {
        use std::os::unix::fs::MetadataExt;
        Some(Self {
            dev: metadata.dev(),
            ino: metadata.ino(),
        })
    }

    /// Identity from metadata, `None` where the platform has no inode.
    #[cfg(not(unix))]
    #[must_use]
    pub fn from_metadata(_metadata: &Metadata) -> Option<Self> {
        None
    }

    /// Whether aliases can be detected on this platform.
    #[must_use]
    pub const fn is_supported() -> bool {
        cfg!(unix)
    }
}

/// Keep one record per identity; return `(kept, aliases)`.
///
/// Among records sharing an identity the kept one is a real path rather than
/// a symlink, then the first path. Records without identity are always kept.
#[must_use]
pub fn collapse_aliases(files: Vec<FileRecord>) -> (Vec<FileRecord>, Vec<FileRecord>) {
    let mut kept: Vec<FileRecord> = Vec::with_capacity(files.len());
    let mut aliases = Vec::new();
    let mut seen: HashMap<FileIdentity, usize> = HashMap::new();

    for file in files {
        let Some(identity) = file.identity else {
            kept.push(file);
            continue;
        };

        match seen.get(&identity) {
            None => {
                seen.insert(identity, kept.len());
                kept.push(file);
            }
            Some(&idx) => {
                let current = &kept[idx];
                let preferred = (file.is_symlink, &file.path) < (current.is_symlink, &current.path);
                let alias = if preferred {
                    std::mem::replace(&mut kept[idx], file)
                } else {
                    file
                };
                log::debug!(
                    "Skipping alias {} of {}",
                    alias.path.display(),
                    kept[idx].path.display()
                );
                aliases.push(alias);
            }
        }
    }

    (kept, aliases)
}
