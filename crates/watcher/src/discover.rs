//! Recursive discovery walk under a watch root

use std::path::{Path, PathBuf};
use tracing::warn;
use walkdir::WalkDir;

/// A path found by the discovery walk
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Discovered {
    Directory(PathBuf),
    File { path: PathBuf, size: u64 },
}

/// Walk `root` recursively, yielding directories and regular files
///
/// The root itself comes first. Symlinks are not followed; entries that
/// cannot be read are logged and skipped.
pub fn walk(root: &Path) -> impl Iterator<Item = Discovered> {
    WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_map(|entry| {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Skipping unreadable entry during discovery: {}", e);
                    return None;
                }
            };

            let file_type = entry.file_type();
            if file_type.is_dir() {
                Some(Discovered::Directory(entry.into_path()))
            } else if file_type.is_file() {
                // The file may vanish between readdir and stat
                let size = entry.metadata().ok()?.len();
                Some(Discovered::File {
                    path: entry.into_path(),
                    size,
                })
            } else {
                None
            }
        })
}
