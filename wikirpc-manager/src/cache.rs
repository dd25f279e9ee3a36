use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Handle on one wiki's cache directory. Storage format and eviction belong
/// to whoever writes into the directory; this type only measures and clears.
pub struct Cache {
    dir: PathBuf,
}

impl Cache {
    pub fn open(dir: impl Into<PathBuf>) -> io::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Cache { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Total size of all cached files, best effort: entries that vanish or
    /// cannot be read mid-walk are skipped.
    pub fn size_in_bytes(&self) -> u64 {
        dir_size(&self.dir)
    }

    /// Deletes everything inside the cache directory, keeping the directory
    /// itself. Saved preferences and credentials are not touched.
    pub fn clear(&self) {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(err) => {
                warn!(dir = %self.dir.display(), "failed to list cache: {err}");
                return;
            }
        };

        for entry in entries.flatten() {
            let path = entry.path();
            let result = if path.is_dir() {
                fs::remove_dir_all(&path)
            } else {
                fs::remove_file(&path)
            };
            if let Err(err) = result {
                warn!(path = %path.display(), "failed to remove cache entry: {err}");
            }
        }
    }
}

fn dir_size(dir: &Path) -> u64 {
    let Ok(entries) = fs::read_dir(dir) else {
        return 0;
    };

    entries
        .flatten()
        .map(|entry| {
            let path = entry.path();
            if path.is_dir() {
                dir_size(&path)
            } else {
                entry.metadata().map(|m| m.len()).unwrap_or(0)
            }
        })
        .sum()
}
