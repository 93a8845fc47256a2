//! Discovery of region files inside a world folder.

use std::path::{Path, PathBuf};

use super::RegionPos;

/// List the region files of a world, sorted by file name.
///
/// A file qualifies when it sits directly in `<world>/region`, is not empty
/// and is named `r.<x>.<z>.<ext>`. A missing world or region directory yields
/// an empty list rather than an error.
pub fn find_region_files(world: &Path) -> Vec<PathBuf> {
    let region_dir = world.join("region");
    if !world.is_dir() || !region_dir.is_dir() {
        return Vec::new();
    }

    let entries = match std::fs::read_dir(&region_dir) {
        Ok(entries) => entries,
        Err(e) => {
            log::warn!("Cannot read {}: {}", region_dir.display(), e);
            return Vec::new();
        }
    };

    let mut files = Vec::new();
    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                log::warn!("Skipping unreadable entry in {}: {}", region_dir.display(), e);
                continue;
            }
        };

        let name = entry.file_name();
        if RegionPos::from_filename(&name.to_string_lossy()).is_none() {
            continue;
        }
        match entry.metadata() {
            Ok(meta) if meta.is_file() && meta.len() > 0 => files.push(entry.path()),
            Ok(_) => log::debug!("Skipping empty region file {}", entry.path().display()),
            Err(e) => log::warn!("Skipping {}: {}", entry.path().display(), e),
        }
    }

    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    files
}
