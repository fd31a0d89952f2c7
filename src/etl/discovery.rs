use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Recursively find every file under `root` with the given extension
/// (case-insensitive), sorted by path. Symlinked files are included;
/// symlinked directories are not descended into.
pub fn discover_files(root: &Path, extension: &str) -> Vec<PathBuf> {
    let extension = extension.trim_start_matches('.').to_lowercase();
    let mut files = Vec::new();

    for entry in WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();

        if path.is_file() {
            if let Some(ext) = path.extension() {
                if ext.to_string_lossy().to_lowercase() == extension {
                    files.push(path.to_path_buf());
                }
            }
        }
    }

    // Sort by path for consistent ordering
    files.sort();

    files
}
