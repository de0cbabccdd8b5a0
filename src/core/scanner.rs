use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use thiserror::Error;
use walkdir::WalkDir;

use crate::config::{IMAGE_EXTENSIONS, normalize_extension};

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Invalid path: {path}")]
    InvalidPath { path: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A file found under the scan root. `id` is its position in scan order and
/// is what the grouping engine works with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaFile {
    pub id: usize,
    pub path: PathBuf,
    pub size: u64,
    pub modified: SystemTime,
}

pub struct ScannerService {
    supported_formats: HashSet<String>,
}

impl ScannerService {
    pub fn new() -> Self {
        Self::with_extensions(IMAGE_EXTENSIONS)
    }

    pub fn with_extensions<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            supported_formats: extensions
                .into_iter()
                .map(|ext| normalize_extension(ext.as_ref()))
                .filter(|ext| !ext.is_empty())
                .collect(),
        }
    }

    pub fn is_supported_format(&self, file_path: &Path) -> bool {
        if let Some(extension) = file_path.extension() {
            let ext = extension.to_string_lossy().to_lowercase();
            self.supported_formats.contains(&ext)
        } else {
            false
        }
    }

    /// Recursively collect supported files under `root`.
    ///
    /// Paths are absolute and sorted lexicographically, so "first file" means
    /// the same thing on every run regardless of filesystem traversal order.
    /// Entries that vanish or cannot be inspected mid-walk are skipped.
    pub fn scan(&self, root: &Path) -> Result<Vec<MediaFile>, ScanError> {
        if !root.is_dir() {
            return Err(ScanError::InvalidPath {
                path: root.to_string_lossy().to_string(),
            });
        }
        let root = fs::canonicalize(root)?;

        let mut discovered = Vec::new();
        for entry in WalkDir::new(&root).follow_links(false) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    log::warn!("Skipping unreadable entry: {}", e);
                    continue;
                }
            };

            if !entry.file_type().is_file() || !self.is_supported_format(entry.path()) {
                continue;
            }
            // the report stores UTF-8 paths; anything else could never be matched back
            if entry.path().to_str().is_none() {
                log::warn!("Skipping non-UTF-8 path: {}", entry.path().display());
                continue;
            }

            match entry.metadata() {
                Ok(metadata) => {
                    let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
                    discovered.push((entry.into_path(), metadata.len(), modified));
                }
                Err(e) => {
                    log::warn!("Skipping {}: {}", entry.path().display(), e);
                }
            }
        }

        discovered.sort_by(|a, b| a.0.cmp(&b.0));

        Ok(discovered
            .into_iter()
            .enumerate()
            .map(|(id, (path, size, modified))| MediaFile {
                id,
                path,
                size,
                modified,
            })
            .collect())
    }
}

impl Default for ScannerService {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_scan_empty_directory() {
        let temp_dir = TempDir::new().unwrap();
        let files = ScannerService::new().scan(temp_dir.path()).unwrap();
        assert!(files.is_empty());
    }

    #[test]
    fn test_scan_missing_root() {
        let temp_dir = TempDir::new().unwrap();
        let result = ScannerService::new().scan(&temp_dir.path().join("missing"));
        assert!(matches!(result, Err(ScanError::InvalidPath { .. })));
    }

    #[test]
    fn test_file_type_filtering() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("a.jpg"), b"a").unwrap();
        fs::write(temp_dir.path().join("b.PNG"), b"b").unwrap();
        fs::write(temp_dir.path().join("notes.txt"), b"c").unwrap();
        fs::write(temp_dir.path().join("noext"), b"d").unwrap();

        let files = ScannerService::new().scan(temp_dir.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|f| f.path.file_name().unwrap().to_string_lossy().to_string())
            .collect();

        assert_eq!(names, vec!["a.jpg", "b.PNG"]);
    }

    #[test]
    fn test_scan_order_is_lexicographic_and_recursive() {
        let temp_dir = TempDir::new().unwrap();
        let nested = temp_dir.path().join("b_dir").join("inner");
        fs::create_dir_all(&nested).unwrap();
        fs::write(temp_dir.path().join("c.jpg"), b"c").unwrap();
        fs::write(temp_dir.path().join("a.jpg"), b"a").unwrap();
        fs::write(nested.join("z.jpg"), b"z").unwrap();

        let files = ScannerService::new().scan(temp_dir.path()).unwrap();
        let root = fs::canonicalize(temp_dir.path()).unwrap();

        assert_eq!(files.len(), 3);
        assert_eq!(files[0].path, root.join("a.jpg"));
        assert_eq!(files[1].path, root.join("b_dir").join("inner").join("z.jpg"));
        assert_eq!(files[2].path, root.join("c.jpg"));
        for (i, file) in files.iter().enumerate() {
            assert_eq!(file.id, i);
            assert!(file.path.is_absolute());
            assert_eq!(file.size, 1);
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_names_are_skipped() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("good.jpg"), b"a").unwrap();
        fs::write(temp_dir.path().join(OsStr::from_bytes(b"bad\xff.jpg")), b"b").unwrap();

        let files = ScannerService::new().scan(temp_dir.path()).unwrap();

        assert_eq!(files.len(), 1);
        assert!(files[0].path.ends_with("good.jpg"));
    }

    #[test]
    fn test_supported_format_detection() {
        let scanner = ScannerService::with_extensions([".JPG", "heic"]);

        assert!(scanner.is_supported_format(Path::new("test.jpg")));
        assert!(scanner.is_supported_format(Path::new("test.JPG")));
        assert!(scanner.is_supported_format(Path::new("test.heic")));
        assert!(!scanner.is_supported_format(Path::new("test.png")));
        assert!(!scanner.is_supported_format(Path::new("test")));
    }
}
