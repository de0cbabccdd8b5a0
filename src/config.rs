use crate::core::hash::DigestAlgorithm;
use crate::core::index::IndexStrategy;
use std::path::PathBuf;
use thiserror::Error;

pub const DEFAULT_THRESHOLD: u32 = 5;
pub const MAX_THRESHOLD: u32 = 64;
pub const DEFAULT_CHUNK_SIZE: usize = 8192;
pub const DEFAULT_MAX_DECODE_BYTES: u64 = 512 * 1024 * 1024;
pub const DEFAULT_REPORT: &str = "duplicate_report.csv";

pub const IMAGE_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "heic", "bmp", "tiff", "tif", "webp", "gif",
];
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "avi", "mkv", "3gp", "wmv", "mts"];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Similarity threshold {value} is out of range (0..={max})")]
    ThresholdOutOfRange { value: u32, max: u32 },

    #[error("Hash chunk size must be greater than zero")]
    ZeroChunkSize,

    #[error("Worker count must be greater than zero")]
    ZeroJobs,

    #[error("Decode allocation limit must be greater than zero")]
    ZeroDecodeLimit,

    #[error("No file extensions configured")]
    NoExtensions,

    #[error("Root path does not exist: {path}")]
    MissingRoot { path: String },

    #[error("Root path is not a directory: {path}")]
    RootNotDirectory { path: String },
}

/// Settings for one duplicate analysis run.
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    pub root: PathBuf,
    pub report_path: PathBuf,
    /// Maximum Hamming distance for two signatures to be linked.
    pub threshold: u32,
    pub chunk_size: usize,
    pub digest: DigestAlgorithm,
    pub index: IndexStrategy,
    /// Only the first file of each exact group takes part in the visual pass.
    pub collapse_exact: bool,
    /// Dedicated worker pool size; `None` uses the global rayon pool.
    pub jobs: Option<usize>,
    pub max_decode_bytes: u64,
    pub extensions: Vec<String>,
}

impl AnalysisConfig {
    pub fn new(root: impl Into<PathBuf>, report_path: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            report_path: report_path.into(),
            threshold: DEFAULT_THRESHOLD,
            chunk_size: DEFAULT_CHUNK_SIZE,
            digest: DigestAlgorithm::default(),
            index: IndexStrategy::default(),
            collapse_exact: true,
            jobs: None,
            max_decode_bytes: DEFAULT_MAX_DECODE_BYTES,
            extensions: IMAGE_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
        }
    }

    pub fn with_threshold(mut self, threshold: u32) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.extensions = extensions
            .into_iter()
            .map(|ext| normalize_extension(ext.as_ref()))
            .filter(|ext| !ext.is_empty())
            .collect();
        self
    }

    /// Reject settings that would make the run meaningless. Called before
    /// any file is touched.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.threshold > MAX_THRESHOLD {
            return Err(ConfigError::ThresholdOutOfRange {
                value: self.threshold,
                max: MAX_THRESHOLD,
            });
        }
        if self.chunk_size == 0 {
            return Err(ConfigError::ZeroChunkSize);
        }
        if self.jobs == Some(0) {
            return Err(ConfigError::ZeroJobs);
        }
        if self.max_decode_bytes == 0 {
            return Err(ConfigError::ZeroDecodeLimit);
        }
        if self.extensions.is_empty() {
            return Err(ConfigError::NoExtensions);
        }
        if !self.root.exists() {
            return Err(ConfigError::MissingRoot {
                path: self.root.to_string_lossy().to_string(),
            });
        }
        if !self.root.is_dir() {
            return Err(ConfigError::RootNotDirectory {
                path: self.root.to_string_lossy().to_string(),
            });
        }
        Ok(())
    }
}

/// `".JPG"` and `"jpg"` both become `"jpg"`.
pub fn normalize_extension(ext: &str) -> String {
    ext.trim().trim_start_matches('.').to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_are_valid() {
        let temp_dir = TempDir::new().unwrap();
        let config = AnalysisConfig::new(temp_dir.path(), "report.csv");

        assert_eq!(config.threshold, 5);
        assert_eq!(config.chunk_size, 8192);
        assert!(config.collapse_exact);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_threshold_range() {
        let temp_dir = TempDir::new().unwrap();

        let config = AnalysisConfig::new(temp_dir.path(), "report.csv").with_threshold(64);
        assert!(config.validate().is_ok());

        let config = AnalysisConfig::new(temp_dir.path(), "report.csv").with_threshold(65);
        assert_eq!(
            config.validate(),
            Err(ConfigError::ThresholdOutOfRange { value: 65, max: 64 })
        );
    }

    #[test]
    fn test_zero_chunk_size_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let config = AnalysisConfig::new(temp_dir.path(), "report.csv").with_chunk_size(0);

        assert_eq!(config.validate(), Err(ConfigError::ZeroChunkSize));
    }

    #[test]
    fn test_missing_root_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("nope");
        let config = AnalysisConfig::new(&missing, "report.csv");

        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingRoot { .. })
        ));
    }

    #[test]
    fn test_file_root_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("file.jpg");
        std::fs::write(&file, b"x").unwrap();
        let config = AnalysisConfig::new(&file, "report.csv");

        assert!(matches!(
            config.validate(),
            Err(ConfigError::RootNotDirectory { .. })
        ));
    }

    #[test]
    fn test_extension_normalization() {
        let temp_dir = TempDir::new().unwrap();
        let config =
            AnalysisConfig::new(temp_dir.path(), "report.csv").with_extensions([".JPG", "png", " "]);

        assert_eq!(config.extensions, vec!["jpg".to_string(), "png".to_string()]);

        let config = AnalysisConfig::new(temp_dir.path(), "report.csv")
            .with_extensions(Vec::<String>::new());
        assert_eq!(config.validate(), Err(ConfigError::NoExtensions));
    }
}
