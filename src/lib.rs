//! Photo library organizer: exact and visual duplicate detection, duplicate
//! cleanup and review, and date-based sorting.

pub mod config;
pub mod core;

pub use config::{AnalysisConfig, ConfigError};
pub use core::analysis::{Analysis, AnalysisError, AnalysisSummary};
pub use core::duplicate::{DuplicateDetector, DuplicateGroup, DuplicateType};
pub use core::hash::{ContentDigest, DigestAlgorithm, HashService};
pub use core::index::IndexStrategy;
pub use core::perceptual::{PerceptualService, PerceptualSignature};
pub use core::report::ReportRow;
pub use core::scanner::{MediaFile, ScannerService};
