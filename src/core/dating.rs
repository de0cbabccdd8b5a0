//! Best-effort capture date for a media file.
//!
//! Sources are tried in order: EXIF (images only), date-like filename
//! patterns, then the older of the filesystem created/modified times.

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;
use std::time::SystemTime;

use super::exif;

static FILENAME_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"IMG[-_]?(\d{4})(\d{2})(\d{2})",
        r"VID[-_]?(\d{4})(\d{2})(\d{2})",
        r"SAVE[-_]?(\d{4})(\d{2})(\d{2})",
        r"Screenshot[-_]?(\d{4})[-_](\d{2})[-_](\d{2})",
        r"(\d{4})(\d{2})(\d{2})",
    ]
    .iter()
    .filter_map(|pattern| Regex::new(pattern).ok())
    .collect()
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DateSource {
    Exif,
    Filename,
    Filesystem,
    Unknown,
}

impl DateSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            DateSource::Exif => "EXIF",
            DateSource::Filename => "FILENAME",
            DateSource::Filesystem => "FILESYSTEM",
            DateSource::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for DateSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BestDate {
    pub date: Option<NaiveDateTime>,
    pub source: DateSource,
}

impl BestDate {
    pub fn unknown() -> Self {
        Self {
            date: None,
            source: DateSource::Unknown,
        }
    }
}

pub fn best_date(path: &Path, is_image: bool) -> BestDate {
    if is_image {
        if let Some(date) = exif::capture_date(path) {
            return BestDate {
                date: Some(date),
                source: DateSource::Exif,
            };
        }
    }

    let from_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .and_then(date_from_filename);
    if let Some(date) = from_name {
        return BestDate {
            date: Some(date),
            source: DateSource::Filename,
        };
    }

    match filesystem_date(path) {
        Some(date) => BestDate {
            date: Some(date),
            source: DateSource::Filesystem,
        },
        None => BestDate::unknown(),
    }
}

/// First pattern whose digits form a real calendar date, at midnight.
pub fn date_from_filename(filename: &str) -> Option<NaiveDateTime> {
    FILENAME_PATTERNS.iter().find_map(|pattern| {
        let caps = pattern.captures(filename)?;
        let year = caps.get(1)?.as_str().parse().ok()?;
        let month = caps.get(2)?.as_str().parse().ok()?;
        let day = caps.get(3)?.as_str().parse().ok()?;
        NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(0, 0, 0)
    })
}

/// Older of created/modified, in local time. Platforms without a birth
/// time fall back to the modified time alone.
fn filesystem_date(path: &Path) -> Option<NaiveDateTime> {
    let metadata = fs::metadata(path).ok()?;
    let oldest: SystemTime = [metadata.created().ok(), metadata.modified().ok()]
        .into_iter()
        .flatten()
        .min()?;
    Some(DateTime::<Local>::from(oldest).naive_local())
}
