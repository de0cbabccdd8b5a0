use chrono::NaiveDateTime;
use std::collections::HashSet;
use std::ffi::OsStr;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

use super::dating::{self, DateSource};
use super::history::{HistoryAction, HistoryError, HistoryLog, HistoryRecord, MoveEntry};
use crate::config::{IMAGE_EXTENSIONS, VIDEO_EXTENSIONS};

pub const DEFAULT_OUTPUT_DIR: &str = "Sorted_Images_Videos";
const UNKNOWN_FOLDER: &str = "Unknown";

#[derive(Debug, Error)]
pub enum OrganizeError {
    #[error("Invalid source directory: {path}")]
    InvalidSource { path: String },

    #[error("File has no name: {path}")]
    NoFileName { path: String },

    #[error("Failed to move {from} → {to}: {source}")]
    Move {
        from: String,
        to: String,
        #[source]
        source: io::Error,
    },

    #[error("IO error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("History error: {0}")]
    History(#[from] HistoryError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    pub fn of(path: &Path) -> Option<MediaKind> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
            Some(MediaKind::Image)
        } else if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
            Some(MediaKind::Video)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveOutcome {
    /// Moved, or would be moved in dry-run mode
    Moved { to: PathBuf, source: DateSource },
    AlreadySorted,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SortSummary {
    pub images: usize,
    pub videos: usize,
    pub moves: Vec<MoveEntry>,
    pub already_sorted: usize,
    pub failures: usize,
}

/// `<base>/<YYYY>/<MM>`, or `<base>/Unknown` without a date.
pub fn dated_folder(base: &Path, date: Option<NaiveDateTime>) -> PathBuf {
    match date {
        Some(date) => base
            .join(date.format("%Y").to_string())
            .join(date.format("%m").to_string()),
        None => base.join(UNKNOWN_FOLDER),
    }
}

/// `folder/name`, or the first free `folder/stem_N.ext` for N = 1, 2, …
/// A path is free when it is neither on disk nor in `claimed`, the set of
/// destinations already handed out during this run (dry runs included).
pub fn unique_destination(folder: &Path, file_name: &OsStr, claimed: &HashSet<PathBuf>) -> PathBuf {
    let is_free = |path: &Path| !path.exists() && !claimed.contains(path);
    let candidate = folder.join(file_name);
    if is_free(candidate.as_path()) {
        return candidate;
    }

    let name = Path::new(file_name);
    let stem = name
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let ext = name
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    (1..)
        .map(|counter| folder.join(format!("{}_{}{}", stem, counter, ext)))
        .find(|path| is_free(path.as_path()))
        .unwrap_or(candidate)
}

/// Rename, falling back to copy + remove when the rename crosses devices.
pub fn move_file(from: &Path, to: &Path) -> io::Result<()> {
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(e) if is_cross_device_error(&e) => {
            fs::copy(from, to)?;
            if let Err(e) = fs::remove_file(from) {
                let _ = fs::remove_file(to);
                return Err(e);
            }
            Ok(())
        }
        Err(e) => Err(e),
    }
}

fn is_cross_device_error(err: &io::Error) -> bool {
    matches!(err.raw_os_error(), Some(18) | Some(17))
}

/// Moves media into a `<base>/<YYYY>/<MM>` hierarchy by best date.
pub struct Organizer {
    base: PathBuf,
    dry_run: bool,
    claimed: HashSet<PathBuf>,
}

impl Organizer {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self {
            base: base.into(),
            dry_run: false,
            claimed: HashSet::new(),
        }
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// True when `path` already lives under the base folder.
    pub fn contains(&self, path: &Path) -> bool {
        match (fs::canonicalize(&self.base), fs::canonicalize(path)) {
            (Ok(base), Ok(path)) => path.starts_with(base),
            _ => false,
        }
    }

    pub fn move_to_dated_folder(&mut self, path: &Path, is_image: bool) -> Result<MoveOutcome, OrganizeError> {
        if self.contains(path) {
            log::info!(
                "Skipping {}; already inside {}",
                path.display(),
                self.base.display()
            );
            return Ok(MoveOutcome::AlreadySorted);
        }

        let file_name = path.file_name().ok_or_else(|| OrganizeError::NoFileName {
            path: path.to_string_lossy().to_string(),
        })?;
        let best = dating::best_date(path, is_image);
        let folder = dated_folder(&self.base, best.date);
        let to = unique_destination(&folder, file_name, &self.claimed);
        self.claimed.insert(to.clone());

        if self.dry_run {
            log::info!("[dry-run] {} → {} ({})", path.display(), to.display(), best.source);
            return Ok(MoveOutcome::Moved {
                to,
                source: best.source,
            });
        }

        fs::create_dir_all(&folder).map_err(|source| OrganizeError::Io {
            path: folder.to_string_lossy().to_string(),
            source,
        })?;
        move_file(path, &to).map_err(|source| OrganizeError::Move {
            from: path.to_string_lossy().to_string(),
            to: to.to_string_lossy().to_string(),
            source,
        })?;
        log::info!("Moved {} → {} ({})", path.display(), to.display(), best.source);

        Ok(MoveOutcome::Moved {
            to,
            source: best.source,
        })
    }

    /// Move every image and video under `source` into date folders. The
    /// base folder's own subtree is never walked. Per-file failures are
    /// logged and counted.
    pub fn sort_all_media(
        &mut self,
        source: &Path,
        history: Option<&HistoryLog>,
    ) -> Result<SortSummary, OrganizeError> {
        if !source.is_dir() {
            return Err(OrganizeError::InvalidSource {
                path: source.to_string_lossy().to_string(),
            });
        }
        let base = fs::canonicalize(&self.base).ok();

        let media: Vec<(PathBuf, MediaKind)> = WalkDir::new(source)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| match (&base, fs::canonicalize(entry.path())) {
                (Some(base), Ok(path)) => !path.starts_with(base),
                _ => true,
            })
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    log::warn!("Skipping unreadable entry: {}", e);
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file())
            .filter_map(|entry| {
                MediaKind::of(entry.path()).map(|kind| (entry.into_path(), kind))
            })
            .collect();

        let mut summary = SortSummary::default();
        for (path, kind) in media {
            match kind {
                MediaKind::Image => summary.images += 1,
                MediaKind::Video => summary.videos += 1,
            }
            match self.move_to_dated_folder(&path, kind == MediaKind::Image) {
                Ok(MoveOutcome::Moved { to, .. }) => summary.moves.push(MoveEntry { from: path, to }),
                Ok(MoveOutcome::AlreadySorted) => summary.already_sorted += 1,
                Err(e) => {
                    log::warn!("{}", e);
                    summary.failures += 1;
                }
            }
        }

        if let Some(history) = history {
            if !self.dry_run && !summary.moves.is_empty() {
                let mut record = HistoryRecord::new(HistoryAction::Sort);
                record.moves = summary.moves.clone();
                history.append(&record)?;
            }
        }

        Ok(summary)
    }
}
