//! Acting on a duplicate report: removing exact copies, and applying the
//! decisions taken while reviewing visual groups.

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::dating::{self, BestDate};
use super::duplicate::DuplicateType;
use super::history::{HistoryAction, HistoryError, HistoryLog, HistoryRecord, MoveEntry};
use super::organize::{self, MoveOutcome, Organizer};
use super::quality;
use super::report::{self, ReportGroup, ReportRow};

pub const DEFAULT_TRASH_DIR: &str = "duplicates";

#[derive(Debug, Error)]
pub enum CleanupError {
    #[error("Failed to prepare directory {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("Selection index {index} out of range for a group of {len}")]
    InvalidSelection { index: usize, len: usize },

    #[error("History error: {0}")]
    History(#[from] HistoryError),
}

/// What happened (or, in dry-run mode, would happen) to one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileAction {
    Kept(PathBuf),
    AlreadySorted(PathBuf),
    Deleted(PathBuf),
    /// Sent to the operating system's trash
    Trashed(PathBuf),
    Moved { from: PathBuf, to: PathBuf },
    Missing(PathBuf),
    /// Left where it was because an earlier step for its group failed
    Skipped(PathBuf),
    Failed { path: PathBuf, error: String },
}

/// What happens to a file that is not kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposal {
    Delete,
    MoveTo(PathBuf),
    SystemTrash,
}

#[derive(Debug, Clone)]
pub struct CleanOptions {
    pub disposal: Disposal,
    pub dry_run: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupOutcome {
    pub group_id: String,
    pub actions: Vec<FileAction>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CleanSummary {
    pub groups: Vec<GroupOutcome>,
    pub removed: usize,
    pub missing: usize,
    pub failures: usize,
}

/// Keep the first listed file of every exact group that still exists and
/// delete (or move away) the rest. Files that have vanished since the scan
/// are reported and skipped; a group with nothing left is left alone.
pub fn clean_exact_duplicates(
    rows: &[ReportRow],
    options: &CleanOptions,
    history: Option<&HistoryLog>,
) -> Result<CleanSummary, CleanupError> {
    if let Disposal::MoveTo(dir) = &options.disposal {
        if !options.dry_run {
            create_dir(dir)?;
        }
    }

    let mut claimed = HashSet::new();
    let mut summary = CleanSummary::default();
    for group in report::groups_of(rows, DuplicateType::ExactDuplicate) {
        let mut actions = Vec::with_capacity(group.files.len());
        let mut record = HistoryRecord::new(HistoryAction::CleanExact);
        let mut kept = false;

        for file in &group.files {
            if !file.exists() {
                log::warn!("File not found: {}", file.display());
                summary.missing += 1;
                actions.push(FileAction::Missing(file.clone()));
                continue;
            }
            if !kept {
                kept = true;
                record.retained.push(file.clone());
                actions.push(FileAction::Kept(file.clone()));
                continue;
            }

            let action = dispose(file, &options.disposal, options.dry_run, &mut claimed);
            record_action(&mut record, &action);
            match action {
                FileAction::Failed { .. } => summary.failures += 1,
                _ => summary.removed += 1,
            }
            actions.push(action);
        }

        if let Some(history) = history {
            if !options.dry_run && !record.is_empty() {
                history.append(&record)?;
            }
        }
        summary.groups.push(GroupOutcome {
            group_id: group.id,
            actions,
        });
    }

    Ok(summary)
}

fn dispose(path: &Path, disposal: &Disposal, dry_run: bool, claimed: &mut HashSet<PathBuf>) -> FileAction {
    match disposal {
        Disposal::Delete => delete(path, dry_run),
        Disposal::MoveTo(dir) => move_into(path, dir, dry_run, claimed),
        Disposal::SystemTrash => send_to_trash(path, dry_run),
    }
}

/// Trashed files count as deleted: the history log cannot bring them back.
fn record_action(record: &mut HistoryRecord, action: &FileAction) {
    match action {
        FileAction::Deleted(path) | FileAction::Trashed(path) => record.deleted.push(path.clone()),
        FileAction::Moved { from, to } => record.moves.push(MoveEntry {
            from: from.clone(),
            to: to.clone(),
        }),
        _ => {}
    }
}

fn delete(path: &Path, dry_run: bool) -> FileAction {
    if dry_run {
        return FileAction::Deleted(path.to_path_buf());
    }
    match fs::remove_file(path) {
        Ok(()) => {
            log::info!("Deleted {}", path.display());
            FileAction::Deleted(path.to_path_buf())
        }
        Err(e) => {
            log::warn!("Failed to delete {}: {}", path.display(), e);
            FileAction::Failed {
                path: path.to_path_buf(),
                error: e.to_string(),
            }
        }
    }
}

fn send_to_trash(path: &Path, dry_run: bool) -> FileAction {
    if dry_run {
        return FileAction::Trashed(path.to_path_buf());
    }
    match trash::delete(path) {
        Ok(()) => {
            log::info!("Trashed {}", path.display());
            FileAction::Trashed(path.to_path_buf())
        }
        Err(e) => {
            log::warn!("Failed to trash {}: {}", path.display(), e);
            FileAction::Failed {
                path: path.to_path_buf(),
                error: e.to_string(),
            }
        }
    }
}

fn move_into(path: &Path, dir: &Path, dry_run: bool, claimed: &mut HashSet<PathBuf>) -> FileAction {
    let Some(name) = path.file_name() else {
        return FileAction::Failed {
            path: path.to_path_buf(),
            error: "file has no name".to_string(),
        };
    };
    let to = organize::unique_destination(dir, name, claimed);
    claimed.insert(to.clone());
    if dry_run {
        return FileAction::Moved {
            from: path.to_path_buf(),
            to,
        };
    }
    match organize::move_file(path, &to) {
        Ok(()) => {
            log::info!("Moved {} → {}", path.display(), to.display());
            FileAction::Moved {
                from: path.to_path_buf(),
                to,
            }
        }
        Err(e) => {
            log::warn!("Failed to move {} → {}: {}", path.display(), to.display(), e);
            FileAction::Failed {
                path: path.to_path_buf(),
                error: e.to_string(),
            }
        }
    }
}

fn create_dir(dir: &Path) -> Result<(), CleanupError> {
    fs::create_dir_all(dir).map_err(|source| CleanupError::Io {
        path: dir.to_string_lossy().to_string(),
        source,
    })
}

/// Visual groups worth reviewing: members that still exist, in report
/// order, and at least two of them.
pub fn reviewable_groups(rows: &[ReportRow]) -> Vec<ReportGroup> {
    report::groups_of(rows, DuplicateType::VisualDuplicate)
        .into_iter()
        .filter_map(|mut group| {
            group.files.retain(|f| f.exists());
            (group.files.len() >= 2).then_some(group)
        })
        .collect()
}

/// What the reviewer sees for one member of a group.
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewCandidate {
    pub path: PathBuf,
    pub size: u64,
    pub dimensions: Option<(u32, u32)>,
    pub date: BestDate,
    pub sharpness: f64,
}

impl ReviewCandidate {
    pub fn inspect(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            size: fs::metadata(path).map(|m| m.len()).unwrap_or(0),
            dimensions: quality::dimensions(path),
            date: dating::best_date(path, true),
            sharpness: quality::sharpness(path),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReviewAction {
    KeepIndex(usize),
    KeepLargest,
    /// Keep every file
    Skip,
    DeleteAll,
    KeepSelected(Vec<usize>),
    DeleteSelected(Vec<usize>),
    Quit,
}

/// Partition of a group into files to keep and files to trash, in group
/// order.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReviewPlan {
    pub keep: Vec<PathBuf>,
    pub trash: Vec<PathBuf>,
}

impl ReviewAction {
    /// `Ok(None)` for `Quit`.
    pub fn plan(&self, candidates: &[ReviewCandidate]) -> Result<Option<ReviewPlan>, CleanupError> {
        let len = candidates.len();
        let check = |index: usize| {
            if index < len {
                Ok(index)
            } else {
                Err(CleanupError::InvalidSelection { index, len })
            }
        };

        let keep: Vec<bool> = match self {
            ReviewAction::Quit => return Ok(None),
            ReviewAction::Skip => vec![true; len],
            ReviewAction::DeleteAll => vec![false; len],
            ReviewAction::KeepIndex(index) => {
                let index = check(*index)?;
                (0..len).map(|i| i == index).collect()
            }
            ReviewAction::KeepLargest => {
                let largest = largest_index(candidates);
                (0..len).map(|i| Some(i) == largest).collect()
            }
            ReviewAction::KeepSelected(selected) => {
                for &index in selected {
                    check(index)?;
                }
                (0..len).map(|i| selected.contains(&i)).collect()
            }
            ReviewAction::DeleteSelected(selected) => {
                for &index in selected {
                    check(index)?;
                }
                (0..len).map(|i| !selected.contains(&i)).collect()
            }
        };

        let mut plan = ReviewPlan::default();
        for (candidate, keep) in candidates.iter().zip(keep) {
            if keep {
                plan.keep.push(candidate.path.clone());
            } else {
                plan.trash.push(candidate.path.clone());
            }
        }
        Ok(Some(plan))
    }
}

/// First candidate with the maximum size.
fn largest_index(candidates: &[ReviewCandidate]) -> Option<usize> {
    candidates
        .iter()
        .enumerate()
        .fold(None, |best: Option<(usize, u64)>, (i, c)| match best {
            Some((_, size)) if size >= c.size => best,
            _ => Some((i, c.size)),
        })
        .map(|(i, _)| i)
}

/// Kept files go into the date-folder hierarchy; discarded files go the
/// way of `discard`. When a kept file cannot be moved, its group's other
/// files stay where they are.
pub struct ReviewExecutor<'a> {
    organizer: Organizer,
    discard: Disposal,
    claimed: HashSet<PathBuf>,
    history: Option<&'a HistoryLog>,
}

impl<'a> ReviewExecutor<'a> {
    pub fn new(organizer: Organizer, discard: Disposal, history: Option<&'a HistoryLog>) -> Self {
        Self {
            organizer,
            discard,
            claimed: HashSet::new(),
            history,
        }
    }

    pub fn apply(&mut self, plan: &ReviewPlan) -> Result<Vec<FileAction>, CleanupError> {
        let dry_run = self.organizer.is_dry_run();
        let mut actions = Vec::with_capacity(plan.keep.len() + plan.trash.len());
        let mut record = HistoryRecord::new(HistoryAction::Review);
        let mut keep_failed = false;

        for path in &plan.keep {
            let action = match self.organizer.move_to_dated_folder(path, true) {
                Ok(MoveOutcome::Moved { to, .. }) => {
                    record.moves.push(MoveEntry {
                        from: path.clone(),
                        to: to.clone(),
                    });
                    record.retained.push(to.clone());
                    FileAction::Moved {
                        from: path.clone(),
                        to,
                    }
                }
                Ok(MoveOutcome::AlreadySorted) => {
                    record.retained.push(path.clone());
                    FileAction::AlreadySorted(path.clone())
                }
                Err(e) => {
                    log::warn!("{}", e);
                    keep_failed = true;
                    FileAction::Failed {
                        path: path.clone(),
                        error: e.to_string(),
                    }
                }
            };
            actions.push(action);
        }

        if keep_failed {
            log::warn!("Leaving {} discarded file(s) in place", plan.trash.len());
            actions.extend(plan.trash.iter().cloned().map(FileAction::Skipped));
        } else {
            if let Disposal::MoveTo(dir) = &self.discard {
                if !plan.trash.is_empty() && !dry_run {
                    create_dir(dir)?;
                }
            }
            for path in &plan.trash {
                let action = dispose(path, &self.discard, dry_run, &mut self.claimed);
                record_action(&mut record, &action);
                actions.push(action);
            }
        }

        if let Some(history) = self.history {
            if !dry_run && !record.is_empty() {
                history.append(&record)?;
            }
        }
        Ok(actions)
    }
}
