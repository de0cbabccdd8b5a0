//! Append-only JSON-lines log of file operations, used to undo moves.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::organize::move_file;

pub const DEFAULT_HISTORY_FILE: &str = ".history.jsonl";

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("History file error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to encode history record: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Invalid history index {index}; {len} record(s) available")]
    InvalidIndex { index: usize, len: usize },

    #[error("History record {index} has no moves to restore")]
    NotRestorable { index: usize },

    #[error("No history records with moves to restore")]
    NothingToRestore,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryAction {
    CleanExact,
    Review,
    Sort,
}

impl fmt::Display for HistoryAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            HistoryAction::CleanExact => "clean_exact",
            HistoryAction::Review => "review",
            HistoryAction::Sort => "sort",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveEntry {
    pub from: PathBuf,
    pub to: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub timestamp: String,
    pub action: HistoryAction,
    #[serde(default)]
    pub retained: Vec<PathBuf>,
    #[serde(default)]
    pub moves: Vec<MoveEntry>,
    #[serde(default)]
    pub deleted: Vec<PathBuf>,
}

impl HistoryRecord {
    pub fn new(action: HistoryAction) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
            action,
            retained: Vec::new(),
            moves: Vec::new(),
            deleted: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.moves.is_empty() && self.deleted.is_empty()
    }

    pub fn is_restorable(&self) -> bool {
        !self.moves.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreSelection {
    /// Most recent record that has moves
    Latest,
    /// Record at this position in `HistoryLog::load`
    Index(usize),
    All,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RestoreSummary {
    pub records: usize,
    pub restored: Vec<MoveEntry>,
    pub skipped: usize,
}

pub struct HistoryLog {
    path: PathBuf,
}

impl HistoryLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, record: &HistoryRecord) -> Result<(), HistoryError> {
        let line = serde_json::to_string(record)?;
        let mut out = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|source| self.io_error(source))?;
        writeln!(out, "{}", line).map_err(|source| self.io_error(source))
    }

    /// Well-formed records in file order. Malformed lines are skipped with a
    /// warning; a missing log is empty.
    pub fn load(&self) -> Result<Vec<HistoryRecord>, HistoryError> {
        Ok(self
            .read_lines()?
            .into_iter()
            .filter_map(|line| line.record)
            .collect())
    }

    /// Move files back to where a record found them. Moves whose current
    /// location has vanished, or whose original path is taken again, are
    /// skipped. Restored records leave the log; every other line stays.
    pub fn restore(&self, selection: RestoreSelection) -> Result<RestoreSummary, HistoryError> {
        let lines = self.read_lines()?;
        let records: Vec<(usize, &HistoryRecord)> = lines
            .iter()
            .enumerate()
            .filter_map(|(line_no, line)| line.record.as_ref().map(|r| (line_no, r)))
            .collect();

        let chosen: Vec<usize> = match selection {
            RestoreSelection::Latest => {
                let latest = records
                    .iter()
                    .rposition(|(_, r)| r.is_restorable())
                    .ok_or(HistoryError::NothingToRestore)?;
                vec![latest]
            }
            RestoreSelection::Index(index) => {
                let (_, record) = records.get(index).ok_or(HistoryError::InvalidIndex {
                    index,
                    len: records.len(),
                })?;
                if !record.is_restorable() {
                    return Err(HistoryError::NotRestorable { index });
                }
                vec![index]
            }
            RestoreSelection::All => {
                let all: Vec<usize> = records
                    .iter()
                    .enumerate()
                    .filter(|(_, (_, r))| r.is_restorable())
                    .map(|(i, _)| i)
                    .collect();
                if all.is_empty() {
                    return Err(HistoryError::NothingToRestore);
                }
                all
            }
        };

        let mut summary = RestoreSummary::default();
        // newest first so chains of moves unwind in reverse
        for &index in chosen.iter().rev() {
            let (_, record) = records[index];
            summary.records += 1;
            for entry in record.moves.iter().rev() {
                match restore_move(entry) {
                    Ok(true) => summary.restored.push(entry.clone()),
                    Ok(false) => summary.skipped += 1,
                    Err(e) => {
                        log::warn!(
                            "Failed to restore {} → {}: {}",
                            entry.to.display(),
                            entry.from.display(),
                            e
                        );
                        summary.skipped += 1;
                    }
                }
            }
        }

        let removed: Vec<usize> = chosen.iter().map(|&i| records[i].0).collect();
        let remaining: Vec<&str> = lines
            .iter()
            .enumerate()
            .filter(|(line_no, _)| !removed.contains(line_no))
            .map(|(_, line)| line.raw.as_str())
            .collect();
        self.rewrite(&remaining)?;

        Ok(summary)
    }

    fn read_lines(&self) -> Result<Vec<LogLine>, HistoryError> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => return Err(self.io_error(source)),
        };

        let mut lines = Vec::new();
        for (line_no, line) in BufReader::new(file).lines().enumerate() {
            let raw = line.map_err(|source| self.io_error(source))?;
            if raw.trim().is_empty() {
                continue;
            }
            let record = match serde_json::from_str::<HistoryRecord>(&raw) {
                Ok(record) => Some(record),
                Err(e) => {
                    log::warn!("Skipping malformed history entry on line {}: {}", line_no + 1, e);
                    None
                }
            };
            lines.push(LogLine { raw, record });
        }
        Ok(lines)
    }

    fn rewrite(&self, lines: &[&str]) -> Result<(), HistoryError> {
        let content = if lines.is_empty() {
            String::new()
        } else {
            lines.join("\n") + "\n"
        };
        let tmp = self.path.with_extension("jsonl.tmp");
        fs::write(&tmp, content).map_err(|source| self.io_error(source))?;
        fs::rename(&tmp, &self.path).map_err(|source| self.io_error(source))
    }

    fn io_error(&self, source: std::io::Error) -> HistoryError {
        HistoryError::Io {
            path: self.path.to_string_lossy().to_string(),
            source,
        }
    }
}

struct LogLine {
    raw: String,
    record: Option<HistoryRecord>,
}

/// `Ok(false)` when the move cannot be reversed safely.
fn restore_move(entry: &MoveEntry) -> std::io::Result<bool> {
    if !entry.to.exists() {
        log::warn!("{} no longer exists; skipping", entry.to.display());
        return Ok(false);
    }
    if entry.from.exists() {
        log::warn!("{} is occupied; skipping", entry.from.display());
        return Ok(false);
    }
    if let Some(parent) = entry.from.parent() {
        fs::create_dir_all(parent)?;
    }
    move_file(&entry.to, &entry.from)?;
    log::info!("Restored {} → {}", entry.to.display(), entry.from.display());
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn record_with_move(dir: &Path, name: &str) -> HistoryRecord {
        let from = dir.join("originals").join(name);
        let to = dir.join("moved").join(name);
        fs::create_dir_all(to.parent().unwrap()).unwrap();
        fs::write(&to, name).unwrap();

        let mut record = HistoryRecord::new(HistoryAction::CleanExact);
        record.moves.push(MoveEntry { from, to });
        record
    }

    #[test]
    fn test_append_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let log = HistoryLog::new(temp_dir.path().join(DEFAULT_HISTORY_FILE));

        let mut first = HistoryRecord::new(HistoryAction::Sort);
        first.retained.push(PathBuf::from("/a.jpg"));
        let mut second = HistoryRecord::new(HistoryAction::CleanExact);
        second.deleted.push(PathBuf::from("/b.jpg"));
        log.append(&first).unwrap();
        log.append(&second).unwrap();

        let records = log.load().unwrap();
        assert_eq!(records, vec![first, second]);
    }

    #[test]
    fn test_record_format() {
        let record = HistoryRecord {
            timestamp: "2024-01-01T00:00:00+00:00".to_string(),
            action: HistoryAction::CleanExact,
            retained: vec![PathBuf::from("/keep.jpg")],
            moves: vec![],
            deleted: vec![PathBuf::from("/dup.jpg")],
        };
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(
            json,
            r#"{"timestamp":"2024-01-01T00:00:00+00:00","action":"clean_exact","retained":["/keep.jpg"],"moves":[],"deleted":["/dup.jpg"]}"#
        );
    }

    #[test]
    fn test_missing_log_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let log = HistoryLog::new(temp_dir.path().join("none.jsonl"));
        assert!(log.load().unwrap().is_empty());
        assert!(matches!(
            log.restore(RestoreSelection::Latest),
            Err(HistoryError::NothingToRestore)
        ));
    }

    #[test]
    fn test_malformed_lines_are_skipped() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(DEFAULT_HISTORY_FILE);
        let log = HistoryLog::new(&path);
        log.append(&HistoryRecord::new(HistoryAction::Sort)).unwrap();
        let mut content = fs::read_to_string(&path).unwrap();
        content.push_str("{not json\n");
        fs::write(&path, content).unwrap();
        log.append(&HistoryRecord::new(HistoryAction::Review)).unwrap();

        let records = log.load().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].action, HistoryAction::Review);
    }

    #[test]
    fn test_restore_latest_moves_file_back() {
        let temp_dir = TempDir::new().unwrap();
        let log = HistoryLog::new(temp_dir.path().join(DEFAULT_HISTORY_FILE));
        let older = record_with_move(temp_dir.path(), "old.jpg");
        let newer = record_with_move(temp_dir.path(), "new.jpg");
        log.append(&older).unwrap();
        log.append(&newer).unwrap();

        let summary = log.restore(RestoreSelection::Latest).unwrap();

        assert_eq!(summary.records, 1);
        assert_eq!(summary.restored, newer.moves);
        assert!(newer.moves[0].from.exists());
        assert!(!newer.moves[0].to.exists());
        assert!(older.moves[0].to.exists());
        assert_eq!(log.load().unwrap(), vec![older]);
    }

    #[test]
    fn test_restore_skips_occupied_and_vanished() {
        let temp_dir = TempDir::new().unwrap();
        let log = HistoryLog::new(temp_dir.path().join(DEFAULT_HISTORY_FILE));
        let mut record = record_with_move(temp_dir.path(), "a.jpg");
        let vanished = record_with_move(temp_dir.path(), "b.jpg").moves.remove(0);
        fs::remove_file(&vanished.to).unwrap();
        record.moves.push(vanished);
        let occupied = record_with_move(temp_dir.path(), "c.jpg").moves.remove(0);
        fs::create_dir_all(occupied.from.parent().unwrap()).unwrap();
        fs::write(&occupied.from, "someone else").unwrap();
        record.moves.push(occupied.clone());
        log.append(&record).unwrap();

        let summary = log.restore(RestoreSelection::All).unwrap();

        assert_eq!(summary.restored.len(), 1);
        assert_eq!(summary.skipped, 2);
        assert_eq!(fs::read_to_string(&occupied.from).unwrap(), "someone else");
        assert!(occupied.to.exists());
        assert!(log.load().unwrap().is_empty());
    }

    #[test]
    fn test_restore_by_index() {
        let temp_dir = TempDir::new().unwrap();
        let log = HistoryLog::new(temp_dir.path().join(DEFAULT_HISTORY_FILE));
        let first = record_with_move(temp_dir.path(), "first.jpg");
        let deletion_only = HistoryRecord::new(HistoryAction::CleanExact);
        let third = record_with_move(temp_dir.path(), "third.jpg");
        log.append(&first).unwrap();
        log.append(&deletion_only).unwrap();
        log.append(&third).unwrap();

        assert!(matches!(
            log.restore(RestoreSelection::Index(1)),
            Err(HistoryError::NotRestorable { index: 1 })
        ));
        assert!(matches!(
            log.restore(RestoreSelection::Index(7)),
            Err(HistoryError::InvalidIndex { index: 7, len: 3 })
        ));

        log.restore(RestoreSelection::Index(0)).unwrap();

        assert!(first.moves[0].from.exists());
        assert!(third.moves[0].to.exists());
        assert_eq!(log.load().unwrap(), vec![deletion_only, third]);
    }
}
