use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::duplicate::{DuplicateType, GroupingResult};
use super::scanner::MediaFile;

const HEADER: [&str; 3] = ["type", "group_id", "file_path"];

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Failed to write report {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: csv::Error,
    },

    #[error("Failed to move report into place at {path}: {source}")]
    Persist {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read report {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: csv::Error,
    },

    #[error("Report row refers to unknown file id {id}")]
    UnknownFile { id: usize },

    #[error("Path is not valid UTF-8 and cannot be written to the report: {path}")]
    NonUtf8Path { path: String },
}

/// One (group, member) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportRow {
    #[serde(rename = "type")]
    pub kind: DuplicateType,
    pub group_id: String,
    pub file_path: String,
}

/// Rows of one group as read back from a report, in file order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportGroup {
    pub id: String,
    pub files: Vec<PathBuf>,
}

/// Flatten groups into rows: exact groups first, then visual groups, each
/// group's members in scan order.
pub fn build_rows(result: &GroupingResult, files: &[MediaFile]) -> Result<Vec<ReportRow>, ReportError> {
    let mut rows = Vec::new();
    for group in result.groups() {
        for &id in &group.members {
            let file = files.get(id).ok_or(ReportError::UnknownFile { id })?;
            let file_path = file.path.to_str().ok_or_else(|| ReportError::NonUtf8Path {
                path: file.path.to_string_lossy().to_string(),
            })?;
            rows.push(ReportRow {
                kind: group.group_type,
                group_id: group.id.clone(),
                file_path: file_path.to_string(),
            });
        }
    }
    Ok(rows)
}

/// Write `rows` as CSV. The header is always written. Output goes to a
/// sibling temporary file first and is renamed over `path` only once every
/// byte is flushed, so a failed run never leaves a truncated report behind.
pub fn write_report(path: &Path, rows: &[ReportRow]) -> Result<(), ReportError> {
    let tmp_path = temp_path_for(path);

    if let Err(source) = write_rows(&tmp_path, rows) {
        let _ = fs::remove_file(&tmp_path);
        return Err(ReportError::Write {
            path: path.to_string_lossy().to_string(),
            source,
        });
    }

    fs::rename(&tmp_path, path).map_err(|source| {
        let _ = fs::remove_file(&tmp_path);
        ReportError::Persist {
            path: path.to_string_lossy().to_string(),
            source,
        }
    })
}

fn write_rows(path: &Path, rows: &[ReportRow]) -> Result<(), csv::Error> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)?;
    writer.write_record(HEADER)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn read_report(path: &Path) -> Result<Vec<ReportRow>, ReportError> {
    let read_err = |source: csv::Error| ReportError::Read {
        path: path.to_string_lossy().to_string(),
        source,
    };

    let mut reader = csv::Reader::from_path(path).map_err(read_err)?;
    reader
        .deserialize::<ReportRow>()
        .map(|row| row.map_err(read_err))
        .collect()
}

/// Groups of one kind, in the order their first row appears, members in
/// row order.
pub fn groups_of(rows: &[ReportRow], kind: DuplicateType) -> Vec<ReportGroup> {
    let mut slots: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<ReportGroup> = Vec::new();

    for row in rows.iter().filter(|r| r.kind == kind) {
        let slot = *slots.entry(row.group_id.as_str()).or_insert_with(|| {
            groups.push(ReportGroup {
                id: row.group_id.clone(),
                files: Vec::new(),
            });
            groups.len() - 1
        });
        groups[slot].files.push(PathBuf::from(&row.file_path));
    }

    groups
}

fn temp_path_for(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "report".to_string());
    path.with_file_name(format!(".{}.tmp", name))
}
