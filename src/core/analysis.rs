//! Directory in, report out.
//!
//! scan → fingerprint every file in parallel → (barrier) → group on one
//! thread → write the CSV report.

use indicatif::style::TemplateError;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Instant;
use thiserror::Error;

use super::duplicate::{DuplicateDetector, GroupingResult};
use super::fingerprint::{Fingerprint, Fingerprinter};
use super::hash::HashService;
use super::perceptual::PerceptualService;
use super::report::{self, ReportError, ReportRow};
use super::scanner::{MediaFile, ScanError, ScannerService};
use crate::config::{AnalysisConfig, ConfigError};

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Scan error: {0}")]
    Scan(#[from] ScanError),

    #[error("Report error: {0}")]
    Report(#[from] ReportError),

    #[error("Failed to build worker pool: {message}")]
    WorkerPool { message: String },

    #[error("Invalid progress template: {0}")]
    ProgressTemplate(#[from] TemplateError),
}

/// Everything one run produced, before it is written out.
#[derive(Debug)]
pub struct AnalysisOutput {
    pub files: Vec<MediaFile>,
    pub fingerprints: Vec<Fingerprint>,
    pub groups: GroupingResult,
    pub rows: Vec<ReportRow>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisSummary {
    pub files_scanned: usize,
    pub digests: usize,
    pub signatures: usize,
    pub exact_groups: usize,
    pub visual_groups: usize,
    pub rows: usize,
    pub report_path: PathBuf,
}

pub struct Analysis {
    config: AnalysisConfig,
    show_progress: bool,
}

impl Analysis {
    pub fn new(config: AnalysisConfig) -> Self {
        Self {
            config,
            show_progress: false,
        }
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Scan, fingerprint and group without touching the report.
    pub fn analyze(&self) -> Result<AnalysisOutput, AnalysisError> {
        self.config.validate()?;

        let spinner = self.spinner("Scanning for images…")?;
        let scanner = ScannerService::with_extensions(&self.config.extensions);
        let files = benchmark("scanning", || scanner.scan(&self.config.root))?;
        spinner.finish_with_message(format!("Found {} image(s)", files.len()));
        log::info!("Scanned {} image(s) under {}", files.len(), self.config.root.display());

        let fingerprinter = Fingerprinter::new(
            HashService::new(self.config.digest, self.config.chunk_size),
            PerceptualService::new(self.config.max_decode_bytes),
        );
        let progress = self.progress_bar(files.len() as u64)?;
        let fingerprints = benchmark("fingerprinting", || match self.config.jobs {
            Some(jobs) => rayon::ThreadPoolBuilder::new()
                .num_threads(jobs)
                .build()
                .map(|pool| pool.install(|| fingerprinter.fingerprint_all(&files, &progress)))
                .map_err(|e| AnalysisError::WorkerPool {
                    message: e.to_string(),
                }),
            None => Ok(fingerprinter.fingerprint_all(&files, &progress)),
        })?;
        progress.finish_and_clear();

        let detector = DuplicateDetector::new(self.config.threshold)
            .with_strategy(self.config.index)
            .with_collapse_exact(self.config.collapse_exact);
        let groups = benchmark("grouping", || detector.detect(&fingerprints));
        let rows = report::build_rows(&groups, &files)?;

        Ok(AnalysisOutput {
            files,
            fingerprints,
            groups,
            rows,
        })
    }

    /// Full run: analyze, then write the report. A report that cannot be
    /// written fails the run.
    pub fn run(&self) -> Result<AnalysisSummary, AnalysisError> {
        let output = self.analyze()?;
        report::write_report(&self.config.report_path, &output.rows)?;
        log::info!("Report written to {}", self.config.report_path.display());

        Ok(AnalysisSummary {
            files_scanned: output.files.len(),
            digests: output.fingerprints.iter().filter(|f| f.digest.is_some()).count(),
            signatures: output
                .fingerprints
                .iter()
                .filter(|f| f.signature.is_some())
                .count(),
            exact_groups: output.groups.exact.len(),
            visual_groups: output.groups.visual.len(),
            rows: output.rows.len(),
            report_path: self.config.report_path.clone(),
        })
    }

    fn spinner(&self, message: &'static str) -> Result<ProgressBar, AnalysisError> {
        if !self.show_progress {
            return Ok(ProgressBar::hidden());
        }
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(style("{spinner:.green} {msg}")?);
        spinner.set_message(message);
        spinner.enable_steady_tick(std::time::Duration::from_millis(100));
        Ok(spinner)
    }

    fn progress_bar(&self, len: u64) -> Result<ProgressBar, AnalysisError> {
        if !self.show_progress {
            return Ok(ProgressBar::hidden());
        }
        let bar = ProgressBar::new(len);
        bar.set_style(style(
            "{spinner:.green} Hashing images [{bar:40.cyan/blue}] {pos}/{len} ({eta})",
        )?);
        Ok(bar)
    }
}

fn style(template: &str) -> Result<ProgressStyle, AnalysisError> {
    Ok(ProgressStyle::with_template(template)?)
}

/// Run `f()` and log how long it took under `label`.
fn benchmark<T, F: FnOnce() -> T>(label: &str, f: F) -> T {
    let start = Instant::now();
    let result = f();
    log::debug!("{} took {:.2?}", label, start.elapsed());
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::duplicate::DuplicateType;
    use crate::core::testing::{render_scene, render_texture};
    use std::fs;
    use tempfile::TempDir;

    fn names(rows: &[ReportRow], kind: DuplicateType) -> Vec<String> {
        rows.iter()
            .filter(|r| r.kind == kind)
            .map(|r| {
                PathBuf::from(&r.file_path)
                    .file_name()
                    .unwrap()
                    .to_string_lossy()
                    .to_string()
            })
            .collect()
    }

    #[test]
    fn test_end_to_end_scenario() {
        let photos = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        render_scene(&photos.path().join("a.png"), 200, 150, 0);
        fs::copy(photos.path().join("a.png"), photos.path().join("b.png")).unwrap();
        render_scene(&photos.path().join("c.png"), 100, 75, 0);
        render_texture(&photos.path().join("d.png"), 200, 150, 3);

        let report_path = out.path().join("duplicate_report.csv");
        let summary = Analysis::new(AnalysisConfig::new(photos.path(), &report_path))
            .run()
            .unwrap();

        assert_eq!(summary.files_scanned, 4);
        assert_eq!(summary.exact_groups, 1);
        assert_eq!(summary.visual_groups, 1);

        let rows = report::read_report(&report_path).unwrap();
        assert_eq!(names(&rows, DuplicateType::ExactDuplicate), vec!["a.png", "b.png"]);
        assert_eq!(names(&rows, DuplicateType::VisualDuplicate), vec!["a.png", "c.png"]);
        assert!(rows.iter().all(|r| !r.file_path.ends_with("d.png")));
        assert!(rows[2].group_id == "visual_group_0");
    }

    #[test]
    fn test_reports_are_byte_identical_across_runs() {
        let photos = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        for i in 0..6 {
            render_scene(&photos.path().join(format!("s{}.png", i)), 80, 60, i % 3);
        }
        fs::copy(photos.path().join("s0.png"), photos.path().join("copy.png")).unwrap();

        let first = out.path().join("first.csv");
        let second = out.path().join("second.csv");
        Analysis::new(AnalysisConfig::new(photos.path(), &first)).run().unwrap();
        let mut config = AnalysisConfig::new(photos.path(), &second);
        config.jobs = Some(3);
        Analysis::new(config).run().unwrap();

        assert_eq!(fs::read(&first).unwrap(), fs::read(&second).unwrap());
    }

    #[test]
    fn test_undecodable_copy_stays_out_of_visual_groups() {
        let photos = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        fs::write(photos.path().join("x.jpg"), b"corrupt bytes").unwrap();
        fs::write(photos.path().join("y.jpg"), b"corrupt bytes").unwrap();
        render_scene(&photos.path().join("z.png"), 64, 64, 0);

        let report_path = out.path().join("report.csv");
        let mut config = AnalysisConfig::new(photos.path(), &report_path).with_threshold(64);
        config.collapse_exact = false;
        Analysis::new(config).run().unwrap();

        let rows = report::read_report(&report_path).unwrap();
        assert_eq!(names(&rows, DuplicateType::ExactDuplicate), vec!["x.jpg", "y.jpg"]);
        assert!(names(&rows, DuplicateType::VisualDuplicate).is_empty());
    }

    #[test]
    fn test_threshold_64_groups_all_images() {
        let photos = TempDir::new().unwrap();
        for i in 0..4 {
            render_texture(&photos.path().join(format!("t{}.png", i)), 32, 32, i);
        }

        let config =
            AnalysisConfig::new(photos.path(), photos.path().join("r.csv")).with_threshold(64);
        let output = Analysis::new(config).analyze().unwrap();

        assert!(output.groups.exact.is_empty());
        assert_eq!(output.groups.visual.len(), 1);
        assert_eq!(output.groups.visual[0].members, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_invalid_config_fails_before_scanning() {
        let photos = TempDir::new().unwrap();
        let report_path = photos.path().join("report.csv");
        let config = AnalysisConfig::new(photos.path(), &report_path).with_threshold(100);

        let result = Analysis::new(config).run();

        assert!(matches!(result, Err(AnalysisError::Config(_))));
        assert!(!report_path.exists());
    }

    #[test]
    fn test_bad_progress_template_is_reported_as_such() {
        assert!(style("{spinner:.green} {msg}").is_ok());
        assert!(matches!(
            style("{msg:x}"),
            Err(AnalysisError::ProgressTemplate(_))
        ));
    }

    #[test]
    fn test_unwritable_report_fails_run() {
        let photos = TempDir::new().unwrap();
        render_scene(&photos.path().join("a.png"), 32, 32, 0);
        let report_path = photos.path().join("no_such_dir").join("report.csv");

        let result = Analysis::new(AnalysisConfig::new(photos.path(), &report_path)).run();

        assert!(matches!(result, Err(AnalysisError::Report(_))));
    }
}
