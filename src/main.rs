mod interactive;
mod review;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use photogallery::config::{DEFAULT_CHUNK_SIZE, DEFAULT_REPORT, DEFAULT_THRESHOLD};
use photogallery::core::cleanup::{
    self, CleanOptions, Disposal, FileAction, ReviewCandidate, ReviewExecutor, DEFAULT_TRASH_DIR,
};
use photogallery::core::history::{HistoryLog, RestoreSelection, DEFAULT_HISTORY_FILE};
use photogallery::core::organize::{Organizer, DEFAULT_OUTPUT_DIR};
use photogallery::core::report;
use photogallery::{Analysis, AnalysisConfig, DigestAlgorithm, DuplicateType, IndexStrategy};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "photogallery", version, about = "Find duplicate photos, clean them up and sort by date")]
struct Cli {
    /// More log output (-v info, -vv debug); RUST_LOG overrides
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Hide progress bars
    #[arg(short, long, global = true)]
    quiet: bool,

    /// History log used for undo
    #[arg(long, value_name = "FILE", global = true, default_value = DEFAULT_HISTORY_FILE)]
    history: PathBuf,

    /// Without a command, a menu asks what to do
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub(crate) enum Commands {
    /// Duplicate workflows
    Duplicates {
        #[command(subcommand)]
        command: Dups,
    },

    /// Move images and videos into <output>/<YYYY>/<MM> folders by best date
    Sort {
        /// Directory to sort (asked for when omitted)
        #[arg(short, long, value_name = "DIR")]
        path: Option<PathBuf>,
        /// Root of the date folders
        #[arg(short, long, value_name = "DIR", default_value = DEFAULT_OUTPUT_DIR)]
        output: PathBuf,
        /// Only show what would be moved
        #[arg(long)]
        dry_run: bool,
    },

    /// Work with the operation history
    History {
        #[command(subcommand)]
        command: HistoryCmd,
    },
}

#[derive(Subcommand, Debug)]
pub(crate) enum Dups {
    /// Find exact and visual duplicates and write a CSV report
    Scan {
        /// Directory to scan (asked for when omitted)
        #[arg(short, long, value_name = "DIR")]
        path: Option<PathBuf>,
        /// Report file
        #[arg(short, long, value_name = "FILE", default_value = DEFAULT_REPORT)]
        report: PathBuf,
        /// Maximum Hamming distance between visual duplicates (0-64)
        #[arg(short, long, default_value_t = DEFAULT_THRESHOLD)]
        threshold: u32,
        /// Read buffer size for content hashing
        #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
        chunk_size: usize,
        /// Content digest algorithm
        #[arg(long, value_enum, default_value_t = DigestAlgorithm::Md5)]
        digest: DigestAlgorithm,
        /// Candidate lookup for the visual pass
        #[arg(long, value_enum, default_value_t = IndexStrategy::Auto)]
        index: IndexStrategy,
        /// Let every copy of an exact group take part in visual grouping
        #[arg(long)]
        keep_exact_in_visual: bool,
        /// Worker threads (default: one per core)
        #[arg(short, long)]
        jobs: Option<usize>,
        /// Comma-separated extensions to scan
        #[arg(long, value_delimiter = ',', value_name = "EXT,...")]
        extensions: Vec<String>,
    },

    /// Keep the first file of every exact group and remove the others
    Clean {
        /// Report file
        #[arg(short, long, value_name = "FILE", default_value = DEFAULT_REPORT)]
        report: PathBuf,
        /// Only show what would be removed
        #[arg(long)]
        dry_run: bool,
        /// Move duplicates here instead of deleting them
        #[arg(long, value_name = "DIR", conflicts_with = "system_trash")]
        target_dir: Option<PathBuf>,
        /// Send duplicates to the system trash instead of deleting them
        #[arg(long)]
        system_trash: bool,
    },

    /// Walk through visual groups and decide what to keep
    Review {
        /// Report file
        #[arg(short, long, value_name = "FILE", default_value = DEFAULT_REPORT)]
        report: PathBuf,
        /// Root of the date folders for kept files
        #[arg(short, long, value_name = "DIR", default_value = DEFAULT_OUTPUT_DIR)]
        output: PathBuf,
        /// Where discarded files are moved
        #[arg(long, value_name = "DIR", default_value = DEFAULT_TRASH_DIR, conflicts_with = "system_trash")]
        trash_dir: PathBuf,
        /// Send discarded files to the system trash instead
        #[arg(long)]
        system_trash: bool,
        /// Only show what would be moved
        #[arg(long)]
        dry_run: bool,
    },
}

#[derive(Subcommand, Debug)]
pub(crate) enum HistoryCmd {
    /// List history records
    List,

    /// Move files back to where a record found them
    Restore {
        /// Restore a specific record index
        #[arg(long, conflicts_with = "all")]
        record: Option<usize>,
        /// Restore all records
        #[arg(long, conflicts_with = "record")]
        all: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let history = HistoryLog::new(&cli.history);

    let command = match cli.command {
        Some(command) => command,
        None => match interactive::choose_command()? {
            Some(command) => command,
            None => return Ok(()),
        },
    };

    match command {
        Commands::Duplicates { command } => match command {
            Dups::Scan {
                path,
                report,
                threshold,
                chunk_size,
                digest,
                index,
                keep_exact_in_visual,
                jobs,
                extensions,
            } => {
                let path = match path {
                    Some(path) => path,
                    None => interactive::ask_directory("Directory to scan")?,
                };
                println!("▶ Scanning for duplicates in: {}", path.display());
                let mut config = AnalysisConfig::new(&path, &report)
                    .with_threshold(threshold)
                    .with_chunk_size(chunk_size);
                config.digest = digest;
                config.index = index;
                config.collapse_exact = !keep_exact_in_visual;
                config.jobs = jobs;
                if !extensions.is_empty() {
                    config = config.with_extensions(&extensions);
                }

                let summary = Analysis::new(config)
                    .with_progress(!cli.quiet)
                    .run()
                    .with_context(|| format!("Duplicate scan of {} failed", path.display()))?;

                println!(
                    "Scanned {} image(s): {} hashed, {} decoded",
                    summary.files_scanned, summary.digests, summary.signatures
                );
                if summary.rows == 0 {
                    println!("No duplicates found.");
                } else {
                    println!("Exact duplicate groups: {}", summary.exact_groups);
                    println!("Visual duplicate groups: {}", summary.visual_groups);
                }
                println!("✅ Report saved to {}", summary.report_path.display());
            }

            Dups::Clean {
                report,
                dry_run,
                target_dir,
                system_trash,
            } => {
                let rows = report::read_report(&report).with_context(|| {
                    format!("Could not read {}; run `duplicates scan` first", report.display())
                })?;
                if !rows.iter().any(|r| r.kind == DuplicateType::ExactDuplicate) {
                    println!("No exact duplicates found in report.");
                    return Ok(());
                }

                let disposal = match (target_dir, system_trash) {
                    (Some(dir), _) => Disposal::MoveTo(dir),
                    (None, true) => Disposal::SystemTrash,
                    (None, false) => Disposal::Delete,
                };
                let options = CleanOptions { disposal, dry_run };
                let summary = cleanup::clean_exact_duplicates(&rows, &options, Some(&history))
                    .context("Failed to clean exact duplicates")?;

                for group in &summary.groups {
                    println!("\n✨ Group {}:", group.group_id);
                    for action in &group.actions {
                        print_action(action, dry_run);
                    }
                }

                if dry_run {
                    println!("\n⚠️  Dry-run only; no files were changed.");
                } else {
                    println!(
                        "\n✅ Removed {} duplicate(s), {} missing, {} failed; history in {}",
                        summary.removed,
                        summary.missing,
                        summary.failures,
                        history.path().display()
                    );
                }
            }

            Dups::Review {
                report,
                output,
                trash_dir,
                system_trash,
                dry_run,
            } => {
                let rows = report::read_report(&report).with_context(|| {
                    format!("Could not read {}; run `duplicates scan` first", report.display())
                })?;
                let groups = cleanup::reviewable_groups(&rows);
                if groups.is_empty() {
                    println!("No visual duplicates to review.");
                    return Ok(());
                }

                let discard = if system_trash {
                    Disposal::SystemTrash
                } else {
                    Disposal::MoveTo(trash_dir)
                };
                let mut executor = ReviewExecutor::new(
                    Organizer::new(output).with_dry_run(dry_run),
                    discard,
                    Some(&history),
                );
                for (i, group) in groups.iter().enumerate() {
                    let candidates: Vec<ReviewCandidate> =
                        group.files.iter().map(|f| ReviewCandidate::inspect(f)).collect();
                    let action = review::prompt_action(i + 1, groups.len(), group, &candidates)?;
                    let Some(plan) = action.plan(&candidates)? else {
                        println!("Stopping review.");
                        break;
                    };
                    for action in executor.apply(&plan)? {
                        print_action(&action, dry_run);
                    }
                }
                println!("\nDone reviewing.");
            }
        },

        Commands::Sort {
            path,
            output,
            dry_run,
        } => {
            let path = match path {
                Some(path) => path,
                None => interactive::ask_directory("Directory to sort")?,
            };
            println!("▶ Sorting media in: {}", path.display());
            let mut organizer = Organizer::new(&output).with_dry_run(dry_run);
            let summary = organizer
                .sort_all_media(&path, Some(&history))
                .with_context(|| format!("Failed to sort {}", path.display()))?;

            for entry in &summary.moves {
                let verb = if dry_run { "[dry-run] MOVE" } else { "Moved" };
                println!("   📦 {} {} → {}", verb, entry.from.display(), entry.to.display());
            }
            println!("\n==============================");
            println!("Total images processed: {}", summary.images);
            println!("Total videos processed: {}", summary.videos);
            println!("Already sorted: {}", summary.already_sorted);
            println!("Failed: {}", summary.failures);
            println!("==============================");
        }

        Commands::History { command } => match command {
            HistoryCmd::List => {
                let records = history
                    .load()
                    .with_context(|| format!("Could not read history {}", history.path().display()))?;
                if records.is_empty() {
                    println!("No history recorded.");
                    return Ok(());
                }
                println!("🗂️  History:");
                for (i, rec) in records.iter().enumerate() {
                    println!("[{}] {} {}", i, rec.timestamp, rec.action);
                    for kept in &rec.retained {
                        println!("     kept: {}", kept.display());
                    }
                    for entry in &rec.moves {
                        println!("     moved: {} → {}", entry.from.display(), entry.to.display());
                    }
                    for deleted in &rec.deleted {
                        println!("     deleted: {}", deleted.display());
                    }
                }
            }

            HistoryCmd::Restore { record, all } => {
                let selection = match (all, record) {
                    (true, _) => RestoreSelection::All,
                    (false, Some(index)) => RestoreSelection::Index(index),
                    (false, None) => RestoreSelection::Latest,
                };
                let summary = history.restore(selection).context("Restore failed")?;
                for entry in &summary.restored {
                    println!("🔄 Restored {} → {}", entry.to.display(), entry.from.display());
                }
                if summary.skipped > 0 {
                    println!("⚠️  Skipped {} file(s)", summary.skipped);
                }
                println!("🧹 Updated history, removed {} record(s)", summary.records);
            }
        },
    }

    Ok(())
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn print_action(action: &FileAction, dry_run: bool) {
    let tag = if dry_run { "[dry-run] " } else { "" };
    match action {
        FileAction::Kept(path) => println!("   🏆 Keeping → {}", path.display()),
        FileAction::AlreadySorted(path) => println!("   🏆 {}Keeping in place → {}", tag, path.display()),
        FileAction::Deleted(path) => println!("   🗑️  {}Deleted {}", tag, path.display()),
        FileAction::Trashed(path) => println!("   🗑️  {}Sent to trash {}", tag, path.display()),
        FileAction::Moved { from, to } => {
            println!("   📦 {}Moved {} → {}", tag, from.display(), to.display())
        }
        FileAction::Missing(path) => println!("   ⚠️  File not found: {}", path.display()),
        FileAction::Skipped(path) => println!("   ⏭️  Left in place: {}", path.display()),
        FileAction::Failed { path, error } => println!("   ❌ {}: {}", path.display(), error),
    }
}
