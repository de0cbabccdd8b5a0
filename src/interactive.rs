use anyhow::Result;
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Input, Select};
use photogallery::config::{DEFAULT_CHUNK_SIZE, DEFAULT_REPORT, DEFAULT_THRESHOLD};
use photogallery::core::cleanup::DEFAULT_TRASH_DIR;
use photogallery::core::organize::DEFAULT_OUTPUT_DIR;
use photogallery::{DigestAlgorithm, IndexStrategy};
use std::path::{Path, PathBuf};

use crate::{Commands, Dups, HistoryCmd};

const MODES: [&str; 6] = [
    "Scan for duplicates",
    "Clean exact duplicates",
    "Review visual duplicates",
    "Sort media by date",
    "Show history",
    "Undo last operation",
];

/// Menu shown when no subcommand was given. Escape exits.
pub fn choose_command() -> Result<Option<Commands>> {
    let theme = ColorfulTheme::default();
    let mode = Select::with_theme(&theme)
        .with_prompt("What would you like to do?")
        .items(&MODES)
        .default(0)
        .interact_opt()?;
    Ok(mode.map(command_for))
}

/// Commands run from the menu use default settings. Directories are left
/// empty so the command itself asks for them.
fn command_for(mode: usize) -> Commands {
    match mode {
        0 => Commands::Duplicates {
            command: Dups::Scan {
                path: None,
                report: PathBuf::from(DEFAULT_REPORT),
                threshold: DEFAULT_THRESHOLD,
                chunk_size: DEFAULT_CHUNK_SIZE,
                digest: DigestAlgorithm::default(),
                index: IndexStrategy::default(),
                keep_exact_in_visual: false,
                jobs: None,
                extensions: Vec::new(),
            },
        },
        1 => Commands::Duplicates {
            command: Dups::Clean {
                report: PathBuf::from(DEFAULT_REPORT),
                dry_run: false,
                target_dir: None,
                system_trash: false,
            },
        },
        2 => Commands::Duplicates {
            command: Dups::Review {
                report: PathBuf::from(DEFAULT_REPORT),
                output: PathBuf::from(DEFAULT_OUTPUT_DIR),
                trash_dir: PathBuf::from(DEFAULT_TRASH_DIR),
                system_trash: false,
                dry_run: false,
            },
        },
        3 => Commands::Sort {
            path: None,
            output: PathBuf::from(DEFAULT_OUTPUT_DIR),
            dry_run: false,
        },
        4 => Commands::History {
            command: HistoryCmd::List,
        },
        _ => Commands::History {
            command: HistoryCmd::Restore {
                record: None,
                all: false,
            },
        },
    }
}

/// Prompt until the answer names an existing directory.
pub fn ask_directory(prompt: &str) -> Result<PathBuf> {
    let answer: String = Input::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .validate_with(|input: &String| -> Result<(), &str> {
            if Path::new(input.trim()).is_dir() {
                Ok(())
            } else {
                Err("Not a directory")
            }
        })
        .interact_text()?;
    Ok(PathBuf::from(answer.trim()))
}
