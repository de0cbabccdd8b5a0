use anyhow::Result;
use dialoguer::theme::ColorfulTheme;
use dialoguer::{MultiSelect, Select};
use indicatif::HumanBytes;
use photogallery::core::cleanup::{ReviewAction, ReviewCandidate};
use photogallery::core::report::ReportGroup;

/// Print one group and ask what to do with it. Escape quits.
pub fn prompt_action(
    position: usize,
    total: usize,
    group: &ReportGroup,
    candidates: &[ReviewCandidate],
) -> Result<ReviewAction> {
    println!("\n✨ Group {} of {} ({}):", position, total, group.id);
    for (i, c) in candidates.iter().enumerate() {
        println!("   [{}] {}", i, c.path.display());
        let dims = c
            .dimensions
            .map(|(w, h)| format!("{}x{}", w, h))
            .unwrap_or_else(|| "?".to_string());
        let date = c
            .date
            .date
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "Unknown".to_string());
        println!(
            "       {} | {} | {} ({}) | sharpness {}",
            HumanBytes(c.size),
            dims,
            date,
            c.date.source,
            c.sharpness as u64
        );
    }

    let mut items: Vec<String> = (0..candidates.len()).map(|i| format!("Keep [{}]", i)).collect();
    let fixed = [
        "Keep largest",
        "Skip (keep all)",
        "Delete all",
        "Keep selected…",
        "Delete selected…",
        "Quit",
    ];
    items.extend(fixed.iter().map(|s| s.to_string()));

    let theme = ColorfulTheme::default();
    let choice = Select::with_theme(&theme)
        .with_prompt("Action")
        .items(&items)
        .default(0)
        .interact_opt()?;

    let Some(choice) = choice else {
        return Ok(ReviewAction::Quit);
    };
    if choice < candidates.len() {
        return Ok(ReviewAction::KeepIndex(choice));
    }

    let action = match choice - candidates.len() {
        0 => ReviewAction::KeepLargest,
        1 => ReviewAction::Skip,
        2 => ReviewAction::DeleteAll,
        3 => ReviewAction::KeepSelected(select_files(&theme, "Files to keep", candidates)?),
        4 => ReviewAction::DeleteSelected(select_files(&theme, "Files to delete", candidates)?),
        _ => ReviewAction::Quit,
    };
    Ok(action)
}

fn select_files(theme: &ColorfulTheme, prompt: &str, candidates: &[ReviewCandidate]) -> Result<Vec<usize>> {
    let labels: Vec<String> = candidates
        .iter()
        .enumerate()
        .map(|(i, c)| format!("[{}] {}", i, c.path.display()))
        .collect();
    Ok(MultiSelect::with_theme(theme)
        .with_prompt(prompt)
        .items(&labels)
        .interact()?)
}
