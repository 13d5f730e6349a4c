use colored::Colorize;
use std::collections::HashSet;
use std::path::Path;

const RULE_WIDTH: usize = 60;

pub fn print_info(message: &str) {
    println!("{} {message}", "ℹ".cyan());
}

pub fn print_warning(message: &str) {
    eprintln!("{} {message}", "⚠".yellow());
}

pub fn print_error(message: &str) {
    eprintln!("{} {message}", "Error:".red().bold());
}

/// Success line for the written file, plus the backup location if one was made
pub fn print_success(path: &Path, backup: Option<&Path>) {
    println!(
        "{} Successfully created {}",
        "✓".green(),
        path.display().to_string().bold()
    );
    if let Some(backup) = backup {
        println!("  Backup saved to: {}", backup.display());
    }
}

/// Drop repeated warnings, keeping the first occurrence of each
pub fn dedup_warnings(warnings: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    warnings
        .into_iter()
        .filter(|warning| seen.insert(warning.clone()))
        .collect()
}

pub fn print_warnings(warnings: &[String]) {
    if warnings.is_empty() {
        return;
    }
    eprintln!();
    eprintln!("{}", format!("Warnings ({}):", warnings.len()).yellow().bold());
    for warning in warnings {
        print_warning(warning);
    }
}

/// Dry-run output: the would-be manifest between rules
pub fn print_preview(content: &str) {
    let rule = "=".repeat(RULE_WIDTH);
    println!();
    println!("{}", "DRY RUN - would write the following to pyproject.toml:".bold());
    println!("{rule}");
    print!("{content}");
    if !content.ends_with('\n') {
        println!();
    }
    println!("{rule}");
}

pub fn print_next_steps(warning_count: usize) {
    println!();
    println!("{}", "Next steps:".bold());
    println!("  1. Review the generated pyproject.toml");
    println!("  2. Install dependencies: {}", "uv sync".cyan());
    println!("  3. Run your project: {}", "uv run <script>".cyan());

    if warning_count > 0 {
        println!();
        println!(
            "{}",
            format!("Note: {warning_count} warning(s) were generated during conversion.").yellow()
        );
    }
}
