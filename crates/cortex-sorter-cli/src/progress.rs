use colored::*;
use cortex_sorter_core::{ProcessingOutcome, ProgressReporter, StatsSnapshot};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

/// CLI progress reporter.
///
/// - Sweep: progress bar over the files found at startup
/// - Watch: one colored line per finished file
pub struct CliReporter {
    bar: Mutex<Option<ProgressBar>>,
}

impl CliReporter {
    pub fn new() -> Self {
        Self {
            bar: Mutex::new(None),
        }
    }

    fn bar(&self) -> MutexGuard<'_, Option<ProgressBar>> {
        self.bar.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn outcome_line(path: &Path, outcome: &ProcessingOutcome) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    match outcome {
        ProcessingOutcome::Sorted { rule, destination } => format!(
            "  {} {} -> {} {}",
            "✓".green(),
            name,
            destination.display(),
            format!("[{}]", rule).cyan()
        ),
        ProcessingOutcome::Duplicate {
            original_path,
            moved_to,
        } => format!(
            "  {} {} duplicate of {} -> {}",
            "≡".yellow(),
            name,
            original_path,
            moved_to.display()
        ),
        ProcessingOutcome::Unmatched => format!("  {} {} (no rule)", "·".dimmed(), name),
        ProcessingOutcome::Skipped(reason) => {
            format!("  {} {} {}", "-".dimmed(), name, reason.to_string().dimmed())
        }
        ProcessingOutcome::Failed(reason) => {
            format!("  {} {} {}", "✗".red(), name, reason.to_string().red())
        }
    }
}

impl ProgressReporter for CliReporter {
    fn on_outcome(&self, path: &Path, outcome: &ProcessingOutcome, _stats: &StatsSnapshot) {
        let line = outcome_line(path, outcome);
        let guard = self.bar();
        match guard.as_ref() {
            Some(pb) => {
                pb.println(line);
                pb.inc(1);
            }
            None => eprintln!("{}", line),
        }
    }

    fn on_sweep_start(&self, total_files: usize) {
        let pb = ProgressBar::new(total_files as u64);
        pb.set_style(
            ProgressStyle::with_template(
                "  {spinner:.cyan} Sorting [{bar:30.cyan/dim}] {pos}/{len} files ({eta} remaining)",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("━╸─")
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
        );
        pb.enable_steady_tick(Duration::from_millis(80));

        let mut guard = self.bar();
        if let Some(old) = guard.replace(pb) {
            old.finish_and_clear();
        }
    }

    fn on_sweep_complete(&self, stats: &StatsSnapshot) {
        if let Some(pb) = self.bar().take() {
            pb.finish_and_clear();
        }
        eprintln!("  {} Sweep complete: {}", "✓".green(), stats);
    }
}
