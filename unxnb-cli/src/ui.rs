//! Console reporter: colored step output and a per-file progress bar.

use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use unxnb_core::{ProgressReporter, ProgressStep, UnpackFailedReason};

fn bar_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-")
}

/// Drives the console output for one run.
pub struct ConsoleReporter {
    total_files: u64,
    bar: Option<ProgressBar>,
}

impl ConsoleReporter {
    pub fn new(total_files: usize) -> Self {
        Self {
            total_files: total_files as u64,
            bar: None,
        }
    }

    /// Print above the bar while it's live, or directly otherwise.
    fn println(&self, line: &str) {
        match &self.bar {
            Some(bar) => bar.println(line),
            None => println!("{line}"),
        }
    }
}

impl ProgressReporter for ConsoleReporter {
    fn on_start_error(&mut self, error: &str) {
        eprintln!("{} {}", "✗".red().bold(), error.red());
    }

    fn on_step_changed(&mut self, step: ProgressStep, message: &str) {
        match step {
            ProgressStep::Unpacking => {
                println!("{message}");
                let bar = ProgressBar::new(self.total_files);
                bar.set_style(bar_style());
                self.bar = Some(bar);
            }
            ProgressStep::Done => {
                if let Some(bar) = self.bar.take() {
                    bar.finish_and_clear();
                }
                println!("{}", message.bright_green());
            }
            _ => println!("{message}"),
        }
    }

    fn on_file_unpacking(&mut self, relative_path: &str) {
        if let Some(bar) = &self.bar {
            bar.set_message(relative_path.to_string());
            bar.inc(1);
        }
    }

    fn on_file_unpack_failed(
        &mut self,
        relative_path: &str,
        reason: UnpackFailedReason,
        message: &str,
    ) {
        let line = format!("{relative_path}: {message}");
        // unsupported types are expected noise; real failures stand out in red
        let line = match reason {
            UnpackFailedReason::UnsupportedFileType => line.yellow(),
            _ => line.red(),
        };
        self.println(&line.to_string());
    }
}
