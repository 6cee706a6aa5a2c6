//! Terminal and JSON rendering of command results.

use std::fmt::Display;

use console::style;
use edge_packager::{ArtifactReport, Step};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;

/// Command output: styled text, or a single JSON document with `--json`.
#[derive(Clone)]
pub struct Output {
    verbose: bool,
    json: bool,
}

impl Output {
    pub fn new(verbose: bool, json: bool) -> Self {
        Self { verbose, json }
    }

    /// Print `value` as the command's JSON document.
    ///
    /// Returns false in text mode, leaving rendering to the caller.
    pub fn emit_json<T: Serialize>(&self, value: &T) -> bool {
        if !self.json {
            return false;
        }
        match serde_json::to_string_pretty(value) {
            Ok(doc) => println!("{}", doc),
            Err(e) => self.error(&format!("failed to encode output: {}", e)),
        }
        true
    }

    pub fn success(&self, msg: &str) {
        if !self.json {
            println!("{} {}", style("✓").green(), msg);
        }
    }

    pub fn warn(&self, msg: &str) {
        if !self.json {
            eprintln!("{} {}", style("⚠").yellow(), msg);
        }
    }

    /// Errors are reported in both modes; JSON mode keeps stdout clean.
    pub fn error(&self, msg: &str) {
        if self.json {
            eprintln!("{}", serde_json::json!({ "error": msg }));
        } else {
            eprintln!("{} {}", style("✗").red(), style(msg).red());
        }
    }

    /// Verbose-only diagnostics.
    pub fn debug(&self, msg: &str) {
        if self.verbose && !self.json {
            eprintln!("{} {}", style("→").dim(), style(msg).dim());
        }
    }

    pub fn title(&self, msg: &str) {
        if !self.json {
            println!("\n{}", style(msg).bold().underlined());
        }
    }

    /// A `[name]` group heading, as in the config file.
    pub fn section(&self, name: &str) {
        if !self.json {
            println!("\n{}", style(format!("[{}]", name)).cyan());
        }
    }

    pub fn field(&self, key: &str, value: impl Display) {
        if !self.json {
            println!("  {}: {}", style(key).dim(), value);
        }
    }

    /// Name, location, size and digest of a written artifact.
    pub fn artifact(&self, artifact: &ArtifactReport) {
        if self.json {
            return;
        }
        println!("{}", style(&artifact.name).bold());
        self.field("Path", artifact.path.display());
        self.field("Size", human_size(artifact.bytes));
        self.field("Entries", artifact.entries);
        self.field("SHA-256", &artifact.sha256);
    }

    /// Entry table of an archive.
    pub fn entries(&self, entries: &[(String, u64)]) {
        if self.json {
            return;
        }
        if entries.is_empty() {
            println!("  {}", style("(no entries)").dim());
            return;
        }

        let width = entries.iter().map(|(name, _)| name.len()).max().unwrap_or(0).max(4);
        println!("\n  {:width$}  {}", style("NAME").dim(), style("SIZE").dim(), width = width);
        for (name, size) in entries {
            println!("  {:width$}  {:>10}", name, human_size(*size), width = width);
        }
    }

    /// Spinner that follows pipeline steps. Hidden in JSON mode.
    pub fn steps(&self) -> StepProgress {
        if self.json {
            return StepProgress(ProgressBar::hidden());
        }

        let bar = ProgressBar::new_spinner();
        if let Ok(spinner_style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
            bar.set_style(spinner_style);
        }
        bar.set_message("Starting...");
        bar.enable_steady_tick(std::time::Duration::from_millis(100));
        StepProgress(bar)
    }
}

/// Packaging progress display, cheap to clone into a progress callback.
#[derive(Clone)]
pub struct StepProgress(ProgressBar);

impl StepProgress {
    pub fn step(&self, step: Step) {
        self.0.set_message(step_label(step));
    }

    pub fn finish(&self) {
        self.0.finish_and_clear();
    }
}

fn step_label(step: Step) -> String {
    format!(
        "{} {}",
        style(format!("[{}/{}]", step.number(), Step::TOTAL)).dim(),
        step
    )
}

fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 3] = ["KB", "MB", "GB"];

    if bytes < 1024 {
        return format!("{} B", bytes);
    }
    let mut size = bytes as f64 / 1024.0;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    format!("{:.2} {}", size, UNITS[unit])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_human_size() {
        assert_eq!(human_size(0), "0 B");
        assert_eq!(human_size(1023), "1023 B");
        assert_eq!(human_size(1536), "1.50 KB");
        assert_eq!(human_size(5 * 1024 * 1024), "5.00 MB");
        assert_eq!(human_size(3 * 1024 * 1024 * 1024), "3.00 GB");
    }

    #[test]
    fn test_step_label() {
        console::set_colors_enabled(false);
        assert_eq!(step_label(Step::Extract), "[1/7] Extracting bundle");
        assert_eq!(step_label(Step::Cleanup), "[7/7] Removing workspace");
    }

    #[test]
    fn test_emit_json_only_in_json_mode() {
        assert!(!Output::new(false, false).emit_json(&serde_json::json!({ "ok": true })));
        assert!(Output::new(false, true).emit_json(&serde_json::json!({ "ok": true })));
    }
}
