//! Output formatting module for tierctl
//!
//! Human output is colored text; JSON mode emits one JSON object per event.
//! Results go to stdout, diagnostics to stderr.

use colored::Colorize;
use serde_json::{json, Value};
use std::io::{self, Write};
use std::time::{Duration, Instant};
use tierctl::policy::{PolicyViolation, Severity};

/// Output formatter for different output modes
pub struct OutputFormatter {
    /// Use colored output
    use_color: bool,
    /// JSON output mode
    json_mode: bool,
    /// Verbosity level
    verbosity: u8,
    /// Start time for duration calculations
    start_time: Instant,
}

impl OutputFormatter {
    /// Create a new output formatter
    pub fn new(use_color: bool, json_mode: bool, verbosity: u8) -> Self {
        // Respect NO_COLOR environment variable
        let use_color = use_color && std::env::var("NO_COLOR").is_err();
        colored::control::set_override(use_color);

        Self {
            use_color,
            json_mode,
            verbosity,
            start_time: Instant::now(),
        }
    }

    /// Whether JSON output is active
    pub fn is_json(&self) -> bool {
        self.json_mode
    }

    /// Print a banner/header
    pub fn banner(&self, title: &str) {
        if self.json_mode {
            return;
        }

        let line = "=".repeat(title.len() + 4);
        if self.use_color {
            println!("\n{}", line.bright_blue());
            println!("{}", format!("  {title}  ").bright_blue().bold());
            println!("{}\n", line.bright_blue());
        } else {
            println!("\n{line}");
            println!("  {title}  ");
            println!("{line}\n");
        }
    }

    /// Print a section header
    pub fn section(&self, title: &str) {
        if self.json_mode {
            return;
        }

        if self.use_color {
            println!("\n{}", title.cyan().bold());
            println!("{}", "-".repeat(title.len()).cyan());
        } else {
            println!("\n{title}");
            println!("{}", "-".repeat(title.len()));
        }
    }

    /// Print an aligned `label: value` line
    pub fn field(&self, label: &str, value: &str) {
        if self.json_mode {
            return;
        }

        if self.use_color {
            println!("  {:<24} {}", format!("{label}:").bright_black(), value);
        } else {
            println!("  {:<24} {}", format!("{label}:"), value);
        }
    }

    /// Print a machine-readable result object on stdout
    pub fn json(&self, value: &Value) {
        println!("{value}");
    }

    /// Print the violations of one environment
    pub fn violations(&self, violations: &[PolicyViolation]) {
        if self.json_mode {
            for violation in violations {
                self.json(&json!({
                    "type": "violation",
                    "rule": violation.rule,
                    "field": violation.field,
                    "severity": violation.severity,
                    "message": violation.message,
                }));
            }
            return;
        }

        for violation in violations {
            let label = format!("[{}]", violation.severity);
            let label = if self.use_color {
                match violation.severity {
                    Severity::Critical => label.red().bold().to_string(),
                    Severity::High => label.red().to_string(),
                    Severity::Medium => label.yellow().to_string(),
                }
            } else {
                label
            };
            let rule = if self.use_color {
                violation.rule.as_str().bright_white().bold().to_string()
            } else {
                violation.rule.as_str().to_string()
            };
            println!("  {label} {rule} ({}): {}", violation.field, violation.message);
        }
    }

    /// Print a final success line
    pub fn success(&self, message: &str) {
        if self.json_mode {
            return;
        }

        if self.use_color {
            println!("\n{}", message.green().bold());
        } else {
            println!("\n{message}");
        }
    }

    /// Print a final failure line
    pub fn failure(&self, message: &str) {
        if self.json_mode {
            return;
        }

        if self.use_color {
            println!("\n{}", message.red().bold());
        } else {
            println!("\n{message}");
        }
    }

    /// Print an error message
    pub fn error(&self, message: &str) {
        if self.json_mode {
            let err = json!({
                "type": "error",
                "message": message
            });
            eprintln!("{err}");
            return;
        }

        if self.use_color {
            eprintln!("{} {}", "ERROR:".red().bold(), message);
        } else {
            eprintln!("ERROR: {message}");
        }
    }

    /// Print a warning message
    pub fn warning(&self, message: &str) {
        if self.json_mode {
            let warn = json!({
                "type": "warning",
                "message": message
            });
            eprintln!("{warn}");
            return;
        }

        if self.use_color {
            eprintln!("{} {}", "WARNING:".yellow().bold(), message);
        } else {
            eprintln!("WARNING: {message}");
        }
    }

    /// Print a hint message
    pub fn hint(&self, message: &str) {
        if self.json_mode {
            let hint = json!({
                "type": "hint",
                "message": message
            });
            eprintln!("{hint}");
            return;
        }

        if self.use_color {
            eprintln!("{} {}", "HINT:".cyan().bold(), message);
        } else {
            eprintln!("HINT: {message}");
        }
    }

    /// Print an info message (respects verbosity)
    pub fn info(&self, message: &str) {
        if self.verbosity < 1 {
            return;
        }

        if self.json_mode {
            let info = json!({
                "type": "info",
                "message": message
            });
            eprintln!("{info}");
            return;
        }

        if self.use_color {
            eprintln!("{} {}", "INFO:".blue(), message);
        } else {
            eprintln!("INFO: {message}");
        }
    }

    /// Print a debug message (requires higher verbosity)
    pub fn debug(&self, message: &str) {
        if self.verbosity < 2 {
            return;
        }

        if self.json_mode {
            let debug = json!({
                "type": "debug",
                "message": message
            });
            eprintln!("{debug}");
            return;
        }

        if self.use_color {
            eprintln!("{} {}", "DEBUG:".magenta(), message);
        } else {
            eprintln!("DEBUG: {message}");
        }
    }

    /// Print a table
    pub fn table(&self, headers: &[&str], rows: &[Vec<String>]) {
        if self.json_mode {
            self.json(&json!({
                "type": "table",
                "headers": headers,
                "rows": rows
            }));
            return;
        }

        // Calculate column widths
        let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
        for row in rows {
            for (i, cell) in row.iter().enumerate() {
                if i < widths.len() {
                    widths[i] = widths[i].max(cell.len());
                }
            }
        }

        let header_line = join_cells(headers.iter().copied(), &widths);
        if self.use_color {
            println!("{}", header_line.bright_white().bold());
        } else {
            println!("{header_line}");
        }

        let sep: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
        if self.use_color {
            println!("{}", sep.join("-+-").bright_black());
        } else {
            println!("{}", sep.join("-+-"));
        }

        for row in rows {
            println!("{}", join_cells(row.iter().map(String::as_str), &widths));
        }
    }

    /// Time since the formatter was created, human-readable
    pub fn elapsed(&self) -> String {
        format_duration(self.start_time.elapsed())
    }

    /// Flush stdout
    pub fn flush(&self) {
        let _ = io::stdout().flush();
    }
}

fn join_cells<'a>(cells: impl Iterator<Item = &'a str>, widths: &[usize]) -> String {
    cells
        .zip(widths)
        .map(|(cell, width)| format!("{cell:width$}"))
        .collect::<Vec<_>>()
        .join(" | ")
        .trim_end()
        .to_string()
}

/// Format a duration as a human-readable string
fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    let millis = duration.subsec_millis();

    if secs >= 60 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else if secs > 0 {
        format!("{secs}.{millis:03}s")
    } else {
        format!("{millis}ms")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_cells() {
        let line = join_cells(["dev", "1"].into_iter(), &[7, 3]);
        assert_eq!(line, "dev     | 1");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(500)), "500ms");
        assert_eq!(format_duration(Duration::from_secs(5)), "5.000s");
        assert_eq!(format_duration(Duration::from_secs(65)), "1m 5s");
    }
}
