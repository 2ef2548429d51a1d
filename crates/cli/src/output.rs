//! Report formatting

use chirpcheck_harness::{ResultSet, Summary, TestResult};
use clap::ValueEnum;
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Cell, Color, ContentArrangement, Table};
use serde::Serialize;
use std::fmt::Write;

/// Output format
#[derive(Debug, Clone, Copy, ValueEnum, Default)]
pub enum OutputFormat {
    /// Summary table followed by failure details
    #[default]
    Table,
    /// The whole result set as JSON
    Json,
    /// One line per result, then failure details
    Plain,
}

#[derive(Serialize)]
struct Report<'a> {
    summary: Summary,
    results: &'a [TestResult],
}

/// Print the end-of-run report
pub fn print_report(results: &ResultSet, format: OutputFormat) {
    print!("{}", render_report(results, format));
}

pub fn render_report(results: &ResultSet, format: OutputFormat) -> String {
    let summary = results.summary();
    let mut out = String::new();

    match format {
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic);

            table.set_header(vec!["", "Check", "Message", "ms"]);
            for result in results.results() {
                let glyph = if result.success {
                    Cell::new("✓").fg(Color::Green)
                } else {
                    Cell::new("✗").fg(Color::Red)
                };
                table.add_row(vec![
                    glyph,
                    Cell::new(&result.name),
                    Cell::new(&result.message),
                    Cell::new(result.duration_ms),
                ]);
            }

            let _ = writeln!(out, "{table}");
            write_summary(&mut out, &summary);
            write_failures(&mut out, results);
        }
        OutputFormat::Json => {
            let report = Report {
                summary,
                results: results.results(),
            };
            let _ = writeln!(out, "{}", serde_json::to_string_pretty(&report).unwrap_or_default());
        }
        OutputFormat::Plain => {
            for result in results.results() {
                let status = if result.success { "PASS" } else { "FAIL" };
                let _ = writeln!(out, "{} {}: {}", status, result.name, result.message);
            }
            write_summary(&mut out, &summary);
            write_failures(&mut out, results);
        }
    }

    out
}

fn write_summary(out: &mut String, summary: &Summary) {
    let failed = if summary.failed > 0 {
        summary.failed.to_string().red()
    } else {
        summary.failed.to_string().normal()
    };

    let _ = writeln!(out);
    let _ = writeln!(out, "📊 Test Results Summary");
    let _ = writeln!(out, "   Total:        {}", summary.total);
    let _ = writeln!(out, "   Passed:       {}", summary.passed.to_string().green());
    let _ = writeln!(out, "   Failed:       {}", failed);
    let _ = writeln!(out, "   Success rate: {:.1}%", summary.success_rate);
}

fn write_failures(out: &mut String, results: &ResultSet) {
    let failures: Vec<&TestResult> = results.failures().collect();
    if failures.is_empty() {
        return;
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "{}", "Failed checks:".red().bold());
    for failure in failures {
        let _ = writeln!(out, "  ✗ {} - {}", failure.name.bold(), failure.message);
        if let Some(details) = &failure.details {
            let pretty = serde_json::to_string_pretty(details).unwrap_or_default();
            for line in pretty.lines() {
                let _ = writeln!(out, "      {}", line.dimmed());
            }
        }
    }
}

/// Print error message
pub fn print_error(message: &str) {
    eprintln!("❌ {}", message);
}

/// Print warning message
pub fn print_warning(message: &str) {
    eprintln!("⚠️  {}", message);
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> ResultSet {
        let mut set = ResultSet::new();
        set.pass("Server Health Check", "Server is running");
        set.fail(
            "Mark All Notifications Read",
            "Assertion failed: every notification isRead",
            Some(json!({ "kind": "assertion", "actual": ["n3"] })),
        );
        set
    }

    #[test]
    fn test_plain_report_lists_failure_details() {
        colored::control::set_override(false);
        let report = render_report(&sample(), OutputFormat::Plain);

        assert!(report.contains("PASS Server Health Check: Server is running"));
        assert!(report.contains("FAIL Mark All Notifications Read"));
        assert!(report.contains("Success rate: 50.0%"));
        assert!(report.contains("Failed checks:"));
        assert!(report.contains("  ✗ Mark All Notifications Read - Assertion failed"));
        assert!(report.contains("\"n3\""));
    }

    #[test]
    fn test_json_report_carries_summary() {
        let report = render_report(&sample(), OutputFormat::Json);
        let value: serde_json::Value = serde_json::from_str(&report).unwrap();
        assert_eq!(value["summary"]["failed"], 1);
        assert_eq!(value["results"][1]["details"]["actual"][0], "n3");
    }
}
