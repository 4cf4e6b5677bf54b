// Reporting and output for scanforge
// Exports findings as CSV, Markdown or JSON into a chosen directory

use crate::models::{Finding, ScanReport};
use chrono::Local;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Escape CSV field to prevent formula injection attacks
/// Cells starting with =, +, -, @, or tab are prefixed with single quote
fn escape_csv_field(field: &str) -> String {
    let Some(first_char) = field.chars().next() else {
        return String::new();
    };
    let needs_escaping = matches!(first_char, '=' | '+' | '-' | '@' | '\t');

    if needs_escaping {
        format!("\"'{}\"", field.replace('"', "\"\""))
    } else if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn report_path(dir: &Path, extension: &str) -> PathBuf {
    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    dir.join(format!("scanforge_report_{}.{}", timestamp, extension))
}

pub fn export_csv(findings: &[Finding], dir: &Path) -> Result<PathBuf, std::io::Error> {
    let path = report_path(dir, "csv");
    let mut file = File::create(&path)?;

    writeln!(file, "Type,URL,Parameter,Payload,Evidence,Timestamp")?;
    for f in findings {
        writeln!(
            file,
            "{},{},{},{},{},{}",
            escape_csv_field(&f.kind),
            escape_csv_field(f.target.as_str()),
            escape_csv_field(f.parameter.as_deref().unwrap_or("")),
            escape_csv_field(&f.payload),
            escape_csv_field(&f.evidence),
            f.timestamp.to_rfc3339()
        )?;
    }

    Ok(path)
}

pub fn export_markdown(report: &ScanReport, dir: &Path) -> Result<PathBuf, std::io::Error> {
    let path = report_path(dir, "md");
    let mut file = File::create(&path)?;

    writeln!(file, "# Scan Report: {}\n", report.target)?;
    writeln!(file, "Parameters probed: {}\n", report.parameters.as_slice().join(", "))?;

    writeln!(file, "## Detectors\n")?;
    for (kind, outcome) in &report.outcomes {
        writeln!(file, "- **{}**: {:?}", kind, outcome)?;
    }

    writeln!(file, "\n## Findings\n")?;
    if report.findings.is_empty() {
        writeln!(file, "No vulnerabilities found.")?;
    }
    for f in &report.findings {
        writeln!(
            file,
            "- **{}** `{}` payload `{}`: {}",
            f.kind,
            f.parameter.as_deref().unwrap_or("-"),
            f.payload,
            f.evidence
        )?;
    }

    Ok(path)
}

pub fn export_json(report: &ScanReport, dir: &Path) -> Result<PathBuf, std::io::Error> {
    let path = report_path(dir, "json");
    let json = serde_json::to_string_pretty(report)?;
    std::fs::write(&path, json)?;
    Ok(path)
}
