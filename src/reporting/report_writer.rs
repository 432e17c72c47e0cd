//! Report writing functionality

use anyhow::{Context, Result};
use chrono::Local;
use std::fmt::Write as _;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::core::{MessageLevel, Report, ReportSummary};

/// Render one report tree as indented plain text.
pub fn render_text(report: &Report) -> String {
    let mut out = String::new();
    render_into(&mut out, report, 0);
    out
}

fn render_into(out: &mut String, report: &Report, depth: usize) {
    let pad = "  ".repeat(depth);
    let _ = write!(out, "{}Container: {} [{}]", pad, report.file_name, report.container_type);
    if let Some(ref id) = report.id {
        let _ = write!(out, " id={}", id);
    }
    out.push('\n');
    if let Some(ref hash) = report.file_hash {
        let _ = writeln!(out, "{}  SHA-256: {}", pad, hash);
    }

    for message in report.messages() {
        let level = match message.level {
            MessageLevel::Error => "ERROR",
            MessageLevel::Warning => "WARN ",
            MessageLevel::Info => "INFO ",
        };
        let indent = "  ".repeat(message.indent);
        let _ = writeln!(out, "{}  {}{} [{}] {}", pad, indent, level, message.code, message.text);
    }

    for sub in report.sub_reports() {
        render_into(out, sub, depth + 1);
    }
}

/// Write a human-readable report for several validated inputs
///
/// # Arguments
/// * `output_path` - Path to the output report file
/// * `reports` - Report trees, one per validated input
pub fn write_text_report(output_path: &Path, reports: &[Report]) -> Result<()> {
    let file = File::create(output_path)
        .with_context(|| format!("cannot create report file {}", output_path.display()))?;
    let mut file = BufWriter::new(file);

    writeln!(file, "VDI 2770 Validation Report")?;
    writeln!(file, "==========================")?;
    writeln!(file, "Generated: {}", Local::now().to_rfc3339())?;
    writeln!(file)?;

    let accepted = reports.iter().filter(|r| !r.has_errors()).count();
    let rejected = reports.len() - accepted;

    writeln!(file, "Summary Statistics:")?;
    writeln!(file, "-------------------")?;
    writeln!(file, "  Containers validated: {}", reports.len())?;
    writeln!(file, "  Accepted: {}", accepted)?;
    writeln!(file, "  Rejected: {}", rejected)?;
    if !reports.is_empty() {
        let pct = (accepted as f64 / reports.len() as f64) * 100.0;
        writeln!(file, "  Acceptance rate: {:.2}%", pct)?;
    }
    writeln!(file)?;

    for report in reports {
        write!(file, "{}", render_text(report))?;
        writeln!(file)?;
    }

    file.flush()?;
    Ok(())
}

/// Write the serializable report trees as a JSON array
///
/// # Arguments
/// * `output_path` - Path to the output JSON file
/// * `reports` - Report trees, one per validated input
pub fn write_json_report(output_path: &Path, reports: &[Report]) -> Result<()> {
    let file = File::create(output_path)
        .with_context(|| format!("cannot create report file {}", output_path.display()))?;
    let summaries: Vec<ReportSummary> = reports.iter().map(Report::summary).collect();

    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, &summaries)?;
    writer.flush()?;
    Ok(())
}
