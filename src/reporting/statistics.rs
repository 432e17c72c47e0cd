//! Append-only validation statistics
//!
//! One `;`-separated line per validation:
//! `hash;timestamp;error codes;warning codes`, codes joined by `,`.

use chrono::{DateTime, Utc};
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::core::Report;

const HEADER: &str = "hash;timestamp;errors;warnings";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatisticsRecord {
    pub hash: String,
    pub timestamp: DateTime<Utc>,
    pub error_codes: Vec<String>,
    pub warning_codes: Vec<String>,
}

impl StatisticsRecord {
    /// Record for a finished validation, codes collected over the whole tree.
    pub fn from_report(report: &Report) -> Self {
        Self {
            hash: report.file_hash.clone().unwrap_or_default(),
            timestamp: Utc::now(),
            error_codes: report.error_messages(true).iter().map(|m| m.code.clone()).collect(),
            warning_codes: report
                .warn_messages(true, false)
                .iter()
                .map(|m| m.code.clone())
                .collect(),
        }
    }

    pub fn to_line(&self) -> String {
        format!(
            "{};{};{};{}",
            self.hash,
            self.timestamp.to_rfc3339(),
            self.error_codes.join(","),
            self.warning_codes.join(",")
        )
    }
}

/// Statistics file owned by the caller; records are only ever appended.
#[derive(Debug, Clone)]
pub struct StatisticsSink {
    path: PathBuf,
}

impl StatisticsSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record, writing the header first into a new or empty file.
    pub fn append(&self, record: &StatisticsRecord) -> io::Result<()> {
        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        if file.metadata()?.len() == 0 {
            writeln!(file, "{}", HEADER)?;
        }
        writeln!(file, "{}", record.to_line())
    }
}
