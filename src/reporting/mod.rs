//! Report output and statistics

pub mod report_writer;
pub mod statistics;

pub use report_writer::{render_text, write_json_report, write_text_report};
pub use statistics::{StatisticsRecord, StatisticsSink};
