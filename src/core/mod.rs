//! Fault and report model shared by every validation stage

pub mod fault;
pub mod report;

pub use fault::{has_errors, has_warnings, Fault, FaultLevel, FaultType};
pub use report::{ContainerType, Message, MessageLevel, Report, ReportSummary};
