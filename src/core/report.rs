//! Hierarchical validation reports
//!
//! A [`Report`] is produced per examined container. Documentation containers
//! own one sub-report per referenced container that was resolved and
//! validated, so the tree mirrors the package nesting.

use serde::Serialize;
use std::fmt;

use super::fault::{Fault, FaultLevel};

/// Classification of a validated container
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContainerType {
    DocumentContainer,
    DocumentationContainer,
    Unknown,
}

impl fmt::Display for ContainerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ContainerType::DocumentContainer => "document container",
            ContainerType::DocumentationContainer => "documentation container",
            ContainerType::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageLevel {
    Error,
    Warning,
    Info,
}

impl From<FaultLevel> for MessageLevel {
    fn from(level: FaultLevel) -> Self {
        match level {
            FaultLevel::Error => MessageLevel::Error,
            FaultLevel::Warning => MessageLevel::Warning,
        }
    }
}

/// A leveled report line.
///
/// `code` is stable and language independent; `text` is the English
/// default rendering. `indent` only affects presentation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    pub level: MessageLevel,
    pub code: String,
    pub text: String,
    pub indent: usize,
}

impl Message {
    pub fn new(level: MessageLevel, code: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            level,
            code: code.into(),
            text: text.into(),
            indent: 0,
        }
    }

    pub fn error(code: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(MessageLevel::Error, code, text)
    }

    pub fn warning(code: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(MessageLevel::Warning, code, text)
    }

    pub fn info(code: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(MessageLevel::Info, code, text)
    }

    pub fn with_indent(mut self, indent: usize) -> Self {
        self.indent = indent;
        self
    }

    pub fn from_fault(fault: &Fault, indent: usize) -> Self {
        Self::new(fault.level.into(), fault.code(), fault.to_string()).with_indent(indent)
    }
}

/// Returns `true` if any message is an error.
pub fn messages_have_errors(messages: &[Message]) -> bool {
    messages.iter().any(|m| m.level == MessageLevel::Error)
}

/// Returns `true` if any message is a warning.
pub fn messages_have_warnings(messages: &[Message]) -> bool {
    messages.iter().any(|m| m.level == MessageLevel::Warning)
}

#[derive(Debug, Clone)]
pub struct Report {
    pub id: Option<String>,
    pub container_type: ContainerType,
    pub file_name: String,
    pub file_hash: Option<String>,
    messages: Vec<Message>,
    sub_reports: Vec<Report>,
}

impl Report {
    pub fn new(container_type: ContainerType, file_name: impl Into<String>) -> Self {
        Self {
            id: None,
            container_type,
            file_name: file_name.into(),
            file_hash: None,
            messages: Vec::new(),
            sub_reports: Vec::new(),
        }
    }

    pub fn add_message(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn add_messages<I>(&mut self, messages: I)
    where
        I: IntoIterator<Item = Message>,
    {
        self.messages.extend(messages);
    }

    /// Append faults as messages, preserving their order.
    pub fn add_faults(&mut self, faults: &[Fault], indent: usize) {
        self.messages
            .extend(faults.iter().map(|f| Message::from_fault(f, indent)));
    }

    /// Create an empty sub-report for `file_name` and return it for filling.
    pub fn create_sub_report(&mut self, file_name: impl Into<String>) -> &mut Report {
        self.sub_reports
            .push(Report::new(ContainerType::Unknown, file_name));
        let last = self.sub_reports.len() - 1;
        &mut self.sub_reports[last]
    }

    pub fn add_sub_report(&mut self, report: Report) {
        self.sub_reports.push(report);
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn sub_reports(&self) -> &[Report] {
        &self.sub_reports
    }

    pub fn error_messages(&self, recursive: bool) -> Vec<&Message> {
        self.collect(recursive, &|m| m.level == MessageLevel::Error)
    }

    pub fn warn_messages(&self, recursive: bool, include_errors: bool) -> Vec<&Message> {
        self.collect(recursive, &|m| {
            m.level == MessageLevel::Warning || (include_errors && m.level == MessageLevel::Error)
        })
    }

    pub fn info_messages(&self, recursive: bool) -> Vec<&Message> {
        self.collect(recursive, &|m| m.level == MessageLevel::Info)
    }

    fn collect<'a>(&'a self, recursive: bool, keep: &dyn Fn(&Message) -> bool) -> Vec<&'a Message> {
        let mut out: Vec<&Message> = self.messages.iter().filter(|m| keep(*m)).collect();
        if recursive {
            for sub in &self.sub_reports {
                out.extend(sub.collect(true, keep));
            }
        }
        out
    }

    /// `true` if this report or any sub-report holds an error.
    pub fn has_errors(&self) -> bool {
        messages_have_errors(&self.messages) || self.sub_reports.iter().any(Report::has_errors)
    }

    /// `true` if this report or any sub-report holds a warning.
    pub fn has_warnings(&self) -> bool {
        messages_have_warnings(&self.messages) || self.sub_reports.iter().any(Report::has_warnings)
    }

    /// Serializable projection of the tree with messages split by level.
    pub fn summary(&self) -> ReportSummary {
        let texts = |level: MessageLevel| -> Vec<MessageSummary> {
            self.messages
                .iter()
                .filter(|m| m.level == level)
                .map(|m| MessageSummary {
                    code: m.code.clone(),
                    text: m.text.clone(),
                })
                .collect()
        };

        ReportSummary {
            id: self.id.clone(),
            container_type: self.container_type,
            file_name: self.file_name.clone(),
            file_hash: self.file_hash.clone(),
            errors: texts(MessageLevel::Error),
            warnings: texts(MessageLevel::Warning),
            infos: texts(MessageLevel::Info),
            sub_reports: self.sub_reports.iter().map(Report::summary).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageSummary {
    pub code: String,
    pub text: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSummary {
    pub id: Option<String>,
    pub container_type: ContainerType,
    pub file_name: String,
    pub file_hash: Option<String>,
    pub errors: Vec<MessageSummary>,
    pub warnings: Vec<MessageSummary>,
    pub infos: Vec<MessageSummary>,
    pub sub_reports: Vec<ReportSummary>,
}
