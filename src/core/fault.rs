//! Structured validation findings

use serde::Serialize;
use std::fmt;

/// Severity of a [`Fault`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FaultLevel {
    Error,
    Warning,
}

impl FaultLevel {
    /// Level for a borderline omission: an error in strict mode, a warning otherwise.
    pub fn for_omission(strict: bool) -> Self {
        if strict {
            FaultLevel::Error
        } else {
            FaultLevel::Warning
        }
    }
}

/// Semantic category of a [`Fault`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FaultType {
    IsNull,
    IsEmpty,
    HasInvalidValue,
    IsInconsistent,
    HasDuplicateValue,
    ExceedsUpperBound,
    ExceedsLowerBound,
    Unknown,
}

impl FaultType {
    /// Stable identifier used in message codes and statistics.
    pub fn as_str(&self) -> &'static str {
        match self {
            FaultType::IsNull => "is_null",
            FaultType::IsEmpty => "is_empty",
            FaultType::HasInvalidValue => "has_invalid_value",
            FaultType::IsInconsistent => "is_inconsistent",
            FaultType::HasDuplicateValue => "has_duplicate_value",
            FaultType::ExceedsUpperBound => "exceeds_upper_bound",
            FaultType::ExceedsLowerBound => "exceeds_lower_bound",
            FaultType::Unknown => "unknown",
        }
    }
}

/// A single validation finding.
///
/// `field` names the validated property (e.g. `DocumentVersion.DigitalFile`),
/// `index` is the position inside the collection being validated, if any.
/// Faults are immutable once built; the `with_*` helpers consume and return
/// a new value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Fault {
    pub level: FaultLevel,
    pub fault_type: FaultType,
    pub field: String,
    pub index: Option<usize>,
    pub message: String,
    pub original_value: Option<String>,
}

impl Fault {
    pub fn new(
        level: FaultLevel,
        fault_type: FaultType,
        field: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            level,
            fault_type,
            field: field.into(),
            index: None,
            message: message.into(),
            original_value: None,
        }
    }

    pub fn error(fault_type: FaultType, field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(FaultLevel::Error, fault_type, field, message)
    }

    pub fn warning(fault_type: FaultType, field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(FaultLevel::Warning, fault_type, field, message)
    }

    pub fn with_index(mut self, index: usize) -> Self {
        self.index = Some(index);
        self
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.original_value = Some(value.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.level == FaultLevel::Error
    }

    /// Stable code, e.g. `fault.is_empty.DocumentId`
    pub fn code(&self) -> String {
        format!("fault.{}.{}", self.fault_type.as_str(), self.field)
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.field)?;
        if let Some(index) = self.index {
            write!(f, "[{}]", index)?;
        }
        write!(f, ": {}", self.message)?;
        if let Some(ref value) = self.original_value {
            write!(f, " (value: '{}')", value)?;
        }
        Ok(())
    }
}

/// Returns `true` if any fault is an error.
pub fn has_errors(faults: &[Fault]) -> bool {
    faults.iter().any(Fault::is_error)
}

/// Returns `true` if any fault is a warning.
pub fn has_warnings(faults: &[Fault]) -> bool {
    faults.iter().any(|f| f.level == FaultLevel::Warning)
}
