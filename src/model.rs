use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

/// A single spreadsheet cell as the workflow sees it.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    #[default]
    Empty,
    Bool(bool),
    Number(f64),
    Text(String),
}

impl CellValue {
    pub fn text(value: impl Into<String>) -> Self {
        CellValue::Text(value.into())
    }

    /// Text cells become `Empty` when blank so rows written back stay clean.
    pub fn text_or_empty(value: impl Into<String>) -> Self {
        let value = value.into();
        if value.is_empty() {
            CellValue::Empty
        } else {
            CellValue::Text(value)
        }
    }

    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            CellValue::Bool(_) | CellValue::Number(_) => false,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Only a literal boolean `true` counts as a ticked checkbox.
    pub fn is_true(&self) -> bool {
        matches!(self, CellValue::Bool(true))
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Bool(b) => write!(f, "{}", if *b { "true" } else { "false" }),
            CellValue::Number(n) if n.fract() == 0.0 && n.is_finite() && n.abs() < 1e15 => {
                write!(f, "{}", *n as i64)
            }
            CellValue::Number(n) => write!(f, "{n}"),
            CellValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Text(value)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

impl From<bool> for CellValue {
    fn from(value: bool) -> Self {
        CellValue::Bool(value)
    }
}

/// Every problem found with one source sheet row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowError {
    pub row: u32,
    pub errors: Vec<String>,
}

impl RowError {
    pub fn new(row: u32, errors: Vec<String>) -> Self {
        Self { row, errors }
    }

    pub fn single(row: u32, error: impl Into<String>) -> Self {
        Self {
            row,
            errors: vec![error.into()],
        }
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumIter,
    EnumString,
    IntoStaticStr,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum Operation {
    Add,
    Edit,
    Trash,
    Restore,
    PermanentlyDelete,
}

impl Operation {
    /// Cloud endpoint name for this operation.
    pub fn endpoint(self) -> &'static str {
        match self {
            Operation::Add => "addMuseums",
            Operation::Edit => "editMuseums",
            Operation::Trash => "trashMuseums",
            Operation::Restore => "restoreMuseums",
            Operation::PermanentlyDelete => "permanentlyDeleteMuseums",
        }
    }

    /// Name of the success-count field in wire responses.
    pub fn count_field(self) -> &'static str {
        match self {
            Operation::Add => "addedCount",
            Operation::Edit => "editedCount",
            Operation::Trash => "trashedCount",
            Operation::Restore => "restoredCount",
            Operation::PermanentlyDelete => "deletedCount",
        }
    }

    /// Action label used when a whole run fails.
    pub fn action_label(self) -> &'static str {
        match self {
            Operation::Add => "Add",
            Operation::Edit => "Edit",
            Operation::Trash => "Trash",
            Operation::Restore => "Restore",
            Operation::PermanentlyDelete => "Permanent delete",
        }
    }
}

/// Outcome of one workflow run, rendered as a single summary for the user.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationReport {
    pub operation: Operation,
    pub count: usize,
    pub errors_by_row: Vec<RowError>,
    pub skipped_not_ready: usize,
    pub dry_run: bool,
    pub message: String,
}

impl OperationReport {
    pub fn empty(operation: Operation, message: impl Into<String>) -> Self {
        Self {
            operation,
            count: 0,
            errors_by_row: Vec::new(),
            skipped_not_ready: 0,
            dry_run: false,
            message: message.into(),
        }
    }

    pub fn has_errors(&self) -> bool {
        !self.errors_by_row.is_empty()
    }

    /// The single alert shown to the user for this run.
    pub fn summary(&self) -> String {
        if self.has_errors() {
            crate::ops::format_errors(
                &self.errors_by_row,
                self.count,
                self.operation,
                self.dry_run,
            )
        } else {
            self.message.clone()
        }
    }
}

impl Serialize for OperationReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("ok", &true)?;
        map.serialize_entry(self.operation.count_field(), &self.count)?;
        map.serialize_entry("errorsByRow", &self.errors_by_row)?;
        map.serialize_entry("skippedNotReady", &self.skipped_not_ready)?;
        map.serialize_entry("message", &self.message)?;
        if self.dry_run {
            map.serialize_entry("dryRun", &true)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integral_numbers_render_without_fraction() {
        assert_eq!(CellValue::Number(1999.0).to_string(), "1999");
        assert_eq!(CellValue::Number(2.5).to_string(), "2.5");
        assert_eq!(CellValue::Bool(true).to_string(), "true");
        assert_eq!(CellValue::Empty.to_string(), "");
    }

    #[test]
    fn only_boolean_true_is_ticked() {
        assert!(CellValue::Bool(true).is_true());
        assert!(!CellValue::text("TRUE").is_true());
        assert!(!CellValue::Number(1.0).is_true());
    }

    #[test]
    fn report_serializes_operation_specific_count() {
        let mut report = OperationReport::empty(Operation::Restore, "Restored 2 museums to Database.");
        report.count = 2;
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["restoredCount"], 2);
        assert_eq!(value["ok"], true);
        assert!(value["errorsByRow"].as_array().unwrap().is_empty());
    }
}
