use crate::layout::{DbColumns, DbField, SheetLayouts, SheetSpec};
use crate::lock::DocumentLock;
use crate::model::{CellValue, Operation, OperationReport, RowError};
use crate::normalize::trim_to_string;
use crate::validate::Vocabularies;
use crate::workbook::Workbook;
use anyhow::Result;
use std::collections::HashMap;
use tracing::{info, warn};

mod add;
mod edit;
mod populate;
mod purge;
mod restore;
mod trash;

pub use add::add_museums;
pub use edit::edit_museums;
pub use populate::{PickerSheet, populate_from_picker};
pub use purge::permanently_delete_museums;
pub use restore::restore_museums;
pub use trash::trash_museums;

/// Shown when a source row moved or changed between the scan and the lock.
pub const ROW_CHANGED_MESSAGE: &str = "Row changed before it could be committed. Run the action again.";

/// What every operation needs besides the workbook.
#[derive(Debug, Clone, Default)]
pub struct OperationContext {
    pub layouts: SheetLayouts,
    pub vocab: Vocabularies,
    pub dry_run: bool,
}

impl OperationContext {
    pub fn new(layouts: SheetLayouts, vocab: Vocabularies) -> Self {
        Self {
            layouts,
            vocab,
            dry_run: false,
        }
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }
}

/// Run `op` against `doc`.
///
/// Flagged rows are scanned bottom-up and validated under a brief
/// acquisition; the mutating phase then takes the lock and re-resolves every
/// cross-reference. Row problems land in the report as [`RowError`]s; only
/// configuration and platform failures come back as `Err`.
pub fn run_operation<W: Workbook>(
    op: Operation,
    doc: &DocumentLock<W>,
    ctx: &OperationContext,
) -> Result<OperationReport> {
    let report = match op {
        Operation::Add => add_museums(doc, ctx),
        Operation::Edit => edit_museums(doc, ctx),
        Operation::Trash => trash_museums(doc, ctx),
        Operation::Restore => restore_museums(doc, ctx),
        Operation::PermanentlyDelete => permanently_delete_museums(doc, ctx),
    }?;
    info!(
        operation = %op,
        count = report.count,
        errors = report.errors_by_row.len(),
        skipped = report.skipped_not_ready,
        dry_run = report.dry_run,
        "operation finished"
    );
    Ok(report)
}

/// One flagged source row as read during the scan.
#[derive(Debug, Clone)]
pub(crate) struct FlaggedRow {
    pub row: u32,
    pub values: Vec<CellValue>,
}

pub(crate) struct Scan {
    /// Flagged rows, highest row number first.
    pub flagged: Vec<FlaggedRow>,
    pub skipped_not_ready: usize,
}

/// Read every data row of `spec` and split it into flagged and skipped rows.
/// `Ok(None)` means the sheet holds no data rows at all.
pub(crate) fn scan_flagged_rows<W: Workbook + ?Sized>(
    workbook: &W,
    spec: &SheetSpec,
    width: u32,
    flag_col: u32,
) -> Result<Option<Scan>> {
    workbook.require_sheet(&spec.name)?;
    let first = spec.first_data_row();
    let last = workbook.last_row(&spec.name)?;
    if last < first {
        return Ok(None);
    }
    let rows = workbook.read_rows(&spec.name, first, last, width)?;
    let flag_idx = flag_col as usize - 1;
    let mut scan = Scan {
        flagged: Vec::new(),
        skipped_not_ready: 0,
    };
    for (offset, values) in rows.into_iter().enumerate().rev() {
        if values.get(flag_idx).is_some_and(CellValue::is_true) {
            scan.flagged.push(FlaggedRow {
                row: first + offset as u32,
                values,
            });
        } else {
            scan.skipped_not_ready += 1;
        }
    }
    Ok(Some(scan))
}

/// Museum ID → 1-indexed Database row. The first occurrence of an ID wins.
pub(crate) fn build_id_index<W: Workbook + ?Sized>(
    workbook: &W,
    layouts: &SheetLayouts,
) -> Result<HashMap<String, u32>> {
    let db = &layouts.database;
    workbook.require_sheet(&db.name)?;
    let id_col = DbColumns::DATABASE.col(DbField::Id);
    let mut index = HashMap::new();
    for row in db.first_data_row()..=workbook.last_row(&db.name)? {
        let id = trim_to_string(&workbook.read_cell(&db.name, row, id_col)?);
        if !id.is_empty() {
            index.entry(id).or_insert(row);
        }
    }
    Ok(index)
}

/// Re-read a scanned row inside the lock and check nothing moved it.
pub(crate) fn still_matches<W: Workbook + ?Sized>(
    workbook: &W,
    sheet: &str,
    row: &FlaggedRow,
) -> Result<bool> {
    let current = workbook.read_row(sheet, row.row, row.values.len() as u32)?;
    Ok(current == row.values)
}

pub(crate) fn require_sheets<W: Workbook + ?Sized>(
    workbook: &W,
    sheets: &[&SheetSpec],
) -> Result<()> {
    for spec in sheets {
        workbook.require_sheet(&spec.name)?;
    }
    Ok(())
}

/// Run the mutating phase, then persist whatever it managed to write even
/// when it failed part way.
pub(crate) fn commit<W, T>(workbook: &mut W, apply: impl FnOnce(&mut W) -> Result<T>) -> Result<T>
where
    W: Workbook + ?Sized,
{
    let outcome = apply(workbook);
    let flushed = workbook.flush();
    if let (Err(err), Err(flush_err)) = (&outcome, &flushed) {
        warn!(error = %err, flush_error = %flush_err, "flush after failed commit also failed");
    }
    let value = outcome?;
    flushed?;
    Ok(value)
}

/// Stamp the change date when the run mutated the Database cleanly.
pub(crate) fn stamp_if_clean<W: Workbook + ?Sized>(
    workbook: &mut W,
    layouts: &SheetLayouts,
    count: usize,
    errors: &[RowError],
) -> Result<()> {
    if count > 0 && errors.is_empty() {
        let stamp = crate::changelog::log_database_change(workbook, layouts)?;
        info!(stamp = %stamp, "database change logged");
    }
    Ok(())
}

pub(crate) fn museums(n: usize) -> &'static str {
    if n == 1 { "museum" } else { "museums" }
}

struct Wording {
    past: &'static str,
    infinitive: &'static str,
    target: &'static str,
    failed: &'static str,
}

fn wording(op: Operation) -> Wording {
    match op {
        Operation::Add => Wording {
            past: "Added",
            infinitive: "add",
            target: " to Database",
            failed: "added",
        },
        Operation::Edit => Wording {
            past: "Edited",
            infinitive: "edit",
            target: " in Database",
            failed: "edited",
        },
        Operation::Trash => Wording {
            past: "Moved",
            infinitive: "move",
            target: " to Trash",
            failed: "moved to Trash",
        },
        Operation::Restore => Wording {
            past: "Restored",
            infinitive: "restore",
            target: " to Database",
            failed: "restored",
        },
        Operation::PermanentlyDelete => Wording {
            past: "Permanently deleted",
            infinitive: "permanently delete",
            target: "",
            failed: "permanently deleted",
        },
    }
}

/// `"Added 2 museums to Database."` or the dry-run equivalent.
pub fn success_message(op: Operation, count: usize, dry_run: bool) -> String {
    let w = wording(op);
    if dry_run {
        format!(
            "Dry run: would {} {count} {}{}.",
            w.infinitive,
            museums(count),
            w.target
        )
    } else {
        format!("{} {count} {}{}.", w.past, museums(count), w.target)
    }
}

/// Message for a source sheet with no data rows.
pub fn nothing_to_do_message(op: Operation) -> &'static str {
    match op {
        Operation::Add => "No rows to add.",
        Operation::Edit => "No edits to commit.",
        Operation::Trash => "No deletions to commit.",
        Operation::Restore => "No restores to commit.",
        Operation::PermanentlyDelete => "No items to permanently delete.",
    }
}

/// Message for a sheet with rows but none flagged.
pub fn nothing_flagged_message(op: Operation) -> &'static str {
    match op {
        Operation::Add | Operation::Edit => "No rows marked ready to commit.",
        Operation::Trash => "No rows marked ready to delete.",
        Operation::Restore => "No rows marked ready to restore.",
        Operation::PermanentlyDelete => "No rows marked for permanent deletion.",
    }
}

/// Message when every flagged row failed validation.
pub fn nothing_valid_message(op: Operation) -> &'static str {
    match op {
        Operation::Add | Operation::Edit => "No valid rows marked ready to commit.",
        Operation::Trash => "No valid rows marked ready to delete.",
        Operation::Restore => "No valid rows marked ready to restore.",
        Operation::PermanentlyDelete => "No valid rows marked for permanent deletion.",
    }
}

/// The combined alert for a run with row errors:
///
/// ```text
/// Added 1 museum.
///
/// Some rows could not be added:
/// Row 3:
///   - Museum must have a name.
/// ```
///
/// A dry run opens with the dry-run summary instead, since nothing was written.
pub fn format_errors(errors: &[RowError], count: usize, op: Operation, dry_run: bool) -> String {
    let w = wording(op);
    let mut lines = Vec::new();
    if count > 0 {
        if dry_run {
            lines.push(success_message(op, count, true));
        } else {
            lines.push(format!("{} {count} {}.", w.past, museums(count)));
        }
        lines.push(String::new());
    }
    lines.push(format!("Some rows could not be {}:", w.failed));
    for row_error in errors {
        lines.push(format!("Row {}:", row_error.row));
        lines.extend(row_error.errors.iter().map(|e| format!("  - {e}")));
    }
    lines.join("\n")
}

/// Report for a run that stopped before touching anything.
pub(crate) fn early_report(op: Operation, scan: Option<Scan>) -> Result<Scan, OperationReport> {
    match scan {
        None => Err(OperationReport::empty(op, nothing_to_do_message(op))),
        Some(scan) if scan.flagged.is_empty() => {
            let mut report = OperationReport::empty(op, nothing_flagged_message(op));
            report.skipped_not_ready = scan.skipped_not_ready;
            Err(report)
        }
        Some(scan) => Ok(scan),
    }
}

pub(crate) fn final_report(
    op: Operation,
    count: usize,
    mut errors: Vec<RowError>,
    skipped_not_ready: usize,
    dry_run: bool,
) -> OperationReport {
    errors.sort_by_key(|e| e.row);
    let message = if count == 0 && !errors.is_empty() {
        nothing_valid_message(op).to_string()
    } else {
        success_message(op, count, dry_run)
    };
    OperationReport {
        operation: op,
        count,
        errors_by_row: errors,
        skipped_not_ready,
        dry_run,
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_messages_pluralise() {
        assert_eq!(
            success_message(Operation::Add, 1, false),
            "Added 1 museum to Database."
        );
        assert_eq!(
            success_message(Operation::Trash, 3, false),
            "Moved 3 museums to Trash."
        );
        assert_eq!(
            success_message(Operation::PermanentlyDelete, 2, false),
            "Permanently deleted 2 museums."
        );
        assert_eq!(
            success_message(Operation::Edit, 2, true),
            "Dry run: would edit 2 museums in Database."
        );
    }

    #[test]
    fn combined_error_message_layout() {
        let errors = vec![
            RowError::new(
                3,
                vec![
                    "Museum must have a name.".into(),
                    "Postcode x is not a correctly formatted UK postcode.".into(),
                ],
            ),
            RowError::single(5, "Museum must have a name."),
        ];
        assert_eq!(
            format_errors(&errors, 1, Operation::Add, false),
            "Added 1 museum.\n\nSome rows could not be added:\nRow 3:\n  - Museum must have a name.\n  - Postcode x is not a correctly formatted UK postcode.\nRow 5:\n  - Museum must have a name."
        );
        assert_eq!(
            format_errors(&errors[1..], 0, Operation::Restore, false),
            "Some rows could not be restored:\nRow 5:\n  - Museum must have a name."
        );
        assert_eq!(
            format_errors(&errors[1..], 2, Operation::Trash, true),
            "Dry run: would move 2 museums to Trash.\n\nSome rows could not be moved to Trash:\nRow 5:\n  - Museum must have a name."
        );
    }

    #[test]
    fn scan_walks_bottom_up_and_counts_skipped() {
        let wb = crate::workbook::MemoryWorkbook::new().with_sheet(
            "Add",
            vec![
                vec!["Ready".into()],
                vec![CellValue::Bool(true)],
                vec![CellValue::text("TRUE")],
                vec![CellValue::Bool(false)],
                vec![CellValue::Bool(true)],
            ],
        );
        let scan = scan_flagged_rows(&wb, &SheetSpec::new("Add"), 1, 1)
            .unwrap()
            .unwrap();
        let rows: Vec<u32> = scan.flagged.iter().map(|f| f.row).collect();
        assert_eq!(rows, vec![5, 2]);
        assert_eq!(scan.skipped_not_ready, 2);
    }

    #[test]
    fn header_only_sheet_scans_as_empty() {
        let wb = crate::workbook::MemoryWorkbook::new()
            .with_sheet("Add", vec![vec!["Ready".into()]]);
        assert!(
            scan_flagged_rows(&wb, &SheetSpec::new("Add"), 1, 1)
                .unwrap()
                .is_none()
        );
    }
}
