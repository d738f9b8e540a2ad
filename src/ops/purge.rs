use super::{
    OperationContext, commit, early_report, final_report, require_sheets, scan_flagged_rows,
    stamp_if_clean, still_matches, ROW_CHANGED_MESSAGE,
};
use crate::layout::{DbColumns, trash_sheet};
use crate::lock::DocumentLock;
use crate::model::{Operation, OperationReport, RowError};
use crate::workbook::Workbook;
use anyhow::Result;
use tracing::{debug, warn};

/// Remove every Trash row flagged for permanent deletion. A row that fails
/// to delete is reported and the rest of the batch carries on.
pub fn permanently_delete_museums<W: Workbook>(
    doc: &DocumentLock<W>,
    ctx: &OperationContext,
) -> Result<OperationReport> {
    let op = Operation::PermanentlyDelete;
    let source = &ctx.layouts.trash;

    let scan = doc.read(|wb| -> Result<_> {
        wb.require_sheet(&source.name)?;
        let width = wb.last_column(&source.name)?.max(DbColumns::TRASH.width());
        scan_flagged_rows(wb, source, width, trash_sheet::PERMANENTLY_DELETE_COL)
    })??;
    let scan = match early_report(op, scan) {
        Ok(scan) => scan,
        Err(report) => return Ok(report),
    };
    if ctx.dry_run {
        return Ok(final_report(
            op,
            scan.flagged.len(),
            Vec::new(),
            scan.skipped_not_ready,
            true,
        ));
    }

    let mut errors = Vec::new();
    let mut guard = doc.lock()?;
    let wb = &mut *guard;
    require_sheets(wb, &[source, &ctx.layouts.instructions])?;
    let count = commit(wb, |wb| {
        let mut deleted = 0;
        for flagged in &scan.flagged {
            if !still_matches(wb, &source.name, flagged)? {
                errors.push(RowError::single(flagged.row, ROW_CHANGED_MESSAGE));
                continue;
            }
            match wb.delete_row(&source.name, flagged.row) {
                Ok(()) => {
                    deleted += 1;
                    debug!(row = flagged.row, "trash row deleted");
                }
                Err(err) => {
                    warn!(row = flagged.row, error = %err, "permanent delete failed");
                    errors.push(RowError::single(flagged.row, "Failed to permanently delete row."));
                }
            }
        }
        stamp_if_clean(wb, &ctx.layouts, deleted, &errors)?;
        Ok(deleted)
    })?;

    Ok(final_report(op, count, errors, scan.skipped_not_ready, false))
}
