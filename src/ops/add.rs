use super::{
    OperationContext, commit, early_report, final_report, require_sheets, scan_flagged_rows,
    stamp_if_clean, still_matches, ROW_CHANGED_MESSAGE,
};
use crate::ids::IdAllocator;
use crate::layout::{DbColumns, FormLayout};
use crate::lock::DocumentLock;
use crate::model::{Operation, OperationReport, RowError};
use crate::rows::form_to_db;
use crate::validate::validate_form_row;
use crate::workbook::Workbook;
use anyhow::Result;
use tracing::debug;

/// Commit every ready Add row as a new Database record with a fresh ID.
pub fn add_museums<W: Workbook>(
    doc: &DocumentLock<W>,
    ctx: &OperationContext,
) -> Result<OperationReport> {
    let op = Operation::Add;
    let layout = FormLayout::ADD;
    let source = &ctx.layouts.add;
    let db = &ctx.layouts.database;

    let scan = doc.read(|wb| scan_flagged_rows(wb, source, layout.width(), layout.ready_col))??;
    let scan = match early_report(op, scan) {
        Ok(scan) => scan,
        Err(report) => return Ok(report),
    };

    let mut errors = Vec::new();
    let mut actions = Vec::new();
    for flagged in scan.flagged {
        let problems = validate_form_row(&flagged.values, &layout, &ctx.vocab);
        if problems.is_empty() {
            actions.push(flagged);
        } else {
            errors.push(RowError::new(flagged.row, problems));
        }
    }
    if actions.is_empty() || ctx.dry_run {
        return Ok(final_report(
            op,
            actions.len(),
            errors,
            scan.skipped_not_ready,
            ctx.dry_run,
        ));
    }

    let mut guard = doc.lock()?;
    let wb = &mut *guard;
    require_sheets(wb, &[db, source, &ctx.layouts.instructions])?;
    let count = commit(wb, |wb| {
        let mut ready = Vec::new();
        for action in actions {
            if still_matches(wb, &source.name, &action)? {
                ready.push(action);
            } else {
                errors.push(RowError::single(action.row, ROW_CHANGED_MESSAGE));
            }
        }
        let ids = IdAllocator::new(&ctx.layouts).allocate(wb, ready.len())?;
        let db_width = wb.last_column(&db.name)?.max(DbColumns::DATABASE.width());
        for (action, id) in ready.iter().zip(&ids) {
            let target = wb.last_row(&db.name)?.max(db.header_row) + 1;
            let record = form_to_db(None, db_width, &action.values, &layout, id);
            wb.write_row(&db.name, target, &record)?;
            wb.delete_row(&source.name, action.row)?;
            debug!(row = action.row, id = %id, db_row = target, "museum added");
        }
        stamp_if_clean(wb, &ctx.layouts, ready.len(), &errors)?;
        Ok(ready.len())
    })?;

    Ok(final_report(op, count, errors, scan.skipped_not_ready, false))
}
