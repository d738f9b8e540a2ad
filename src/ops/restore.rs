use super::{
    FlaggedRow, OperationContext, build_id_index, commit, early_report, final_report,
    require_sheets, scan_flagged_rows, stamp_if_clean, still_matches, ROW_CHANGED_MESSAGE,
};
use crate::layout::{DbColumns, DbField, trash_sheet};
use crate::lock::DocumentLock;
use crate::model::{Operation, OperationReport, RowError};
use crate::normalize::trim_to_string;
use crate::rows::db_to_db;
use crate::workbook::Workbook;
use anyhow::Result;
use std::collections::HashMap;
use tracing::debug;

struct RestoreAction {
    flagged: FlaggedRow,
    museum_id: String,
}

fn already_exists(id: &str, db_sheet: &str) -> String {
    format!("Museum ID \"{id}\" already exists in {db_sheet}.")
}

/// Walk actions bottom-up, rejecting IDs the Database already holds. Each
/// accepted ID is added to `index` so a repeat later in the batch is caught.
fn plan(
    actions: Vec<RestoreAction>,
    index: &mut HashMap<String, u32>,
    mut next_db_row: u32,
    db_sheet: &str,
    errors: &mut Vec<RowError>,
) -> Vec<(RestoreAction, u32)> {
    let mut accepted = Vec::new();
    for action in actions {
        if index.contains_key(&action.museum_id) {
            errors.push(RowError::single(
                action.flagged.row,
                already_exists(&action.museum_id, db_sheet),
            ));
            continue;
        }
        index.insert(action.museum_id.clone(), next_db_row);
        accepted.push((action, next_db_row));
        next_db_row += 1;
    }
    accepted
}

/// Move every Trash row flagged for restore back into Database.
pub fn restore_museums<W: Workbook>(
    doc: &DocumentLock<W>,
    ctx: &OperationContext,
) -> Result<OperationReport> {
    let op = Operation::Restore;
    let source = &ctx.layouts.trash;
    let db = &ctx.layouts.database;
    let columns = DbColumns::TRASH;

    let scan = doc.read(|wb| -> Result<_> {
        wb.require_sheet(&source.name)?;
        let width = wb.last_column(&source.name)?.max(columns.width());
        scan_flagged_rows(wb, source, width, trash_sheet::RESTORE_COL)
    })??;
    let scan = match early_report(op, scan) {
        Ok(scan) => scan,
        Err(report) => return Ok(report),
    };

    let mut errors = Vec::new();
    let mut actions = Vec::new();
    for flagged in scan.flagged {
        let museum_id = flagged
            .values
            .get(columns.index(DbField::Id))
            .map(trim_to_string)
            .unwrap_or_default();
        if museum_id.is_empty() {
            errors.push(RowError::single(flagged.row, "Trash row is missing a Museum ID."));
        } else {
            actions.push(RestoreAction { flagged, museum_id });
        }
    }
    if actions.is_empty() {
        return Ok(final_report(op, 0, errors, scan.skipped_not_ready, ctx.dry_run));
    }
    if ctx.dry_run {
        let (mut index, next) = doc.read(|wb| -> Result<_> {
            Ok((
                build_id_index(wb, &ctx.layouts)?,
                wb.last_row(&db.name)?.max(db.header_row) + 1,
            ))
        })??;
        let accepted = plan(actions, &mut index, next, &db.name, &mut errors);
        return Ok(final_report(op, accepted.len(), errors, scan.skipped_not_ready, true));
    }

    let mut guard = doc.lock()?;
    let wb = &mut *guard;
    require_sheets(wb, &[db, source, &ctx.layouts.instructions])?;
    let count = commit(wb, |wb| {
        let mut current = Vec::new();
        for action in actions {
            if still_matches(wb, &source.name, &action.flagged)? {
                current.push(action);
            } else {
                errors.push(RowError::single(action.flagged.row, ROW_CHANGED_MESSAGE));
            }
        }
        let mut index = build_id_index(wb, &ctx.layouts)?;
        let next = wb.last_row(&db.name)?.max(db.header_row) + 1;
        let accepted = plan(current, &mut index, next, &db.name, &mut errors);
        let db_width = wb.last_column(&db.name)?.max(DbColumns::DATABASE.width());
        for (action, db_row) in &accepted {
            let record = db_to_db(&action.flagged.values, columns, DbColumns::DATABASE, db_width);
            wb.write_row(&db.name, *db_row, &record)?;
            wb.delete_row(&source.name, action.flagged.row)?;
            debug!(id = %action.museum_id, db_row, "museum restored");
        }
        stamp_if_clean(wb, &ctx.layouts, accepted.len(), &errors)?;
        Ok(accepted.len())
    })?;

    Ok(final_report(op, count, errors, scan.skipped_not_ready, false))
}
