use super::edit::{invalid_picker, not_found};
use super::{
    FlaggedRow, OperationContext, build_id_index, commit, early_report, final_report,
    require_sheets, scan_flagged_rows, stamp_if_clean, still_matches, ROW_CHANGED_MESSAGE,
};
use crate::layout::{DbColumns, DbField, delete_sheet};
use crate::lock::DocumentLock;
use crate::model::{Operation, OperationReport, RowError};
use crate::normalize::parse_composite_id;
use crate::rows::db_to_db;
use crate::workbook::Workbook;
use anyhow::Result;
use std::collections::{HashMap, HashSet};
use tracing::debug;

struct TrashAction {
    flagged: FlaggedRow,
    museum_id: String,
}

struct Resolved {
    source_row: u32,
    museum_id: String,
    db_row: u32,
}

/// Resolve IDs to Database rows. A museum named twice in one batch is only
/// moved once; the later row gets an error.
fn resolve(
    actions: Vec<TrashAction>,
    index: &HashMap<String, u32>,
    db_sheet: &str,
    errors: &mut Vec<RowError>,
) -> Vec<Resolved> {
    let mut claimed = HashSet::new();
    let mut resolved = Vec::new();
    for action in actions {
        let row = action.flagged.row;
        match index.get(&action.museum_id) {
            None => errors.push(RowError::single(row, not_found(&action.museum_id, db_sheet))),
            Some(_) if !claimed.insert(action.museum_id.clone()) => errors.push(RowError::single(
                row,
                format!("Museum ID \"{}\" is listed more than once.", action.museum_id),
            )),
            Some(&db_row) => resolved.push(Resolved {
                source_row: row,
                museum_id: action.museum_id,
                db_row,
            }),
        }
    }
    resolved
}

/// Move every ready Delete row's museum from Database into Trash.
pub fn trash_museums<W: Workbook>(
    doc: &DocumentLock<W>,
    ctx: &OperationContext,
) -> Result<OperationReport> {
    let op = Operation::Trash;
    let source = &ctx.layouts.delete;
    let db = &ctx.layouts.database;
    let trash = &ctx.layouts.trash;

    let scan = doc.read(|wb| {
        scan_flagged_rows(wb, source, delete_sheet::WIDTH, delete_sheet::READY_COL)
    })??;
    let scan = match early_report(op, scan) {
        Ok(scan) => scan,
        Err(report) => return Ok(report),
    };

    let mut errors = Vec::new();
    let mut actions = Vec::new();
    for flagged in scan.flagged {
        let picker = flagged
            .values
            .get(delete_sheet::MUSEUM_COL as usize - 1)
            .cloned()
            .unwrap_or_default();
        match parse_composite_id(&picker) {
            Some(museum_id) => actions.push(TrashAction { flagged, museum_id }),
            None => errors.push(RowError::single(flagged.row, invalid_picker(&picker))),
        }
    }
    if actions.is_empty() {
        return Ok(final_report(op, 0, errors, scan.skipped_not_ready, ctx.dry_run));
    }
    if ctx.dry_run {
        let index = doc.read(|wb| build_id_index(wb, &ctx.layouts))??;
        let resolved = resolve(actions, &index, &db.name, &mut errors);
        return Ok(final_report(op, resolved.len(), errors, scan.skipped_not_ready, true));
    }

    let mut guard = doc.lock()?;
    let wb = &mut *guard;
    require_sheets(wb, &[db, trash, source, &ctx.layouts.instructions])?;
    let count = commit(wb, |wb| {
        let mut current = Vec::new();
        for action in actions {
            if still_matches(wb, &source.name, &action.flagged)? {
                current.push(action);
            } else {
                errors.push(RowError::single(action.flagged.row, ROW_CHANGED_MESSAGE));
            }
        }
        let index = build_id_index(wb, &ctx.layouts)?;
        let mut resolved = resolve(current, &index, &db.name, &mut errors);

        // Deleting from the bottom keeps the remaining resolved rows in place.
        resolved.sort_by(|a, b| b.db_row.cmp(&a.db_row));
        let db_width = wb.last_column(&db.name)?.max(DbColumns::DATABASE.width());
        let trash_id_col = DbColumns::TRASH.col(DbField::Id);
        for item in &resolved {
            let record = wb.read_row(&db.name, item.db_row, db_width)?;
            let trash_width = wb.last_column(&trash.name)?.max(DbColumns::TRASH.width());
            let trash_row = wb.first_blank_row(&trash.name, trash_id_col, trash.first_data_row())?;
            let moved = db_to_db(&record, DbColumns::DATABASE, DbColumns::TRASH, trash_width);
            wb.write_row(&trash.name, trash_row, &moved)?;
            wb.delete_row(&db.name, item.db_row)?;
            debug!(id = %item.museum_id, db_row = item.db_row, trash_row, "museum trashed");
        }

        let mut source_rows: Vec<u32> = resolved.iter().map(|item| item.source_row).collect();
        source_rows.sort_unstable_by(|a, b| b.cmp(a));
        for row in source_rows {
            wb.delete_row(&source.name, row)?;
        }
        stamp_if_clean(wb, &ctx.layouts, resolved.len(), &errors)?;
        Ok(resolved.len())
    })?;

    Ok(final_report(op, count, errors, scan.skipped_not_ready, false))
}
