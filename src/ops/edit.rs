use super::{
    FlaggedRow, OperationContext, build_id_index, commit, early_report, final_report,
    require_sheets, scan_flagged_rows, stamp_if_clean, still_matches, ROW_CHANGED_MESSAGE,
};
use crate::layout::{DbColumns, FormLayout};
use crate::lock::DocumentLock;
use crate::model::{Operation, OperationReport, RowError};
use crate::normalize::{parse_composite_id, trim_to_string};
use crate::rows::form_to_db;
use crate::validate::validate_form_row;
use crate::workbook::Workbook;
use anyhow::Result;
use std::collections::HashMap;
use tracing::debug;

struct EditAction {
    flagged: FlaggedRow,
    museum_id: String,
}

pub(crate) fn not_found(id: &str, db_sheet: &str) -> String {
    format!("Museum ID \"{id}\" not found in {db_sheet}.")
}

pub(crate) fn invalid_picker(cell: &crate::model::CellValue) -> String {
    format!(
        "Museum \"{}\" is not valid. Expected \"id - name\".",
        trim_to_string(cell)
    )
}

/// Split actions into those whose museum exists and row errors for the rest.
fn resolve(
    actions: Vec<EditAction>,
    index: &HashMap<String, u32>,
    db_sheet: &str,
    errors: &mut Vec<RowError>,
) -> Vec<(EditAction, u32)> {
    actions
        .into_iter()
        .filter_map(|action| match index.get(&action.museum_id) {
            Some(&db_row) => Some((action, db_row)),
            None => {
                errors.push(RowError::single(
                    action.flagged.row,
                    not_found(&action.museum_id, db_sheet),
                ));
                None
            }
        })
        .collect()
}

/// Overwrite Database records with every ready Edit row.
pub fn edit_museums<W: Workbook>(
    doc: &DocumentLock<W>,
    ctx: &OperationContext,
) -> Result<OperationReport> {
    let op = Operation::Edit;
    let layout = FormLayout::EDIT;
    let source = &ctx.layouts.edit;
    let db = &ctx.layouts.database;
    let picker_idx = layout.picker_index().unwrap_or(1);

    let scan = doc.read(|wb| scan_flagged_rows(wb, source, layout.width(), layout.ready_col))??;
    let scan = match early_report(op, scan) {
        Ok(scan) => scan,
        Err(report) => return Ok(report),
    };

    let mut errors = Vec::new();
    let mut actions = Vec::new();
    for flagged in scan.flagged {
        let picker = flagged.values.get(picker_idx).cloned().unwrap_or_default();
        let museum_id = parse_composite_id(&picker);
        let mut problems = Vec::new();
        if museum_id.is_none() {
            problems.push(invalid_picker(&picker));
        }
        problems.extend(validate_form_row(&flagged.values, &layout, &ctx.vocab));
        match museum_id {
            Some(museum_id) if problems.is_empty() => actions.push(EditAction { flagged, museum_id }),
            _ => errors.push(RowError::new(flagged.row, problems)),
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
        let index = build_id_index(wb, &ctx.layouts)?;
        let resolved = resolve(current, &index, &db.name, &mut errors);
        let db_width = wb.last_column(&db.name)?.max(DbColumns::DATABASE.width());
        for (action, db_row) in &resolved {
            let existing = wb.read_row(&db.name, *db_row, db_width)?;
            let record = form_to_db(
                Some(&existing),
                db_width,
                &action.flagged.values,
                &layout,
                &action.museum_id,
            );
            wb.write_row(&db.name, *db_row, &record)?;
            wb.delete_row(&source.name, action.flagged.row)?;
            debug!(row = action.flagged.row, id = %action.museum_id, db_row, "museum edited");
        }
        stamp_if_clean(wb, &ctx.layouts, resolved.len(), &errors)?;
        Ok(resolved.len())
    })?;

    Ok(final_report(op, count, errors, scan.skipped_not_ready, false))
}
