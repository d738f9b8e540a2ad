use super::build_id_index;
use super::edit::not_found;
use crate::layout::{DbColumns, DbField, FormLayout, SheetLayouts, SheetSpec, delete_sheet};
use crate::lock::DocumentLock;
use crate::model::CellValue;
use crate::normalize::{compose_picker_label, parse_composite_id, trim_to_string};
use crate::rows::{clear_form_row_except_ready, db_to_form};
use crate::workbook::Workbook;
use anyhow::Result;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use tracing::debug;

/// Sheets whose museum picker fills the rest of the row.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize, ValueEnum,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PickerSheet {
    Edit,
    Delete,
}

impl PickerSheet {
    fn spec(self, layouts: &SheetLayouts) -> &SheetSpec {
        match self {
            PickerSheet::Edit => &layouts.edit,
            PickerSheet::Delete => &layouts.delete,
        }
    }

    pub fn picker_col(self) -> u32 {
        match self {
            PickerSheet::Edit => FormLayout::EDIT.picker_col.unwrap_or(2),
            PickerSheet::Delete => delete_sheet::MUSEUM_COL,
        }
    }

    fn width(self) -> u32 {
        match self {
            PickerSheet::Edit => FormLayout::EDIT.width(),
            PickerSheet::Delete => delete_sheet::WIDTH,
        }
    }

    /// Row contents with everything but the ready and picker cells blanked.
    fn cleared(self, existing: &[CellValue]) -> Vec<CellValue> {
        match self {
            PickerSheet::Edit => clear_form_row_except_ready(existing, &FormLayout::EDIT),
            // The Delete sheet holds nothing else.
            PickerSheet::Delete => existing.to_vec(),
        }
    }

    fn filled(self, record: &[CellValue], existing: &[CellValue]) -> Vec<CellValue> {
        match self {
            PickerSheet::Edit => db_to_form(record, &FormLayout::EDIT, Some(existing), true),
            PickerSheet::Delete => {
                let db = DbColumns::DATABASE;
                let field = |f: DbField| {
                    trim_to_string(record.get(db.index(f)).unwrap_or(&CellValue::Empty))
                };
                let mut out = existing.to_vec();
                out[delete_sheet::MUSEUM_COL as usize - 1] = CellValue::text(
                    compose_picker_label(&field(DbField::Id), &field(DbField::MuseumName)),
                );
                out
            }
        }
    }
}

/// React to a change of the picker cell in `row` (or `col`, when given).
///
/// Returns a message for the user when the picked ID is unknown. Header
/// rows and other columns are ignored.
pub fn populate_from_picker<W: Workbook>(
    doc: &DocumentLock<W>,
    layouts: &SheetLayouts,
    target: PickerSheet,
    row: u32,
    col: Option<u32>,
) -> Result<Option<String>> {
    let spec = target.spec(layouts);
    if row < spec.first_data_row() || col.is_some_and(|c| c != target.picker_col()) {
        return Ok(None);
    }

    let mut guard = doc.lock()?;
    let wb = &mut *guard;
    wb.require_sheet(&spec.name)?;
    let existing = wb.read_row(&spec.name, row, target.width())?;
    let picker = existing
        .get(target.picker_col() as usize - 1)
        .cloned()
        .unwrap_or_default();

    let (values, message) = match parse_composite_id(&picker) {
        None => (target.cleared(&existing), None),
        Some(id) => {
            let index = build_id_index(wb, layouts)?;
            match index.get(&id) {
                None => (
                    target.cleared(&existing),
                    Some(not_found(&id, &layouts.database.name)),
                ),
                Some(&db_row) => {
                    let db_width = wb
                        .last_column(&layouts.database.name)?
                        .max(DbColumns::DATABASE.width());
                    let record = wb.read_row(&layouts.database.name, db_row, db_width)?;
                    debug!(sheet = %spec.name, row, id = %id, "form row populated");
                    (target.filled(&record, &existing), None)
                }
            }
        }
    };
    wb.write_row(&spec.name, row, &values)?;
    wb.flush()?;
    Ok(message)
}
