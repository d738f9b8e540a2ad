use crate::layout::SheetLayouts;
use crate::model::CellValue;
use crate::workbook::Workbook;
use anyhow::Result;
use chrono::{SecondsFormat, Utc};

/// Stamp the Instructions sheet with the time of the last Database change.
pub fn log_database_change<W: Workbook + ?Sized>(
    workbook: &mut W,
    layouts: &SheetLayouts,
) -> Result<String> {
    let sheet = &layouts.instructions.name;
    workbook.require_sheet(sheet)?;
    let stamp = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, false);
    let (col, row) = layouts.changelog_cell;
    workbook.write_cell(sheet, row, col, CellValue::text(stamp.clone()))?;
    Ok(stamp)
}
