use crate::errors::RegistryError;
use crate::layout::{COUNTER_CELL, DbColumns, SheetLayouts};
use crate::model::CellValue;
use crate::workbook::Workbook;
use anyhow::Result;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::info;

pub const ID_PREFIX: &str = "mm.new.";

static MM_NEW_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bmm\.new\.(\d+)\b").expect("mm.new regex"));

pub fn format_id(n: u64) -> String {
    format!("{ID_PREFIX}{n}")
}

/// Largest `mm.new.<n>` suffix in any cell of `rows`, or 0.
pub fn max_new_id_suffix<'a>(rows: impl IntoIterator<Item = &'a Vec<CellValue>>) -> u64 {
    rows.into_iter()
        .flatten()
        .filter_map(|cell| cell.as_text())
        .flat_map(|text| MM_NEW_RE.captures_iter(text))
        .filter_map(|caps| caps[1].parse::<u64>().ok())
        .max()
        .unwrap_or(0)
}

/// Interpret the counter cell: blank is 0, otherwise a non-negative integer.
pub fn parse_counter_cell(value: &CellValue) -> Result<u64, RegistryError> {
    let invalid = || RegistryError::InvalidCounter(value.to_string());
    match value {
        CellValue::Empty => Ok(0),
        CellValue::Number(n) if n.fract() == 0.0 && *n >= 0.0 && n.is_finite() => Ok(*n as u64),
        CellValue::Text(s) if s.trim().is_empty() => Ok(0),
        CellValue::Text(s) => s.trim().parse::<u64>().map_err(|_| invalid()),
        _ => Err(invalid()),
    }
}

/// Issues museum IDs from the counter on the New IDs sheet.
///
/// The counter holds the last issued suffix. It is seeded once from the
/// highest `mm.new.<n>` in Database and Trash. Callers hold the document lock
/// across allocation and the writes that use the IDs.
pub struct IdAllocator<'a> {
    layouts: &'a SheetLayouts,
}

impl<'a> IdAllocator<'a> {
    pub fn new(layouts: &'a SheetLayouts) -> Self {
        Self { layouts }
    }

    /// Issue `count` consecutive IDs and persist the new counter value.
    pub fn allocate<W: Workbook + ?Sized>(&self, workbook: &mut W, count: usize) -> Result<Vec<String>> {
        if count == 0 {
            return Ok(Vec::new());
        }
        self.ensure_counter_sheet(workbook)?;
        let sheet = &self.layouts.new_ids.name;
        let (col, row) = COUNTER_CELL;
        let last_issued = parse_counter_cell(&workbook.read_cell(sheet, row, col)?)?;
        let new_last = last_issued + count as u64;
        workbook.write_cell(sheet, row, col, CellValue::Number(new_last as f64))?;
        Ok((last_issued + 1..=new_last).map(format_id).collect())
    }

    fn ensure_counter_sheet<W: Workbook + ?Sized>(&self, workbook: &mut W) -> Result<()> {
        let sheet = &self.layouts.new_ids.name;
        if workbook.has_sheet(sheet) {
            return Ok(());
        }
        let seed = self.scan_max_suffix(workbook)?;
        workbook.insert_sheet(sheet)?;
        let (col, row) = COUNTER_CELL;
        workbook.write_cell(sheet, row, col, CellValue::Number(seed as f64))?;
        workbook.hide_sheet(sheet)?;
        info!(seed, sheet = %sheet, "seeded ID counter sheet");
        Ok(())
    }

    fn scan_max_suffix<W: Workbook + ?Sized>(&self, workbook: &W) -> Result<u64> {
        let mut max = 0;
        for (spec, width) in [
            (&self.layouts.database, DbColumns::DATABASE.width()),
            (&self.layouts.trash, DbColumns::TRASH.width()),
        ] {
            if !workbook.has_sheet(&spec.name) {
                continue;
            }
            let width = width.max(workbook.last_column(&spec.name)?);
            let last = workbook.last_row(&spec.name)?;
            let rows = workbook.read_rows(&spec.name, 1, last, width)?;
            max = max.max(max_new_id_suffix(&rows));
        }
        Ok(max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn counter_cell_parsing() {
        assert_eq!(parse_counter_cell(&CellValue::Empty).unwrap(), 0);
        assert_eq!(parse_counter_cell(&CellValue::Number(12.0)).unwrap(), 12);
        assert_eq!(parse_counter_cell(&CellValue::text(" 7 ")).unwrap(), 7);
        assert_eq!(parse_counter_cell(&CellValue::text("")).unwrap(), 0);
        assert_matches!(
            parse_counter_cell(&CellValue::Number(1.5)),
            Err(RegistryError::InvalidCounter(_))
        );
        assert_matches!(
            parse_counter_cell(&CellValue::text("-3")),
            Err(RegistryError::InvalidCounter(_))
        );
        assert_matches!(
            parse_counter_cell(&CellValue::Bool(true)),
            Err(RegistryError::InvalidCounter(_))
        );
    }

    #[test]
    fn max_suffix_scans_any_cell_case_insensitively() {
        let rows = vec![
            vec![CellValue::text("MM.NEW.12"), CellValue::text("note mm.new.40 here")],
            vec![CellValue::text("mm.new.x"), CellValue::Number(99.0)],
        ];
        assert_eq!(max_new_id_suffix(&rows), 40);
    }
}
