use super::{ColumnRange, Workbook};
use crate::errors::RegistryError;
use crate::model::CellValue;
use crate::rules::ValidationRule;
use anyhow::{Result, bail};
use indexmap::IndexMap;
use std::collections::HashSet;

#[derive(Debug, Clone, Default)]
struct MemorySheet {
    rows: Vec<Vec<CellValue>>,
    hidden: bool,
    validations: Vec<(ColumnRange, ValidationRule)>,
}

impl MemorySheet {
    fn cell(&self, row: u32, col: u32) -> CellValue {
        self.rows
            .get(row as usize - 1)
            .and_then(|r| r.get(col as usize - 1))
            .cloned()
            .unwrap_or_default()
    }
}

/// Workbook held entirely in memory, with nothing to flush to.
///
/// Row deletions can be made to fail with [`MemoryWorkbook::fail_delete`].
#[derive(Debug, Clone, Default)]
pub struct MemoryWorkbook {
    sheets: IndexMap<String, MemorySheet>,
    failing_deletes: HashSet<(String, u32)>,
    flushes: usize,
}

impl MemoryWorkbook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sheet(mut self, name: &str, rows: Vec<Vec<CellValue>>) -> Self {
        self.sheets.insert(
            name.to_string(),
            MemorySheet {
                rows,
                ..Default::default()
            },
        );
        self
    }

    /// Make deleting `row` on `sheet` return an error.
    pub fn fail_delete(&mut self, sheet: &str, row: u32) {
        self.failing_deletes.insert((sheet.to_string(), row));
    }

    /// Snapshot of a sheet's rows with trailing empty cells trimmed.
    pub fn rows(&self, sheet: &str) -> Vec<Vec<CellValue>> {
        let Some(data) = self.sheets.get(sheet) else {
            return Vec::new();
        };
        let last = data
            .rows
            .iter()
            .rposition(|r| r.iter().any(|c| !c.is_blank()))
            .map_or(0, |i| i + 1);
        data.rows[..last]
            .iter()
            .map(|r| {
                let end = r.iter().rposition(|c| *c != CellValue::Empty).map_or(0, |i| i + 1);
                r[..end].to_vec()
            })
            .collect()
    }

    pub fn cell(&self, sheet: &str, row: u32, col: u32) -> CellValue {
        self.sheets
            .get(sheet)
            .map(|s| s.cell(row, col))
            .unwrap_or_default()
    }

    pub fn is_hidden(&self, sheet: &str) -> bool {
        self.sheets.get(sheet).is_some_and(|s| s.hidden)
    }

    pub fn validations(&self, sheet: &str) -> Vec<(ColumnRange, ValidationRule)> {
        self.sheets
            .get(sheet)
            .map(|s| s.validations.clone())
            .unwrap_or_default()
    }

    pub fn flush_count(&self) -> usize {
        self.flushes
    }

    fn sheet(&self, name: &str) -> Result<&MemorySheet> {
        self.sheets
            .get(name)
            .ok_or_else(|| RegistryError::MissingSheet(name.to_string()).into())
    }

    fn sheet_mut(&mut self, name: &str) -> Result<&mut MemorySheet> {
        self.sheets
            .get_mut(name)
            .ok_or_else(|| RegistryError::MissingSheet(name.to_string()).into())
    }
}

impl Workbook for MemoryWorkbook {
    fn has_sheet(&self, sheet: &str) -> bool {
        self.sheets.contains_key(sheet)
    }

    fn last_row(&self, sheet: &str) -> Result<u32> {
        let data = self.sheet(sheet)?;
        Ok(data
            .rows
            .iter()
            .rposition(|r| r.iter().any(|c| !c.is_blank()))
            .map_or(0, |i| i as u32 + 1))
    }

    fn last_column(&self, sheet: &str) -> Result<u32> {
        let data = self.sheet(sheet)?;
        Ok(data
            .rows
            .iter()
            .filter_map(|r| r.iter().rposition(|c| !c.is_blank()))
            .max()
            .map_or(0, |i| i as u32 + 1))
    }

    fn read_cell(&self, sheet: &str, row: u32, col: u32) -> Result<CellValue> {
        if row == 0 || col == 0 {
            bail!("cell coordinates are 1-indexed (got row {row}, col {col})");
        }
        Ok(self.sheet(sheet)?.cell(row, col))
    }

    fn write_cell(&mut self, sheet: &str, row: u32, col: u32, value: CellValue) -> Result<()> {
        if row == 0 || col == 0 {
            bail!("cell coordinates are 1-indexed (got row {row}, col {col})");
        }
        let data = self.sheet_mut(sheet)?;
        let (r, c) = (row as usize - 1, col as usize - 1);
        if value == CellValue::Empty && data.rows.get(r).is_none_or(|cells| c >= cells.len()) {
            return Ok(());
        }
        if data.rows.len() <= r {
            data.rows.resize(r + 1, Vec::new());
        }
        let cells = &mut data.rows[r];
        if cells.len() <= c {
            cells.resize(c + 1, CellValue::Empty);
        }
        cells[c] = value;
        Ok(())
    }

    fn delete_row(&mut self, sheet: &str, row: u32) -> Result<()> {
        if self.failing_deletes.contains(&(sheet.to_string(), row)) {
            bail!("simulated failure deleting row {row} on {sheet}");
        }
        let data = self.sheet_mut(sheet)?;
        let idx = row as usize - 1;
        if idx < data.rows.len() {
            data.rows.remove(idx);
        }
        Ok(())
    }

    fn insert_sheet(&mut self, sheet: &str) -> Result<()> {
        if self.sheets.contains_key(sheet) {
            bail!("sheet '{sheet}' already exists");
        }
        self.sheets.insert(sheet.to_string(), MemorySheet::default());
        Ok(())
    }

    fn hide_sheet(&mut self, sheet: &str) -> Result<()> {
        self.sheet_mut(sheet)?.hidden = true;
        Ok(())
    }

    fn clear_validation(&mut self, sheet: &str, range: ColumnRange) -> Result<()> {
        self.sheet_mut(sheet)?.validations.retain(|(existing, _)| {
            existing.col != range.col
                || existing.last_row < range.first_row
                || existing.first_row > range.last_row
        });
        Ok(())
    }

    fn set_validation(
        &mut self,
        sheet: &str,
        range: ColumnRange,
        rule: &ValidationRule,
    ) -> Result<()> {
        self.sheet_mut(sheet)?
            .validations
            .push((range, rule.clone()));
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.flushes += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delete_shifts_rows_up() {
        let mut wb = MemoryWorkbook::new().with_sheet(
            "S",
            vec![
                vec!["h".into()],
                vec!["a".into()],
                vec!["b".into()],
            ],
        );
        wb.delete_row("S", 2).unwrap();
        assert_eq!(wb.cell("S", 2, 1), CellValue::text("b"));
        assert_eq!(wb.last_row("S").unwrap(), 2);
    }

    #[test]
    fn cleared_trailing_rows_do_not_count() {
        let mut wb = MemoryWorkbook::new().with_sheet("S", vec![vec!["h".into()]]);
        wb.write_cell("S", 4, 2, "x".into()).unwrap();
        assert_eq!(wb.last_row("S").unwrap(), 4);
        wb.write_cell("S", 4, 2, CellValue::Empty).unwrap();
        assert_eq!(wb.last_row("S").unwrap(), 1);
    }

    #[test]
    fn missing_sheet_is_typed() {
        let wb = MemoryWorkbook::new();
        let err = wb.last_row("Nope").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<RegistryError>(),
            Some(RegistryError::MissingSheet(name)) if name == "Nope"
        ));
    }
}
