use crate::errors::RegistryError;
use crate::layout::col_to_a1;
use crate::model::CellValue;
use crate::rules::ValidationRule;
use anyhow::Result;

pub mod memory;
pub mod xlsx;

pub use memory::MemoryWorkbook;
pub use xlsx::XlsxWorkbook;

/// A single-column block of rows, 1-indexed and inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnRange {
    pub col: u32,
    pub first_row: u32,
    pub last_row: u32,
}

impl ColumnRange {
    pub fn new(col: u32, first_row: u32, last_row: u32) -> Self {
        Self {
            col,
            first_row,
            last_row: last_row.max(first_row),
        }
    }

    /// `"C2:C1001"`
    pub fn to_a1(&self) -> String {
        let letters = col_to_a1(self.col);
        format!(
            "{letters}{}:{letters}{}",
            self.first_row, self.last_row
        )
    }
}

/// Cell-level access to a workbook, the only way operations touch one.
/// Rows and columns are 1-indexed.
pub trait Workbook: Send {
    fn has_sheet(&self, sheet: &str) -> bool;

    /// Last row holding a non-empty cell, or 0 for an empty sheet.
    fn last_row(&self, sheet: &str) -> Result<u32>;

    /// Last column holding a non-empty cell, or 0 for an empty sheet.
    fn last_column(&self, sheet: &str) -> Result<u32>;

    fn read_cell(&self, sheet: &str, row: u32, col: u32) -> Result<CellValue>;

    /// Write `value`; `CellValue::Empty` clears the cell.
    fn write_cell(&mut self, sheet: &str, row: u32, col: u32, value: CellValue) -> Result<()>;

    /// Remove a row, shifting everything below it up by one.
    fn delete_row(&mut self, sheet: &str, row: u32) -> Result<()>;

    fn insert_sheet(&mut self, sheet: &str) -> Result<()>;

    fn hide_sheet(&mut self, sheet: &str) -> Result<()>;

    fn clear_validation(&mut self, sheet: &str, range: ColumnRange) -> Result<()>;

    fn set_validation(&mut self, sheet: &str, range: ColumnRange, rule: &ValidationRule)
    -> Result<()>;

    /// Persist pending changes.
    fn flush(&mut self) -> Result<()>;

    /// Pick up changes saved by other writers since the last read or flush.
    fn reload(&mut self) -> Result<()> {
        Ok(())
    }

    fn require_sheet(&self, sheet: &str) -> Result<()> {
        if self.has_sheet(sheet) {
            Ok(())
        } else {
            Err(RegistryError::MissingSheet(sheet.to_string()).into())
        }
    }

    /// Read `width` cells starting at column A.
    fn read_row(&self, sheet: &str, row: u32, width: u32) -> Result<Vec<CellValue>> {
        (1..=width)
            .map(|col| self.read_cell(sheet, row, col))
            .collect()
    }

    /// Rows `first..=last`, each `width` cells wide.
    fn read_rows(&self, sheet: &str, first: u32, last: u32, width: u32) -> Result<Vec<Vec<CellValue>>> {
        if last < first {
            return Ok(Vec::new());
        }
        (first..=last)
            .map(|row| self.read_row(sheet, row, width))
            .collect()
    }

    /// Overwrite a full row starting at column A.
    fn write_row(&mut self, sheet: &str, row: u32, values: &[CellValue]) -> Result<()> {
        for (idx, value) in values.iter().enumerate() {
            self.write_cell(sheet, row, idx as u32 + 1, value.clone())?;
        }
        Ok(())
    }

    /// First row at or below `from` whose cell in `col` is blank.
    fn first_blank_row(&self, sheet: &str, col: u32, from: u32) -> Result<u32> {
        let last = self.last_row(sheet)?;
        for row in from..=last {
            if self.read_cell(sheet, row, col)?.is_blank() {
                return Ok(row);
            }
        }
        Ok(last.max(from.saturating_sub(1)) + 1)
    }
}
