use super::{ColumnRange, Workbook};
use crate::errors::RegistryError;
use crate::layout::col_to_a1;
use crate::model::CellValue;
use crate::rules::ValidationRule;
use anyhow::{Context, Result, anyhow, bail};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, info, warn};
use umya_spreadsheet::{
    Cell, DataValidation, DataValidationOperatorValues, DataValidationValues, DataValidations,
    Spreadsheet, Worksheet,
};

/// Hidden sheet holding dropdown sources too long to write inline.
pub const LIST_SOURCE_SHEET: &str = "Validation Lists";

/// Excel rejects inline list sources longer than this many characters.
const INLINE_LIST_LIMIT: usize = 255;

/// Modification time and length of the file as last read or written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FileStamp {
    modified: Option<SystemTime>,
    len: u64,
}

impl FileStamp {
    fn of(path: &Path) -> Result<Self> {
        let meta = std::fs::metadata(path)
            .with_context(|| format!("failed to stat workbook {:?}", path))?;
        Ok(Self {
            modified: meta.modified().ok(),
            len: meta.len(),
        })
    }
}

/// Workbook backed by an `.xlsx` file. Changes stay in memory until
/// [`Workbook::flush`] rewrites the file; [`Workbook::reload`] picks up
/// edits other programs saved in the meantime.
pub struct XlsxWorkbook {
    path: PathBuf,
    book: Spreadsheet,
    stamp: FileStamp,
    dirty: bool,
}

fn read_book(path: &Path) -> Result<(Spreadsheet, FileStamp)> {
    let stamp = FileStamp::of(path)?;
    let book = umya_spreadsheet::reader::xlsx::read(path)
        .with_context(|| format!("failed to read workbook {:?}", path))?;
    Ok((book, stamp))
}

impl XlsxWorkbook {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let (book, stamp) = read_book(&path)?;
        Ok(Self {
            path,
            book,
            stamp,
            dirty: false,
        })
    }

    pub fn book(&self) -> &Spreadsheet {
        &self.book
    }

    /// Absolute range on [`LIST_SOURCE_SHEET`] holding `values` top to bottom.
    /// A column already holding exactly `values` is reused.
    fn list_source(&mut self, values: &[String]) -> Result<String> {
        if !self.has_sheet(LIST_SOURCE_SHEET) {
            self.insert_sheet(LIST_SOURCE_SHEET)?;
            self.hide_sheet(LIST_SOURCE_SHEET)?;
        }
        let wanted: Vec<CellValue> = values.iter().map(CellValue::text).collect();
        let last_row = self.last_row(LIST_SOURCE_SHEET)?;
        let last_col = self.last_column(LIST_SOURCE_SHEET)?;

        let mut target = None;
        for col in 1..=last_col {
            let mut existing = (1..=last_row)
                .map(|row| self.read_cell(LIST_SOURCE_SHEET, row, col))
                .collect::<Result<Vec<_>>>()?;
            while existing.last().is_some_and(CellValue::is_blank) {
                existing.pop();
            }
            if existing == wanted {
                target = Some(col);
                break;
            }
        }
        let col = match target {
            Some(col) => col,
            None => {
                let col = last_col + 1;
                for (idx, value) in wanted.into_iter().enumerate() {
                    self.write_cell(LIST_SOURCE_SHEET, idx as u32 + 1, col, value)?;
                }
                col
            }
        };
        let letters = col_to_a1(col);
        Ok(format!(
            "'{LIST_SOURCE_SHEET}'!${letters}$1:${letters}${}",
            values.len()
        ))
    }

    fn sheet(&self, name: &str) -> Result<&Worksheet> {
        self.book
            .get_sheet_by_name(name)
            .ok_or_else(|| RegistryError::MissingSheet(name.to_string()).into())
    }

    fn sheet_mut(&mut self, name: &str) -> Result<&mut Worksheet> {
        self.dirty = true;
        self.book
            .get_sheet_by_name_mut(name)
            .ok_or_else(|| RegistryError::MissingSheet(name.to_string()).into())
    }
}

fn to_cell_value(cell: &Cell) -> CellValue {
    let raw = cell.get_value();
    if raw.is_empty() {
        return CellValue::Empty;
    }
    match cell.get_data_type() {
        "b" => CellValue::Bool(raw.eq_ignore_ascii_case("true") || raw == "1"),
        "n" => cell
            .get_value_number()
            .map(CellValue::Number)
            .unwrap_or_else(|| CellValue::Text(raw.to_string())),
        _ => CellValue::Text(raw.to_string()),
    }
}

fn is_blank(sheet: &Worksheet, col: u32, row: u32) -> bool {
    sheet
        .get_cell((col, row))
        .is_none_or(|cell| cell.get_value().trim().is_empty())
}

fn sqref(range: ColumnRange) -> String {
    range.to_a1()
}

impl Workbook for XlsxWorkbook {
    fn has_sheet(&self, sheet: &str) -> bool {
        self.book.get_sheet_by_name(sheet).is_some()
    }

    fn last_row(&self, sheet: &str) -> Result<u32> {
        let ws = self.sheet(sheet)?;
        let max_col = ws.get_highest_column();
        let mut row = ws.get_highest_row();
        while row > 0 {
            if (1..=max_col).any(|col| !is_blank(ws, col, row)) {
                return Ok(row);
            }
            row -= 1;
        }
        Ok(0)
    }

    fn last_column(&self, sheet: &str) -> Result<u32> {
        let ws = self.sheet(sheet)?;
        let max_row = ws.get_highest_row();
        let mut col = ws.get_highest_column();
        while col > 0 {
            if (1..=max_row).any(|row| !is_blank(ws, col, row)) {
                return Ok(col);
            }
            col -= 1;
        }
        Ok(0)
    }

    fn read_cell(&self, sheet: &str, row: u32, col: u32) -> Result<CellValue> {
        if row == 0 || col == 0 {
            bail!("cell coordinates are 1-indexed (got row {row}, col {col})");
        }
        Ok(self
            .sheet(sheet)?
            .get_cell((col, row))
            .map(to_cell_value)
            .unwrap_or_default())
    }

    fn write_cell(&mut self, sheet: &str, row: u32, col: u32, value: CellValue) -> Result<()> {
        if row == 0 || col == 0 {
            bail!("cell coordinates are 1-indexed (got row {row}, col {col})");
        }
        let ws = self.sheet_mut(sheet)?;
        match value {
            CellValue::Empty => {
                ws.remove_cell((col, row));
            }
            CellValue::Bool(b) => {
                ws.get_cell_mut((col, row)).set_value_bool(b);
            }
            CellValue::Number(n) => {
                ws.get_cell_mut((col, row)).set_value_number(n);
            }
            CellValue::Text(s) => {
                ws.get_cell_mut((col, row)).set_value_string(s);
            }
        }
        Ok(())
    }

    fn delete_row(&mut self, sheet: &str, row: u32) -> Result<()> {
        if row == 0 {
            bail!("row numbers are 1-indexed");
        }
        self.sheet_mut(sheet)?.remove_row(&row, &1);
        Ok(())
    }

    fn insert_sheet(&mut self, sheet: &str) -> Result<()> {
        self.dirty = true;
        self.book
            .new_sheet(sheet)
            .map_err(|e| anyhow!("failed to add sheet '{sheet}': {e}"))?;
        Ok(())
    }

    fn hide_sheet(&mut self, sheet: &str) -> Result<()> {
        self.sheet_mut(sheet)?
            .set_sheet_state("hidden".to_string());
        Ok(())
    }

    fn clear_validation(&mut self, sheet: &str, range: ColumnRange) -> Result<()> {
        let target = sqref(range);
        let ws = self.sheet_mut(sheet)?;
        if let Some(dvs) = ws.get_data_validations_mut() {
            dvs.get_data_validation_list_mut().retain(|dv| {
                let existing = dv.get_sequence_of_references().get_sqref();
                existing.replace(' ', "").to_ascii_uppercase() != target
            });
        }
        Ok(())
    }

    fn set_validation(
        &mut self,
        sheet: &str,
        range: ColumnRange,
        rule: &ValidationRule,
    ) -> Result<()> {
        let list_range = match rule {
            ValidationRule::List { values, .. }
                if values.join(",").chars().count() > INLINE_LIST_LIMIT =>
            {
                Some(self.list_source(values)?)
            }
            _ => None,
        };
        let ws = self.sheet_mut(sheet)?;
        if ws.get_data_validations_mut().is_none() {
            ws.set_data_validations(DataValidations::default());
        }
        let dvs = ws
            .get_data_validations_mut()
            .ok_or_else(|| anyhow!("failed to initialize data validations"))?;

        let mut dv = DataValidation::default();
        dv.get_sequence_of_references_mut().set_sqref(sqref(range));
        dv.set_show_error_message(true);
        match rule {
            // xlsx has no checkbox validation; a TRUE/FALSE list is the closest.
            ValidationRule::Checkbox => {
                dv.set_type(DataValidationValues::List);
                dv.set_formula1("\"TRUE,FALSE\"".to_string());
                dv.set_allow_blank(true);
            }
            ValidationRule::List {
                values,
                allow_empty,
            } => {
                dv.set_type(DataValidationValues::List);
                dv.set_formula1(match list_range {
                    Some(range) => range,
                    None => format!("\"{}\"", values.join(",")),
                });
                dv.set_allow_blank(*allow_empty);
            }
            ValidationRule::Formula { formula, .. } => {
                dv.set_type(DataValidationValues::Custom);
                dv.set_formula1(formula.trim_start_matches('=').to_string());
                dv.set_allow_blank(true);
            }
            ValidationRule::Date { .. } => {
                dv.set_type(DataValidationValues::Date);
                dv.set_operator(DataValidationOperatorValues::GreaterThan);
                dv.set_formula1("0".to_string());
                dv.set_allow_blank(true);
            }
            ValidationRule::RangeRef { range } => {
                dv.set_type(DataValidationValues::List);
                dv.set_formula1(range.trim_start_matches('=').to_string());
                dv.set_allow_blank(true);
            }
        }
        if let Some(help) = rule.help() {
            dv.set_show_input_message(true);
            dv.set_prompt(help.to_string());
        }
        dvs.add_data_validation_list(dv);
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        if !self.dirty {
            return Ok(());
        }
        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let tmp = tempfile::Builder::new()
            .prefix(".museum-registry")
            .suffix(".xlsx")
            .tempfile_in(dir)
            .with_context(|| format!("failed to create temp file in {:?}", dir))?;
        umya_spreadsheet::writer::xlsx::write(&self.book, tmp.path())
            .with_context(|| format!("failed to write workbook {:?}", self.path))?;
        tmp.persist(&self.path)
            .with_context(|| format!("failed to replace workbook {:?}", self.path))?;
        self.stamp = FileStamp::of(&self.path)?;
        self.dirty = false;
        debug!(path = ?self.path, "workbook flushed");
        Ok(())
    }

    fn reload(&mut self) -> Result<()> {
        if FileStamp::of(&self.path)? == self.stamp {
            return Ok(());
        }
        if self.dirty {
            warn!(path = ?self.path, "workbook changed on disk; dropping unsaved changes");
        }
        let (book, stamp) = read_book(&self.path)?;
        self.book = book;
        self.stamp = stamp;
        self.dirty = false;
        info!(path = ?self.path, "workbook reloaded from disk");
        Ok(())
    }
}
