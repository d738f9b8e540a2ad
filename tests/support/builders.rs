#![allow(dead_code)]
use museum_registry::{CellValue, MemoryWorkbook};
use museum_registry::layout::{DbColumns, DbField, FormField, FormLayout};
use museum_registry::normalize::compose_picker_label;
use std::path::Path;
use strum::IntoEnumIterator;
use umya_spreadsheet::Worksheet;

pub fn text(s: &str) -> CellValue {
    CellValue::text(s)
}

pub fn ticked() -> CellValue {
    CellValue::Bool(true)
}

/// A form row that passes validation, with `overrides` applied on top.
pub fn form_row(
    layout: &FormLayout,
    name: &str,
    overrides: &[(FormField, CellValue)],
) -> Vec<CellValue> {
    let mut row = vec![CellValue::Empty; layout.width() as usize];
    row[layout.ready_index()] = ticked();
    let defaults = [
        (FormField::MuseumName, text(name)),
        (FormField::Postcode, text("sw1a 1aa")),
        (FormField::Accreditation, text("Accredited")),
        (FormField::Governance, text("Government: Local Authority")),
        (FormField::Size, text("small")),
        (FormField::Subject, text("Arts: Crafts")),
        (FormField::YearOpened, text("1999")),
        (FormField::YearClosed, text("2010/2012")),
    ];
    for (field, value) in defaults.iter().chain(overrides) {
        row[layout.index(*field)] = value.clone();
    }
    row
}

pub fn add_row(name: &str) -> Vec<CellValue> {
    form_row(&FormLayout::ADD, name, &[])
}

pub fn edit_row(id: &str, name: &str) -> Vec<CellValue> {
    let layout = FormLayout::EDIT;
    let mut row = form_row(&layout, name, &[]);
    if let Some(idx) = layout.picker_index() {
        row[idx] = text(&compose_picker_label(id, name));
    }
    row
}

pub fn delete_row(id: &str, name: &str, ready: bool) -> Vec<CellValue> {
    vec![
        CellValue::Bool(ready),
        text(&compose_picker_label(id, name)),
    ]
}

/// A Database record with an ID and name; every other field blank.
pub fn db_record(id: &str, name: &str) -> Vec<CellValue> {
    let db = DbColumns::DATABASE;
    let mut row = vec![CellValue::Empty; db.width() as usize];
    row[db.index(DbField::Id)] = text(id);
    row[db.index(DbField::MuseumName)] = text(name);
    row
}

/// A Trash row holding `record`'s fields with the two flags set.
pub fn trash_record(id: &str, name: &str, purge: bool, restore: bool) -> Vec<CellValue> {
    let trash = DbColumns::TRASH;
    let mut row = vec![CellValue::Empty; trash.width() as usize];
    row[0] = CellValue::Bool(purge);
    row[1] = CellValue::Bool(restore);
    row[trash.index(DbField::Id)] = text(id);
    row[trash.index(DbField::MuseumName)] = text(name);
    row
}

pub fn db_headers() -> Vec<CellValue> {
    DbField::iter().map(|f| text(f.header())).collect()
}

pub fn trash_headers() -> Vec<CellValue> {
    let mut row = vec![text("PERMANENTLY_DELETE"), text("RESTORE")];
    row.extend(db_headers());
    row
}

pub fn form_headers(layout: &FormLayout) -> Vec<CellValue> {
    let mut row = vec![CellValue::Empty; layout.width() as usize];
    row[layout.ready_index()] = text("READY_TO_COMMIT");
    if let Some(idx) = layout.picker_index() {
        row[idx] = text("MUSEUM");
    }
    for field in FormField::iter() {
        row[layout.index(field)] = text(field.header());
    }
    row
}

pub fn delete_headers() -> Vec<CellValue> {
    vec![text("READY_TO_DELETE"), text("MUSEUM")]
}

fn write_cell(sheet: &mut Worksheet, col: u32, row: u32, value: &CellValue) {
    match value {
        CellValue::Empty => {}
        CellValue::Bool(b) => {
            sheet.get_cell_mut((col, row)).set_value_bool(*b);
        }
        CellValue::Number(n) => {
            sheet.get_cell_mut((col, row)).set_value_number(*n);
        }
        CellValue::Text(s) => {
            sheet.get_cell_mut((col, row)).set_value_string(s.clone());
        }
    }
}

pub fn fill_rows(sheet: &mut Worksheet, rows: &[Vec<CellValue>]) {
    for (r, row) in rows.iter().enumerate() {
        for (c, value) in row.iter().enumerate() {
            write_cell(sheet, c as u32 + 1, r as u32 + 1, value);
        }
    }
}

/// Write an `.xlsx` with one sheet per `(name, rows)` pair.
pub fn write_xlsx(path: &Path, sheets: &[(&str, Vec<Vec<CellValue>>)]) {
    let mut book = umya_spreadsheet::new_file();
    for (name, rows) in sheets {
        if book.get_sheet_by_name(name).is_none() {
            book.new_sheet(*name).expect("add sheet");
        }
        let sheet = book.get_sheet_by_name_mut(name).expect("sheet exists");
        fill_rows(sheet, rows);
    }
    umya_spreadsheet::writer::xlsx::write(&book, path).expect("write workbook");
}

/// Rows for every registry sheet, headers included.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    pub database: Vec<Vec<CellValue>>,
    pub add: Vec<Vec<CellValue>>,
    pub edit: Vec<Vec<CellValue>>,
    pub delete: Vec<Vec<CellValue>>,
    pub trash: Vec<Vec<CellValue>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn museum(mut self, id: &str, name: &str) -> Self {
        self.database.push(db_record(id, name));
        self
    }

    pub fn add(mut self, row: Vec<CellValue>) -> Self {
        self.add.push(row);
        self
    }

    pub fn edit(mut self, row: Vec<CellValue>) -> Self {
        self.edit.push(row);
        self
    }

    pub fn delete(mut self, row: Vec<CellValue>) -> Self {
        self.delete.push(row);
        self
    }

    pub fn trash(mut self, row: Vec<CellValue>) -> Self {
        self.trash.push(row);
        self
    }

    pub fn sheets(&self) -> Vec<(&'static str, Vec<Vec<CellValue>>)> {
        let with_header = |header: Vec<CellValue>, rows: &[Vec<CellValue>]| {
            let mut out = vec![header];
            out.extend(rows.iter().cloned());
            out
        };
        vec![
            ("Instructions", vec![vec![text("Last changed")]]),
            ("Database", with_header(db_headers(), &self.database)),
            ("Add", with_header(form_headers(&FormLayout::ADD), &self.add)),
            ("Edit", with_header(form_headers(&FormLayout::EDIT), &self.edit)),
            ("Delete", with_header(delete_headers(), &self.delete)),
            ("Trash", with_header(trash_headers(), &self.trash)),
        ]
    }

    pub fn memory(&self) -> MemoryWorkbook {
        self.sheets()
            .into_iter()
            .fold(MemoryWorkbook::new(), |wb, (name, rows)| {
                wb.with_sheet(name, rows)
            })
    }

    pub fn write(&self, path: &Path) {
        write_xlsx(path, &self.sheets());
    }
}

/// IDs in the Database sheet, top to bottom.
pub fn database_ids(wb: &MemoryWorkbook) -> Vec<String> {
    let idx = DbColumns::DATABASE.index(DbField::Id);
    wb.rows("Database")
        .iter()
        .skip(1)
        .map(|row| row.get(idx).map(|c| c.to_string()).unwrap_or_default())
        .collect()
}

/// IDs in the Trash sheet, top to bottom.
pub fn trash_ids(wb: &MemoryWorkbook) -> Vec<String> {
    let idx = DbColumns::TRASH.index(DbField::Id);
    wb.rows("Trash")
        .iter()
        .skip(1)
        .map(|row| row.get(idx).map(|c| c.to_string()).unwrap_or_default())
        .collect()
}
