mod support;

use anyhow::Result;
use museum_registry::layout::{DbColumns, DbField, SheetLayouts};
use museum_registry::ops::run_operation;
use museum_registry::rules::setup_all_sheet_validations;
use museum_registry::validate::Vocabularies;
use museum_registry::workbook::xlsx::LIST_SOURCE_SHEET;
use museum_registry::{CellValue, DocumentLock, Operation, OperationContext, Workbook, XlsxWorkbook};
use support::builders::*;
use tempfile::tempdir;

#[test]
fn cells_read_back_with_their_types() -> Result<()> {
    let tmp = tempdir()?;
    let path = tmp.path().join("registry.xlsx");
    write_xlsx(
        &path,
        &[(
            "Database",
            vec![vec![
                text("mm.new.1"),
                CellValue::Bool(true),
                CellValue::Number(1999.0),
                CellValue::Empty,
                text("tail"),
            ]],
        )],
    );

    let wb = XlsxWorkbook::open(&path)?;
    assert_eq!(wb.read_cell("Database", 1, 1)?, text("mm.new.1"));
    assert_eq!(wb.read_cell("Database", 1, 2)?, CellValue::Bool(true));
    assert_eq!(wb.read_cell("Database", 1, 3)?, CellValue::Number(1999.0));
    assert_eq!(wb.read_cell("Database", 1, 4)?, CellValue::Empty);
    assert_eq!(wb.last_row("Database")?, 1);
    assert_eq!(wb.last_column("Database")?, 5);
    assert!(wb.read_cell("Missing", 1, 1).is_err());
    Ok(())
}

#[test]
fn delete_row_shifts_rows_up_and_flush_persists() -> Result<()> {
    let tmp = tempdir()?;
    let path = tmp.path().join("registry.xlsx");
    write_xlsx(
        &path,
        &[(
            "Trash",
            vec![vec![text("a")], vec![text("b")], vec![text("c")]],
        )],
    );

    let mut wb = XlsxWorkbook::open(&path)?;
    wb.delete_row("Trash", 2)?;
    wb.write_cell("Trash", 3, 1, text("d"))?;
    wb.flush()?;

    let reopened = XlsxWorkbook::open(&path)?;
    assert_eq!(
        reopened.read_rows("Trash", 1, 3, 1)?,
        vec![vec![text("a")], vec![text("c")], vec![text("d")]]
    );
    Ok(())
}

#[test]
fn add_and_trash_run_against_a_file() -> Result<()> {
    let tmp = tempdir()?;
    let path = tmp.path().join("registry.xlsx");
    Registry::new()
        .museum("mm.new.1", "Abbey")
        .add(add_row("Mill"))
        .delete(delete_row("mm.new.1", "Abbey", true))
        .write(&path);

    let ctx = OperationContext::default();
    let doc = DocumentLock::new(XlsxWorkbook::open(&path)?);
    assert_eq!(run_operation(Operation::Add, &doc, &ctx)?.count, 1);
    assert_eq!(run_operation(Operation::Trash, &doc, &ctx)?.count, 1);
    drop(doc);

    let wb = XlsxWorkbook::open(&path)?;
    let id_col = DbColumns::DATABASE.col(DbField::Id);
    assert_eq!(wb.read_cell("Database", 2, id_col)?, text("mm.new.2"));
    assert_eq!(wb.read_cell("Database", 3, id_col)?, CellValue::Empty);
    assert_eq!(
        wb.read_cell("Trash", 2, DbColumns::TRASH.col(DbField::Id))?,
        text("mm.new.1")
    );
    assert_eq!(wb.last_row("Add")?, 1);
    assert_eq!(wb.last_row("Delete")?, 1);
    assert!(wb.has_sheet("New IDs"));
    assert_eq!(wb.read_cell("New IDs", 1, 1)?, CellValue::Number(2.0));
    assert!(wb.read_cell("Instructions", 1, 2)?.as_text().is_some());
    Ok(())
}

#[test]
fn lock_picks_up_rows_saved_by_another_writer() -> Result<()> {
    let tmp = tempdir()?;
    let path = tmp.path().join("registry.xlsx");
    Registry::new().add(add_row("Alpha")).write(&path);
    let doc = DocumentLock::new(XlsxWorkbook::open(&path)?);
    assert_eq!(doc.read(|wb| wb.last_row("Add"))??, 2);

    Registry::new()
        .add(add_row("Alpha"))
        .add(add_row("Beta"))
        .write(&path);
    assert_eq!(doc.read(|wb| wb.last_row("Add"))??, 3);

    let report = run_operation(Operation::Add, &doc, &OperationContext::default())?;
    assert_eq!(report.count, 2);
    drop(doc);

    let wb = XlsxWorkbook::open(&path)?;
    assert_eq!(wb.last_row("Add")?, 1);
    assert_eq!(wb.last_row("Database")?, 3);
    Ok(())
}

#[test]
fn unchanged_file_is_not_reread() -> Result<()> {
    let tmp = tempdir()?;
    let path = tmp.path().join("registry.xlsx");
    write_xlsx(&path, &[("Trash", vec![vec![text("a")]])]);

    let mut wb = XlsxWorkbook::open(&path)?;
    wb.write_cell("Trash", 1, 1, text("pending"))?;
    wb.reload()?;
    assert_eq!(wb.read_cell("Trash", 1, 1)?, text("pending"));

    wb.flush()?;
    wb.reload()?;
    assert_eq!(wb.read_cell("Trash", 1, 1)?, text("pending"));
    Ok(())
}

#[test]
fn validations_are_written_into_the_file() -> Result<()> {
    let tmp = tempdir()?;
    let path = tmp.path().join("registry.xlsx");
    Registry::new().museum("mm.new.1", "Abbey").write(&path);

    let mut wb = XlsxWorkbook::open(&path)?;
    setup_all_sheet_validations(&mut wb, &SheetLayouts::default(), &Vocabularies::default(), 25)?;
    wb.flush()?;

    let reopened = XlsxWorkbook::open(&path)?;
    let sheet = reopened
        .book()
        .get_sheet_by_name("Add")
        .expect("Add sheet");
    let rules = sheet
        .get_data_validations()
        .expect("validations written")
        .get_data_validation_list();
    assert_eq!(rules.len(), 14);
    assert!(
        rules
            .iter()
            .any(|dv| dv.get_sequence_of_references().get_sqref() == "A2:A26")
    );
    assert!(reopened.has_sheet("Museum List"));
    assert_eq!(reopened.read_cell("Museum List", 2, 1)?, text("mm.new.1 - Abbey"));
    Ok(())
}

#[test]
fn long_dropdowns_point_at_a_hidden_list_sheet() -> Result<()> {
    let tmp = tempdir()?;
    let path = tmp.path().join("registry.xlsx");
    Registry::new().write(&path);

    let vocab = Vocabularies::default();
    let mut wb = XlsxWorkbook::open(&path)?;
    setup_all_sheet_validations(&mut wb, &SheetLayouts::default(), &vocab, 25)?;
    setup_all_sheet_validations(&mut wb, &SheetLayouts::default(), &vocab, 25)?;
    wb.flush()?;

    let reopened = XlsxWorkbook::open(&path)?;
    let formulas: Vec<String> = reopened
        .book()
        .get_sheet_by_name("Add")
        .expect("Add sheet")
        .get_data_validations()
        .expect("validations written")
        .get_data_validation_list()
        .iter()
        .map(|dv| dv.get_formula1().to_string())
        .collect();
    assert!(formulas.iter().all(|f| f.chars().count() <= 257), "{formulas:?}");

    let subjects: Vec<CellValue> = vocab.subject.iter().map(CellValue::text).collect();
    let source = format!("'Validation Lists'!$A$1:$A${}", subjects.len());
    assert!(formulas.contains(&source), "{formulas:?}");

    // The Add and Edit subject rules share one column.
    assert_eq!(reopened.last_column(LIST_SOURCE_SHEET)?, 1);
    assert_eq!(
        reopened.read_rows(LIST_SOURCE_SHEET, 1, subjects.len() as u32, 1)?,
        subjects.into_iter().map(|v| vec![v]).collect::<Vec<_>>()
    );
    Ok(())
}
