use anyhow::Result;
use serde_json::json;

use crate::cli::CommandOutput;
use crate::config::RegistryConfig;
use crate::lock::DocumentLock;
use crate::ops::{PickerSheet, populate_from_picker};
use crate::rules;
use crate::workbook::{Workbook, XlsxWorkbook};

fn open(config: &RegistryConfig) -> Result<DocumentLock<XlsxWorkbook>> {
    let path = config.require_workbook()?;
    Ok(DocumentLock::with_timeout(
        XlsxWorkbook::open(path)?,
        config.lock_timeout,
    ))
}

pub fn setup_validations(config: &RegistryConfig) -> Result<CommandOutput> {
    let doc = open(config)?;
    let mut wb = doc.lock()?;
    rules::setup_all_sheet_validations(
        &mut *wb,
        &config.layouts,
        &config.vocabularies,
        config.validation_rows,
    )?;
    wb.flush()?;
    Ok(CommandOutput {
        summary: "Sheet validations applied.".to_string(),
        payload: json!({ "ok": true, "rows": config.validation_rows }),
    })
}

pub fn refresh_museum_list(config: &RegistryConfig) -> Result<CommandOutput> {
    let doc = open(config)?;
    let mut wb = doc.lock()?;
    let count = rules::refresh_museum_list(&mut *wb, &config.layouts)?;
    wb.flush()?;
    Ok(CommandOutput {
        summary: format!("Museum list refreshed with {count} entries."),
        payload: json!({ "ok": true, "count": count }),
    })
}

pub fn populate(
    config: &RegistryConfig,
    sheet: PickerSheet,
    row: u32,
    col: Option<u32>,
) -> Result<CommandOutput> {
    let doc = open(config)?;
    let message = populate_from_picker(&doc, &config.layouts, sheet, row, col)?;
    Ok(CommandOutput {
        summary: message
            .clone()
            .unwrap_or_else(|| format!("Row {row} on the {sheet} sheet updated.")),
        payload: json!({ "ok": message.is_none(), "row": row, "message": message }),
    })
}
