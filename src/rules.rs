use crate::layout::{
    DbColumns, DbField, FormField, FormLayout, SheetLayouts, cell_a1, col_to_a1, delete_sheet,
    museum_list_sheet, trash_sheet,
};
use crate::model::CellValue;
use crate::normalize::{compose_picker_label, trim_to_string};
use crate::validate::Vocabularies;
use crate::workbook::{ColumnRange, Workbook};
use anyhow::{Result, ensure};
use tracing::{debug, info};

pub const DEFAULT_DATA_ROWS: u32 = 1000;
const LIST_CLEAR_MIN_ROWS: u32 = 2000;
const YEAR_RANGE_PATTERN: &str = r"^\d{4}(?:\/\d{4})?$";
const POSTCODE_PATTERN: &str = r"^[A-Z]{1,2}[0-9][A-Z0-9]?\s[0-9][A-Z]{2}$";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationRule {
    Checkbox,
    List {
        values: Vec<String>,
        allow_empty: bool,
    },
    /// Custom formula written against the top-left cell of its range.
    Formula {
        formula: String,
        help: Option<String>,
    },
    Date {
        help: Option<String>,
    },
    /// Dropdown sourced from a live range such as `'Museum List'!$A$2:$A$40`.
    RangeRef {
        range: String,
    },
}

impl ValidationRule {
    pub fn help(&self) -> Option<&str> {
        match self {
            ValidationRule::Formula { help, .. } | ValidationRule::Date { help } => help.as_deref(),
            _ => None,
        }
    }
}

pub fn dv_checkbox() -> ValidationRule {
    ValidationRule::Checkbox
}

pub fn dv_dropdown<I, S>(values: I, allow_empty: bool) -> Result<ValidationRule>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let values: Vec<String> = values.into_iter().map(Into::into).collect();
    ensure!(!values.is_empty(), "dropdown values must be non-empty");
    Ok(ValidationRule::List {
        values,
        allow_empty,
    })
}

pub fn dv_required_non_blank_text(a1_top_left: &str, help: Option<&str>) -> ValidationRule {
    ValidationRule::Formula {
        formula: format!("=LEN(TRIM({a1_top_left}))>0"),
        help: help.map(str::to_string),
    }
}

pub fn dv_optional_regex(a1_top_left: &str, regex: &str, help: Option<&str>) -> ValidationRule {
    ValidationRule::Formula {
        formula: format!(
            "=OR(LEN(TRIM({a1_top_left}))=0, REGEXMATCH(TRIM({a1_top_left}), \"{regex}\"))"
        ),
        help: help.map(str::to_string),
    }
}

pub fn dv_postcode(a1_top_left: &str) -> ValidationRule {
    ValidationRule::Formula {
        formula: format!(
            "=OR(LEN(TRIM({a1_top_left}))=0, REGEXMATCH(UPPER(TRIM({a1_top_left})), \"{POSTCODE_PATTERN}\"))"
        ),
        help: Some("Optional: UK postcode with a space (e.g. SW1A 1AA)".to_string()),
    }
}

pub fn dv_wikidata_id(a1_top_left: &str) -> ValidationRule {
    dv_optional_regex(
        a1_top_left,
        "^Q[0-9]+$",
        Some("Optional: Wikidata ID like Q12345"),
    )
}

pub fn dv_optional_year_range(a1_top_left: &str) -> ValidationRule {
    dv_optional_regex(
        a1_top_left,
        YEAR_RANGE_PATTERN,
        Some("Optional: YYYY or YYYY/YYYY"),
    )
}

pub fn dv_optional_date(help: &str) -> ValidationRule {
    ValidationRule::Date {
        help: Some(help.to_string()),
    }
}

fn quote_sheet(name: &str) -> String {
    format!("'{}'", name.replace('\'', "''"))
}

/// Dropdown over the current Museum List values.
pub fn dv_museum_picker<W: Workbook + ?Sized>(
    workbook: &W,
    layouts: &SheetLayouts,
) -> Result<ValidationRule> {
    let list = &layouts.museum_list;
    ensure!(
        workbook.has_sheet(&list.name),
        "Missing sheet \"{}\". Refresh the museum list first.",
        list.name
    );
    let start = list.first_data_row();
    let end = workbook.last_row(&list.name)?.max(start);
    let col = col_to_a1(museum_list_sheet::VALUE_COL);
    Ok(ValidationRule::RangeRef {
        range: format!(
            "{}!${col}${start}:${col}${end}",
            quote_sheet(&list.name)
        ),
    })
}

#[derive(Debug, Clone)]
pub enum RuleSource {
    Static(ValidationRule),
    /// Built per range from its top-left cell, e.g. `"C2"`.
    Factory(fn(&str) -> ValidationRule),
}

#[derive(Debug, Clone)]
pub struct SheetRule {
    pub col: u32,
    pub source: RuleSource,
}

impl SheetRule {
    fn fixed(col: u32, rule: ValidationRule) -> Self {
        Self {
            col,
            source: RuleSource::Static(rule),
        }
    }

    fn factory(col: u32, build: fn(&str) -> ValidationRule) -> Self {
        Self {
            col,
            source: RuleSource::Factory(build),
        }
    }
}

fn form_sheet_rules(
    layout: &FormLayout,
    vocab: &Vocabularies,
    picker: Option<ValidationRule>,
) -> Result<Vec<SheetRule>> {
    let mut rules = vec![SheetRule::fixed(layout.ready_col, dv_checkbox())];
    if let (Some(col), Some(rule)) = (layout.picker_col, picker) {
        rules.push(SheetRule::fixed(col, rule));
    }
    rules.extend([
        SheetRule::factory(layout.col(FormField::MuseumName), |a1| {
            dv_required_non_blank_text(a1, Some("Required: museum name"))
        }),
        SheetRule::factory(layout.col(FormField::WikidataId), dv_wikidata_id),
        SheetRule::factory(layout.col(FormField::Postcode), dv_postcode),
        SheetRule::fixed(
            layout.col(FormField::Accreditation),
            dv_dropdown(vocab.accreditation.iter().cloned(), false)?,
        ),
        SheetRule::fixed(
            layout.col(FormField::AccreditationChangeDate),
            dv_optional_date("Optional: enter a date"),
        ),
        SheetRule::fixed(
            layout.col(FormField::Governance),
            dv_dropdown(vocab.governance.iter().cloned(), false)?,
        ),
        SheetRule::fixed(
            layout.col(FormField::PreviousGovernance),
            dv_dropdown(vocab.governance.iter().cloned(), true)?,
        ),
        SheetRule::factory(
            layout.col(FormField::PreviousGovernanceStart),
            dv_optional_year_range,
        ),
        SheetRule::factory(
            layout.col(FormField::PreviousGovernanceEnd),
            dv_optional_year_range,
        ),
        SheetRule::fixed(
            layout.col(FormField::Size),
            dv_dropdown(vocab.size.iter().cloned(), false)?,
        ),
        SheetRule::fixed(
            layout.col(FormField::Subject),
            dv_dropdown(vocab.subject.iter().cloned(), false)?,
        ),
        SheetRule::factory(layout.col(FormField::YearOpened), dv_optional_year_range),
        SheetRule::factory(layout.col(FormField::YearClosed), dv_optional_year_range),
    ]);
    Ok(rules)
}

pub fn build_add_sheet_rules(vocab: &Vocabularies) -> Result<Vec<SheetRule>> {
    form_sheet_rules(&FormLayout::ADD, vocab, None)
}

pub fn build_edit_sheet_rules(
    vocab: &Vocabularies,
    picker: ValidationRule,
) -> Result<Vec<SheetRule>> {
    form_sheet_rules(&FormLayout::EDIT, vocab, Some(picker))
}

pub fn build_delete_sheet_rules(picker: ValidationRule) -> Vec<SheetRule> {
    vec![
        SheetRule::fixed(delete_sheet::READY_COL, dv_checkbox()),
        SheetRule::fixed(delete_sheet::MUSEUM_COL, picker),
    ]
}

pub fn build_trash_sheet_rules() -> Vec<SheetRule> {
    vec![
        SheetRule::fixed(trash_sheet::PERMANENTLY_DELETE_COL, dv_checkbox()),
        SheetRule::fixed(trash_sheet::RESTORE_COL, dv_checkbox()),
    ]
}

/// Clear and re-apply each rule over `header_row+1 ..= max(last_row, header_row+data_rows)`.
pub fn apply_sheet_rules<W: Workbook + ?Sized>(
    workbook: &mut W,
    sheet: &str,
    rules: &[SheetRule],
    header_row: u32,
    data_rows: u32,
) -> Result<()> {
    workbook.require_sheet(sheet)?;
    let start = header_row + 1;
    let end = workbook
        .last_row(sheet)?
        .max(header_row + data_rows.max(1));
    for rule in rules {
        let range = ColumnRange::new(rule.col, start, end);
        workbook.clear_validation(sheet, range)?;
        let dv = match &rule.source {
            RuleSource::Static(dv) => dv.clone(),
            RuleSource::Factory(build) => build(&cell_a1(rule.col, start)),
        };
        debug!(sheet, range = %range.to_a1(), "applying validation");
        workbook.set_validation(sheet, range, &dv)?;
    }
    Ok(())
}

/// Rebuild the Museum List sheet as `"id - name"` values sorted by name.
/// Returns the number of museums listed.
pub fn refresh_museum_list<W: Workbook + ?Sized>(
    workbook: &mut W,
    layouts: &SheetLayouts,
) -> Result<usize> {
    let db = &layouts.database;
    workbook.require_sheet(&db.name)?;
    let columns = DbColumns::DATABASE;
    let width = columns
        .col(DbField::Id)
        .max(columns.col(DbField::MuseumName));
    let last = workbook.last_row(&db.name)?;
    let rows = workbook.read_rows(&db.name, db.first_data_row(), last, width)?;

    let mut items: Vec<(String, String)> = rows
        .iter()
        .filter_map(|row| {
            let id = trim_to_string(row.get(columns.index(DbField::Id))?);
            let name = trim_to_string(row.get(columns.index(DbField::MuseumName))?);
            (!id.is_empty() && !name.is_empty()).then_some((id, name))
        })
        .collect();
    items.sort_by_key(|(_, name)| name.to_lowercase());

    let list = &layouts.museum_list;
    if !workbook.has_sheet(&list.name) {
        workbook.insert_sheet(&list.name)?;
        workbook.write_cell(
            &list.name,
            list.header_row,
            museum_list_sheet::VALUE_COL,
            CellValue::text("Museum"),
        )?;
    }
    let start = list.first_data_row();
    let clear_rows = LIST_CLEAR_MIN_ROWS
        .max(items.len() as u32 + 10)
        .max(workbook.last_row(&list.name)?.saturating_sub(start) + 1);
    for row in start..start + clear_rows {
        workbook.write_cell(&list.name, row, museum_list_sheet::VALUE_COL, CellValue::Empty)?;
    }
    for (offset, (id, name)) in items.iter().enumerate() {
        workbook.write_cell(
            &list.name,
            start + offset as u32,
            museum_list_sheet::VALUE_COL,
            CellValue::text(compose_picker_label(id, name)),
        )?;
    }
    workbook.hide_sheet(&list.name)?;
    info!(count = items.len(), "museum list refreshed");
    Ok(items.len())
}

/// Refresh the museum list, then re-apply rules on Add, Edit, Delete and Trash.
pub fn setup_all_sheet_validations<W: Workbook + ?Sized>(
    workbook: &mut W,
    layouts: &SheetLayouts,
    vocab: &Vocabularies,
    data_rows: u32,
) -> Result<()> {
    refresh_museum_list(workbook, layouts)?;
    let picker = dv_museum_picker(workbook, layouts)?;

    let plan = [
        (&layouts.add, build_add_sheet_rules(vocab)?),
        (&layouts.edit, build_edit_sheet_rules(vocab, picker.clone())?),
        (&layouts.delete, build_delete_sheet_rules(picker)),
        (&layouts.trash, build_trash_sheet_rules()),
    ];
    for (spec, rules) in plan {
        apply_sheet_rules(workbook, &spec.name, &rules, spec.header_row, data_rows)?;
    }
    info!("sheet validations applied");
    Ok(())
}
