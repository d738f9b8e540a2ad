use anyhow::{Result, bail, ensure};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use strum::{EnumCount, EnumIter, IntoStaticStr};

/// Canonical Database fields, in Database column order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, EnumCount, IntoStaticStr)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum DbField {
    Id,
    MuseumName,
    AlternativeName,
    WikidataId,
    Address1,
    Address2,
    Address3,
    VillageTownCity,
    Postcode,
    Accreditation,
    AccreditationNumber,
    AccreditationChangeDate,
    GovernanceBroad,
    Governance,
    GovernanceSource,
    PreviousGovernance,
    PreviousGovernanceStart,
    PreviousGovernanceEnd,
    Size,
    SizeSource,
    SubjectBroad,
    Subject,
    YearOpened1,
    YearOpened2,
    YearOpenedSource,
    YearClosed1,
    YearClosed2,
    YearClosedSource,
    PrimaryProvenanceOfData,
    Notes,
}

impl DbField {
    pub fn header(self) -> &'static str {
        self.into()
    }
}

/// Fields a person fills in on the Add and Edit sheets, in column order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, EnumCount, IntoStaticStr)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum FormField {
    MuseumName,
    AlternativeName,
    WikidataId,
    Address1,
    Address2,
    Address3,
    VillageTownCity,
    Postcode,
    Accreditation,
    AccreditationNumber,
    AccreditationChangeDate,
    Governance,
    GovernanceSource,
    PreviousGovernance,
    PreviousGovernanceStart,
    PreviousGovernanceEnd,
    Size,
    SizeSource,
    Subject,
    YearOpened,
    YearOpenedSource,
    YearClosed,
    YearClosedSource,
    PrimaryProvenanceOfData,
    Notes,
}

impl FormField {
    pub fn header(self) -> &'static str {
        self.into()
    }
}

/// Where the Database field block starts on a sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DbColumns {
    first_col: u32,
}

impl DbColumns {
    pub const DATABASE: DbColumns = DbColumns { first_col: 1 };
    /// Trash keeps its two flag columns ahead of the Database fields.
    pub const TRASH: DbColumns = DbColumns { first_col: 3 };

    pub fn col(&self, field: DbField) -> u32 {
        self.first_col + field as u32
    }

    /// Zero-based position of `field` within a row read from column A.
    pub fn index(&self, field: DbField) -> usize {
        (self.col(field) - 1) as usize
    }

    pub fn width(&self) -> u32 {
        self.first_col - 1 + DbField::COUNT as u32
    }
}

/// Column positions for the Add and Edit sheets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormLayout {
    pub ready_col: u32,
    pub picker_col: Option<u32>,
    first_field_col: u32,
}

impl FormLayout {
    pub const ADD: FormLayout = FormLayout {
        ready_col: 1,
        picker_col: None,
        first_field_col: 2,
    };
    pub const EDIT: FormLayout = FormLayout {
        ready_col: 1,
        picker_col: Some(2),
        first_field_col: 3,
    };

    pub fn col(&self, field: FormField) -> u32 {
        self.first_field_col + field as u32
    }

    pub fn index(&self, field: FormField) -> usize {
        (self.col(field) - 1) as usize
    }

    pub fn ready_index(&self) -> usize {
        (self.ready_col - 1) as usize
    }

    pub fn picker_index(&self) -> Option<usize> {
        self.picker_col.map(|c| (c - 1) as usize)
    }

    pub fn width(&self) -> u32 {
        self.first_field_col - 1 + FormField::COUNT as u32
    }
}

/// The Delete sheet: a ready checkbox and a museum picker.
pub mod delete_sheet {
    pub const READY_COL: u32 = 1;
    pub const MUSEUM_COL: u32 = 2;
    pub const WIDTH: u32 = 2;
}

/// The Trash sheet flag columns; Database fields follow at [`DbColumns::TRASH`].
pub mod trash_sheet {
    pub const PERMANENTLY_DELETE_COL: u32 = 1;
    pub const RESTORE_COL: u32 = 2;
}

pub mod museum_list_sheet {
    pub const VALUE_COL: u32 = 1;
}

/// Counter cell on the New IDs sheet (A1).
pub const COUNTER_CELL: (u32, u32) = (1, 1);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetSpec {
    pub name: String,
    /// 1-indexed header row; data starts on the row below.
    pub header_row: u32,
}

impl SheetSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            header_row: 1,
        }
    }

    pub fn first_data_row(&self) -> u32 {
        self.header_row + 1
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SheetOverride {
    pub name: Option<String>,
    pub header_row: Option<u32>,
}

impl SheetOverride {
    fn apply(self, spec: &mut SheetSpec) {
        if let Some(name) = self.name {
            spec.name = name.trim().to_string();
        }
        if let Some(header_row) = self.header_row {
            spec.header_row = header_row;
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SheetOverrides {
    pub database: Option<SheetOverride>,
    pub add: Option<SheetOverride>,
    pub edit: Option<SheetOverride>,
    pub delete: Option<SheetOverride>,
    pub trash: Option<SheetOverride>,
    pub museum_list: Option<SheetOverride>,
    pub instructions: Option<SheetOverride>,
    pub new_ids: Option<SheetOverride>,
    pub changelog_cell: Option<String>,
}

/// Every sheet the registry reads or writes. Column positions are fixed per
/// sheet shape; only names and header rows come from configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetLayouts {
    pub database: SheetSpec,
    pub add: SheetSpec,
    pub edit: SheetSpec,
    pub delete: SheetSpec,
    pub trash: SheetSpec,
    pub museum_list: SheetSpec,
    pub instructions: SheetSpec,
    pub new_ids: SheetSpec,
    /// Cell on the Instructions sheet holding the last-changed timestamp.
    pub changelog_cell: (u32, u32),
}

impl Default for SheetLayouts {
    fn default() -> Self {
        Self {
            database: SheetSpec::new("Database"),
            add: SheetSpec::new("Add"),
            edit: SheetSpec::new("Edit"),
            delete: SheetSpec::new("Delete"),
            trash: SheetSpec::new("Trash"),
            museum_list: SheetSpec::new("Museum List"),
            instructions: SheetSpec::new("Instructions"),
            new_ids: SheetSpec::new("New IDs"),
            changelog_cell: (2, 1),
        }
    }
}

impl SheetLayouts {
    pub fn with_overrides(overrides: SheetOverrides) -> Result<Self> {
        let mut layouts = Self::default();
        let SheetOverrides {
            database,
            add,
            edit,
            delete,
            trash,
            museum_list,
            instructions,
            new_ids,
            changelog_cell,
        } = overrides;
        for (value, spec) in [
            (database, &mut layouts.database),
            (add, &mut layouts.add),
            (edit, &mut layouts.edit),
            (delete, &mut layouts.delete),
            (trash, &mut layouts.trash),
            (museum_list, &mut layouts.museum_list),
            (instructions, &mut layouts.instructions),
            (new_ids, &mut layouts.new_ids),
        ] {
            if let Some(value) = value {
                value.apply(spec);
            }
        }
        if let Some(cell) = changelog_cell {
            layouts.changelog_cell = parse_a1(&cell)?;
        }
        layouts.validate()?;
        Ok(layouts)
    }

    fn all(&self) -> [&SheetSpec; 8] {
        [
            &self.database,
            &self.add,
            &self.edit,
            &self.delete,
            &self.trash,
            &self.museum_list,
            &self.instructions,
            &self.new_ids,
        ]
    }

    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for spec in self.all() {
            ensure!(!spec.name.is_empty(), "sheet names must not be empty");
            ensure!(
                spec.header_row >= 1,
                "sheet '{}' header_row must be >= 1",
                spec.name
            );
            ensure!(
                seen.insert(spec.name.to_ascii_lowercase()),
                "sheet name '{}' is configured more than once",
                spec.name
            );
        }
        Ok(())
    }
}

/// Column letters for a 1-indexed column.
pub fn col_to_a1(col: u32) -> String {
    let mut n = col;
    let mut out = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        out.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}

pub fn cell_a1(col: u32, row: u32) -> String {
    format!("{}{}", col_to_a1(col), row)
}

/// Parse `"B2"` into `(col, row)`, both 1-indexed.
pub fn parse_a1(cell: &str) -> Result<(u32, u32)> {
    let cell = cell.trim().replace('$', "").to_ascii_uppercase();
    let split = cell
        .find(|c: char| c.is_ascii_digit())
        .unwrap_or(cell.len());
    let (letters, digits) = cell.split_at(split);
    if letters.is_empty() || digits.is_empty() || !letters.chars().all(|c| c.is_ascii_uppercase())
    {
        bail!("invalid cell reference '{cell}'");
    }
    let col = letters
        .chars()
        .try_fold(0u32, |acc, c| {
            acc.checked_mul(26)?.checked_add(c as u32 - 'A' as u32 + 1)
        })
        .ok_or_else(|| anyhow::anyhow!("cell reference '{cell}' is out of range"))?;
    let row: u32 = digits
        .parse()
        .map_err(|_| anyhow::anyhow!("invalid cell reference '{cell}'"))?;
    ensure!(row >= 1, "invalid cell reference '{cell}'");
    Ok((col, row))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn database_and_trash_widths() {
        assert_eq!(DbColumns::DATABASE.width(), 30);
        assert_eq!(DbColumns::TRASH.width(), 32);
        assert_eq!(DbColumns::TRASH.col(DbField::Id), 3);
        assert_eq!(DbColumns::DATABASE.col(DbField::Notes), 30);
    }

    #[test]
    fn form_layouts_shift_by_picker() {
        assert_eq!(FormLayout::ADD.col(FormField::MuseumName), 2);
        assert_eq!(FormLayout::EDIT.col(FormField::MuseumName), 3);
        assert_eq!(FormLayout::ADD.col(FormField::Notes), 26);
        assert_eq!(FormLayout::EDIT.width(), 27);
    }

    #[test]
    fn a1_conversions() {
        assert_eq!(col_to_a1(1), "A");
        assert_eq!(col_to_a1(26), "Z");
        assert_eq!(col_to_a1(27), "AA");
        assert_eq!(cell_a1(3, 2), "C2");
        assert_eq!(parse_a1("$AB$12").unwrap(), (28, 12));
        assert!(parse_a1("12").is_err());
        assert!(parse_a1("ZZZZZZZZ1").is_err());
        assert!(parse_a1("XFD1048576").is_ok());
    }

    #[test]
    fn duplicate_sheet_names_are_rejected() {
        let overrides = SheetOverrides {
            edit: Some(SheetOverride {
                name: Some("add".into()),
                header_row: None,
            }),
            ..Default::default()
        };
        assert!(SheetLayouts::with_overrides(overrides).is_err());
    }
}
