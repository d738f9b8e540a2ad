use crate::layout::{DbColumns, DbField, FormField, FormLayout};
use crate::model::CellValue;
use crate::normalize::{
    broad_category, compose_picker_label, join_year_range, split_year_range, trim_to_string,
};
use strum::IntoEnumIterator;

fn cell(row: &[CellValue], idx: usize) -> &CellValue {
    static BLANK: CellValue = CellValue::Empty;
    row.get(idx).unwrap_or(&BLANK)
}

fn padded(row: Option<&[CellValue]>, width: usize) -> Vec<CellValue> {
    let mut out = row.map(<[CellValue]>::to_vec).unwrap_or_default();
    out.resize(width.max(out.len()), CellValue::Empty);
    out
}

/// Fields copied verbatim (trimmed) from the form into the same-named DB column.
const TRIMMED_FIELDS: &[(FormField, DbField)] = &[
    (FormField::MuseumName, DbField::MuseumName),
    (FormField::AlternativeName, DbField::AlternativeName),
    (FormField::WikidataId, DbField::WikidataId),
    (FormField::Address1, DbField::Address1),
    (FormField::Address2, DbField::Address2),
    (FormField::Address3, DbField::Address3),
    (FormField::VillageTownCity, DbField::VillageTownCity),
    (FormField::Accreditation, DbField::Accreditation),
    (FormField::AccreditationChangeDate, DbField::AccreditationChangeDate),
    (FormField::Governance, DbField::Governance),
    (FormField::GovernanceSource, DbField::GovernanceSource),
    (FormField::PreviousGovernance, DbField::PreviousGovernance),
    (FormField::PreviousGovernanceStart, DbField::PreviousGovernanceStart),
    (FormField::PreviousGovernanceEnd, DbField::PreviousGovernanceEnd),
    (FormField::Size, DbField::Size),
    (FormField::SizeSource, DbField::SizeSource),
    (FormField::Subject, DbField::Subject),
    (FormField::YearOpenedSource, DbField::YearOpenedSource),
    (FormField::YearClosedSource, DbField::YearClosedSource),
    (FormField::PrimaryProvenanceOfData, DbField::PrimaryProvenanceOfData),
    (FormField::Notes, DbField::Notes),
];

/// Build the Database row for a committed form row.
///
/// Starts from `existing` (or blanks when appending) so columns the form
/// does not own survive an overwrite.
pub fn form_to_db(
    existing: Option<&[CellValue]>,
    db_width: u32,
    form_row: &[CellValue],
    layout: &FormLayout,
    museum_id: &str,
) -> Vec<CellValue> {
    let db = DbColumns::DATABASE;
    let mut out = padded(existing, db_width.max(db.width()) as usize);
    let form = |field: FormField| cell(form_row, layout.index(field));
    let mut put = |field: DbField, value: CellValue| out[db.index(field)] = value;

    put(DbField::Id, CellValue::text(museum_id));
    for (form_field, db_field) in TRIMMED_FIELDS {
        put(*db_field, CellValue::text_or_empty(trim_to_string(form(*form_field))));
    }
    put(
        DbField::Postcode,
        CellValue::text_or_empty(trim_to_string(form(FormField::Postcode)).to_uppercase()),
    );
    // Accreditation numbers keep their original cell type.
    put(
        DbField::AccreditationNumber,
        form(FormField::AccreditationNumber).clone(),
    );
    put(
        DbField::GovernanceBroad,
        CellValue::text_or_empty(broad_category(form(FormField::Governance))),
    );
    put(
        DbField::SubjectBroad,
        CellValue::text_or_empty(broad_category(form(FormField::Subject))),
    );
    let (opened_1, opened_2) = split_year_range(form(FormField::YearOpened));
    put(DbField::YearOpened1, CellValue::text_or_empty(opened_1));
    put(DbField::YearOpened2, CellValue::text_or_empty(opened_2));
    let (closed_1, closed_2) = split_year_range(form(FormField::YearClosed));
    put(DbField::YearClosed1, CellValue::text_or_empty(closed_1));
    put(DbField::YearClosed2, CellValue::text_or_empty(closed_2));
    out
}

/// Copy the canonical Database fields between Database- and Trash-shaped rows.
/// The result starts blank, so destination-only columns never carry stale flags.
pub fn db_to_db(
    source_row: &[CellValue],
    source: DbColumns,
    dest: DbColumns,
    dest_width: u32,
) -> Vec<CellValue> {
    let mut out = vec![CellValue::Empty; dest_width.max(dest.width()) as usize];
    for field in DbField::iter() {
        out[dest.index(field)] = cell(source_row, source.index(field)).clone();
    }
    out
}

/// Fresh form row populated from a Database row.
///
/// The picker column (Edit only) gets `"<id> - <name>"`; the ready cell is
/// kept from `existing_form_row` when `preserve_ready` is set.
pub fn db_to_form(
    db_row: &[CellValue],
    layout: &FormLayout,
    existing_form_row: Option<&[CellValue]>,
    preserve_ready: bool,
) -> Vec<CellValue> {
    let db = DbColumns::DATABASE;
    let mut out = vec![CellValue::Empty; layout.width() as usize];
    let from_db = |field: DbField| cell(db_row, db.index(field));

    if preserve_ready {
        if let Some(existing) = existing_form_row {
            out[layout.ready_index()] = cell(existing, layout.ready_index()).clone();
        }
    }
    if let Some(idx) = layout.picker_index() {
        let label = compose_picker_label(
            &trim_to_string(from_db(DbField::Id)),
            &trim_to_string(from_db(DbField::MuseumName)),
        );
        out[idx] = CellValue::text_or_empty(label);
    }
    for (form_field, db_field) in TRIMMED_FIELDS {
        out[layout.index(*form_field)] = from_db(*db_field).clone();
    }
    out[layout.index(FormField::Postcode)] = from_db(DbField::Postcode).clone();
    out[layout.index(FormField::AccreditationNumber)] =
        from_db(DbField::AccreditationNumber).clone();
    out[layout.index(FormField::YearOpened)] = CellValue::text_or_empty(join_year_range(
        from_db(DbField::YearOpened1),
        from_db(DbField::YearOpened2),
    ));
    out[layout.index(FormField::YearClosed)] = CellValue::text_or_empty(join_year_range(
        from_db(DbField::YearClosed1),
        from_db(DbField::YearClosed2),
    ));
    out
}

/// Blank a form row except for its ready and picker cells.
pub fn clear_form_row_except_ready(existing: &[CellValue], layout: &FormLayout) -> Vec<CellValue> {
    let mut out = vec![CellValue::Empty; layout.width() as usize];
    out[layout.ready_index()] = cell(existing, layout.ready_index()).clone();
    if let Some(idx) = layout.picker_index() {
        out[idx] = cell(existing, idx).clone();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn add_row(pairs: &[(FormField, CellValue)]) -> Vec<CellValue> {
        let layout = FormLayout::ADD;
        let mut row = vec![CellValue::Empty; layout.width() as usize];
        row[layout.ready_index()] = CellValue::Bool(true);
        for (field, value) in pairs {
            row[layout.index(*field)] = value.clone();
        }
        row
    }

    #[test]
    fn form_to_db_normalizes_and_derives() {
        let row = add_row(&[
            (FormField::MuseumName, " Museum A ".into()),
            (FormField::Postcode, "sw1a 1aa".into()),
            (FormField::Governance, "Government: Local Authority".into()),
            (FormField::Subject, "Arts: Crafts".into()),
            (FormField::YearOpened, "1999/2003".into()),
            (FormField::YearClosed, "2010".into()),
            (FormField::AccreditationNumber, CellValue::Number(42.0)),
        ]);
        let out = form_to_db(None, 30, &row, &FormLayout::ADD, "mm.new.5");
        let db = DbColumns::DATABASE;
        let get = |f: DbField| out[db.index(f)].clone();
        assert_eq!(get(DbField::Id), CellValue::text("mm.new.5"));
        assert_eq!(get(DbField::MuseumName), CellValue::text("Museum A"));
        assert_eq!(get(DbField::Postcode), CellValue::text("SW1A 1AA"));
        assert_eq!(get(DbField::GovernanceBroad), CellValue::text("Government"));
        assert_eq!(get(DbField::SubjectBroad), CellValue::text("Arts"));
        assert_eq!(get(DbField::YearOpened1), CellValue::text("1999"));
        assert_eq!(get(DbField::YearOpened2), CellValue::text("2003"));
        assert_eq!(get(DbField::YearClosed1), CellValue::text("2010"));
        assert_eq!(get(DbField::YearClosed2), CellValue::text("2010"));
        assert_eq!(get(DbField::AccreditationNumber), CellValue::Number(42.0));
    }

    #[test]
    fn form_to_db_keeps_db_only_columns() {
        let mut existing = vec![CellValue::Empty; 32];
        existing[30] = CellValue::text("reviewed");
        let row = add_row(&[(FormField::MuseumName, "B".into())]);
        let out = form_to_db(Some(&existing), 32, &row, &FormLayout::ADD, "mm.new.1");
        assert_eq!(out.len(), 32);
        assert_eq!(out[30], CellValue::text("reviewed"));
    }

    #[test]
    fn db_to_db_clears_destination_flags() {
        let mut trash = vec![CellValue::Bool(true), CellValue::Bool(true)];
        trash.extend((0..30).map(|i| CellValue::text(format!("v{i}"))));
        let out = db_to_db(&trash, DbColumns::TRASH, DbColumns::DATABASE, 30);
        assert_eq!(out.len(), 30);
        assert_eq!(out[0], CellValue::text("v0"));
        assert_eq!(out[29], CellValue::text("v29"));

        let back = db_to_db(&out, DbColumns::DATABASE, DbColumns::TRASH, 32);
        assert_eq!(back[0], CellValue::Empty);
        assert_eq!(back[1], CellValue::Empty);
        assert_eq!(back[2], CellValue::text("v0"));
    }

    #[test]
    fn db_to_form_composes_picker_and_year_ranges() {
        let db = DbColumns::DATABASE;
        let mut db_row = vec![CellValue::Empty; 30];
        db_row[db.index(DbField::Id)] = "mm.new.3".into();
        db_row[db.index(DbField::MuseumName)] = "Hall".into();
        db_row[db.index(DbField::YearOpened1)] = "1999".into();
        db_row[db.index(DbField::YearOpened2)] = "1999".into();
        db_row[db.index(DbField::YearClosed1)] = "2001".into();
        db_row[db.index(DbField::YearClosed2)] = "2004".into();

        let layout = FormLayout::EDIT;
        let mut existing = vec![CellValue::Empty; layout.width() as usize];
        existing[layout.ready_index()] = CellValue::Bool(true);
        existing[layout.index(FormField::Notes)] = "stale".into();

        let out = db_to_form(&db_row, &layout, Some(&existing), true);
        assert_eq!(out[0], CellValue::Bool(true));
        assert_eq!(out[1], CellValue::text("mm.new.3 - Hall"));
        assert_eq!(out[layout.index(FormField::YearOpened)], CellValue::text("1999"));
        assert_eq!(out[layout.index(FormField::YearClosed)], CellValue::text("2001/2004"));
        assert_eq!(out[layout.index(FormField::Notes)], CellValue::Empty);

        let unticked = db_to_form(&db_row, &layout, Some(&existing), false);
        assert_eq!(unticked[0], CellValue::Empty);
    }
}
