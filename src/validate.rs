use crate::layout::{FormField, FormLayout};
use crate::model::CellValue;
use crate::normalize::trim_to_string;
use indexmap::IndexSet;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

static WIKIDATA_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^Q[0-9]+$").expect("wikidata regex"));
static POSTCODE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^[A-Z]{1,2}[0-9][A-Z0-9]?\s[0-9][A-Z]{2}$").expect("postcode regex")
});
static YEAR_RANGE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{4})(?:/(\d{4}))?$").expect("year range regex"));

const DEFAULT_ACCREDITATION: &[&str] = &["Accredited", "Unaccredited"];
const DEFAULT_GOVERNANCE: &[&str] = &[
    "Government: National",
    "Government: Local Authority",
    "Government: Other",
    "Independent: Not for profit",
    "Independent: Private",
    "Independent: National Trust",
    "Independent: English Heritage",
    "Independent: Historic Environment Scotland",
    "University",
    "Unknown",
];
const DEFAULT_SIZE: &[&str] = &["small", "medium", "large", "huge", "unknown"];
const DEFAULT_SUBJECT: &[&str] = &[
    "Archaeology: Mixed",
    "Archaeology: Roman",
    "Arts: Fine and decorative arts",
    "Arts: Crafts",
    "Belief and identity: Religion",
    "Buildings: Houses",
    "Communications",
    "Food and drink",
    "Industry and manufacture",
    "Leisure and sport",
    "Local Histories",
    "Medicine and health",
    "Military: Regiment",
    "Mixed",
    "Natural world",
    "Personality",
    "Rural Industry",
    "Science and technology",
    "Sea and seafaring",
    "Services",
    "Transport: Trains",
    "Utilities",
    "War and conflict",
    "Other",
];

/// The four closed vocabularies a form row is checked against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vocabularies {
    pub accreditation: IndexSet<String>,
    pub governance: IndexSet<String>,
    pub size: IndexSet<String>,
    pub subject: IndexSet<String>,
}

fn to_set(values: &[&str]) -> IndexSet<String> {
    values.iter().map(|v| (*v).to_string()).collect()
}

impl Default for Vocabularies {
    fn default() -> Self {
        Self {
            accreditation: to_set(DEFAULT_ACCREDITATION),
            governance: to_set(DEFAULT_GOVERNANCE),
            size: to_set(DEFAULT_SIZE),
            subject: to_set(DEFAULT_SUBJECT),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VocabularyOverrides {
    pub accreditation: Option<Vec<String>>,
    pub governance: Option<Vec<String>>,
    pub size: Option<Vec<String>>,
    pub subject: Option<Vec<String>>,
}

impl Vocabularies {
    pub fn with_overrides(overrides: VocabularyOverrides) -> anyhow::Result<Self> {
        let mut vocab = Self::default();
        for (label, values, target) in [
            ("accreditation", overrides.accreditation, &mut vocab.accreditation),
            ("governance", overrides.governance, &mut vocab.governance),
            ("size", overrides.size, &mut vocab.size),
            ("subject", overrides.subject, &mut vocab.subject),
        ] {
            if let Some(values) = values {
                let set: IndexSet<String> = values
                    .into_iter()
                    .map(|v| v.trim().to_string())
                    .filter(|v| !v.is_empty())
                    .collect();
                anyhow::ensure!(!set.is_empty(), "{label} vocabulary must not be empty");
                *target = set;
            }
        }
        Ok(vocab)
    }
}

pub fn is_empty(value: &CellValue) -> bool {
    value.is_blank()
}

pub fn is_valid_wikidata_id(value: &CellValue) -> bool {
    value
        .as_text()
        .is_some_and(|s| WIKIDATA_RE.is_match(s.trim()))
}

pub fn is_valid_postcode(value: &CellValue) -> bool {
    value
        .as_text()
        .is_some_and(|s| POSTCODE_RE.is_match(s.trim()))
}

/// Integer greater than zero, typed as a number or as numeric text.
pub fn is_valid_accreditation_number(value: &CellValue) -> bool {
    let number = match value {
        CellValue::Number(n) => *n,
        CellValue::Text(s) if !s.trim().is_empty() => match s.trim().parse::<f64>() {
            Ok(n) => n,
            Err(_) => return false,
        },
        _ => return false,
    };
    number.is_finite() && number.fract() == 0.0 && number > 0.0
}

/// `YYYY` or `YYYY/YYYY` with start not after end. A whole-number cell counts
/// as a single year.
pub fn is_valid_year_range(value: &CellValue) -> bool {
    let text = match value {
        CellValue::Text(s) => s.trim().to_string(),
        CellValue::Number(n) if n.fract() == 0.0 => value.to_string(),
        _ => return false,
    };
    let Some(caps) = YEAR_RANGE_RE.captures(&text) else {
        return false;
    };
    let start: u32 = caps[1].parse().unwrap_or(u32::MAX);
    let end: u32 = caps
        .get(2)
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(start);
    start <= end
}

fn in_set(value: &CellValue, set: &IndexSet<String>) -> bool {
    value.as_text().is_some_and(|s| set.contains(s.trim()))
}

/// Every validation failure for one form row, in column order.
pub fn validate_form_row(
    row: &[CellValue],
    layout: &FormLayout,
    vocab: &Vocabularies,
) -> Vec<String> {
    let blank = CellValue::Empty;
    let get = |field: FormField| row.get(layout.index(field)).unwrap_or(&blank);
    let shown = |field: FormField| trim_to_string(get(field));
    let mut errors = Vec::new();

    if is_empty(get(FormField::MuseumName)) {
        errors.push("Museum must have a name.".to_string());
    }

    let wikidata = get(FormField::WikidataId);
    if !is_empty(wikidata) && !is_valid_wikidata_id(wikidata) {
        errors.push(format!(
            "Wikidata ID {} is not a valid Wikidata ID.",
            shown(FormField::WikidataId)
        ));
    }

    if !is_valid_postcode(get(FormField::Postcode)) {
        errors.push(format!(
            "Postcode {} is not a correctly formatted UK postcode.",
            shown(FormField::Postcode)
        ));
    }

    if !in_set(get(FormField::Accreditation), &vocab.accreditation) {
        errors.push(format!(
            "Accreditation {} is not a valid accreditation status.",
            shown(FormField::Accreditation)
        ));
    }

    let number = get(FormField::AccreditationNumber);
    if !is_empty(number) && !is_valid_accreditation_number(number) {
        errors.push(format!(
            "Accreditation number {} is not a valid accreditation number.",
            shown(FormField::AccreditationNumber)
        ));
    }

    let change_date = get(FormField::AccreditationChangeDate);
    if !is_empty(change_date) && !is_valid_year_range(change_date) {
        errors.push(format!(
            "Date accreditation status changed {} is not a valid year range.",
            shown(FormField::AccreditationChangeDate)
        ));
    }

    if !in_set(get(FormField::Governance), &vocab.governance) {
        errors.push(format!(
            "Governance {} is not a valid governance type.",
            shown(FormField::Governance)
        ));
    }

    let previous = get(FormField::PreviousGovernance);
    if !is_empty(previous) && !in_set(previous, &vocab.governance) {
        errors.push(format!(
            "Previous governance {} is not a valid governance type.",
            shown(FormField::PreviousGovernance)
        ));
    }

    for (field, label) in [
        (
            FormField::PreviousGovernanceStart,
            "Start date of previous governance",
        ),
        (
            FormField::PreviousGovernanceEnd,
            "End date of previous governance",
        ),
    ] {
        let value = get(field);
        if !is_empty(value) && !is_valid_year_range(value) {
            errors.push(format!(
                "{label} {} is not a valid year range.",
                shown(field)
            ));
        }
    }

    if !in_set(get(FormField::Size), &vocab.size) {
        errors.push(format!(
            "Size {} is not a valid museum size.",
            shown(FormField::Size)
        ));
    }

    if !in_set(get(FormField::Subject), &vocab.subject) {
        errors.push(format!(
            "Subject {} is not a valid museum subject matter.",
            shown(FormField::Subject)
        ));
    }

    if !is_valid_year_range(get(FormField::YearOpened)) {
        errors.push(format!(
            "Year opened {} is not a valid year range.",
            shown(FormField::YearOpened)
        ));
    }

    if !is_valid_year_range(get(FormField::YearClosed)) {
        errors.push(format!(
            "Year closed {} is not a valid year range.",
            shown(FormField::YearClosed)
        ));
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> CellValue {
        CellValue::text(s)
    }

    #[test]
    fn postcodes() {
        for ok in ["SW1A 1AA", "sw1a 1aa", "B33 8TH", " M1 1AE "] {
            assert!(is_valid_postcode(&text(ok)), "{ok}");
        }
        for bad in ["SW1A1AA", "", "SW1A  1AA", "12345"] {
            assert!(!is_valid_postcode(&text(bad)), "{bad}");
        }
        assert!(!is_valid_postcode(&CellValue::Number(1.0)));
    }

    #[test]
    fn year_ranges() {
        assert!(is_valid_year_range(&text("1999")));
        assert!(is_valid_year_range(&text("1999/2000")));
        assert!(is_valid_year_range(&CellValue::Number(1999.0)));
        assert!(!is_valid_year_range(&text("1999/1998")));
        assert!(!is_valid_year_range(&text("199")));
        assert!(!is_valid_year_range(&text("")));
        assert!(!is_valid_year_range(&CellValue::Bool(true)));
    }

    #[test]
    fn accreditation_numbers() {
        assert!(is_valid_accreditation_number(&CellValue::Number(12.0)));
        assert!(is_valid_accreditation_number(&text(" 7 ")));
        assert!(!is_valid_accreditation_number(&CellValue::Number(0.0)));
        assert!(!is_valid_accreditation_number(&CellValue::Number(1.5)));
        assert!(!is_valid_accreditation_number(&text("abc")));
        assert!(!is_valid_accreditation_number(&CellValue::Empty));
    }

    #[test]
    fn wikidata_ids() {
        assert!(is_valid_wikidata_id(&text("Q42")));
        assert!(!is_valid_wikidata_id(&text("q42")));
        assert!(!is_valid_wikidata_id(&text("Q")));
    }

    #[test]
    fn vocabulary_override_replaces_set() {
        let vocab = Vocabularies::with_overrides(VocabularyOverrides {
            size: Some(vec!["tiny".into(), " ".into()]),
            ..Default::default()
        })
        .unwrap();
        assert!(in_set(&text("tiny"), &vocab.size));
        assert!(!in_set(&text("small"), &vocab.size));
        assert!(in_set(&text("Accredited"), &vocab.accreditation));
    }
}
