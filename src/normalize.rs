use crate::model::CellValue;
use once_cell::sync::Lazy;
use regex::Regex;

static COMPOSITE_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(.+?)\s*-\s*.+$").expect("composite id regex"));

pub fn trim_to_string(value: &CellValue) -> String {
    value.to_string().trim().to_string()
}

/// Text of a year-like cell. Integral numbers count as typed years.
fn year_text(value: &CellValue) -> Option<String> {
    match value {
        CellValue::Text(s) => Some(s.trim().to_string()),
        CellValue::Number(n) if n.fract() == 0.0 => Some(value.to_string()),
        _ => None,
    }
}

/// Part of a `"broad: narrow"` taxonomy value before the first colon.
pub fn broad_category(value: &CellValue) -> String {
    let Some(text) = value.as_text() else {
        return String::new();
    };
    let trimmed = text.trim();
    match trimmed.split_once(':') {
        Some((broad, _)) => broad.trim().to_string(),
        None => trimmed.to_string(),
    }
}

pub fn split_year_range(value: &CellValue) -> (String, String) {
    let Some(text) = year_text(value) else {
        return (String::new(), String::new());
    };
    if text.is_empty() {
        return (String::new(), String::new());
    }
    match text.split_once('/') {
        Some((start, end)) => (start.trim().to_string(), end.trim().to_string()),
        None => (text.clone(), text),
    }
}

pub fn join_year_range(start: &CellValue, end: &CellValue) -> String {
    let start = trim_to_string(start);
    let end = trim_to_string(end);
    if end.is_empty() || end == start {
        return start;
    }
    format!("{start}/{end}")
}

/// Extract `<id>` from a `"<id> - <name>"` picker value.
pub fn parse_composite_id(value: &CellValue) -> Option<String> {
    let text = value.as_text()?.trim();
    let caps = COMPOSITE_ID_RE.captures(text)?;
    let id = caps.get(1)?.as_str().trim();
    if id.is_empty() {
        None
    } else {
        Some(id.to_string())
    }
}

pub fn compose_picker_label(id: &str, name: &str) -> String {
    match (id.is_empty(), name.is_empty()) {
        (false, false) => format!("{id} - {name}"),
        (false, true) => id.to_string(),
        (true, false) => name.to_string(),
        (true, true) => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> CellValue {
        CellValue::text(s)
    }

    #[test]
    fn broad_category_takes_prefix() {
        assert_eq!(broad_category(&text("Government: Local Authority")), "Government");
        assert_eq!(broad_category(&text("  Mixed ")), "Mixed");
        assert_eq!(broad_category(&CellValue::Number(3.0)), "");
        assert_eq!(broad_category(&CellValue::Empty), "");
    }

    #[test]
    fn split_and_join_year_ranges() {
        assert_eq!(split_year_range(&text("")), (String::new(), String::new()));
        assert_eq!(split_year_range(&text("2010")), ("2010".into(), "2010".into()));
        assert_eq!(split_year_range(&text("1999/2003")), ("1999".into(), "2003".into()));
        assert_eq!(split_year_range(&CellValue::Number(1870.0)), ("1870".into(), "1870".into()));
        assert_eq!(join_year_range(&text("2000"), &text("2000")), "2000");
        assert_eq!(join_year_range(&text("2000"), &CellValue::Empty), "2000");
        assert_eq!(join_year_range(&text("1999"), &text("2003")), "1999/2003");
        assert_eq!(join_year_range(&CellValue::Empty, &CellValue::Empty), "");
    }

    #[test]
    fn year_range_display_round_trips() {
        for s in ["1999", "1999/2000", "2000/2000"] {
            let (a, b) = split_year_range(&text(s));
            let joined = join_year_range(&text(&a), &text(&b));
            let expected = if s == "2000/2000" { "2000" } else { s };
            assert_eq!(joined, expected);
        }
    }

    #[test]
    fn composite_ids() {
        assert_eq!(parse_composite_id(&text("mm.new.7 - Museum A")), Some("mm.new.7".into()));
        assert_eq!(parse_composite_id(&text("  mm.x.1 -  Hall - Annex ")), Some("mm.x.1".into()));
        assert_eq!(parse_composite_id(&text("mm.new.7")), None);
        assert_eq!(parse_composite_id(&CellValue::Number(7.0)), None);
    }

    #[test]
    fn picker_labels() {
        assert_eq!(compose_picker_label("mm.new.1", "A"), "mm.new.1 - A");
        assert_eq!(compose_picker_label("", "A"), "A");
        assert_eq!(compose_picker_label("mm.new.1", ""), "mm.new.1");
    }
}
