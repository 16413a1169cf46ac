//! Raw cell text to typed values.
//!
//! Every loader goes through [`normalize`], so the fallback for each field kind
//! lives in exactly one place:
//!
//! | kind    | placeholder (`""`, `-`, `nan`, missing) | unparsable            |
//! |---------|------------------------------------------|-----------------------|
//! | `Count` | `0`                                      | `0`, flagged          |
//! | `Flag`  | `false`                                  | `false`, flagged      |
//! | `Line`  | `Unassigned` (label `"0"`)               | `Unassigned`, flagged |
//! | `Text`  | `""`                                     | never                 |
//! | `Date`  | `None`                                   | `None`, flagged       |

use chrono::NaiveDate;

use crate::records::Line;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Count,
    Flag,
    Line,
    Text,
    Date,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Count(u32),
    Flag(bool),
    Line(Line),
    Text(String),
    Date(Option<NaiveDate>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Normalized {
    pub value: FieldValue,
    /// The raw text was present but not understood; `value` is the default.
    pub fell_back: bool,
}

impl Normalized {
    fn ok(value: FieldValue) -> Self {
        Self {
            value,
            fell_back: false,
        }
    }

    fn fallback(value: FieldValue) -> Self {
        Self {
            value,
            fell_back: true,
        }
    }

    pub fn as_count(&self) -> u32 {
        match self.value {
            FieldValue::Count(v) => v,
            _ => 0,
        }
    }

    pub fn as_flag(&self) -> bool {
        matches!(self.value, FieldValue::Flag(true))
    }

    pub fn as_line(&self) -> Line {
        match self.value {
            FieldValue::Line(line) => line,
            _ => Line::Unassigned,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self.value {
            FieldValue::Date(date) => date,
            _ => None,
        }
    }

    pub fn into_text(self) -> String {
        match self.value {
            FieldValue::Text(s) => s,
            _ => String::new(),
        }
    }
}

pub fn normalize(raw: Option<&str>, kind: FieldKind) -> Normalized {
    let trimmed = raw.map(str::trim).unwrap_or("");
    if is_placeholder(trimmed) {
        return Normalized::ok(default_value(kind));
    }

    let parsed = match kind {
        FieldKind::Count => parse_count(trimmed).map(FieldValue::Count),
        FieldKind::Flag => parse_flag(trimmed).map(FieldValue::Flag),
        FieldKind::Line => parse_line(trimmed).map(FieldValue::Line),
        FieldKind::Date => parse_date(trimmed).map(|d| FieldValue::Date(Some(d))),
        FieldKind::Text => Some(FieldValue::Text(trimmed.to_string())),
    };
    match parsed {
        Some(value) => Normalized::ok(value),
        None => Normalized::fallback(default_value(kind)),
    }
}

pub fn default_value(kind: FieldKind) -> FieldValue {
    match kind {
        FieldKind::Count => FieldValue::Count(0),
        FieldKind::Flag => FieldValue::Flag(false),
        FieldKind::Line => FieldValue::Line(Line::Unassigned),
        FieldKind::Text => FieldValue::Text(String::new()),
        FieldKind::Date => FieldValue::Date(None),
    }
}

/// Blank cells and the placeholders spreadsheets and pandas leave behind.
pub fn is_placeholder(s: &str) -> bool {
    let s = s.trim();
    s.is_empty() || s == "-" || s.eq_ignore_ascii_case("nan")
}

/// Non-negative integer, also accepting integral floats like `"3.0"`.
pub fn parse_count(raw: &str) -> Option<u32> {
    let s = raw.trim();
    if let Ok(v) = s.parse::<u32>() {
        return Some(v);
    }
    let v = s.replace(',', ".").parse::<f64>().ok()?;
    if !v.is_finite() || v < 0.0 || v.fract() != 0.0 || v > u32::MAX as f64 {
        return None;
    }
    Some(v as u32)
}

pub fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "ja" | "j" | "yes" | "y" | "true" | "1" | "x" | "1.0" => Some(true),
        "nein" | "n" | "no" | "false" | "0" | "0.0" => Some(false),
        _ => None,
    }
}

pub fn parse_line(raw: &str) -> Option<Line> {
    let s = raw.trim();
    if is_placeholder(s) || s == "0" {
        return Some(Line::Unassigned);
    }
    let lower = s.to_lowercase();
    if matches!(
        lower.as_str(),
        "goalie" | "g" | "goalkeeper" | "torhüter" | "torhueter" | "tw"
    ) {
        return Some(Line::Goalie);
    }
    match parse_count(s)? {
        0 => Some(Line::Unassigned),
        n => u8::try_from(n).ok().map(Line::Numbered),
    }
}

pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    const FORMATS: [&str; 4] = ["%d.%m.%y", "%d.%m.%Y", "%Y-%m-%d", "%d/%m/%Y"];

    let s = raw.trim();
    for fmt in FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d);
        }
    }
    None
}

/// Match ids are compared trimmed; `""` and `"nan"` mean "no match selected".
pub fn normalize_match_id(raw: &str) -> Option<String> {
    let s = raw.trim();
    if s.is_empty() || s.eq_ignore_ascii_case("nan") {
        None
    } else {
        Some(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_fall_back_to_zero() {
        assert_eq!(normalize(Some(" 4 "), FieldKind::Count).as_count(), 4);
        assert_eq!(normalize(Some("2.0"), FieldKind::Count).as_count(), 2);

        let dash = normalize(Some("-"), FieldKind::Count);
        assert_eq!(dash.as_count(), 0);
        assert!(!dash.fell_back);

        let missing = normalize(None, FieldKind::Count);
        assert_eq!(missing.as_count(), 0);
        assert!(!missing.fell_back);

        let junk = normalize(Some("abc"), FieldKind::Count);
        assert_eq!(junk.as_count(), 0);
        assert!(junk.fell_back);

        let negative = normalize(Some("-3"), FieldKind::Count);
        assert_eq!(negative.as_count(), 0);
        assert!(negative.fell_back);
    }

    #[test]
    fn lines_use_the_zero_sentinel() {
        assert_eq!(normalize(None, FieldKind::Line).as_line(), Line::Unassigned);
        assert_eq!(normalize(Some(""), FieldKind::Line).as_line(), Line::Unassigned);
        assert_eq!(normalize(Some("0"), FieldKind::Line).as_line(), Line::Unassigned);
        assert_eq!(normalize(Some(" 2 "), FieldKind::Line).as_line(), Line::Numbered(2));
        assert_eq!(normalize(Some("3.0"), FieldKind::Line).as_line(), Line::Numbered(3));
        assert_eq!(normalize(Some("Goalie"), FieldKind::Line).as_line(), Line::Goalie);
        assert_eq!(Line::Unassigned.label(), "0");

        let odd = normalize(Some("Sturm"), FieldKind::Line);
        assert_eq!(odd.as_line(), Line::Unassigned);
        assert!(odd.fell_back);
    }

    #[test]
    fn flags_and_dates() {
        assert!(normalize(Some("Ja"), FieldKind::Flag).as_flag());
        assert!(!normalize(Some("Nein"), FieldKind::Flag).as_flag());
        assert!(!normalize(None, FieldKind::Flag).as_flag());
        assert!(normalize(Some("vielleicht"), FieldKind::Flag).fell_back);

        let d = normalize(Some("14.09.2025"), FieldKind::Date).as_date();
        assert_eq!(d, NaiveDate::from_ymd_opt(2025, 9, 14));
        assert_eq!(normalize(Some("2025-09-14"), FieldKind::Date).as_date(), d);
        let bad = normalize(Some("Sonntag"), FieldKind::Date);
        assert_eq!(bad.as_date(), None);
        assert!(bad.fell_back);
    }

    #[test]
    fn text_is_trimmed() {
        assert_eq!(normalize(Some("  A.Muster "), FieldKind::Text).into_text(), "A.Muster");
        assert_eq!(normalize(Some("nan"), FieldKind::Text).into_text(), "");
        assert!(!normalize(Some("-"), FieldKind::Text).fell_back);
        assert_eq!(normalize_match_id(" nan "), None);
        assert_eq!(normalize_match_id("  "), None);
        assert_eq!(normalize_match_id(" 25-01 ").as_deref(), Some("25-01"));
    }
}
