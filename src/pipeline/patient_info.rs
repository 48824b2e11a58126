//! Patient header extraction from recognized report text.
//!
//! Labels appear in English or Arabic; patterns are tried in order and
//! the first hit wins. A report with no recognizable header still
//! produces a usable envelope ("Unknown" name, no date).

use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;

use super::types::PatientInfo;
use crate::text;

fn name_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?:اسم المريض|اسم|Patient Name|Name)[':\-=\]\s]*\s*([^\n]+)")
            .unwrap_or_else(|_| unreachable!("static pattern"))
    })
}

fn date_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?:Date|تاريخ|التاريخ)\s*[:\-=\]\s]*\s*(\d{1,2}[/\-.]\d{1,2}[/\-.]\d{2,4})",
        )
        .unwrap_or_else(|_| unreachable!("static pattern"))
    })
}

fn national_id_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b\d{14}\b").unwrap_or_else(|_| unreachable!("static pattern")))
}

fn cleanup_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[\d\W_]+").unwrap_or_else(|_| unreachable!("static pattern")))
}

pub fn extract(raw_text: &str) -> PatientInfo {
    PatientInfo {
        name: extract_name(raw_text),
        date: extract_date(raw_text),
        national_id: extract_national_id(raw_text),
    }
}

/// Captured name, stripped of digits and punctuation the OCR tends to
/// drag in, bidi-reshaped for display. Falls back to "Unknown".
fn extract_name(raw_text: &str) -> String {
    let Some(captures) = name_pattern().captures(raw_text) else {
        return "Unknown".to_string();
    };
    let raw = captures.get(1).map(|m| m.as_str()).unwrap_or("");
    let cleaned = cleanup_pattern().replace_all(raw, " ");
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        "Unknown".to_string()
    } else {
        text::reshape_bidi(cleaned)
    }
}

/// Printed date as ISO when it parses as month/day/year; the raw match
/// otherwise, so a human reviewer still sees it.
fn extract_date(raw_text: &str) -> Option<String> {
    let captures = date_pattern().captures(raw_text)?;
    let raw = captures.get(1)?.as_str();
    let normalized: String = raw
        .chars()
        .map(|c| if c == '-' || c == '.' { '/' } else { c })
        .collect();
    match NaiveDate::parse_from_str(&normalized, "%m/%d/%Y") {
        Ok(date) => Some(date.format("%Y-%m-%d").to_string()),
        Err(_) => Some(raw.to_string()),
    }
}

fn extract_national_id(raw_text: &str) -> Option<String> {
    let folded = text::fold_digits(raw_text);
    national_id_pattern()
        .find(&folded)
        .map(|m| m.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn english_label_extracts_name() {
        let info = extract("Patient Name: John Smith\nDate: 03/15/2026");
        assert_eq!(info.name, "John Smith");
        assert_eq!(info.date.as_deref(), Some("2026-03-15"));
    }

    #[test]
    fn arabic_label_extracts_name() {
        let info = extract("اسم المريض: أحمد محمد\nالتاريخ: 01/02/2026");
        assert_eq!(info.name, "محمد أحمد"); // bidi display order
        assert_eq!(info.date.as_deref(), Some("2026-01-02"));
    }

    #[test]
    fn missing_header_degrades_to_unknown() {
        let info = extract("Hemoglobin\n13.5\n12 - 16 g/dL");
        assert_eq!(info.name, "Unknown");
        assert_eq!(info.date, None);
        assert_eq!(info.national_id, None);
    }

    #[test]
    fn unparseable_date_kept_raw() {
        let info = extract("Date: 45/99/2026");
        assert_eq!(info.date.as_deref(), Some("45/99/2026"));
    }

    #[test]
    fn dotted_and_dashed_dates_parse() {
        assert_eq!(
            extract("Date: 03-15-2026").date.as_deref(),
            Some("2026-03-15")
        );
        assert_eq!(
            extract("Date: 03.15.2026").date.as_deref(),
            Some("2026-03-15")
        );
    }

    #[test]
    fn name_cleanup_strips_ocr_noise() {
        let info = extract("Patient Name:- 12 John  //Smith 99");
        assert_eq!(info.name, "John Smith");
    }

    #[test]
    fn national_id_found_after_digit_folding() {
        let info = extract("ID \u{0662}\u{0669}\u{0668}\u{0660}\u{0663}123456789 end");
        assert_eq!(info.national_id.as_deref(), Some("29803123456789"));
    }

    #[test]
    fn thirteen_digits_not_an_id() {
        let info = extract("ref 1234567890123 end");
        assert_eq!(info.national_id, None);
    }
}
