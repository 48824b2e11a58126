//! Text and unit normalization for bilingual (Arabic/English) lab reports.
//!
//! OCR output from scanned Egyptian lab reports mixes Arabic-Indic digits,
//! right-to-left text, and inconsistently printed units. Everything that
//! matches or compares text downstream goes through these helpers first.
//! `reshape_bidi` is the one exception: it is display-only and must never
//! feed back into matching.

use std::sync::OnceLock;

use regex::Regex;

/// Ordered unit substitution table. First match wins, so longer keys that
/// contain shorter ones must come first ("mmoll" before "mmol").
const UNIT_SUBSTITUTIONS: &[(&str, &str)] = &[
    ("mgdl", "mg/dL"),
    ("ngdl", "ng/dL"),
    ("ugdl", "μg/dL"),
    ("μgdl", "μg/dL"),
    ("gdl", "g/dL"),
    ("mmoll", "mmol/L"),
    ("mmol", "mmol/L"),
    ("meql", "mEq/L"),
    ("miul", "mIU/L"),
    ("x103l", "x10^3/μL"),
    ("x102l", "x10^2/μL"),
    ("x10ل", "x10^3/μL"),
    ("9dl", "g/dL"),
    ("mmhr", "mm/hr"),
];

/// Punctuation stripped from unit strings before table lookup.
/// Includes the slash so "mg/dl", "MGDL" and "mg dl" all key as "mgdl".
const UNIT_STRIP_CHARS: &[char] = &['?', ':', '/', '.', ',', '\'', '\u{2018}', '\u{2019}'];

/// Fold Arabic-Indic (U+0660..U+0669) and Eastern Arabic-Indic
/// (U+06F0..U+06F9) digits to ASCII. All other characters pass through.
pub fn fold_digits(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '\u{0660}'..='\u{0669}' => {
                char::from(b'0' + (c as u32 - 0x0660) as u8)
            }
            '\u{06F0}'..='\u{06F9}' => {
                char::from(b'0' + (c as u32 - 0x06F0) as u8)
            }
            other => other,
        })
        .collect()
}

/// Fold digits, then drop everything that is not an ASCII digit.
/// Identifier-parsing mode: national ids arrive as "١٢٣٤..." or with
/// stray separators, and only the digit string is meaningful.
pub fn fold_to_digits_only(text: &str) -> String {
    fold_digits(text)
        .chars()
        .filter(|c| c.is_ascii_digit())
        .collect()
}

/// Reorder mixed-direction text for left-to-right display.
///
/// Splits the input into maximal runs of RTL words (Arabic script) and
/// non-RTL words, then reverses the word order inside each RTL run. This is
/// a display transform only: no character is added, removed, or reshaped,
/// so the semantic content survives a round trip. Never use the output for
/// matching.
pub fn reshape_bidi(text: &str) -> String {
    let words: Vec<&str> = text.split_whitespace().collect();
    let mut display: Vec<&str> = Vec::with_capacity(words.len());
    let mut rtl_run: Vec<&str> = Vec::new();

    for word in words {
        if is_rtl_word(word) {
            rtl_run.push(word);
        } else {
            flush_rtl_run(&mut rtl_run, &mut display);
            display.push(word);
        }
    }
    flush_rtl_run(&mut rtl_run, &mut display);

    display.join(" ")
}

fn flush_rtl_run<'a>(run: &mut Vec<&'a str>, out: &mut Vec<&'a str>) {
    while let Some(word) = run.pop() {
        out.push(word);
    }
}

fn is_rtl_word(word: &str) -> bool {
    word.chars().any(|c| {
        matches!(c,
            '\u{0600}'..='\u{06FF}' | '\u{0750}'..='\u{077F}' | '\u{08A0}'..='\u{08FF}'
        )
    })
}

/// Canonicalize a unit string printed on a lab report.
///
/// Lowercases, strips whitespace and a fixed punctuation set (including the
/// slash), then applies the ordered substitution table with
/// first-match-wins substring semantics. Unmatched input returns the folded
/// string — "%" stays "%", unknown units degrade gracefully.
pub fn normalize_unit(unit: &str) -> String {
    let folded: String = unit
        .to_lowercase()
        .chars()
        .filter(|c| !c.is_whitespace() && !UNIT_STRIP_CHARS.contains(c))
        .collect();

    for (key, replacement) in UNIT_SUBSTITUTIONS {
        if folded.contains(key) {
            return (*replacement).to_string();
        }
    }
    folded
}

fn range_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(\d+\.?\d*)\s*[-\u{2013}~]\s*(\d+\.?\d*)").expect("range regex")
    })
}

/// Extract the first `low - high` pair from a reference-range string.
/// Commas are treated as thousands separators and stripped. Returns `None`
/// on no match — callers degrade, they do not error.
pub fn parse_range(range: &str) -> Option<(f64, f64)> {
    let cleaned = range.replace(',', "");
    let caps = range_regex().captures(&cleaned)?;
    let low: f64 = caps.get(1)?.as_str().parse().ok()?;
    let high: f64 = caps.get(2)?.as_str().parse().ok()?;
    Some((low, high))
}

/// Whether `value` falls outside the `low - high` bounds of `range`.
///
/// Returns `None` when either the value or the range fails to parse.
/// `None` means "flag unknown" — treating it as "normal" would silently
/// clear abnormal results that happened to print an unparseable range.
pub fn is_abnormal(value: &str, range: &str) -> Option<bool> {
    let val: f64 = value.trim().parse().ok()?;
    let (low, high) = parse_range(range)?;
    Some(val < low || val > high)
}

/// Validate a national id: exactly 14 digits after digit folding.
pub fn validate_national_id(value: &str) -> Result<String, String> {
    let digits = fold_to_digits_only(value);
    if digits.len() != 14 || digits.len() != value.trim().chars().count() {
        return Err("National ID must be exactly 14 digits".into());
    }
    Ok(digits)
}

/// Validate a phone number: exactly 11 digits starting with 0.
pub fn validate_phone_number(value: &str) -> Result<String, String> {
    let digits = fold_to_digits_only(value);
    if digits.len() != 11 || !digits.starts_with('0') {
        return Err("Phone number must be exactly 11 digits and start with 0".into());
    }
    Ok(digits)
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── digit folding ──

    #[test]
    fn folds_arabic_indic_digits() {
        assert_eq!(fold_digits("٠١٢٣٤٥٦٧٨٩"), "0123456789");
    }

    #[test]
    fn folds_eastern_arabic_indic_digits() {
        assert_eq!(fold_digits("۰۱۲۳۴۵۶۷۸۹"), "0123456789");
    }

    #[test]
    fn fold_preserves_structure() {
        assert_eq!(fold_digits("Glucose: ١٠٥ mg/dL"), "Glucose: 105 mg/dL");
    }

    #[test]
    fn digits_only_strips_separators() {
        assert_eq!(fold_to_digits_only("٢٩٨-٠٣١٢٣-٤٥٦٧٨"), "2980312345678");
        assert_eq!(fold_to_digits_only("id: 12345"), "12345");
    }

    // ── bidi display ──

    #[test]
    fn reshape_reverses_rtl_run_order() {
        // Two-word Arabic name: display order flips, content unchanged.
        let reshaped = reshape_bidi("احمد محمد");
        assert_eq!(reshaped, "محمد احمد");
    }

    #[test]
    fn reshape_leaves_latin_untouched() {
        assert_eq!(reshape_bidi("John  Smith"), "John Smith");
    }

    #[test]
    fn reshape_mixed_keeps_latin_position() {
        let reshaped = reshape_bidi("Patient احمد محمد Glucose");
        assert_eq!(reshaped, "Patient محمد احمد Glucose");
    }

    #[test]
    fn reshape_round_trips_content() {
        let original = "اسم المريض";
        assert_eq!(reshape_bidi(&reshape_bidi(original)), original);
    }

    // ── units ──

    #[test]
    fn unit_variants_all_normalize_to_mg_dl() {
        assert_eq!(normalize_unit("mg/dl"), "mg/dL");
        assert_eq!(normalize_unit("MGDL"), "mg/dL");
        assert_eq!(normalize_unit("mg dl"), "mg/dL");
    }

    #[test]
    fn unit_table_first_match_wins() {
        // "mmoll" key must shadow the shorter "mmol" key.
        assert_eq!(normalize_unit("mmol/l"), "mmol/L");
        assert_eq!(normalize_unit("mmol"), "mmol/L");
    }

    #[test]
    fn unit_thyroid_keys_shadow_gdl() {
        // "ngdl"/"ugdl" contain "gdl" and must be matched first.
        assert_eq!(normalize_unit("ng/dL"), "ng/dL");
        assert_eq!(normalize_unit("μg/dL"), "μg/dL");
        assert_eq!(normalize_unit("ug/dl"), "μg/dL");
        assert_eq!(normalize_unit("g/dl"), "g/dL");
    }

    #[test]
    fn unit_percent_passes_through() {
        assert_eq!(normalize_unit("%"), "%");
        assert_eq!(normalize_unit(" % "), "%");
    }

    #[test]
    fn unit_unknown_returns_folded() {
        assert_eq!(normalize_unit("IU / mL"), "iuml");
    }

    #[test]
    fn unit_meq_and_miu() {
        assert_eq!(normalize_unit("mEq/L"), "mEq/L");
        assert_eq!(normalize_unit("mIU/L"), "mIU/L");
    }

    // ── ranges ──

    #[test]
    fn parses_simple_range() {
        assert_eq!(parse_range("70 - 99"), Some((70.0, 99.0)));
        assert_eq!(parse_range("0.4-4.0 mIU/L"), Some((0.4, 4.0)));
    }

    #[test]
    fn parses_en_dash_and_tilde() {
        assert_eq!(parse_range("70 \u{2013} 99"), Some((70.0, 99.0)));
        assert_eq!(parse_range("70 ~ 99"), Some((70.0, 99.0)));
    }

    #[test]
    fn parses_range_with_thousands_separators() {
        assert_eq!(parse_range("4,500 - 11,000"), Some((4500.0, 11000.0)));
    }

    #[test]
    fn range_without_two_numbers_is_none() {
        assert_eq!(parse_range("Varies by component"), None);
        assert_eq!(parse_range("<200 mg/dL"), None);
        assert_eq!(parse_range(""), None);
    }

    // ── abnormality flag ──

    #[test]
    fn value_inside_range_is_normal() {
        assert_eq!(is_abnormal("85", "70 - 99"), Some(false));
        assert_eq!(is_abnormal("70", "70 - 99"), Some(false));
        assert_eq!(is_abnormal("99", "70 - 99"), Some(false));
    }

    #[test]
    fn value_outside_range_is_abnormal() {
        assert_eq!(is_abnormal("105", "70 - 99 mg/dL"), Some(true));
        assert_eq!(is_abnormal("12.5", "13.5 - 17.5"), Some(true));
    }

    #[test]
    fn unparseable_value_or_range_is_unknown() {
        assert_eq!(is_abnormal("pending", "70 - 99"), None);
        assert_eq!(is_abnormal("105", "Varies by component"), None);
    }

    // ── identifiers ──

    #[test]
    fn national_id_accepts_folded_digits() {
        assert_eq!(
            validate_national_id("٢٩٨٠٣١٢٣٤٥٦٧٨٩").as_deref(),
            Ok("29803123456789")
        );
    }

    #[test]
    fn national_id_rejects_wrong_length() {
        assert!(validate_national_id("12345").is_err());
        assert!(validate_national_id("123456789012345").is_err());
    }

    #[test]
    fn phone_number_must_start_with_zero() {
        assert!(validate_phone_number("01234567890").is_ok());
        assert!(validate_phone_number("11234567890").is_err());
        assert!(validate_phone_number("0123456789").is_err());
    }
}
