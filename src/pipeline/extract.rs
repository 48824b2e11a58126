//! Sliding-window test extraction over recognized lines.
//!
//! Lab reports print a test name, its value, and its reference range on
//! three consecutive lines. Blank lines are dropped before windowing, and
//! a window needs all three lines: a synonym on the last two lines never
//! starts one. A hit is kept only if the next line carries a numeric
//! value; no value on line i+1 discards the candidate outright. A range
//! line that does not parse leaves the range empty — flags are computed
//! only against ranges the report actually printed — while the unit
//! still falls back to the catalog.

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;
use tracing::debug;

use crate::catalog::Catalog;
use crate::models::ExtractedResult;
use crate::text;

fn value_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"([\d\.,]+)").unwrap_or_else(|_| unreachable!("static pattern")))
}

fn range_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(\d+\.?\d*)\s*[-\u{2013}~]\s*(\d+\.?\d*)\s*(.*)")
            .unwrap_or_else(|_| unreachable!("static pattern"))
    })
}

pub fn extract_results(catalog: &Catalog, lines: &[String]) -> Vec<ExtractedResult> {
    let synonyms: Vec<(&str, String)> = catalog.all_synonyms_lowercased().collect();
    let lines: Vec<&str> = lines
        .iter()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .collect();

    let mut seen: HashSet<(String, String, String)> = HashSet::new();
    let mut results = Vec::new();

    for i in 0..lines.len().saturating_sub(2) {
        let line_lower = lines[i].to_lowercase();

        for (canonical_id, synonym) in &synonyms {
            if !line_lower.contains(synonym.as_str()) {
                continue;
            }

            // The value must sit on the very next line; anything looser
            // floods the output with false positives.
            let Some(value) = parse_value(lines[i + 1]) else {
                continue;
            };

            let test = catalog.lookup(canonical_id);
            let (reference_range, unit) = match parse_range_line(lines[i + 2]) {
                Some((range, Some(unit))) => (range, unit),
                Some((range, None)) => (range, catalog_unit(test)),
                None => (String::new(), catalog_unit(test)),
            };

            let key = (
                canonical_id.to_string(),
                value.clone(),
                reference_range.clone(),
            );
            if !seen.insert(key) {
                continue;
            }

            let flag = text::is_abnormal(&value, &reference_range);
            results.push(ExtractedResult {
                item: canonical_id.to_string(),
                value,
                unit,
                reference_range,
                flag,
            });
        }
    }

    debug!(count = results.len(), "Extracted test results");
    results
}

/// First numeric token on the line, decimal separator normalized.
fn parse_value(line: &str) -> Option<String> {
    let m = value_pattern().find(line)?;
    let value = m.as_str().replace(',', ".");
    // A token of bare separators ("..", ",") is OCR noise, not a value.
    if !value.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }
    Some(value)
}

/// `low - high [unit]` from the range line, thousands separators
/// stripped. The unit comes back `None` when nothing follows the range.
fn parse_range_line(line: &str) -> Option<(String, Option<String>)> {
    let cleaned = line.replace(',', "");
    let captures = range_pattern().captures(&cleaned)?;
    let low = captures.get(1)?.as_str();
    let high = captures.get(2)?.as_str();
    let unit = captures
        .get(3)
        .map(|m| m.as_str().trim())
        .filter(|u| !u.is_empty())
        .map(text::normalize_unit);
    Some((format!("{low} - {high}"), unit))
}

fn catalog_unit(test: Option<&crate::catalog::CanonicalTest>) -> String {
    test.and_then(|t| t.unit.clone()).unwrap_or_default()
}
