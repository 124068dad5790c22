// Utility helpers for parsing, rounding and ordering.
//
// This module centralizes the "dirty" CSV/number/date handling so the
// rest of the code can assume clean, typed values.
use chrono::NaiveDate;
use num_format::{Locale, ToFormattedString};
use std::cmp::Ordering;

/// Parse a string-like value into `f64` while being forgiving about
/// formatting issues that are common in spreadsheet exports.
///
/// - Accepts `Option<&str>` so callers can pass through optional fields.
/// - Trims whitespace.
/// - Rejects values that contain alphabetic characters.
/// - Strips thousands separators like `","` before parsing.
/// - Returns `None` for anything that cannot be safely parsed.
pub fn parse_f64_safe(s: Option<&str>) -> Option<f64> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    if s.chars().any(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    let s = s.replace(",", "");
    s.parse::<f64>().ok()
}

/// Parse a date cell. Export cells are either plain dates (`2023-02-01`)
/// or datetimes (`2023-02-01 14:05:00`); only the calendar date matters
/// downstream, so datetime cells are truncated to their date part.
pub fn parse_date_safe(s: Option<&str>) -> Option<NaiveDate> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(d);
    }
    let date_part = s.split_whitespace().next()?;
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}

pub fn average(v: &[f64]) -> f64 {
    // Standard arithmetic mean; returns 0 for an empty slice to avoid NaNs.
    if v.is_empty() {
        return 0.0;
    }
    let sum: f64 = v.iter().copied().sum();
    sum / v.len() as f64
}

pub fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Ordering for weekly chart axes: digit runs compare numerically, so
/// "2023W5" sorts before "2023W12". Current/previous period selection
/// deliberately does NOT use this; it sorts raw strings.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let (ab, bb) = (a.as_bytes(), b.as_bytes());
    let (mut i, mut j) = (0usize, 0usize);
    while i < ab.len() && j < bb.len() {
        if ab[i].is_ascii_digit() && bb[j].is_ascii_digit() {
            let si = i;
            while i < ab.len() && ab[i].is_ascii_digit() {
                i += 1;
            }
            let sj = j;
            while j < bb.len() && bb[j].is_ascii_digit() {
                j += 1;
            }
            let na: u64 = a[si..i].trim_start_matches('0').parse().unwrap_or(0);
            let nb: u64 = b[sj..j].trim_start_matches('0').parse().unwrap_or(0);
            match na.cmp(&nb) {
                Ordering::Equal => {}
                ord => return ord,
            }
        } else {
            match ab[i].cmp(&bb[j]) {
                Ordering::Equal => {
                    i += 1;
                    j += 1;
                }
                ord => return ord,
            }
        }
    }
    (ab.len() - i).cmp(&(bb.len() - j))
}

pub fn format_number(n: f64, decimals: usize) -> String {
    // Format a floating-point value with:
    // - a fixed number of decimal places, and
    // - locale-aware thousands separators (e.g., `1,234,567.89`).
    let neg = n.is_sign_negative();
    let abs_n = n.abs();
    let s = format!("{:.*}", decimals, abs_n);
    let mut parts = s.split('.');
    let int_part = parts.next().unwrap_or("0");
    let frac_part = parts.next();
    let int_val: i64 = int_part.parse().unwrap_or(0);
    let mut res = int_val.to_formatted_string(&Locale::en);
    if let Some(frac) = frac_part {
        if decimals > 0 {
            res.push('.');
            res.push_str(frac);
        }
    } else if decimals > 0 {
        res.push('.');
        res.push_str(&"0".repeat(decimals));
    }
    if neg {
        format!("-{}", res)
    } else {
        res
    }
}

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    // Thin wrapper around `num-format` for integer-like values, used
    // for counts in console messages (e.g., `9,855 rows loaded`).
    n.to_formatted_string(&Locale::en)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_and_datetime_cells() {
        let d = NaiveDate::from_ymd_opt(2023, 2, 1).unwrap();
        assert_eq!(parse_date_safe(Some("2023-02-01")), Some(d));
        assert_eq!(parse_date_safe(Some("2023-02-01 14:05:00")), Some(d));
        assert_eq!(parse_date_safe(Some("")), None);
        assert_eq!(parse_date_safe(Some("01/02/2023")), None);
        assert_eq!(parse_date_safe(None), None);
    }

    #[test]
    fn parses_numbers_with_separators() {
        assert_eq!(parse_f64_safe(Some("1,234.5")), Some(1234.5));
        assert_eq!(parse_f64_safe(Some(" 12 ")), Some(12.0));
        assert_eq!(parse_f64_safe(Some("n/a")), None);
        assert_eq!(parse_f64_safe(Some("")), None);
    }

    #[test]
    fn natural_ordering_compares_digit_runs_numerically() {
        assert_eq!(natural_cmp("2023W5", "2023W12"), Ordering::Less);
        assert_eq!(natural_cmp("2023W12", "2023W12"), Ordering::Equal);
        assert_eq!(natural_cmp("2023W12", "2023W2"), Ordering::Greater);
        // Plain string comparison would get this backwards.
        assert_eq!("2023W5".cmp("2023W12"), Ordering::Greater);
    }

    #[test]
    fn natural_ordering_falls_back_to_bytes() {
        assert_eq!(natural_cmp("2022W10", "2023W01"), Ordering::Less);
        assert_eq!(natural_cmp("2023", "2023W01"), Ordering::Less);
    }

    #[test]
    fn rounds_to_two_decimals() {
        assert_eq!(round2(33.333), 33.33);
        assert_eq!(round2(25.0), 25.0);
    }

    #[test]
    fn averages_empty_as_zero() {
        assert_eq!(average(&[]), 0.0);
        assert_eq!(average(&[2.0, 4.0]), 3.0);
    }
}
