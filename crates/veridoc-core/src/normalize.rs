//! Field normalization shared by the dispatcher and the site adapters
//!
//! Portals disagree about identifier and date shapes, so everything is
//! normalized before it touches a form field. All functions here are total
//! over their inputs: bad shapes come back as `Format` errors, never panics.

use crate::error::{Result, VeridocError};

/// Lookup key for institution matching: every whitespace character stripped,
/// then lowercased. Input sources are spreadsheets, so exact formatting is
/// never trusted.
pub fn institution_key(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_lowercase()
}

/// Normalize a birth date to 8-digit `yyyyMMdd` form.
///
/// Accepts 6-digit `yyMMdd` or 8-digit `yyyyMMdd`, with any non-digit
/// separators removed first. Two-digit years resolve with a 50-year pivot:
/// 50..=99 is 19xx, 00..=49 is 20xx. Idempotent over valid inputs.
pub fn normalize_birth(raw: &str) -> Result<String> {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    match digits.len() {
        6 => {
            let yy: u32 = digits[..2]
                .parse()
                .map_err(|_| VeridocError::Format(format!("invalid birth date: {raw}")))?;
            let century = if yy >= 50 { "19" } else { "20" };
            Ok(format!("{century}{digits}"))
        }
        8 => Ok(digits),
        _ => Err(VeridocError::Format(format!(
            "invalid birth date: {raw} (expected yyMMdd or yyyyMMdd)"
        ))),
    }
}

/// Normalize an issuance date to `yyyy-MM-dd`.
///
/// Same century pivot as [`normalize_birth`]; a pre-dashed `yyyy-MM-dd`
/// input passes through unchanged.
pub fn normalize_issued_date(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    let digits: String = trimmed.chars().filter(|c| c.is_ascii_digit()).collect();
    match digits.len() {
        6 => {
            let yy: u32 = digits[..2]
                .parse()
                .map_err(|_| VeridocError::Format(format!("invalid issued date: {raw}")))?;
            let century = if yy >= 50 { "19" } else { "20" };
            let full = format!("{century}{digits}");
            Ok(dash_ymd(&full))
        }
        8 if trimmed.contains('-') && trimmed.len() == 10 => Ok(trimmed.to_string()),
        8 => Ok(dash_ymd(&digits)),
        _ => Err(VeridocError::Format(format!(
            "invalid issued date: {raw}"
        ))),
    }
}

fn dash_ymd(digits8: &str) -> String {
    format!("{}-{}-{}", &digits8[..4], &digits8[4..6], &digits8[6..8])
}

/// Split a four-group dash-delimited document number (`nnnn-nnnn-nnnn-nnnn`)
/// into exactly four parts.
pub fn split_doc_number(raw: &str) -> Result<[String; 4]> {
    let parts: Vec<&str> = raw.trim().split('-').collect();
    if parts.len() != 4 || parts.iter().any(|p| p.is_empty()) {
        return Err(VeridocError::Format(format!(
            "invalid document number: {raw} (expected four dash-separated groups)"
        )));
    }
    Ok([
        parts[0].to_string(),
        parts[1].to_string(),
        parts[2].to_string(),
        parts[3].to_string(),
    ])
}

/// Split a fixed-separator credential number, requiring an exact part count.
pub fn split_parts(raw: &str, separator: char, expected: usize) -> Result<Vec<String>> {
    let parts: Vec<String> = raw
        .trim()
        .split(separator)
        .map(|p| p.trim().to_string())
        .collect();
    if parts.len() != expected || parts.iter().any(|p| p.is_empty()) {
        return Err(VeridocError::Format(format!(
            "invalid credential number: {raw} (expected {expected} parts separated by '{separator}')"
        )));
    }
    Ok(parts)
}

/// Strip separators from credential numbers for portals wanting the compact
/// form.
pub fn strip_dashes(raw: &str) -> String {
    raw.trim().replace('-', "")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_institution_key_ignores_whitespace_and_case() {
        assert_eq!(institution_key("  한국 세무사회 "), "한국세무사회");
        assert_eq!(institution_key("OPIc"), "opic");
        assert_eq!(institution_key("OPIC\t"), "opic");
    }

    #[test]
    fn test_birth_six_digit_pivot() {
        assert_eq!(normalize_birth("991231").unwrap(), "19991231");
        assert_eq!(normalize_birth("050101").unwrap(), "20050101");
        assert_eq!(normalize_birth("500101").unwrap(), "19500101");
        assert_eq!(normalize_birth("490101").unwrap(), "20490101");
    }

    #[test]
    fn test_birth_eight_digit_passthrough() {
        assert_eq!(normalize_birth("20000101").unwrap(), "20000101");
        assert_eq!(normalize_birth("1999.12.31").unwrap(), "19991231");
    }

    #[test]
    fn test_birth_idempotent() {
        let once = normalize_birth("991231").unwrap();
        assert_eq!(normalize_birth(&once).unwrap(), once);
    }

    #[test]
    fn test_birth_bad_length_is_format_error() {
        assert!(matches!(
            normalize_birth("12345"),
            Err(VeridocError::Format(_))
        ));
        assert!(normalize_birth("").is_err());
    }

    #[test]
    fn test_issued_date_forms() {
        assert_eq!(normalize_issued_date("991231").unwrap(), "1999-12-31");
        assert_eq!(normalize_issued_date("20240105").unwrap(), "2024-01-05");
        assert_eq!(normalize_issued_date("2024-01-05").unwrap(), "2024-01-05");
        assert!(normalize_issued_date("2024/1/5x").is_err());
    }

    #[test]
    fn test_doc_number_requires_four_groups() {
        let parts = split_doc_number("1730-3002-0530-3240").unwrap();
        assert_eq!(parts.len(), 4);
        assert_eq!(parts[0], "1730");
        assert_eq!(parts[2], "0530");
        assert!(matches!(
            split_doc_number("1730-3002-0530"),
            Err(VeridocError::Format(_))
        ));
        assert!(split_doc_number("1730-3002--3240").is_err());
    }

    #[test]
    fn test_split_parts_exact_count() {
        let parts = split_parts("2023-123456", '-', 2).unwrap();
        assert_eq!(parts, vec!["2023", "123456"]);
        assert!(split_parts("2023", '-', 2).is_err());
        assert!(split_parts("a-b-c", '-', 2).is_err());
    }

    #[test]
    fn test_strip_dashes() {
        assert_eq!(strip_dashes(" 12-34-56 "), "123456");
        assert_eq!(strip_dashes("123456"), "123456");
    }
}
