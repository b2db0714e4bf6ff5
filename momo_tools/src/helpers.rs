use std::sync::OnceLock;

use regex::Regex;

use crate::MomoApiError;

const RWANDA_COUNTRY_CODE: &str = "250";

fn rwanda_msisdn() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Mobile numbers are 7X XXX XXXX behind the country code or a trunk zero.
    RE.get_or_init(|| Regex::new(r"^(?:\+?250|0)?(7[2389]\d{7})$").expect("static regex is valid"))
}

/// Normalizes a Rwandan mobile number to the international MSISDN form the gateway expects (`2507XXXXXXXX`).
///
/// Spaces, dashes and parentheses are ignored. Accepted inputs include `0788 123 456`, `+250788123456` and
/// `788123456`.
pub fn normalize_msisdn(raw: &str) -> Result<String, MomoApiError> {
    let compact = raw.chars().filter(|c| !matches!(c, ' ' | '-' | '(' | ')' | '.')).collect::<String>();
    rwanda_msisdn()
        .captures(&compact)
        .and_then(|caps| caps.get(1))
        .map(|m| format!("{RWANDA_COUNTRY_CODE}{}", m.as_str()))
        .ok_or_else(|| MomoApiError::InvalidPayer(raw.to_string()))
}

/// Shortened order reference shown to payers on their handset.
pub fn short_reference(external_id: &str) -> &str {
    match external_id.char_indices().nth(8) {
        Some((idx, _)) => &external_id[..idx],
        None => external_id,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn accepts_common_rwandan_formats() {
        for raw in ["0788123456", "+250788123456", "250788123456", "788123456", "0788 123 456", "+250-72-1234567"] {
            let n = normalize_msisdn(raw).unwrap_or_else(|e| panic!("{raw} should be valid: {e}"));
            assert!(n.starts_with("2507"), "{raw} -> {n}");
            assert_eq!(n.len(), 12);
        }
    }

    #[test]
    fn rejects_invalid_numbers() {
        for raw in ["", "12345", "0688123456", "+254712345678", "07881234567", "phone"] {
            assert!(matches!(normalize_msisdn(raw), Err(MomoApiError::InvalidPayer(_))), "{raw} should be rejected");
        }
    }

    #[test]
    fn short_references() {
        assert_eq!(short_reference("0f5b1d3c-5a8e-4a40"), "0f5b1d3c");
        assert_eq!(short_reference("abc"), "abc");
    }
}
