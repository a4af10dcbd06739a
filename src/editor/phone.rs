//! Phone-number editing: digits are stored, a hyphenated mask is shown.

use crate::error::ValidationError;

/// Longest Korean phone number in digits (mobile `010-1234-5678`).
pub const MAX_DIGITS: usize = 11;
/// Shortest valid number in digits (Seoul landline `02-123-4567`).
pub const MIN_DIGITS: usize = 9;

/// Keep ASCII digits only.
pub fn strip(input: &str) -> String {
    input.chars().filter(char::is_ascii_digit).collect()
}

/// Hyphenate a (possibly partial) digit string.
///
/// Seoul numbers use a two-digit area code (`02`), everything else three.
/// The middle group is four digits for mobile numbers and for full-length
/// landlines, three otherwise.
pub fn format_mask(digits: &str) -> String {
    let digits: String = digits.chars().take(MAX_DIGITS).collect();
    let len = digits.len();
    let seoul = digits.starts_with("02");
    let area_len = if seoul { 2 } else { 3 };
    if len <= area_len {
        return digits;
    }

    let mobile = digits.starts_with("01");
    let full_len = if seoul { 10 } else { 11 };
    let mid_len = if mobile || len >= full_len { 4 } else { 3 };

    let (area, rest) = digits.split_at(area_len);
    if rest.len() <= mid_len {
        return format!("{area}-{rest}");
    }
    let (mid, tail) = rest.split_at(mid_len);
    format!("{area}-{mid}-{tail}")
}

/// Validate a stripped digit string. Empty input is accepted here; the
/// editor decides whether the column requires a value.
pub fn validate(digits: &str) -> Result<(), ValidationError> {
    if digits.is_empty() {
        return Ok(());
    }
    let len_ok = (MIN_DIGITS..=MAX_DIGITS).contains(&digits.len());
    if !len_ok || !digits.starts_with('0') {
        return Err(ValidationError::InvalidPhone(format_mask(digits)));
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("01012345678", "010-1234-5678" ; "mobile")]
    #[test_case("0212345678", "02-1234-5678" ; "seoul long")]
    #[test_case("021234567", "02-123-4567" ; "seoul short")]
    #[test_case("0311234567", "031-123-4567" ; "regional")]
    #[test_case("0101234", "010-1234" ; "partial mobile")]
    #[test_case("010", "010" ; "area only")]
    #[test_case("", "" ; "empty")]
    fn test_format_mask(input: &str, expected: &str) {
        assert_eq!(format_mask(input), expected);
    }

    #[test]
    fn test_strip_removes_everything_but_digits() {
        assert_eq!(strip("010-1234 5678"), "01012345678");
        assert_eq!(strip("(02) 123.4567"), "021234567");
    }

    #[test]
    fn test_validate() {
        assert!(validate("01012345678").is_ok());
        assert!(validate("").is_ok());
        assert!(validate("0101234").is_err());
        assert!(validate("11012345678").is_err());
        assert!(validate("010123456789").is_err());
    }
}
