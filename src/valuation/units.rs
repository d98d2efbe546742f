//! Exact decimal-string to base-unit conversion
//!
//! Venue prices arrive as decimal strings in whole-currency units ("12.5").
//! Scaling to base units is done digit-by-digit on integers so repeated
//! computation can never drift the way binary floating point would.

use crate::errors::{LendingError, LendingResult};

/// Parse a non-negative decimal string into base units with the given number
/// of decimals. Fails on negatives, malformed input, more fractional digits
/// than the currency carries, and overflow.
pub fn parse_base_units(raw: &str, decimals: u32) -> LendingResult<u128> {
    let invalid = |reason: &str| LendingError::InvalidAmount {
        amount: raw.to_string(),
        reason: reason.to_string(),
    };

    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(invalid("empty amount"));
    }
    if trimmed.starts_with('-') {
        return Err(invalid("negative amount"));
    }

    let (whole, frac) = match trimmed.split_once('.') {
        Some((w, f)) => (w, f),
        None => (trimmed, ""),
    };

    if whole.is_empty() && frac.is_empty() {
        return Err(invalid("no digits"));
    }
    if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid("non-numeric character"));
    }
    if frac.len() as u32 > decimals {
        return Err(invalid("more fractional digits than the currency carries"));
    }

    let scale = 10u128
        .checked_pow(decimals)
        .ok_or_else(|| invalid("unsupported decimal count"))?;

    let whole_units = if whole.is_empty() {
        0
    } else {
        whole.parse::<u128>().map_err(|_| invalid("whole part overflows"))?
    };

    let frac_scale = 10u128.pow(decimals - frac.len() as u32);
    let frac_units = if frac.is_empty() {
        0
    } else {
        frac.parse::<u128>().map_err(|_| invalid("fraction overflows"))? * frac_scale
    };

    whole_units
        .checked_mul(scale)
        .and_then(|w| w.checked_add(frac_units))
        .ok_or_else(|| invalid("amount overflows base units"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whole_amounts() {
        assert_eq!(parse_base_units("10", 18).unwrap(), 10 * 10u128.pow(18));
        assert_eq!(parse_base_units("0", 18).unwrap(), 0);
    }

    #[test]
    fn test_fractional_amounts() {
        assert_eq!(
            parse_base_units("12.5", 18).unwrap(),
            12_500_000_000_000_000_000
        );
        assert_eq!(parse_base_units("0.000000000000000001", 18).unwrap(), 1);
        assert_eq!(parse_base_units(".5", 18).unwrap(), 500_000_000_000_000_000);
        assert_eq!(parse_base_units("2.", 18).unwrap(), 2 * 10u128.pow(18));
    }

    #[test]
    fn test_rejections() {
        assert!(parse_base_units("-1", 18).is_err());
        assert!(parse_base_units("", 18).is_err());
        assert!(parse_base_units(".", 18).is_err());
        assert!(parse_base_units("1e5", 18).is_err());
        assert!(parse_base_units("1.2345", 3).is_err());
        assert!(parse_base_units("1,5", 18).is_err());
    }

    #[test]
    fn test_no_drift_on_repeated_parse() {
        // 0.1 is the classic binary-float trap; integer scaling is exact.
        let first = parse_base_units("0.1", 18).unwrap();
        for _ in 0..1000 {
            assert_eq!(parse_base_units("0.1", 18).unwrap(), first);
        }
        assert_eq!(first, 100_000_000_000_000_000);
    }
}
