//! Human-readable byte sizes ("500MB", "2GB") for config values and reports.

use thiserror::Error;

const KIB: u64 = 1024;
const MIB: u64 = 1024 * KIB;
const GIB: u64 = 1024 * MIB;

/// Error parsing a size string.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("Invalid size '{0}' - expected a byte count or a value like '500MB', '2GB', '1024KB'")]
pub struct SizeParseError(String);

/// Parse a size string into bytes.
///
/// Accepts a bare byte count or an integer with a `K`/`KB`, `M`/`MB` or
/// `G`/`GB` suffix (binary multiples, case-insensitive, optional space).
///
/// # Examples
///
/// ```
/// use slippycache::config::parse_size;
///
/// assert_eq!(parse_size("1024").unwrap(), 1024);
/// assert_eq!(parse_size("500MB").unwrap(), 500 * 1024 * 1024);
/// assert_eq!(parse_size("2 gb").unwrap(), 2 * 1024 * 1024 * 1024);
/// ```
pub fn parse_size(input: &str) -> Result<u64, SizeParseError> {
    let err = || SizeParseError(input.to_string());
    let upper = input.trim().to_ascii_uppercase();

    let (digits, multiplier) = [("GB", GIB), ("G", GIB), ("MB", MIB), ("M", MIB), ("KB", KIB), ("K", KIB)]
        .iter()
        .find_map(|(suffix, mult)| upper.strip_suffix(suffix).map(|rest| (rest, *mult)))
        .unwrap_or((upper.as_str(), 1));

    let digits = digits.trim();
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(err());
    }

    digits
        .parse::<u64>()
        .ok()
        .and_then(|n| n.checked_mul(multiplier))
        .ok_or_else(err)
}

/// Format a byte count for display, e.g. `"1.5 MB"`.
pub fn format_size(bytes: u64) -> String {
    match bytes {
        b if b >= GIB => format!("{:.1} GB", b as f64 / GIB as f64),
        b if b >= MIB => format!("{:.1} MB", b as f64 / MIB as f64),
        b if b >= KIB => format!("{:.1} KB", b as f64 / KIB as f64),
        b => format!("{} B", b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bare_number() {
        assert_eq!(parse_size("0").unwrap(), 0);
        assert_eq!(parse_size("999999").unwrap(), 999_999);
    }

    #[test]
    fn test_parse_suffixes() {
        assert_eq!(parse_size("1K").unwrap(), KIB);
        assert_eq!(parse_size("100kb").unwrap(), 100 * KIB);
        assert_eq!(parse_size("1M").unwrap(), MIB);
        assert_eq!(parse_size("500 MB").unwrap(), 500 * MIB);
        assert_eq!(parse_size("  20GB ").unwrap(), 20 * GIB);
    }

    #[test]
    fn test_parse_invalid() {
        for input in ["", "abc", "MB", "2TB", "-1GB", "1.5GB", "+5"] {
            assert!(parse_size(input).is_err(), "{input:?} should be rejected");
        }
    }

    #[test]
    fn test_parse_overflow() {
        assert!(parse_size("99999999999999999999GB").is_err());
        assert!(parse_size(&format!("{}G", u64::MAX / 2)).is_err());
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(1536), "1.5 KB");
        assert_eq!(format_size(500 * MIB), "500.0 MB");
        assert_eq!(format_size(2 * GIB), "2.0 GB");
    }
}
