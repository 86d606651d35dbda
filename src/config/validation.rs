//! Small helpers shared by config section validators.

use regex::Regex;

/// True when the value matches the anchored pattern. A pattern that fails to
/// compile counts as a non-match rather than a panic.
pub fn matches_pattern(pattern: &str, value: &str) -> bool {
    Regex::new(pattern)
        .map(|re| re.is_match(value))
        .unwrap_or(false)
}

/// Validate an IPv4 CIDR block like `10.9.0.0/16`
pub fn valid_cidr(value: &str) -> bool {
    if !matches_pattern(r"^\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3}/\d{1,2}$", value) {
        return false;
    }
    let (addr, mask) = match value.split_once('/') {
        Some(parts) => parts,
        None => return false,
    };
    let octets_ok = addr
        .split('.')
        .all(|octet| octet.parse::<u32>().map(|n| n <= 255).unwrap_or(false));
    let mask_ok = mask.parse::<u32>().map(|n| n <= 32).unwrap_or(false);
    octets_ok && mask_ok
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_cidr() {
        assert!(valid_cidr("10.9.0.0/16"));
        assert!(valid_cidr("192.168.1.0/24"));
        assert!(!valid_cidr("10.9.0.0"));
        assert!(!valid_cidr("10.9.0.256/16"));
        assert!(!valid_cidr("10.9.0.0/33"));
        assert!(!valid_cidr("not-a-cidr"));
    }

    #[test]
    fn test_matches_pattern_bad_regex_is_non_match() {
        assert!(!matches_pattern(r"([unclosed", "anything"));
    }
}
