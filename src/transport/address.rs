// Address formatting helpers
//
// Platform BLE stacks disagree on how a MAC address is spelled (case,
// colon vs hyphen). The connection loop tries every spelling of the one
// configured address.

/// Strip separators from a MAC address and return its 12 hex digits,
/// upper-cased. Returns `None` when `address` is not a 48-bit MAC.
pub fn normalize_mac(address: &str) -> Option<String> {
    let digits: String = address
        .trim()
        .chars()
        .filter(|c| !matches!(c, ':' | '-'))
        .collect();

    if digits.len() == 12 && digits.chars().all(|c| c.is_ascii_hexdigit()) {
        Some(digits.to_ascii_uppercase())
    } else {
        None
    }
}

fn join_octets(digits: &str, separator: char) -> String {
    let mut out = String::with_capacity(17);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && i % 2 == 0 {
            out.push(separator);
        }
        out.push(c);
    }
    out
}

/// Build the ordered, de-duplicated list of address spellings to try.
///
/// For a MAC address: upper-case colon, lower-case colon, upper-case hyphen,
/// lower-case hyphen. For anything else (e.g. a CoreBluetooth UUID) the
/// address as given, then its upper- and lower-case forms.
pub fn address_variants(address: &str) -> Vec<String> {
    let trimmed = address.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }

    let candidates = match normalize_mac(trimmed) {
        Some(digits) => {
            let colon = join_octets(&digits, ':');
            let hyphen = join_octets(&digits, '-');
            vec![
                colon.clone(),
                colon.to_ascii_lowercase(),
                hyphen.clone(),
                hyphen.to_ascii_lowercase(),
            ]
        }
        None => vec![
            trimmed.to_string(),
            trimmed.to_ascii_uppercase(),
            trimmed.to_ascii_lowercase(),
        ],
    };

    let mut variants: Vec<String> = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        if !variants.contains(&candidate) {
            variants.push(candidate);
        }
    }
    variants
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mac_variants_cover_case_and_separator() {
        let variants = address_variants("aa-bb-cc-dd-ee-0f");
        assert_eq!(
            variants,
            vec![
                "AA:BB:CC:DD:EE:0F".to_string(),
                "aa:bb:cc:dd:ee:0f".to_string(),
                "AA-BB-CC-DD-EE-0F".to_string(),
                "aa-bb-cc-dd-ee-0f".to_string(),
            ]
        );
    }

    #[test]
    fn test_numeric_mac_deduplicates_case() {
        // Digits only: upper and lower spellings collapse
        let variants = address_variants("12:34:56:78:90:12");
        assert_eq!(
            variants,
            vec!["12:34:56:78:90:12".to_string(), "12-34-56-78-90-12".to_string()]
        );
    }

    #[test]
    fn test_non_mac_identifier() {
        let variants = address_variants("5f3c1a2e-Device");
        assert_eq!(
            variants,
            vec![
                "5f3c1a2e-Device".to_string(),
                "5F3C1A2E-DEVICE".to_string(),
                "5f3c1a2e-device".to_string(),
            ]
        );
    }

    #[test]
    fn test_empty_address_has_no_variants() {
        assert!(address_variants("   ").is_empty());
    }

    #[test]
    fn test_normalize_mac() {
        assert_eq!(
            normalize_mac("24:6f:28:1a:2b:3c"),
            Some("246F281A2B3C".to_string())
        );
        assert_eq!(normalize_mac("24:6f:28"), None);
        assert_eq!(normalize_mac("ZZ:6f:28:1a:2b:3c"), None);
    }
}
