/// Abbreviate a long identifier as 0x1234...abcd for compact display.
/// Identifiers are opaque network strings, so truncation counts chars, not
/// bytes.
pub fn abbreviate(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() > 10 {
        let head: String = chars[..6].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{head}...{tail}")
    } else {
        value.to_string()
    }
}

/// Return true for strict 20-byte EVM addresses in 0x-prefixed hex format.
pub fn is_evm_address(value: &str) -> bool {
    let trimmed = value.trim();
    if trimmed.len() != 42 || !trimmed.starts_with("0x") {
        return false;
    }
    trimmed
        .as_bytes()
        .iter()
        .skip(2)
        .all(|b| char::from(*b).is_ascii_hexdigit())
}

/// Canonical form: lower-cased 0x-prefixed 40-hex string, or `None` when the
/// input is not address-shaped.
pub fn normalize_address(value: &str) -> Option<String> {
    if is_evm_address(value) {
        Some(value.trim().to_ascii_lowercase())
    } else {
        None
    }
}

pub const ZERO_ADDRESS: &str = "0x0000000000000000000000000000000000000000";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn abbreviate_truncates_long_values() {
        assert_eq!(
            abbreviate("0xABCDEF0123456789000000000000000000000001"),
            "0xABCD...0001"
        );
        assert_eq!(abbreviate("short"), "short");
    }

    #[test]
    fn abbreviate_handles_multibyte_identifiers() {
        assert_eq!(abbreviate("aaaaaé12345"), "aaaaaé...2345");
        assert_eq!(abbreviate("ééééééééééé"), "éééééé...éééé");
        assert_eq!(abbreviate("éééééééééé"), "éééééééééé");
    }

    #[test]
    fn is_evm_address_strict() {
        assert!(is_evm_address(
            "0xABCDEF0123456789000000000000000000000001"
        ));
        assert!(is_evm_address(
            " 0xabcdef0123456789000000000000000000000001 "
        ));
        assert!(!is_evm_address("0x1234"));
        assert!(!is_evm_address(
            "ABCDEF0123456789000000000000000000000001ab"
        ));
        assert!(!is_evm_address(
            "0xZZCDEF0123456789000000000000000000000001"
        ));
    }

    #[test]
    fn normalize_lowercases() {
        assert_eq!(
            normalize_address("0xABCDEF0123456789000000000000000000000001").as_deref(),
            Some("0xabcdef0123456789000000000000000000000001")
        );
        assert_eq!(normalize_address("not-an-address"), None);
    }
}
