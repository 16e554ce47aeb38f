use crate::error::{DomainError, Result};

/// Normalizes a radio address for display, lookup and deduplication.
///
/// `aa-bb-cc-dd-ee-ff`, ` AA:BB:CC:DD:EE:FF ` and `aa:bb:cc:dd:ee:ff` all map to
/// `AA:BB:CC:DD:EE:FF`. Platform UUID-style identifiers keep their shape
/// (hex groups joined by `:`).
pub fn normalize_address(raw: &str) -> Result<String> {
    let normalized = raw.trim().to_ascii_uppercase().replace('-', ":");

    if normalized.is_empty() {
        return Err(DomainError::Validation(
            "Device address cannot be empty".to_string(),
        ));
    }

    if normalized.len() > 64 {
        return Err(DomainError::Validation(format!(
            "Device address too long: {} chars (max 64)",
            normalized.len()
        )));
    }

    if !normalized
        .chars()
        .all(|c| c.is_ascii_hexdigit() || c == ':')
    {
        return Err(DomainError::Validation(format!(
            "Device address {raw} must contain only hex digits and separators"
        )));
    }

    Ok(normalized)
}

/// Validates an original (protocol) address without changing it.
///
/// The original address is forwarded to the transport untouched, so only the
/// character set is checked here.
pub fn validate_original_address(raw: &str) -> Result<&str> {
    normalize_address(raw)?;
    Ok(raw.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalizes_case_and_separators() {
        assert_eq!(
            normalize_address(" aa-bb-cc-dd-ee-0f ").unwrap(),
            "AA:BB:CC:DD:EE:0F"
        );
        assert_eq!(
            normalize_address("AA:BB:CC:DD:EE:0F").unwrap(),
            "AA:BB:CC:DD:EE:0F"
        );
    }

    #[test]
    fn test_uuid_style_address() {
        assert_eq!(
            normalize_address("6e400001-b5a3-f393-e0a9-e50e24dcca9e").unwrap(),
            "6E400001:B5A3:F393:E0A9:E50E24DCCA9E"
        );
    }

    #[test]
    fn test_rejects_empty_and_markup() {
        assert!(normalize_address("   ").is_err());
        assert!(normalize_address("<script>").is_err());
        assert!(normalize_address("AA BB").is_err());
    }

    #[test]
    fn test_original_address_is_kept_verbatim() {
        assert_eq!(
            validate_original_address(" 6e400001-b5a3 ").unwrap(),
            "6e400001-b5a3"
        );
    }
}
