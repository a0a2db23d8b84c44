/// Number of leading IMEI digits forming the Type Allocation Code.
pub const TAC_LEN: usize = 8;

/// Derive the device TAC from an IMEI.
///
/// Returns `None` for a missing or empty IMEI. IMEIs shorter than
/// [`TAC_LEN`] are passed through whole; the value is not checked for digits.
pub fn device_tac(imei: Option<&str>) -> Option<String> {
    let imei = imei.filter(|value| !value.is_empty())?;
    Some(imei.chars().take(TAC_LEN).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn takes_first_eight_characters() {
        assert_eq!(
            device_tac(Some("352099001761481")).as_deref(),
            Some("35209900")
        );
        assert_eq!(device_tac(Some("35209900")).as_deref(), Some("35209900"));
    }

    #[test]
    fn empty_or_missing_imei_has_no_tac() {
        assert_eq!(device_tac(None), None);
        assert_eq!(device_tac(Some("")), None);
    }

    #[test]
    fn short_imei_passes_through() {
        assert_eq!(device_tac(Some("3520")).as_deref(), Some("3520"));
    }
}
