//! Peripheral identifier helpers.

use btleplug::platform::PeripheralId;

use myo_types::normalize_address;

/// Address reported by platforms that hide hardware addresses.
const HIDDEN_ADDRESS: &str = "00:00:00:00:00:00";

/// Format a peripheral ID as a string.
///
/// On macOS, peripheral IDs are UUIDs. On other platforms, they are
/// hardware addresses.
pub fn format_peripheral_id(id: &PeripheralId) -> String {
    format!("{:?}", id)
        .trim_start_matches("PeripheralId(")
        .trim_end_matches(')')
        .to_string()
}

/// Choose the identifier used to match a peripheral against configured
/// addresses: the hardware address where the platform exposes one,
/// otherwise the formatted peripheral ID. The result is normalized.
pub fn create_identifier(address: &str, peripheral_id: &PeripheralId) -> String {
    identifier_from_parts(address, &format_peripheral_id(peripheral_id))
}

fn identifier_from_parts(address: &str, formatted_id: &str) -> String {
    if address.is_empty() || address == HIDDEN_ADDRESS {
        normalize_address(formatted_id)
    } else {
        normalize_address(address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier_prefers_hardware_address() {
        assert_eq!(
            identifier_from_parts("F0:1C:CD:A7:2C:85", "hci0/dev_F0_1C_CD_A7_2C_85"),
            "f01ccda72c85"
        );
    }

    #[test]
    fn test_identifier_falls_back_to_peripheral_id() {
        assert_eq!(
            identifier_from_parts(HIDDEN_ADDRESS, "6E4F-AB"),
            "6e4fab"
        );
        assert_eq!(identifier_from_parts("", "AbC"), "abc");
    }
}
