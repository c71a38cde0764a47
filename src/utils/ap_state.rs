use crate::utils::network::{AccessPointInfo, WifiDetails};
use crate::utils::wifi_state::{is_ap_enabled, DeviceState};

const ICON_CLASSES: [&str; 3] = ["network-icon", "wifi", "txt-icon"];
const ACTIVE_CLASS: &str = "active";

/// Everything an access point row shows that depends on live Wi-Fi state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApRowState {
    pub is_active: bool,
    pub is_connecting: bool,
    pub show_status: bool,
    pub status_text: &'static str,
    pub show_spinner: bool,
}

impl ApRowState {
    pub fn derive(ap: &AccessPointInfo, details: &WifiDetails, connecting: Option<&str>) -> Self {
        let is_active = is_active(ap, details);
        let state = details.device_state;
        let is_connecting = connecting == Some(ap.bssid.as_str());
        let is_disconnecting = is_active && state == DeviceState::Deactivating;

        Self {
            is_active,
            is_connecting,
            show_status: is_active && is_ap_enabled(state),
            status_text: state.label(),
            show_spinner: is_connecting || is_disconnecting,
        }
    }

    pub fn icon_classes(&self) -> Vec<&'static str> {
        let mut classes = ICON_CLASSES.to_vec();
        if self.is_active {
            classes.push(ACTIVE_CLASS);
        }
        classes
    }
}

/// Rows match the active network by SSID; no active network matches nothing.
pub fn is_active(ap: &AccessPointInfo, details: &WifiDetails) -> bool {
    match (&ap.ssid, &details.ssid) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::network::tests::ap;

    fn details(ssid: Option<&str>, state: DeviceState) -> WifiDetails {
        WifiDetails {
            enabled: true,
            is_connected: ssid.is_some(),
            ssid: ssid.map(String::from),
            device_state: state,
            ..Default::default()
        }
    }

    #[test]
    fn test_active_row_shows_status() {
        let a = ap(Some("Home"), "AA:BB", 80, false);
        let st = ApRowState::derive(&a, &details(Some("Home"), DeviceState::Activated), None);
        assert!(st.is_active);
        assert!(st.show_status);
        assert_eq!(st.status_text, "Activated");
        assert!(!st.show_spinner);
        assert_eq!(st.icon_classes(), ["network-icon", "wifi", "txt-icon", "active"]);
    }

    #[test]
    fn test_inactive_row_hides_status() {
        let a = ap(Some("Cafe"), "AA:BB", 80, false);
        let st = ApRowState::derive(&a, &details(Some("Home"), DeviceState::Activated), None);
        assert!(!st.is_active);
        assert!(!st.show_status);
        assert_eq!(st.icon_classes(), ["network-icon", "wifi", "txt-icon"]);
    }

    #[test]
    fn test_hidden_ap_is_not_active_without_connection() {
        let a = ap(None, "AA:BB", 80, false);
        let st = ApRowState::derive(&a, &details(None, DeviceState::Disconnected), None);
        assert!(!st.is_active);
    }

    #[test]
    fn test_status_hidden_when_device_unavailable() {
        let a = ap(Some("Home"), "AA:BB", 80, false);
        let st = ApRowState::derive(&a, &details(Some("Home"), DeviceState::Failed), None);
        assert!(st.is_active);
        assert!(!st.show_status);
    }

    #[test]
    fn test_spinner_while_connecting_by_bssid() {
        let a = ap(Some("Cafe"), "AA:BB", 80, false);
        let d = details(Some("Home"), DeviceState::Activated);
        let st = ApRowState::derive(&a, &d, Some("AA:BB"));
        assert!(st.show_spinner);
        assert!(st.is_connecting);
        assert!(!ApRowState::derive(&a, &d, Some("CC:DD")).show_spinner);
    }

    #[test]
    fn test_spinner_while_active_deactivates() {
        let a = ap(Some("Home"), "AA:BB", 80, false);
        let st = ApRowState::derive(&a, &details(Some("Home"), DeviceState::Deactivating), None);
        assert!(st.show_spinner);
        assert!(!st.show_status);

        let other = ap(Some("Cafe"), "CC:DD", 80, false);
        let st = ApRowState::derive(
            &other,
            &details(Some("Home"), DeviceState::Deactivating),
            None,
        );
        assert!(!st.show_spinner);
    }
}
