use std::fmt;

/// NetworkManager `NMDeviceState`, limited to the values a Wi-Fi device reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DeviceState {
    #[default]
    Unknown,
    Unmanaged,
    Unavailable,
    Disconnected,
    Prepare,
    Config,
    NeedAuth,
    IpConfig,
    IpCheck,
    Secondaries,
    Activated,
    Deactivating,
    Failed,
}

impl DeviceState {
    pub fn from_u32(code: u32) -> Self {
        match code {
            10 => DeviceState::Unmanaged,
            20 => DeviceState::Unavailable,
            30 => DeviceState::Disconnected,
            40 => DeviceState::Prepare,
            50 => DeviceState::Config,
            60 => DeviceState::NeedAuth,
            70 => DeviceState::IpConfig,
            80 => DeviceState::IpCheck,
            90 => DeviceState::Secondaries,
            100 => DeviceState::Activated,
            110 => DeviceState::Deactivating,
            120 => DeviceState::Failed,
            _ => DeviceState::Unknown,
        }
    }

    pub fn code(self) -> u32 {
        match self {
            DeviceState::Unknown => 0,
            DeviceState::Unmanaged => 10,
            DeviceState::Unavailable => 20,
            DeviceState::Disconnected => 30,
            DeviceState::Prepare => 40,
            DeviceState::Config => 50,
            DeviceState::NeedAuth => 60,
            DeviceState::IpConfig => 70,
            DeviceState::IpCheck => 80,
            DeviceState::Secondaries => 90,
            DeviceState::Activated => 100,
            DeviceState::Deactivating => 110,
            DeviceState::Failed => 120,
        }
    }

    /// Text shown under the active network's name.
    pub fn label(self) -> &'static str {
        match self {
            DeviceState::Unknown => "Unknown",
            DeviceState::Unmanaged => "Unmanaged",
            DeviceState::Unavailable => "Unavailable",
            DeviceState::Disconnected => "Disconnected",
            DeviceState::Prepare => "Preparing",
            DeviceState::Config => "Configuring",
            DeviceState::NeedAuth => "Need Authentication",
            DeviceState::IpConfig => "IP Configuration",
            DeviceState::IpCheck => "IP Check",
            DeviceState::Secondaries => "Secondaries",
            DeviceState::Activated => "Activated",
            DeviceState::Deactivating => "Deactivating",
            DeviceState::Failed => "Failed",
        }
    }

    pub fn is_connecting(self) -> bool {
        matches!(self.code(), 40..=90)
    }

    /// Activation ended without reaching `Activated`.
    pub fn is_terminal_failure(self) -> bool {
        matches!(self, DeviceState::Failed | DeviceState::Disconnected)
    }
}

impl fmt::Display for DeviceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Whether the device is in a state where showing a connection status makes sense.
pub fn is_ap_enabled(state: DeviceState) -> bool {
    let code = state.code();
    code > 20 && code <= 100
}

/// `NM_DEVICE_STATE_REASON_NO_SECRETS`: activation needed secrets nobody supplied.
pub const REASON_NO_SECRETS: u32 = 7;

/// Payload of the device `StateChanged(new, old, reason)` signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceStateChange {
    pub new: DeviceState,
    pub old: DeviceState,
    pub reason: u32,
}

impl DeviceStateChange {
    pub fn from_raw((new, old, reason): (u32, u32, u32)) -> Self {
        Self {
            new: DeviceState::from_u32(new),
            old: DeviceState::from_u32(old),
            reason,
        }
    }

    pub fn missing_secrets(&self) -> bool {
        self.reason == REASON_NO_SECRETS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_change_from_raw() {
        let change = DeviceStateChange::from_raw((120, 60, 7));
        assert_eq!(change.new, DeviceState::Failed);
        assert_eq!(change.old, DeviceState::NeedAuth);
        assert!(change.missing_secrets());
        assert!(!DeviceStateChange::from_raw((30, 110, 39)).missing_secrets());
    }

    #[test]
    fn test_from_u32_known_codes() {
        assert_eq!(DeviceState::from_u32(100), DeviceState::Activated);
        assert_eq!(DeviceState::from_u32(110), DeviceState::Deactivating);
        assert_eq!(DeviceState::from_u32(60), DeviceState::NeedAuth);
        assert_eq!(DeviceState::from_u32(120), DeviceState::Failed);
    }

    #[test]
    fn test_from_u32_unknown_code() {
        assert_eq!(DeviceState::from_u32(7), DeviceState::Unknown);
        assert_eq!(DeviceState::from_u32(999), DeviceState::Unknown);
    }

    #[test]
    fn test_code_matches_from_u32() {
        for code in [0, 10, 20, 30, 40, 50, 60, 70, 80, 90, 100, 110, 120] {
            assert_eq!(DeviceState::from_u32(code).code(), code);
        }
    }

    #[test]
    fn test_is_ap_enabled_bounds() {
        assert!(!is_ap_enabled(DeviceState::Unknown));
        assert!(!is_ap_enabled(DeviceState::Unavailable));
        assert!(is_ap_enabled(DeviceState::Disconnected));
        assert!(is_ap_enabled(DeviceState::Prepare));
        assert!(is_ap_enabled(DeviceState::Activated));
        assert!(!is_ap_enabled(DeviceState::Deactivating));
        assert!(!is_ap_enabled(DeviceState::Failed));
    }

    #[test]
    fn test_is_connecting() {
        assert!(DeviceState::Prepare.is_connecting());
        assert!(DeviceState::NeedAuth.is_connecting());
        assert!(DeviceState::Secondaries.is_connecting());
        assert!(!DeviceState::Activated.is_connecting());
        assert!(!DeviceState::Disconnected.is_connecting());
    }

    #[test]
    fn test_labels() {
        assert_eq!(DeviceState::NeedAuth.label(), "Need Authentication");
        assert_eq!(DeviceState::IpConfig.to_string(), "IP Configuration");
        assert_eq!(DeviceState::default().label(), "Unknown");
    }
}
