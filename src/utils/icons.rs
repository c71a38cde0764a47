const DEFAULT_WIFI_GLYPH: &str = "󰤨";

// Order matters: more specific names first, matching is by substring.
const WIFI_GLYPHS: &[(&str, &str)] = &[
    ("network-wireless-acquiring", "󰤩"),
    ("network-wireless-connected", "󰤨"),
    ("network-wireless-encrypted", "󰤪"),
    ("network-wireless-hotspot", "󰤨"),
    ("network-wireless-no-route", "󰤩"),
    ("network-wireless-offline", "󰤮"),
    ("network-wireless-disabled", "󰤮"),
    ("network-wireless-signal-excellent", "󰤨"),
    ("network-wireless-signal-good", "󰤥"),
    ("network-wireless-signal-ok", "󰤢"),
    ("network-wireless-signal-weak", "󰤟"),
    ("network-wireless-signal-none", "󰤯"),
];

pub fn wifi_glyph(icon_name: &str) -> &'static str {
    WIFI_GLYPHS
        .iter()
        .find(|(name, _)| icon_name.contains(name))
        .map(|(_, glyph)| *glyph)
        .unwrap_or(DEFAULT_WIFI_GLYPH)
}

pub fn signal_icon_name(strength: u8) -> &'static str {
    match strength {
        80.. => "network-wireless-signal-excellent-symbolic",
        60..=79 => "network-wireless-signal-good-symbolic",
        40..=59 => "network-wireless-signal-ok-symbolic",
        20..=39 => "network-wireless-signal-weak-symbolic",
        _ => "network-wireless-signal-none-symbolic",
    }
}

pub fn wifi_icon_name(connected: bool, strength: Option<u8>) -> &'static str {
    if !connected {
        return "network-wireless-offline-symbolic";
    }
    match strength {
        Some(s) => signal_icon_name(s),
        None => "network-wireless-signal-none-symbolic",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wifi_glyph_ignores_symbolic_suffix() {
        assert_eq!(wifi_glyph("network-wireless-signal-good-symbolic"), "󰤥");
        assert_eq!(wifi_glyph("network-wireless-signal-good"), "󰤥");
    }

    #[test]
    fn test_wifi_glyph_unknown_name_falls_back() {
        assert_eq!(wifi_glyph("audio-volume-high"), DEFAULT_WIFI_GLYPH);
        assert_eq!(wifi_glyph(""), DEFAULT_WIFI_GLYPH);
    }

    #[test]
    fn test_signal_icon_buckets() {
        assert_eq!(signal_icon_name(100), "network-wireless-signal-excellent-symbolic");
        assert_eq!(signal_icon_name(80), "network-wireless-signal-excellent-symbolic");
        assert_eq!(signal_icon_name(79), "network-wireless-signal-good-symbolic");
        assert_eq!(signal_icon_name(40), "network-wireless-signal-ok-symbolic");
        assert_eq!(signal_icon_name(20), "network-wireless-signal-weak-symbolic");
        assert_eq!(signal_icon_name(19), "network-wireless-signal-none-symbolic");
    }

    #[test]
    fn test_wifi_icon_name_offline_when_disconnected() {
        assert_eq!(wifi_icon_name(false, Some(90)), "network-wireless-offline-symbolic");
        assert_eq!(wifi_icon_name(true, None), "network-wireless-signal-none-symbolic");
        assert_eq!(wifi_icon_name(true, Some(65)), "network-wireless-signal-good-symbolic");
    }
}
