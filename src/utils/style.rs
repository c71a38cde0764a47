use tracing::warn;

const CSS_DATA: &str = include_str!("../resources/style.css");

pub fn load_css(font: Option<&str>) -> gtk4::CssProvider {
    let provider = gtk4::CssProvider::new();
    match font.and_then(font_css) {
        Some(font_rule) => provider.load_from_data(&format!("{}\n{}", font_rule, CSS_DATA)),
        None => provider.load_from_data(CSS_DATA),
    }
    provider
}

/// Turns a Pango font string such as "Sans 10" into a window-wide CSS rule.
fn font_css(font: &str) -> Option<String> {
    let desc = pango::FontDescription::from_string(font);
    let family = desc.family()?;
    let mut rule = format!("window {{ font-family: \"{}\";", family);
    if desc.size() > 0 {
        rule.push_str(&format!(" font-size: {}pt;", desc.size() / pango::SCALE));
    }
    rule.push_str(" }");
    Some(rule)
}

pub fn apply_css(font: Option<&str>) {
    let provider = load_css(font);
    if let Some(display) = gtk4::gdk::Display::default() {
        gtk4::style_context_add_provider_for_display(
            &display,
            &provider,
            gtk4::STYLE_PROVIDER_PRIORITY_APPLICATION,
        );
    } else {
        warn!("Could not get default display for applying CSS");
    }
}
