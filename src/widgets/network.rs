use crate::utils::network::{NetworkUtilError, WifiDetails};
use gtk4::prelude::*;
use gtk4::{Align, Box as GtkBox, Button, Image, Orientation};
use tracing::{debug, warn};

const OFFLINE_ICON: &str = "network-wireless-offline-symbolic";

/// Bar button whose icon follows the Wi-Fi snapshot.
pub struct NetworkWidget {
    container: Button,
    icon: Image,
}

impl NetworkWidget {
    pub fn new() -> Self {
        let icon = Image::builder().icon_name(OFFLINE_ICON).build();
        icon.add_css_class("network-icon");

        let content_box = GtkBox::builder()
            .orientation(Orientation::Horizontal)
            .spacing(0)
            .build();
        content_box.append(&icon);

        let container = Button::builder()
            .child(&content_box)
            .halign(Align::Center)
            .valign(Align::Center)
            .build();
        container.add_css_class("wifi-button");

        Self { container, icon }
    }

    pub fn update(&self, details_res: &Result<WifiDetails, NetworkUtilError>) {
        match details_res {
            Ok(details) => {
                debug!(icon = %details.icon_name, "Updating bar network icon");
                self.icon.set_icon_name(Some(&details.icon_name));
                self.container.set_tooltip_text(details.ssid.as_deref());
                self.container.set_visible(true);
            }
            Err(NetworkUtilError::NoWifiDevice) => {
                self.container.set_visible(false);
            }
            Err(e) => {
                warn!("Network update failed: {}", e);
                self.set_error_state();
            }
        }
    }

    fn set_error_state(&self) {
        self.icon.set_icon_name(Some(OFFLINE_ICON));
        self.container.set_tooltip_text(None);
        self.container.set_visible(true);
    }

    pub fn widget(&self) -> &Button {
        &self.container
    }
}
