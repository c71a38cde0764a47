use crate::utils::{
    config::NetworkConfig,
    connect_flow::{ConnectFlow, ConnectOutcome},
    network::{AccessPointInfo, NetworkCommand, NetworkUtilError, WifiDetails},
};
use crate::widgets::{AccessPointRow, RowAction};
use gtk4::prelude::*;
use gtk4::{
    glib::{self},
    Align, Box as GtkBox, Button, Image, Label, Orientation, PasswordEntry, PolicyType, Popover,
    Revealer, RevealerTransitionType, ScrolledWindow, Separator, Spinner,
};
use std::{cell::RefCell, rc::Rc, time::Duration};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

const SCAN_RESULT_DELAY: Duration = Duration::from_secs(2);
const AP_BATCH_SIZE: usize = 5;

struct NetworkWindowUI {
    wifi_toggle_button: Button,
    current_icon: Image,
    current_ssid_label: Label,
    current_details_box: GtkBox,
    strength_label: Label,
    frequency_label: Label,
    bandwidth_label: Label,
    networks_revealer: Revealer,
    networks_list_box: GtkBox,
    scan_spinner: Spinner,
    scan_status_label: Label,
    available_networks_button_icon: Image,
    password_revealer: Revealer,
    password_title: Label,
    password_error: Label,
    password_entry: PasswordEntry,
}

pub struct NetworkWindow {
    popover: Popover,
    config: NetworkConfig,
    command_sender: mpsc::Sender<NetworkCommand>,
    details: RefCell<WifiDetails>,
    access_points: RefCell<Vec<AccessPointInfo>>,
    rows: RefCell<Vec<Rc<AccessPointRow>>>,
    flow: RefCell<ConnectFlow>,
    ui_elements: RefCell<Option<NetworkWindowUI>>,
    is_scanning: RefCell<bool>,
    networks_visible: RefCell<bool>,
    polling_active: RefCell<bool>,
    update_source_id: RefCell<Option<glib::SourceId>>,
    scan_source_id: RefCell<Option<glib::SourceId>>,
    rebuild_state: RefCell<Option<(glib::SourceId, usize)>>,
}

impl NetworkWindow {
    pub fn new(config: &NetworkConfig, command_sender: mpsc::Sender<NetworkCommand>) -> Rc<Self> {
        let popover = Popover::builder()
            .autohide(true)
            .cascade_popdown(true)
            .build();
        popover.add_css_class("NetworkWindow");

        let window = Rc::new(Self {
            popover: popover.clone(),
            config: config.clone(),
            command_sender,
            details: RefCell::new(WifiDetails::default()),
            access_points: RefCell::new(Vec::new()),
            rows: RefCell::new(Vec::new()),
            flow: RefCell::new(ConnectFlow::default()),
            ui_elements: RefCell::new(None),
            is_scanning: RefCell::new(false),
            networks_visible: RefCell::new(false),
            polling_active: RefCell::new(false),
            update_source_id: RefCell::new(None),
            scan_source_id: RefCell::new(None),
            rebuild_state: RefCell::new(None),
        });

        let main_box = GtkBox::builder()
            .orientation(Orientation::Vertical)
            .width_request(350)
            .build();

        let (top_bar, wifi_toggle_button) = Self::build_top_bar(&window);
        main_box.append(&top_bar);
        main_box.append(&Separator::new(Orientation::Horizontal));

        let (
            current_section,
            current_icon,
            current_ssid_label,
            current_details_box,
            strength_label,
            frequency_label,
            bandwidth_label,
        ) = Self::build_current_network_section();
        main_box.append(&current_section);
        main_box.append(&Separator::new(Orientation::Horizontal));

        let (
            available_section,
            networks_revealer,
            networks_list_box,
            scan_spinner,
            scan_status_label,
            available_networks_button_icon,
        ) = Self::build_available_networks_section(&window);
        main_box.append(&available_section);

        let (password_revealer, password_title, password_error, password_entry) =
            Self::build_password_prompt(&window);
        main_box.append(&password_revealer);
        main_box.append(&Separator::new(Orientation::Horizontal));

        let settings_section = Self::build_settings_section(&popover, config);
        main_box.append(&settings_section);

        popover.set_child(Some(&main_box));

        *window.ui_elements.borrow_mut() = Some(NetworkWindowUI {
            wifi_toggle_button,
            current_icon,
            current_ssid_label,
            current_details_box,
            strength_label,
            frequency_label,
            bandwidth_label,
            networks_revealer,
            networks_list_box,
            scan_spinner,
            scan_status_label,
            available_networks_button_icon,
            password_revealer,
            password_title,
            password_error,
            password_entry,
        });

        let weak_window = Rc::downgrade(&window);
        popover.connect_visible_notify(move |pop| {
            let Some(window) = weak_window.upgrade() else {
                return;
            };
            if pop.is_visible() {
                window.start_polling();
            } else {
                window.stop_polling();
                window.hide_password_prompt();
                if *window.networks_visible.borrow() {
                    window.set_networks_visible(false);
                }
            }
        });

        window
    }

    fn build_quick_toggle_button(icon_name: &str, label_text: &str) -> Button {
        let icon = Image::builder()
            .icon_name(icon_name)
            .pixel_size(20)
            .margin_bottom(3)
            .halign(Align::Center)
            .build();
        icon.add_css_class("toggle-icon");

        let label = Label::builder()
            .label(label_text)
            .halign(Align::Center)
            .build();
        label.add_css_class("toggle-label");

        let content_box = GtkBox::builder()
            .orientation(Orientation::Vertical)
            .spacing(2)
            .valign(Align::Center)
            .build();
        content_box.append(&icon);
        content_box.append(&label);

        Button::builder()
            .child(&content_box)
            .css_classes(vec!["quick-toggle"])
            .hexpand(true)
            .build()
    }

    fn build_top_bar(window_rc: &Rc<Self>) -> (GtkBox, Button) {
        let wifi_toggle_button =
            Self::build_quick_toggle_button("network-wireless-symbolic", "Wi-Fi");

        let top_bar = GtkBox::builder()
            .orientation(Orientation::Horizontal)
            .spacing(10)
            .css_classes(vec!["quick-settings-row"])
            .build();
        top_bar.append(&wifi_toggle_button);

        let weak_window = Rc::downgrade(window_rc);
        wifi_toggle_button.connect_clicked(move |_| {
            if let Some(window) = weak_window.upgrade() {
                let enable = !window.details.borrow().enabled;
                info!(enable, "Toggling Wi-Fi");
                window.set_controls_sensitive(false);
                window.send_command(NetworkCommand::SetWifiEnabled(enable));
            }
        });

        (top_bar, wifi_toggle_button)
    }

    fn build_current_network_section() -> (GtkBox, Image, Label, GtkBox, Label, Label, Label) {
        let current_icon = Image::builder()
            .icon_name("network-wireless-offline-symbolic")
            .pixel_size(24)
            .build();

        let current_ssid_label = Label::builder()
            .label("Not Connected")
            .halign(Align::Start)
            .hexpand(true)
            .css_classes(vec!["title-3"])
            .build();

        let current_network_info_box = GtkBox::builder()
            .orientation(Orientation::Horizontal)
            .spacing(10)
            .build();
        current_network_info_box.append(&current_icon);
        current_network_info_box.append(&current_ssid_label);

        let (strength_row, strength_label) = Self::create_detail_row("Signal Strength:");
        let (frequency_row, frequency_label) = Self::create_detail_row("Frequency:");
        let (bandwidth_row, bandwidth_label) = Self::create_detail_row("Bandwidth:");

        let current_details_box = GtkBox::builder()
            .orientation(Orientation::Vertical)
            .visible(false)
            .css_classes(vec!["network-details"])
            .build();
        current_details_box.append(&strength_row);
        current_details_box.append(&frequency_row);
        current_details_box.append(&bandwidth_row);

        let current_section = GtkBox::builder()
            .orientation(Orientation::Vertical)
            .spacing(5)
            .css_classes(vec!["current-network"])
            .build();
        current_section.append(&current_network_info_box);
        current_section.append(&current_details_box);

        (
            current_section,
            current_icon,
            current_ssid_label,
            current_details_box,
            strength_label,
            frequency_label,
            bandwidth_label,
        )
    }

    fn build_available_networks_section(
        window_rc: &Rc<Self>,
    ) -> (GtkBox, Revealer, GtkBox, Spinner, Label, Image) {
        let scan_spinner = Spinner::builder().spinning(false).visible(false).build();

        let scan_status_label = Label::builder()
            .label("Available Networks")
            .halign(Align::Start)
            .hexpand(true)
            .build();

        let available_networks_button_icon =
            Image::builder().icon_name("pan-down-symbolic").build();

        let button_content = GtkBox::builder()
            .orientation(Orientation::Horizontal)
            .spacing(10)
            .build();
        button_content.append(&scan_status_label);
        button_content.append(&scan_spinner);
        button_content.append(&available_networks_button_icon);

        let available_networks_button = Button::builder()
            .child(&button_content)
            .css_classes(vec!["network-selector"])
            .build();

        let networks_list_box = GtkBox::builder()
            .orientation(Orientation::Vertical)
            .spacing(5)
            .css_classes(vec!["network-list"])
            .build();

        let scrolled_window = ScrolledWindow::builder()
            .hscrollbar_policy(PolicyType::Never)
            .vscrollbar_policy(PolicyType::Automatic)
            .min_content_height(150)
            .max_content_height(250)
            .min_content_width(300)
            .child(&networks_list_box)
            .build();

        let networks_revealer = Revealer::builder()
            .transition_type(RevealerTransitionType::SlideDown)
            .transition_duration(200)
            .child(&scrolled_window)
            .reveal_child(false)
            .build();

        let weak_window = Rc::downgrade(window_rc);
        available_networks_button.connect_clicked(move |_| {
            if let Some(window) = weak_window.upgrade() {
                let should_reveal = !*window.networks_visible.borrow();
                window.set_networks_visible(should_reveal);
            }
        });

        let networks_container = GtkBox::builder()
            .orientation(Orientation::Vertical)
            .css_classes(vec!["networks-container"])
            .build();
        networks_container.append(&available_networks_button);
        networks_container.append(&networks_revealer);

        let available_section = GtkBox::builder()
            .orientation(Orientation::Vertical)
            .css_classes(vec!["networks-section"])
            .build();
        available_section.append(&networks_container);

        (
            available_section,
            networks_revealer,
            networks_list_box,
            scan_spinner,
            scan_status_label,
            available_networks_button_icon,
        )
    }

    fn build_password_prompt(window_rc: &Rc<Self>) -> (Revealer, Label, Label, PasswordEntry) {
        let title = Label::builder()
            .halign(Align::Start)
            .css_classes(vec!["heading"])
            .build();
        let error_label = Label::builder()
            .halign(Align::Start)
            .visible(false)
            .css_classes(vec!["error-label"])
            .build();
        let entry = PasswordEntry::builder()
            .show_peek_icon(true)
            .hexpand(true)
            .build();

        let cancel_button = Button::builder().label("Cancel").build();
        let connect_button = Button::builder()
            .label("Connect")
            .css_classes(vec!["suggested-action"])
            .build();

        let buttons = GtkBox::builder()
            .orientation(Orientation::Horizontal)
            .spacing(6)
            .halign(Align::End)
            .build();
        buttons.append(&cancel_button);
        buttons.append(&connect_button);

        let prompt_box = GtkBox::builder()
            .orientation(Orientation::Vertical)
            .spacing(6)
            .css_classes(vec!["password-prompt"])
            .build();
        prompt_box.append(&title);
        prompt_box.append(&error_label);
        prompt_box.append(&entry);
        prompt_box.append(&buttons);

        let revealer = Revealer::builder()
            .transition_type(RevealerTransitionType::SlideDown)
            .transition_duration(150)
            .child(&prompt_box)
            .reveal_child(false)
            .build();

        let weak_cancel = Rc::downgrade(window_rc);
        cancel_button.connect_clicked(move |_| {
            if let Some(window) = weak_cancel.upgrade() {
                window.hide_password_prompt();
            }
        });

        let weak_connect = Rc::downgrade(window_rc);
        connect_button.connect_clicked(move |_| {
            if let Some(window) = weak_connect.upgrade() {
                window.submit_password();
            }
        });

        let weak_activate = Rc::downgrade(window_rc);
        entry.connect_activate(move |_| {
            if let Some(window) = weak_activate.upgrade() {
                window.submit_password();
            }
        });

        (revealer, title, error_label, entry)
    }

    fn build_settings_section(popover: &Popover, config: &NetworkConfig) -> GtkBox {
        let button = Button::builder().label("Network Settings").build();

        let popover_clone = popover.clone();
        let command = config.settings_command.clone();
        button.connect_clicked(move |_| {
            popover_clone.popdown();
            let Some((program, args)) = command.split_first() else {
                warn!("No settings command configured");
                return;
            };
            if let Err(e) = std::process::Command::new(program).args(args).spawn() {
                warn!("Failed to launch network settings '{}': {}", program, e);
            }
        });

        let section_box = GtkBox::builder()
            .orientation(Orientation::Horizontal)
            .css_classes(vec!["settings"])
            .halign(Align::Fill)
            .hexpand(true)
            .build();
        section_box.append(&button);
        section_box
    }

    fn create_detail_row(label_text: &str) -> (GtkBox, Label) {
        let label = Label::builder()
            .label(label_text)
            .halign(Align::Start)
            .build();
        let value_label = Label::builder()
            .label("N/A")
            .halign(Align::End)
            .hexpand(true)
            .css_classes(vec!["dim-label"])
            .build();
        let row_box = GtkBox::builder()
            .orientation(Orientation::Horizontal)
            .build();
        row_box.append(&label);
        row_box.append(&value_label);
        (row_box, value_label)
    }

    fn send_command(&self, cmd: NetworkCommand) {
        let sender = self.command_sender.clone();
        glib::MainContext::default().spawn_local(async move {
            if sender.send(cmd).await.is_err() {
                warn!("Network actor is not running");
            }
        });
    }

    fn request_update(&self) {
        self.send_command(NetworkCommand::GetDetails);
    }

    pub fn update_state(self: &Rc<Self>, details_res: Result<WifiDetails, NetworkUtilError>) {
        match details_res {
            Ok(d) => {
                *self.details.borrow_mut() = d;
            }
            Err(e) => {
                warn!("[Window] Failed to update network details: {}", e);
                *self.details.borrow_mut() = WifiDetails::default();
            }
        }
        self.update_ui();
        self.refresh_rows();
    }

    pub fn update_ap_list(
        self: &Rc<Self>,
        aps_res: Result<Vec<AccessPointInfo>, NetworkUtilError>,
    ) {
        match aps_res {
            Ok(aps) => {
                *self.access_points.borrow_mut() = aps;
            }
            Err(e) => {
                warn!("[Window] Failed to update access points: {}", e);
                self.access_points.borrow_mut().clear();
            }
        }

        if *self.networks_visible.borrow() {
            self.rebuild_network_list_ui();
        }
        self.set_scanning_state(false);
    }

    pub fn handle_scan_result(self: &Rc<Self>, result: Result<(), NetworkUtilError>) {
        if let Err(e) = result {
            debug!("[Window] Scan request failed: {}", e);
        }
    }

    pub fn handle_wifi_set_result(self: &Rc<Self>, result: Result<(), NetworkUtilError>) {
        if let Err(e) = result {
            warn!("[Window] Failed to set Wi-Fi state via actor: {}", e);
        }
        self.request_update();
        self.set_controls_sensitive(true);
    }

    pub fn handle_connect_result(
        self: &Rc<Self>,
        bssid: &str,
        result: Result<(), NetworkUtilError>,
    ) {
        let outcome = {
            let known = self.access_points.borrow();
            self.flow.borrow_mut().finish(bssid, result, &known)
        };

        match outcome {
            ConnectOutcome::Connected => {
                info!(bssid, "Connected");
                self.hide_password_prompt();
            }
            ConnectOutcome::PromptPassword { ap, retry } => self.show_password_prompt(&ap, retry),
            ConnectOutcome::Failed(e) => {
                warn!("[Window] Failed to connect via actor: {}", e);
            }
        }

        self.refresh_rows();
        self.request_update();
        if *self.networks_visible.borrow() {
            self.send_command(NetworkCommand::GetAccessPoints);
        }
    }

    pub fn handle_disconnect_result(self: &Rc<Self>, result: Result<(), NetworkUtilError>) {
        if let Err(e) = result {
            warn!("[Window] Failed to disconnect via actor: {}", e);
        }
        self.request_update();
        if *self.networks_visible.borrow() {
            self.send_command(NetworkCommand::GetAccessPoints);
        }
    }

    fn on_row_action(self: &Rc<Self>, action: RowAction) {
        match action {
            RowAction::Connect(ap) => self.connect_to(ap, None),
            RowAction::Disconnect => {
                info!("Disconnecting Wi-Fi device");
                self.send_command(NetworkCommand::Disconnect);
            }
        }
    }

    fn connect_to(self: &Rc<Self>, ap: AccessPointInfo, password: Option<String>) {
        if self.details.borrow().device_path.is_none() {
            warn!("Cannot connect: Wi-Fi device path unknown.");
            return;
        }
        info!(bssid = %ap.bssid, secured = ap.secured, retry = password.is_some(), "Requesting connection");
        self.flow.borrow_mut().begin(&ap.bssid);
        self.refresh_rows();
        self.send_command(NetworkCommand::Connect { ap, password });
    }

    fn refresh_rows(&self) {
        let details = self.details.borrow();
        let flow = self.flow.borrow();
        for row in self.rows.borrow().iter() {
            row.refresh(&details, flow.connecting());
        }
    }

    fn show_password_prompt(&self, ap: &AccessPointInfo, retry: bool) {
        if let Some(ui) = self.ui_elements.borrow().as_ref() {
            let name = ap.ssid.as_deref().unwrap_or(ap.bssid.as_str());
            ui.password_title
                .set_label(&format!("Password for \"{}\"", name));
            ui.password_error.set_label("Incorrect password, try again");
            ui.password_error.set_visible(retry);
            ui.password_entry.set_text("");
            ui.password_revealer.set_reveal_child(true);
            ui.password_entry.grab_focus();
        }
    }

    fn hide_password_prompt(&self) {
        self.flow.borrow_mut().close_prompt();
        if let Some(ui) = self.ui_elements.borrow().as_ref() {
            ui.password_entry.set_text("");
            ui.password_error.set_visible(false);
            ui.password_revealer.set_reveal_child(false);
        }
    }

    fn submit_password(self: &Rc<Self>) {
        let password = match self.ui_elements.borrow().as_ref() {
            Some(ui) => ui.password_entry.text().to_string(),
            None => return,
        };
        if password.is_empty() {
            return;
        }
        let Some(ap) = self.flow.borrow().prompt_target().cloned() else {
            return;
        };
        if let Some(ui) = self.ui_elements.borrow().as_ref() {
            ui.password_revealer.set_reveal_child(false);
        }
        self.connect_to(ap, Some(password));
    }

    fn update_ui(self: &Rc<Self>) {
        let ui_opt = self.ui_elements.borrow();
        let Some(ui) = ui_opt.as_ref() else {
            return;
        };
        let d = self.details.borrow();

        if d.enabled {
            ui.wifi_toggle_button.add_css_class("active");
        } else {
            ui.wifi_toggle_button.remove_css_class("active");
        }

        let icon_name = if d.icon_name.is_empty() {
            "network-wireless-offline-symbolic"
        } else {
            d.icon_name.as_str()
        };
        ui.current_icon.set_icon_name(Some(icon_name));

        if d.is_connected {
            ui.current_ssid_label
                .set_label(d.ssid.as_deref().unwrap_or("Connected"));
            ui.current_details_box.set_visible(true);
            ui.strength_label
                .set_label(&format!("{}%", d.strength.unwrap_or(0)));
            ui.frequency_label.set_label(&format!(
                "{:.1} GHz",
                d.frequency.unwrap_or(0) as f32 / 1000.0
            ));
            ui.bandwidth_label
                .set_label(&format!("{} Mbps", d.bitrate.unwrap_or(0) / 1000));
        } else {
            ui.current_ssid_label.set_label(if d.enabled {
                "Not Connected"
            } else {
                "Wi-Fi Disabled"
            });
            ui.current_details_box.set_visible(false);
        }

        if !d.enabled && *self.networks_visible.borrow() {
            drop(d);
            drop(ui_opt);
            self.set_networks_visible(false);
        }
    }

    fn set_controls_sensitive(&self, sensitive: bool) {
        if let Some(ui) = self.ui_elements.borrow().as_ref() {
            ui.wifi_toggle_button.set_sensitive(sensitive);
        }
    }

    fn set_networks_visible(self: &Rc<Self>, visible: bool) {
        *self.networks_visible.borrow_mut() = visible;
        if let Some(ui) = self.ui_elements.borrow().as_ref() {
            ui.networks_revealer.set_reveal_child(visible);
            if visible {
                ui.available_networks_button_icon
                    .set_icon_name(Some("pan-up-symbolic"));
                ui.available_networks_button_icon.add_css_class("expanded");
            } else {
                ui.available_networks_button_icon
                    .set_icon_name(Some("pan-down-symbolic"));
                ui.available_networks_button_icon
                    .remove_css_class("expanded");
            }
        }

        if visible {
            self.rebuild_network_list_ui();
            self.trigger_scan();
            self.start_scan_timer();
        } else {
            self.stop_scan_timer();
            self.set_scanning_state(false);
            self.cancel_rebuild();
        }
    }

    fn cancel_rebuild(&self) {
        if let Some((id, _)) = self.rebuild_state.borrow_mut().take() {
            id.remove();
        }
    }

    fn rebuild_network_list_ui(self: &Rc<Self>) {
        self.cancel_rebuild();

        let list_box = match self
            .ui_elements
            .borrow()
            .as_ref()
            .map(|ui| ui.networks_list_box.clone())
        {
            Some(lb) => lb,
            None => return,
        };

        while let Some(child) = list_box.first_child() {
            list_box.remove(&child);
        }
        self.rows.borrow_mut().clear();

        if self.access_points.borrow().is_empty() {
            let msg = if *self.is_scanning.borrow() {
                "Scanning..."
            } else {
                "No networks found"
            };
            let label = Label::builder()
                .label(msg)
                .halign(Align::Center)
                .css_classes(vec!["dim-label"])
                .margin_top(20)
                .margin_bottom(20)
                .build();
            list_box.append(&label);
        } else {
            let weak_self = Rc::downgrade(self);
            let id = glib::idle_add_local(move || match weak_self.upgrade() {
                Some(s) => s.add_ap_rows_batch(&list_box),
                None => glib::ControlFlow::Break,
            });
            *self.rebuild_state.borrow_mut() = Some((id, 0));
        }
    }

    fn add_ap_rows_batch(self: &Rc<Self>, list_box: &GtkBox) -> glib::ControlFlow {
        let start_index = match self.rebuild_state.borrow().as_ref() {
            Some((_, index)) => *index,
            None => return glib::ControlFlow::Break,
        };

        let batch: Vec<AccessPointInfo> = self
            .access_points
            .borrow()
            .iter()
            .skip(start_index)
            .take(AP_BATCH_SIZE)
            .cloned()
            .collect();
        let total = self.access_points.borrow().len();

        for ap in batch {
            let row = self.create_ap_row(ap);
            list_box.append(row.widget());
            self.rows.borrow_mut().push(row);
        }

        let end_index = (start_index + AP_BATCH_SIZE).min(total);
        if end_index >= total || !list_box.is_visible() {
            // Returning Break removes the source; drop the id without removing it again.
            self.rebuild_state.borrow_mut().take();
            glib::ControlFlow::Break
        } else {
            if let Some(state) = self.rebuild_state.borrow_mut().as_mut() {
                state.1 = end_index;
            }
            glib::ControlFlow::Continue
        }
    }

    fn create_ap_row(self: &Rc<Self>, ap: AccessPointInfo) -> Rc<AccessPointRow> {
        let weak_self = Rc::downgrade(self);
        let details = self.details.borrow();
        let flow = self.flow.borrow();
        AccessPointRow::new(
            ap,
            &self.config,
            &details,
            flow.connecting(),
            Rc::new(move |action| {
                if let Some(window) = weak_self.upgrade() {
                    window.on_row_action(action);
                }
            }),
        )
    }

    fn set_scanning_state(self: &Rc<Self>, scanning: bool) {
        *self.is_scanning.borrow_mut() = scanning;
        let list_empty = match self.ui_elements.borrow().as_ref() {
            Some(ui) => {
                ui.scan_spinner.set_visible(scanning);
                ui.scan_spinner.set_spinning(scanning);
                ui.scan_status_label.set_label(if scanning {
                    "Scanning..."
                } else {
                    "Available Networks"
                });
                ui.networks_list_box.first_child().is_none()
            }
            None => return,
        };

        let needs_placeholder = list_empty && (scanning || self.access_points.borrow().is_empty());
        if needs_placeholder && *self.networks_visible.borrow() {
            self.rebuild_network_list_ui();
        }
    }

    fn trigger_scan(self: &Rc<Self>) {
        if !*self.networks_visible.borrow() || *self.is_scanning.borrow() {
            return;
        }

        self.set_scanning_state(true);
        let sender = self.command_sender.clone();
        glib::MainContext::default().spawn_local(async move {
            let _ = sender.send(NetworkCommand::RequestScan).await;
            glib::timeout_future(SCAN_RESULT_DELAY).await;
            let _ = sender.send(NetworkCommand::GetAccessPoints).await;
        });
    }

    fn start_polling(self: &Rc<Self>) {
        if *self.polling_active.borrow() {
            return;
        }
        *self.polling_active.borrow_mut() = true;

        self.request_update();

        let weak_self = Rc::downgrade(self);
        let interval = Duration::from_secs(self.config.refresh_interval_secs.max(1));
        let id = glib::timeout_add_local(interval, move || {
            let Some(inner_self) = weak_self.upgrade() else {
                return glib::ControlFlow::Break;
            };
            inner_self.request_update();
            glib::ControlFlow::Continue
        });
        *self.update_source_id.borrow_mut() = Some(id);

        if *self.networks_visible.borrow() {
            self.start_scan_timer();
        }
    }

    fn stop_polling(&self) {
        *self.polling_active.borrow_mut() = false;
        if let Some(id) = self.update_source_id.borrow_mut().take() {
            id.remove();
        }
        self.stop_scan_timer();
        self.cancel_rebuild();
    }

    fn start_scan_timer(self: &Rc<Self>) {
        if self.scan_source_id.borrow().is_some() || !*self.networks_visible.borrow() {
            return;
        }
        let weak_self = Rc::downgrade(self);
        let interval = Duration::from_secs(self.config.scan_interval_secs.max(1));
        let id = glib::timeout_add_local(interval, move || {
            let Some(inner_self) = weak_self.upgrade() else {
                return glib::ControlFlow::Break;
            };
            inner_self.trigger_scan();
            glib::ControlFlow::Continue
        });
        *self.scan_source_id.borrow_mut() = Some(id);
    }

    fn stop_scan_timer(&self) {
        if let Some(id) = self.scan_source_id.borrow_mut().take() {
            id.remove();
        }
    }

    pub fn popover(&self) -> &Popover {
        &self.popover
    }
}

impl Drop for NetworkWindow {
    fn drop(&mut self) {
        self.stop_polling();
    }
}
