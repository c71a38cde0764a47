use crate::utils::ap_state::ApRowState;
use crate::utils::config::NetworkConfig;
use crate::utils::icons::wifi_glyph;
use crate::utils::network::{AccessPointInfo, WifiDetails};
use crate::utils::scroller::SsidScroller;
use gtk4::prelude::*;
use gtk4::{
    gdk, glib, Align, Box as GtkBox, Button, EventControllerMotion, GestureClick, Label,
    Orientation, Revealer, RevealerTransitionType, Spinner,
};
use std::{cell::RefCell, rc::Rc, time::Duration};
use tracing::debug;

#[derive(Debug, Clone)]
pub enum RowAction {
    Connect(AccessPointInfo),
    Disconnect,
}

pub type RowActionHandler = Rc<dyn Fn(RowAction)>;

struct AccessPointRowUI {
    icon: Label,
    name_label: Label,
    status_revealer: Revealer,
    status_label: Label,
    spinner_revealer: Revealer,
}

/// One selectable network in the menu list.
pub struct AccessPointRow {
    button: Button,
    ui: AccessPointRowUI,
    ap: AccessPointInfo,
    state: RefCell<ApRowState>,
    scroller: RefCell<SsidScroller>,
    scroll_interval: Duration,
    scroll_source_id: RefCell<Option<glib::SourceId>>,
}

impl AccessPointRow {
    pub fn new(
        ap: AccessPointInfo,
        config: &NetworkConfig,
        details: &WifiDetails,
        connecting: Option<&str>,
        on_action: RowActionHandler,
    ) -> Rc<Self> {
        let ssid = ap.ssid.clone().unwrap_or_default();
        let scroller = SsidScroller::new(&ssid, config.scroll_limit, config.scroll_padding);
        let state = ApRowState::derive(&ap, details, connecting);

        let icon = Label::builder()
            .label(wifi_glyph(&ap.icon_name))
            .valign(Align::Start)
            .build();

        let name_label = Label::builder()
            .label(scroller.idle_text())
            .tooltip_text(ssid.as_str())
            .halign(Align::Start)
            .valign(Align::Center)
            .css_classes(vec!["active-connection"])
            .build();

        let status_label = Label::builder()
            .halign(Align::Start)
            .ellipsize(pango::EllipsizeMode::End)
            .css_classes(vec!["connection-status", "dim"])
            .build();

        let status_revealer = Revealer::builder()
            .transition_type(RevealerTransitionType::SlideDown)
            .transition_duration(150)
            .child(&status_label)
            .build();

        let connection_box = GtkBox::builder()
            .orientation(Orientation::Vertical)
            .valign(Align::Center)
            .hexpand(true)
            .css_classes(vec!["connection-container"])
            .build();
        connection_box.append(&name_label);
        connection_box.append(&status_revealer);

        let spinner = Spinner::builder()
            .spinning(true)
            .halign(Align::Center)
            .valign(Align::Center)
            .css_classes(vec!["spinner", "wap"])
            .build();

        let spinner_revealer = Revealer::builder()
            .transition_type(RevealerTransitionType::Crossfade)
            .halign(Align::End)
            .valign(Align::Center)
            .child(&spinner)
            .build();

        let content = GtkBox::builder()
            .orientation(Orientation::Horizontal)
            .hexpand(true)
            .build();
        content.append(&icon);
        content.append(&connection_box);
        content.append(&spinner_revealer);

        let button = Button::builder()
            .child(&content)
            .css_classes(vec!["network-element-item", "flat"])
            .build();

        let row = Rc::new(Self {
            button,
            ui: AccessPointRowUI {
                icon,
                name_label,
                status_revealer,
                status_label,
                spinner_revealer,
            },
            ap,
            state: RefCell::new(state),
            scroller: RefCell::new(scroller),
            scroll_interval: Duration::from_millis(config.scroll_interval_ms.max(16)),
            scroll_source_id: RefCell::new(None),
        });

        row.apply_state();
        row.connect_signals(on_action);
        row
    }

    fn connect_signals(self: &Rc<Self>, on_action: RowActionHandler) {
        let motion = EventControllerMotion::new();
        let weak_enter = Rc::downgrade(self);
        motion.connect_enter(move |_, _, _| {
            if let Some(row) = weak_enter.upgrade() {
                row.start_scrolling();
            }
        });
        let weak_leave = Rc::downgrade(self);
        motion.connect_leave(move |_| {
            if let Some(row) = weak_leave.upgrade() {
                row.stop_scrolling();
            }
        });
        self.button.add_controller(motion);

        let weak_click = Rc::downgrade(self);
        let on_connect = on_action.clone();
        self.button.connect_clicked(move |_| {
            if let Some(row) = weak_click.upgrade() {
                let state = row.state.borrow().clone();
                if state.is_active || state.is_connecting {
                    debug!(bssid = %row.ap.bssid, "Ignoring click on active or connecting row");
                    return;
                }
                on_connect(RowAction::Connect(row.ap.clone()));
            }
        });

        let secondary = GestureClick::builder()
            .button(gdk::BUTTON_SECONDARY)
            .build();
        let weak_secondary = Rc::downgrade(self);
        secondary.connect_pressed(move |gesture, _, _, _| {
            if let Some(row) = weak_secondary.upgrade() {
                if row.state.borrow().is_active {
                    gesture.set_state(gtk4::EventSequenceState::Claimed);
                    on_action(RowAction::Disconnect);
                }
            }
        });
        self.button.add_controller(secondary);

        let weak_unrealize = Rc::downgrade(self);
        self.button.connect_unrealize(move |_| {
            if let Some(row) = weak_unrealize.upgrade() {
                row.stop_scrolling();
            }
        });
    }

    /// Re-derives everything that depends on live Wi-Fi state.
    pub fn refresh(&self, details: &WifiDetails, connecting: Option<&str>) {
        let new_state = ApRowState::derive(&self.ap, details, connecting);
        if *self.state.borrow() == new_state {
            return;
        }
        *self.state.borrow_mut() = new_state;
        self.apply_state();
    }

    fn apply_state(&self) {
        let state = self.state.borrow();
        self.ui.icon.set_css_classes(&state.icon_classes());
        self.ui.status_label.set_label(state.status_text);
        self.ui.status_revealer.set_reveal_child(state.show_status);
        self.ui.spinner_revealer.set_reveal_child(state.show_spinner);
    }

    fn start_scrolling(self: &Rc<Self>) {
        if !self.scroller.borrow_mut().start() {
            return;
        }
        let weak_self = Rc::downgrade(self);
        let id = glib::timeout_add_local(self.scroll_interval, move || {
            let Some(row) = weak_self.upgrade() else {
                return glib::ControlFlow::Break;
            };
            let text = row.scroller.borrow_mut().tick();
            row.ui.name_label.set_label(&text);
            glib::ControlFlow::Continue
        });
        *self.scroll_source_id.borrow_mut() = Some(id);
    }

    fn stop_scrolling(&self) {
        if let Some(id) = self.scroll_source_id.borrow_mut().take() {
            id.remove();
        }
        let text = self.scroller.borrow_mut().stop();
        self.ui.name_label.set_label(&text);
    }

    pub fn widget(&self) -> &Button {
        &self.button
    }
}

impl Drop for AccessPointRow {
    fn drop(&mut self) {
        if let Some(id) = self.scroll_source_id.borrow_mut().take() {
            id.remove();
        }
    }
}
