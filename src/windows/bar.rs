use crate::utils::{BarConfig, ModuleType, NetworkCommand, NetworkResult};
use crate::widgets::NetworkWidget;
use crate::windows::NetworkWindow;
use gtk4::prelude::*;
use gtk4::{glib, Application, ApplicationWindow, Box as GtkBox, Orientation};
use gtk4_layer_shell::{Edge, KeyboardMode, Layer, LayerShell};
use std::rc::Rc;
use tokio::sync::mpsc;
use tracing::{debug, info};

pub struct BarWindow {
    window: ApplicationWindow,
    _network: Option<(Rc<NetworkWidget>, Rc<NetworkWindow>)>,
}

impl BarWindow {
    pub fn new(
        app: &Application,
        config: &BarConfig,
        command_sender: mpsc::Sender<NetworkCommand>,
        results: mpsc::Receiver<NetworkResult>,
    ) -> Self {
        let window = ApplicationWindow::builder().application(app).build();
        window.add_css_class("Bar");
        window.init_layer_shell();
        window.set_layer(Layer::Top);
        window.auto_exclusive_zone_enable();
        window.set_anchor(Edge::Top, true);
        window.set_anchor(Edge::Left, true);
        window.set_anchor(Edge::Right, true);
        window.set_keyboard_mode(KeyboardMode::None);

        let container = GtkBox::new(Orientation::Horizontal, 0);
        let left_box = GtkBox::new(Orientation::Horizontal, 6);
        left_box.set_halign(gtk4::Align::Start);
        left_box.add_css_class("left-box");
        let center_box = GtkBox::new(Orientation::Horizontal, 6);
        center_box.set_halign(gtk4::Align::Center);
        center_box.set_hexpand(true);
        center_box.add_css_class("center-box");
        let right_box = GtkBox::new(Orientation::Horizontal, 6);
        right_box.set_halign(gtk4::Align::End);
        right_box.add_css_class("right-box");

        let mut network_instance: Option<(Rc<NetworkWidget>, Rc<NetworkWindow>)> = None;
        let window_weak = window.downgrade();

        let mut add_module = |m: &ModuleType, target: &GtkBox| match m {
            ModuleType::Network => {
                if network_instance.is_some() {
                    debug!("Network module listed more than once; keeping the first");
                    return;
                }
                let widget = Rc::new(NetworkWidget::new());
                let menu = NetworkWindow::new(&config.network, command_sender.clone());
                let button = widget.widget();

                let popover = menu.popover().clone();
                popover.set_parent(button);

                // The password entry needs keyboard focus while the menu is open.
                let window_weak_show = window_weak.clone();
                popover.connect_show(move |_| {
                    if let Some(window) = window_weak_show.upgrade() {
                        window.set_keyboard_mode(KeyboardMode::OnDemand);
                    }
                });
                let window_weak_closed = window_weak.clone();
                popover.connect_closed(move |_| {
                    if let Some(window) = window_weak_closed.upgrade() {
                        window.set_keyboard_mode(KeyboardMode::None);
                    }
                });

                button.connect_clicked(move |button| {
                    popover.set_pointing_to(Some(&button.allocation()));
                    popover.popup();
                });

                target.append(button);
                network_instance = Some((widget, menu));
            }
        };

        for m in &config.modules_left {
            add_module(m, &left_box);
        }
        for m in &config.modules_center {
            add_module(m, &center_box);
        }
        for m in &config.modules_right {
            add_module(m, &right_box);
        }

        container.append(&left_box);
        container.append(&center_box);
        container.append(&right_box);
        window.set_child(Some(&container));

        match &network_instance {
            Some((widget, menu)) => {
                spawn_result_dispatcher(results, widget.clone(), menu.clone());
                glib::MainContext::default().spawn_local(async move {
                    let _ = command_sender.send(NetworkCommand::GetDetails).await;
                });
            }
            None => info!("Network module not configured; results are dropped"),
        }

        BarWindow {
            window,
            _network: network_instance,
        }
    }

    pub fn present(&self) {
        self.window.present();
    }
}

/// Drains actor results on the main context and routes them to the widgets.
fn spawn_result_dispatcher(
    mut results: mpsc::Receiver<NetworkResult>,
    widget: Rc<NetworkWidget>,
    menu: Rc<NetworkWindow>,
) {
    let widget = Rc::downgrade(&widget);
    let menu = Rc::downgrade(&menu);
    glib::MainContext::default().spawn_local(async move {
        while let Some(result) = results.recv().await {
            let (Some(widget), Some(menu)) = (widget.upgrade(), menu.upgrade()) else {
                break;
            };
            match result {
                NetworkResult::Details(details) => {
                    widget.update(&details);
                    menu.update_state(details);
                }
                NetworkResult::AccessPoints(aps) => menu.update_ap_list(aps),
                NetworkResult::ScanRequested(res) => menu.handle_scan_result(res),
                NetworkResult::WifiSet(res) => menu.handle_wifi_set_result(res),
                NetworkResult::Connected { bssid, result } => {
                    menu.handle_connect_result(&bssid, result)
                }
                NetworkResult::Disconnected(res) => menu.handle_disconnect_result(res),
            }
        }
        debug!("Network result dispatcher stopped");
    });
}
