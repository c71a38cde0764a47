mod utils;
mod widgets;
mod windows;

use gio::ApplicationFlags;
use gtk4::prelude::*;
use std::{cell::RefCell, rc::Rc};
use tracing::{error, info};
use utils::{apply_css, logging, read_config, spawn_network_actor};
use windows::BarWindow;

const APP_ID: &str = "com.github.linuxmobile.kaneru-network";

fn main() -> glib::ExitCode {
    let loaded = read_config();
    logging::init(loaded.log_level());
    let config = loaded.into_config();

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .thread_name("kaneru-network")
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            error!("Failed to build tokio runtime: {}", e);
            return glib::ExitCode::FAILURE;
        }
    };
    let _guard = runtime.enter();

    let (command_tx, result_rx) = spawn_network_actor(&runtime, &config.network);
    let channels = Rc::new(RefCell::new(Some((command_tx, result_rx))));

    let app = gtk4::Application::builder()
        .application_id(APP_ID)
        .flags(ApplicationFlags::default())
        .build();

    let font = config.font.clone();
    app.connect_startup(move |_| {
        apply_css(font.as_deref());
        info!("CSS applied");
    });

    // Holding the bar keeps its widgets and dispatcher alive for the app's lifetime.
    let bar_slot: Rc<RefCell<Option<BarWindow>>> = Rc::new(RefCell::new(None));
    app.connect_activate(move |app| {
        if let Some(bar) = bar_slot.borrow().as_ref() {
            bar.present();
            return;
        }
        let Some((command_tx, result_rx)) = channels.borrow_mut().take() else {
            return;
        };
        let bar = BarWindow::new(app, &config, command_tx, result_rx);
        bar.present();
        info!("Bar presented");
        *bar_slot.borrow_mut() = Some(bar);
    });

    app.run()
}
