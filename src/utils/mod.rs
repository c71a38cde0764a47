pub mod ap_state;
pub mod config;
pub mod connect_flow;
pub mod icons;
pub mod logging;
pub mod network;
pub mod network_actor;
pub mod scroller;
mod style;
pub mod wifi_state;

pub use config::{read_config, BarConfig, ModuleType};
pub use network::{NetworkCommand, NetworkResult};
pub use network_actor::spawn_network_actor;
pub use style::apply_css;
