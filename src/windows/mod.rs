mod bar;
mod network;

pub use bar::BarWindow;
pub use network::NetworkWindow;
