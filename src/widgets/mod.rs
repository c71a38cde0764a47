mod access_point;
mod network;

pub use access_point::{AccessPointRow, RowAction};
pub use network::NetworkWidget;
