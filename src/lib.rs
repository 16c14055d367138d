pub mod api;
pub use api::Client;

pub mod decode;
pub use decode::devices::DeviceFilter;

mod error;
pub use error::*;

pub mod html;

pub mod logger;

pub mod model;
