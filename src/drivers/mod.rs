//! Hardware and protocol drivers.
//!
//! Peripheral drivers come in two flavours selected by the `rpi` feature:
//! the real rppal-backed implementation and a host stand-in that lets the
//! crate build and test anywhere.

pub mod display;
pub mod gpio;
pub mod mqtt;
pub mod platform;
pub mod pms5003;
pub mod traits;
pub mod wifi;

pub use mqtt::MqttClient;
pub use platform::DevicePlatform;
pub use pms5003::decode_frame;
pub use traits::{
    DisplayBus, DisplayDriver, MessagingClient, NetworkDriver, Platform, SensorDriver,
    StatusIndicator,
};
pub use wifi::NmcliNetwork;
