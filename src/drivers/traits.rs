//! Traits for the hardware and protocol collaborators the agent drives.
//!
//! The agent core only ever talks to these interfaces. Concrete
//! implementations live next door (`gpio`, `display`, `pms5003`, `wifi`,
//! `mqtt`), and tests substitute in-memory fakes.

use crate::error::Result;
use crate::network::{IpConfig, LinkStatus};
use crate::telemetry::SensorSample;

/// Single LED used as the fallback status channel.
pub trait StatusIndicator {
    /// Drive the indicator on or off.
    fn set(&mut self, on: bool);

    /// Invert the current indicator state.
    fn toggle(&mut self);
}

/// A text-capable display panel.
///
/// Drawing goes to an off-screen buffer; nothing becomes visible until
/// [`DisplayDriver::flush`] succeeds.
pub trait DisplayDriver {
    /// Blank the off-screen buffer.
    fn clear(&mut self) -> Result<()>;

    /// Draw `text` with its top-left corner at (`x`, `y`).
    fn draw_text(&mut self, text: &str, x: i32, y: i32) -> Result<()>;

    /// Push the buffer to the panel.
    fn flush(&mut self) -> Result<()>;
}

/// The bus a display may be attached to.
pub trait DisplayBus {
    type Display: DisplayDriver;

    /// Addresses of every device that answered.
    fn scan(&mut self) -> Vec<u8>;

    /// Take over the bus and initialise the display at `address`.
    fn open(self, address: u8) -> Result<Self::Display>;
}

/// Particulate sensor delivering validated samples.
pub trait SensorDriver {
    /// Wait for the next validated sample.
    fn read(&mut self) -> impl std::future::Future<Output = Result<SensorSample>> + Send;
}

/// Station-mode network interface.
pub trait NetworkDriver {
    /// Power up the radio.
    fn activate(&mut self) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Start associating with `ssid`. Returns once the request is issued.
    fn connect(
        &mut self,
        ssid: &str,
        password: &str,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Current link status.
    fn status(&mut self) -> impl std::future::Future<Output = Result<LinkStatus>> + Send;

    /// Address assigned to the interface.
    fn ifconfig(&mut self) -> impl std::future::Future<Output = Result<IpConfig>> + Send;
}

/// Publish/subscribe client.
pub trait MessagingClient {
    /// Establish the broker session.
    fn connect(&mut self) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Hand `payload` to the client for delivery on `topic`.
    fn publish(
        &mut self,
        topic: &str,
        payload: &str,
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

/// Constructors for every collaborator on a given board.
///
/// Each method is called at most once, in startup order.
pub trait Platform {
    type Indicator: StatusIndicator;
    type Bus: DisplayBus;
    type Sensor: SensorDriver;
    type Network: NetworkDriver;
    type Messaging: MessagingClient;

    fn status_indicator(&mut self) -> Result<Self::Indicator>;

    fn display_bus(&mut self) -> Result<Self::Bus>;

    fn sensor(&mut self) -> Result<Self::Sensor>;

    fn network(&mut self) -> Result<Self::Network>;

    fn messaging(&mut self) -> Result<Self::Messaging>;
}

/// Display type produced by a platform's bus.
pub type PlatformDisplay<P> = <<P as Platform>::Bus as DisplayBus>::Display;
