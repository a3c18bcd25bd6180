//! The board the agent ships on.

use crate::config::AgentConfig;
use crate::drivers::display::DefaultDisplayBus;
use crate::drivers::gpio::DefaultIndicator;
use crate::drivers::mqtt::MqttClient;
use crate::drivers::pms5003::DefaultSensor;
use crate::drivers::traits::Platform;
use crate::drivers::wifi::NmcliNetwork;
use crate::error::Result;

/// Raspberry Pi with an LED, an optional SSD1306, a PMS5003 on the UART,
/// NetworkManager-managed Wi-Fi and an MQTT broker on the LAN.
///
/// Without the `rpi` feature the indicator only logs, the display bus is
/// empty and the sensor cannot be opened.
#[derive(Debug, Clone)]
pub struct DevicePlatform {
    config: AgentConfig,
}

impl DevicePlatform {
    pub fn new(config: AgentConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }
}

impl Platform for DevicePlatform {
    type Indicator = DefaultIndicator;
    type Bus = DefaultDisplayBus;
    type Sensor = DefaultSensor;
    type Network = NmcliNetwork;
    type Messaging = MqttClient;

    fn status_indicator(&mut self) -> Result<DefaultIndicator> {
        DefaultIndicator::new(self.config.hardware.led_pin)
    }

    fn display_bus(&mut self) -> Result<DefaultDisplayBus> {
        DefaultDisplayBus::new(self.config.hardware.i2c_bus)
    }

    fn sensor(&mut self) -> Result<DefaultSensor> {
        DefaultSensor::new(&self.config.hardware)
    }

    fn network(&mut self) -> Result<NmcliNetwork> {
        Ok(NmcliNetwork::new(self.config.wifi.interface.clone()))
    }

    fn messaging(&mut self) -> Result<MqttClient> {
        MqttClient::new(&self.config.mqtt)
    }
}
