//! Agent configuration.
//!
//! Everything here is a static startup parameter: credentials, broker
//! location, topics, window size and pin/bus assignments are fixed for the
//! lifetime of the process.

use crate::error::{AgentError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Wireless station credentials and interface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WifiConfig {
    /// Network name to associate with
    pub ssid: String,
    /// Pre-shared key; never written out when the config is serialized
    #[serde(skip_serializing, default)]
    pub password: String,
    /// Network interface the station runs on
    pub interface: String,
}

/// Broker connection and topic layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MqttConfig {
    pub client_id: String,
    pub host: String,
    pub port: u16,
    pub keep_alive_secs: u64,
    /// Upper bound on waiting for the broker's CONNACK
    pub connect_timeout_secs: u64,
    /// Topic receiving one smoothed record per window
    pub data_topic: String,
    /// Topic receiving the liveness marker every cycle
    pub heartbeat_topic: String,
}

/// Sampling cadence and smoothing window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SamplingConfig {
    /// Number of samples averaged into one smoothed record
    pub window_size: usize,
    /// Fixed sleep at the end of every cycle
    pub cycle_interval_ms: u64,
}

/// Network bring-up limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BootstrapConfig {
    /// Status polls before the bring-up is declared failed
    pub max_attempts: u32,
    pub poll_interval_ms: u64,
}

/// Pin and bus assignments (BCM numbering).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HardwareConfig {
    pub i2c_bus: u8,
    pub uart_path: String,
    pub baud_rate: u32,
    pub led_pin: u8,
    pub sensor_enable_pin: u8,
    pub sensor_reset_pin: u8,
}

/// Complete agent configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    pub wifi: WifiConfig,
    pub mqtt: MqttConfig,
    pub sampling: SamplingConfig,
    pub bootstrap: BootstrapConfig,
    pub hardware: HardwareConfig,
    /// Indicator toggle period once the agent is in its terminal fault state
    pub fault_blink_ms: u64,
}

impl Default for WifiConfig {
    fn default() -> Self {
        Self {
            ssid: String::new(),
            password: String::new(),
            interface: "wlan0".to_string(),
        }
    }
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            client_id: "pms5003".to_string(),
            host: "raspberrypi".to_string(),
            port: 1883,
            keep_alive_secs: 30,
            connect_timeout_secs: 10,
            data_topic: crate::DATA_TOPIC.to_string(),
            heartbeat_topic: crate::HEARTBEAT_TOPIC.to_string(),
        }
    }
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            window_size: crate::DEFAULT_WINDOW_SIZE,
            cycle_interval_ms: crate::DEFAULT_CYCLE_INTERVAL_MS,
        }
    }
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            max_attempts: crate::DEFAULT_MAX_ATTEMPTS,
            poll_interval_ms: 1000,
        }
    }
}

impl Default for HardwareConfig {
    fn default() -> Self {
        Self {
            i2c_bus: 1,
            uart_path: "/dev/serial0".to_string(),
            baud_rate: 9600,
            led_pin: 17,
            sensor_enable_pin: 16,
            sensor_reset_pin: 19,
        }
    }
}

impl BootstrapConfig {
    /// Sleep between two link status polls.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            wifi: WifiConfig::default(),
            mqtt: MqttConfig::default(),
            sampling: SamplingConfig::default(),
            bootstrap: BootstrapConfig::default(),
            hardware: HardwareConfig::default(),
            fault_blink_ms: 250,
        }
    }
}

impl AgentConfig {
    /// Create a configuration with the given station credentials and defaults elsewhere.
    pub fn new(ssid: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            wifi: WifiConfig {
                ssid: ssid.into(),
                password: password.into(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Set the broker host and port.
    pub fn with_broker(mut self, host: impl Into<String>, port: u16) -> Self {
        self.mqtt.host = host.into();
        self.mqtt.port = port;
        self
    }

    /// Set the number of samples per smoothed record.
    pub fn with_window_size(mut self, window_size: usize) -> Self {
        self.sampling.window_size = window_size;
        self
    }

    /// Set the end-of-cycle sleep.
    pub fn with_cycle_interval_ms(mut self, interval_ms: u64) -> Self {
        self.sampling.cycle_interval_ms = interval_ms;
        self
    }

    /// Set the network status poll cap.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.bootstrap.max_attempts = max_attempts;
        self
    }

    /// Set the network interface.
    pub fn with_interface(mut self, interface: impl Into<String>) -> Self {
        self.wifi.interface = interface.into();
        self
    }

    /// Set the hardware pin and bus layout.
    pub fn with_hardware(mut self, hardware: HardwareConfig) -> Self {
        self.hardware = hardware;
        self
    }

    pub fn cycle_interval(&self) -> Duration {
        Duration::from_millis(self.sampling.cycle_interval_ms)
    }

    pub fn fault_blink_interval(&self) -> Duration {
        Duration::from_millis(self.fault_blink_ms)
    }

    /// Broker address as `host:port`, for logging.
    pub fn broker_address(&self) -> String {
        format!("{}:{}", self.mqtt.host, self.mqtt.port)
    }

    /// Reject configurations the agent cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.wifi.ssid.trim().is_empty() {
            return Err(AgentError::config_error("SSID must not be empty"));
        }
        if self.sampling.window_size == 0 {
            return Err(AgentError::config_error("window size must be at least 1"));
        }
        if self.sampling.cycle_interval_ms == 0 {
            return Err(AgentError::config_error("cycle interval must be non-zero"));
        }
        if self.bootstrap.max_attempts == 0 {
            return Err(AgentError::config_error(
                "network bootstrap needs at least one attempt",
            ));
        }
        if self.mqtt.data_topic.is_empty() || self.mqtt.heartbeat_topic.is_empty() {
            return Err(AgentError::config_error("MQTT topics must not be empty"));
        }
        Ok(())
    }
}
