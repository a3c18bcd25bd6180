//! # PMS5003 Telemetry Agent
//!
//! Reads particulate concentrations from a PMS5003 sensor on a Raspberry Pi,
//! smooths them over a tumbling window and publishes the result over MQTT.
//!
//! ## Features
//!
//! - **Windowed smoothing**: one mean record per channel for every full window
//! - **MQTT publishing**: smoothed JSON records plus a per-cycle heartbeat
//! - **Status reporting**: SSD1306 display when present, LED fallback otherwise
//! - **Bounded network bring-up**: gives up after a fixed number of polls
//! - **Terminal fault state**: unrecoverable errors end in a blinking LED
//!
//! Peripheral access is feature-gated behind `rpi`; without it the crate
//! builds on any host with stand-in drivers.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pms_telemetry::{Agent, AgentConfig, DevicePlatform};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AgentConfig::new("my-ssid", "my-password").with_broker("raspberrypi", 1883);
//!     config.validate()?;
//!
//!     // Only returns if the status LED cannot be claimed
//!     Agent::start(DevicePlatform::new(config.clone()), config).await?;
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod config;
pub mod drivers;
pub mod error;
pub mod network;
pub mod status;
pub mod telemetry;

// Re-export public API
pub use agent::{status_lines, Agent, CycleReport, Fault, FaultCause, Phase};
pub use config::{
    AgentConfig, BootstrapConfig, HardwareConfig, MqttConfig, SamplingConfig, WifiConfig,
};
pub use drivers::{DevicePlatform, Platform};
pub use error::{AgentError, Result};
pub use network::{BootstrapFailure, ConnectivityState, IpConfig, LinkStatus, NetworkBootstrap};
pub use status::{DisplayState, StatusLine, StatusReporter};
pub use telemetry::{
    Channel, SensorSample, SmoothedRecord, SmoothingWindow, TelemetryPublisher, HEARTBEAT_PAYLOAD,
};

/// Topic receiving smoothed records
pub const DATA_TOPIC: &str = "home/living_room/pms5003_json_smooth";

/// Topic receiving the per-cycle heartbeat
pub const HEARTBEAT_TOPIC: &str = "home/living_room/pms5003/heartbeat";

/// Samples per smoothing window
pub const DEFAULT_WINDOW_SIZE: usize = 60;

/// Sleep between cycles in milliseconds
pub const DEFAULT_CYCLE_INTERVAL_MS: u64 = 1000;

/// Network status polls before bring-up is abandoned
pub const DEFAULT_MAX_ATTEMPTS: u32 = 100;
