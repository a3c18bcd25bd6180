//! Data structures for particulate readings.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the three particle-size channels reported by the sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Channel {
    /// Particles up to 1.0 µm
    Pm1_0,
    /// Particles up to 2.5 µm
    Pm2_5,
    /// Particles up to 10 µm
    Pm10,
}

impl Channel {
    /// All channels, in display and payload order.
    pub const ALL: [Channel; 3] = [Channel::Pm1_0, Channel::Pm2_5, Channel::Pm10];

    /// Field name used in published payloads.
    pub fn name(self) -> &'static str {
        match self {
            Channel::Pm1_0 => "pm1_0",
            Channel::Pm2_5 => "pm2_5",
            Channel::Pm10 => "pm10",
        }
    }

    /// Short label used on the status display.
    pub fn label(self) -> &'static str {
        match self {
            Channel::Pm1_0 => "PM1.0",
            Channel::Pm2_5 => "PM2.5",
            Channel::Pm10 => "PM10",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One validated reading, concentrations in µg/m³.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorSample {
    pub pm1_0: f64,
    pub pm2_5: f64,
    pub pm10: f64,
}

impl SensorSample {
    pub fn new(pm1_0: f64, pm2_5: f64, pm10: f64) -> Self {
        Self { pm1_0, pm2_5, pm10 }
    }

    /// Value of a single channel.
    pub fn get(&self, channel: Channel) -> f64 {
        match channel {
            Channel::Pm1_0 => self.pm1_0,
            Channel::Pm2_5 => self.pm2_5,
            Channel::Pm10 => self.pm10,
        }
    }

    /// Concentrations must be finite and non-negative.
    pub fn is_valid(&self) -> bool {
        Channel::ALL
            .iter()
            .all(|&c| self.get(c).is_finite() && self.get(c) >= 0.0)
    }
}

/// Per-channel mean over one full smoothing window.
///
/// Serializes to the payload downstream consumers rely on:
/// `{"pm1_0": .., "pm2_5": .., "pm10": ..}`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SmoothedRecord {
    pub pm1_0: f64,
    pub pm2_5: f64,
    pub pm10: f64,
}

impl SmoothedRecord {
    /// Mean of a single channel.
    pub fn get(&self, channel: Channel) -> f64 {
        match channel {
            Channel::Pm1_0 => self.pm1_0,
            Channel::Pm2_5 => self.pm2_5,
            Channel::Pm10 => self.pm10,
        }
    }

    /// JSON payload for the data topic.
    pub fn to_payload(&self) -> crate::Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
