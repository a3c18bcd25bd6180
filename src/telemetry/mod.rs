//! Particulate telemetry: samples, smoothing and publishing.
//!
//! Raw per-second readings are noisy, so they are collected into a
//! tumbling window and only the per-channel mean of each full window is
//! published as data. A constant heartbeat goes out every cycle regardless.

pub mod data;
pub mod publisher;
pub mod smoothing;

// Re-export commonly used items
pub use data::{Channel, SensorSample, SmoothedRecord};
pub use publisher::{TelemetryPublisher, HEARTBEAT_PAYLOAD};
pub use smoothing::SmoothingWindow;
