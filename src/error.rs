//! Error handling for the telemetry agent.

/// A specialized `Result` type for agent operations.
pub type Result<T> = std::result::Result<T, AgentError>;

/// The main error type for the telemetry agent.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Particulate sensor could not be opened or delivered a bad frame
    #[error("Sensor error: {0}")]
    Sensor(String),

    /// Display bus or panel operation failed
    #[error("Display error: {0}")]
    Display(String),

    /// Network driver operation failed
    #[error("Network error: {0}")]
    Network(String),

    /// Messaging client operation failed
    #[error("Messaging error: {0}")]
    Messaging(String),

    /// GPIO, I2C or UART access failed (only available with rpi feature)
    #[cfg(feature = "rpi")]
    #[error("GPIO error: {0}")]
    Gpio(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// A sample was observed into a window that was full and not yet flushed
    #[error("Smoothing window already holds {0} samples")]
    WindowOverflow(usize),

    /// Payload serialization failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl AgentError {
    /// Create a new sensor error
    pub fn sensor_error(msg: impl Into<String>) -> Self {
        Self::Sensor(msg.into())
    }

    /// Create a new display error
    pub fn display_error(msg: impl Into<String>) -> Self {
        Self::Display(msg.into())
    }

    /// Create a new network error
    pub fn network_error(msg: impl Into<String>) -> Self {
        Self::Network(msg.into())
    }

    /// Create a new messaging error
    pub fn messaging_error(msg: impl Into<String>) -> Self {
        Self::Messaging(msg.into())
    }

    /// Create a new GPIO error
    #[cfg(feature = "rpi")]
    pub fn gpio_error(msg: impl Into<String>) -> Self {
        Self::Gpio(msg.into())
    }

    /// Create a new configuration error
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
