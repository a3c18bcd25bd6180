//! PMS5003 particulate sensor on a UART.
//!
//! In active mode the sensor streams one 32-byte frame roughly every second:
//!
//! ```text
//! 0x42 0x4D | len (u16 BE, always 28) | 13 data words (u16 BE) | checksum (u16 BE)
//! ```
//!
//! The checksum is the sum of the first 30 bytes. Data words 1..=3 are the
//! "standard particle" PM1.0, PM2.5 and PM10 concentrations in µg/m³.

use crate::drivers::traits::SensorDriver;
use crate::error::{AgentError, Result};
use crate::telemetry::SensorSample;

/// Length of one frame on the wire.
pub const FRAME_LEN: usize = 32;

const START: [u8; 2] = [0x42, 0x4D];
const BODY_LEN: u16 = 28;
const CHECKSUM_OFFSET: usize = 30;

fn word(frame: &[u8; FRAME_LEN], offset: usize) -> u16 {
    u16::from_be_bytes([frame[offset], frame[offset + 1]])
}

/// Validate a raw frame and extract the three concentration channels.
pub fn decode_frame(frame: &[u8; FRAME_LEN]) -> Result<SensorSample> {
    if frame[..2] != START {
        return Err(AgentError::sensor_error(format!(
            "bad start bytes {:02x} {:02x}",
            frame[0], frame[1]
        )));
    }

    let length = word(frame, 2);
    if length != BODY_LEN {
        return Err(AgentError::sensor_error(format!(
            "bad frame length {} (expected {})",
            length, BODY_LEN
        )));
    }

    let expected = word(frame, CHECKSUM_OFFSET);
    let actual: u16 = frame[..CHECKSUM_OFFSET].iter().map(|&b| u16::from(b)).sum();
    if actual != expected {
        return Err(AgentError::sensor_error(format!(
            "checksum mismatch: computed {:#06x}, frame says {:#06x}",
            actual, expected
        )));
    }

    Ok(SensorSample::new(
        f64::from(word(frame, 4)),
        f64::from(word(frame, 6)),
        f64::from(word(frame, 8)),
    ))
}

#[cfg(feature = "rpi")]
mod raspberry_pi {
    use super::*;
    use crate::config::HardwareConfig;
    use rppal::gpio::{Gpio, OutputPin};
    use rppal::uart::{Parity, Uart};
    use std::time::Duration;

    const READ_TIMEOUT: Duration = Duration::from_secs(3);
    const RESET_PULSE: Duration = Duration::from_millis(100);
    // More than two frames of garbage means we are not looking at a PMS5003
    const MAX_SYNC_BYTES: usize = 2 * FRAME_LEN;

    /// PMS5003 in active mode, wired to a UART plus enable and reset pins.
    pub struct Pms5003 {
        uart: Uart,
        // Held so the pins keep their levels for the life of the driver
        _enable: OutputPin,
        _reset: OutputPin,
    }

    impl Pms5003 {
        pub fn new(hardware: &HardwareConfig) -> Result<Self> {
            let gpio = Gpio::new().map_err(|e| {
                AgentError::gpio_error(format!("Failed to initialize GPIO: {}", e))
            })?;
            let claim = |pin: u8| {
                gpio.get(pin).map(|p| p.into_output_high()).map_err(|e| {
                    AgentError::gpio_error(format!("Failed to access pin {}: {}", pin, e))
                })
            };
            let enable = claim(hardware.sensor_enable_pin)?;
            let mut reset = claim(hardware.sensor_reset_pin)?;
            reset.set_low();
            std::thread::sleep(RESET_PULSE);
            reset.set_high();

            let mut uart = Uart::with_path(&hardware.uart_path, hardware.baud_rate, Parity::None, 8, 1)
                .map_err(|e| {
                    AgentError::sensor_error(format!("Failed to open {}: {}", hardware.uart_path, e))
                })?;
            uart.set_read_mode(0, READ_TIMEOUT)
                .map_err(|e| AgentError::sensor_error(format!("Failed to configure UART: {}", e)))?;

            tracing::info!(
                uart = %hardware.uart_path,
                baud = hardware.baud_rate,
                "PMS5003 driver initialized"
            );
            Ok(Self {
                uart,
                _enable: enable,
                _reset: reset,
            })
        }

        fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
            let mut filled = 0;
            while filled < buf.len() {
                let n = self
                    .uart
                    .read(&mut buf[filled..])
                    .map_err(|e| AgentError::sensor_error(format!("UART read failed: {}", e)))?;
                if n == 0 {
                    return Err(AgentError::sensor_error("timed out waiting for PMS5003 frame"));
                }
                filled += n;
            }
            Ok(())
        }

        fn read_frame(&mut self) -> Result<[u8; FRAME_LEN]> {
            let mut frame = [0u8; FRAME_LEN];
            let mut skipped = 0;

            loop {
                self.read_exact(&mut frame[..1])?;
                if frame[0] == START[0] {
                    self.read_exact(&mut frame[1..2])?;
                    if frame[1] == START[1] {
                        break;
                    }
                }
                skipped += 1;
                if skipped > MAX_SYNC_BYTES {
                    return Err(AgentError::sensor_error("no PMS5003 frame start on UART"));
                }
            }

            self.read_exact(&mut frame[2..])?;
            Ok(frame)
        }
    }

    impl SensorDriver for Pms5003 {
        async fn read(&mut self) -> Result<SensorSample> {
            let frame = tokio::task::block_in_place(|| self.read_frame())?;
            decode_frame(&frame)
        }
    }
}

#[cfg(not(feature = "rpi"))]
mod host {
    use super::*;
    use crate::config::HardwareConfig;

    /// Sensor type for hosts without a UART driver. Never constructed.
    #[derive(Debug)]
    pub enum NoSensor {}

    impl NoSensor {
        pub fn new(hardware: &HardwareConfig) -> Result<Self> {
            Err(AgentError::sensor_error(format!(
                "PMS5003 on {} needs the `rpi` feature",
                hardware.uart_path
            )))
        }
    }

    impl SensorDriver for NoSensor {
        async fn read(&mut self) -> Result<SensorSample> {
            match *self {}
        }
    }
}

// Re-export the appropriate sensor driver
#[cfg(feature = "rpi")]
pub use raspberry_pi::Pms5003 as DefaultSensor;

#[cfg(not(feature = "rpi"))]
pub use host::NoSensor as DefaultSensor;
