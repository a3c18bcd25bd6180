//! I2C display bus and SSD1306 status panel.

use crate::drivers::traits::{DisplayBus, DisplayDriver};
use crate::error::{AgentError, Result};

#[cfg(feature = "rpi")]
mod raspberry_pi {
    use super::*;
    use embedded_graphics::{
        mono_font::{ascii::FONT_5X8, MonoTextStyle},
        pixelcolor::BinaryColor,
        prelude::*,
        text::{Baseline, Text},
    };
    use rppal::i2c::I2c;
    use ssd1306::{mode::BufferedGraphicsMode, prelude::*, I2CDisplayInterface, Ssd1306};

    // 7-bit addresses outside the reserved ranges
    const FIRST_ADDRESS: u16 = 0x08;
    const LAST_ADDRESS: u16 = 0x77;

    type Panel = Ssd1306<I2CInterface<I2c>, DisplaySize128x32, BufferedGraphicsMode<DisplaySize128x32>>;

    /// Hardware I2C bus opened through rppal.
    pub struct RaspberryPiI2cBus {
        i2c: I2c,
    }

    impl RaspberryPiI2cBus {
        pub fn new(bus: u8) -> Result<Self> {
            let i2c = I2c::with_bus(bus).map_err(|e| {
                AgentError::gpio_error(format!("Failed to open I2C bus {}: {}", bus, e))
            })?;
            tracing::debug!(bus, clock_hz = ?i2c.clock_speed().ok(), "I2C bus opened");
            Ok(Self { i2c })
        }
    }

    impl DisplayBus for RaspberryPiI2cBus {
        type Display = Ssd1306Display;

        fn scan(&mut self) -> Vec<u8> {
            let mut probe = [0u8; 1];
            (FIRST_ADDRESS..=LAST_ADDRESS)
                .filter(|&address| {
                    self.i2c.set_slave_address(address).is_ok() && self.i2c.read(&mut probe).is_ok()
                })
                .map(|address| address as u8)
                .collect()
        }

        fn open(self, address: u8) -> Result<Ssd1306Display> {
            let interface = I2CDisplayInterface::new_custom_address(self.i2c, address);
            let mut panel = Ssd1306::new(interface, DisplaySize128x32, DisplayRotation::Rotate0)
                .into_buffered_graphics_mode();
            panel.init().map_err(|e| {
                AgentError::display_error(format!(
                    "Failed to initialize SSD1306 at {:#04x}: {:?}",
                    address, e
                ))
            })?;

            Ok(Ssd1306Display {
                panel,
                style: MonoTextStyle::new(&FONT_5X8, BinaryColor::On),
            })
        }
    }

    /// 128x32 SSD1306 in buffered mode; nothing shows until `flush`.
    pub struct Ssd1306Display {
        panel: Panel,
        style: MonoTextStyle<'static, BinaryColor>,
    }

    impl DisplayDriver for Ssd1306Display {
        fn clear(&mut self) -> Result<()> {
            self.panel.clear_buffer();
            Ok(())
        }

        fn draw_text(&mut self, text: &str, x: i32, y: i32) -> Result<()> {
            Text::with_baseline(text, Point::new(x, y), self.style, Baseline::Top)
                .draw(&mut self.panel)
                .map_err(|e| AgentError::display_error(format!("Failed to draw text: {:?}", e)))?;
            Ok(())
        }

        fn flush(&mut self) -> Result<()> {
            self.panel
                .flush()
                .map_err(|e| AgentError::display_error(format!("Failed to flush display: {:?}", e)))
        }
    }
}

#[cfg(not(feature = "rpi"))]
mod host {
    use super::*;

    /// Display type for hosts without a display bus. Never constructed.
    #[derive(Debug)]
    pub enum NoDisplay {}

    impl DisplayDriver for NoDisplay {
        fn clear(&mut self) -> Result<()> {
            match *self {}
        }

        fn draw_text(&mut self, _text: &str, _x: i32, _y: i32) -> Result<()> {
            match *self {}
        }

        fn flush(&mut self) -> Result<()> {
            match *self {}
        }
    }

    /// Bus on which nothing ever answers.
    #[derive(Debug, Default)]
    pub struct HostDisplayBus;

    impl HostDisplayBus {
        pub fn new(_bus: u8) -> Result<Self> {
            Ok(Self)
        }
    }

    impl DisplayBus for HostDisplayBus {
        type Display = NoDisplay;

        fn scan(&mut self) -> Vec<u8> {
            Vec::new()
        }

        fn open(self, address: u8) -> Result<NoDisplay> {
            Err(AgentError::display_error(format!(
                "no display support compiled in (requested {:#04x})",
                address
            )))
        }
    }
}

// Re-export the appropriate display bus
#[cfg(feature = "rpi")]
pub use raspberry_pi::{RaspberryPiI2cBus as DefaultDisplayBus, Ssd1306Display};

#[cfg(not(feature = "rpi"))]
pub use host::{HostDisplayBus as DefaultDisplayBus, NoDisplay};
