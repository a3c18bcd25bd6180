//! Status LED on a GPIO output pin.
//!
//! Feature-gated so the agent still builds on machines without Raspberry
//! Pi peripherals; there the indicator only logs its transitions.

use crate::drivers::traits::StatusIndicator;
use crate::error::Result;

#[cfg(feature = "rpi")]
mod raspberry_pi {
    use super::*;
    use crate::error::AgentError;
    use rppal::gpio::{Gpio, OutputPin};

    /// LED driven through rppal.
    pub struct RaspberryPiLed {
        pin: OutputPin,
    }

    impl RaspberryPiLed {
        /// Claim BCM pin `pin` as an output, initially low.
        pub fn new(pin: u8) -> Result<Self> {
            let gpio = Gpio::new().map_err(|e| {
                AgentError::gpio_error(format!("Failed to initialize GPIO: {}", e))
            })?;
            let pin = gpio
                .get(pin)
                .map_err(|e| AgentError::gpio_error(format!("Failed to access pin {}: {}", pin, e)))?
                .into_output_low();

            Ok(Self { pin })
        }
    }

    impl StatusIndicator for RaspberryPiLed {
        fn set(&mut self, on: bool) {
            if on {
                self.pin.set_high();
            } else {
                self.pin.set_low();
            }
        }

        fn toggle(&mut self) {
            self.pin.toggle();
        }
    }
}

#[cfg(not(feature = "rpi"))]
mod mock {
    use super::*;

    /// Indicator stand-in for systems without GPIO support.
    #[derive(Debug, Default)]
    pub struct MockLed {
        lit: bool,
    }

    impl MockLed {
        pub fn new(_pin: u8) -> Result<Self> {
            Ok(Self::default())
        }

        pub fn is_lit(&self) -> bool {
            self.lit
        }
    }

    impl StatusIndicator for MockLed {
        fn set(&mut self, on: bool) {
            self.lit = on;
            tracing::trace!(lit = self.lit, "indicator set");
        }

        fn toggle(&mut self) {
            self.lit = !self.lit;
            tracing::trace!(lit = self.lit, "indicator toggled");
        }
    }
}

// Re-export the appropriate indicator
#[cfg(feature = "rpi")]
pub use raspberry_pi::RaspberryPiLed as DefaultIndicator;

#[cfg(not(feature = "rpi"))]
pub use mock::MockLed as DefaultIndicator;
