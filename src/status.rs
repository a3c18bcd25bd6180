//! Status reporting across an optional display and the fallback LED.
//!
//! Callers hand over the lines they want shown and never branch on
//! whether a panel is attached: a present display gets the text, an absent
//! one turns every render into a single indicator toggle.

use crate::drivers::traits::{DisplayBus, DisplayDriver, StatusIndicator};
use crate::error::Result;
use tracing::{debug, info, warn};

/// Outcome of the one-time display probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayState {
    /// No probe has run yet
    Unprobed,
    /// A display answered and is driven for every render
    Present,
    /// Nothing answered; renders toggle the indicator
    Absent,
}

/// One line of status text and the pixel row it is drawn at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLine {
    pub text: String,
    pub row: i32,
}

impl StatusLine {
    pub fn new(text: impl Into<String>, row: i32) -> Self {
        Self {
            text: text.into(),
            row,
        }
    }
}

enum Sink<D> {
    Unprobed,
    Present { display: D, address: u8 },
    Absent,
}

/// Display status controller owning the panel (if any) and the indicator.
pub struct StatusReporter<D, L> {
    sink: Sink<D>,
    indicator: L,
}

impl<D, L> StatusReporter<D, L>
where
    D: DisplayDriver,
    L: StatusIndicator,
{
    /// Take ownership of the indicator and switch it on until a display shows up.
    pub fn new(mut indicator: L) -> Self {
        indicator.set(true);
        Self {
            sink: Sink::Unprobed,
            indicator,
        }
    }

    /// Scan `bus` and attach to the first device that answers.
    ///
    /// Only the first call probes; later calls return the recorded state.
    pub fn probe<B>(&mut self, mut bus: B) -> DisplayState
    where
        B: DisplayBus<Display = D>,
    {
        if !matches!(self.sink, Sink::Unprobed) {
            return self.state();
        }

        let addresses = bus.scan();
        let Some(&address) = addresses.first() else {
            info!("No I2C display found, status goes to the indicator");
            self.sink = Sink::Absent;
            return DisplayState::Absent;
        };

        match bus.open(address) {
            Ok(display) => {
                info!("I2C display found at {:#04x}", address);
                self.indicator.set(false);
                self.sink = Sink::Present { display, address };
                DisplayState::Present
            }
            Err(e) => {
                warn!("Display at {:#04x} did not initialise: {}", address, e);
                self.sink = Sink::Absent;
                DisplayState::Absent
            }
        }
    }

    /// Record that no display is available without touching any bus.
    pub fn mark_absent(&mut self) -> DisplayState {
        if matches!(self.sink, Sink::Unprobed) {
            self.sink = Sink::Absent;
        }
        self.state()
    }

    pub fn state(&self) -> DisplayState {
        match self.sink {
            Sink::Unprobed => DisplayState::Unprobed,
            Sink::Present { .. } => DisplayState::Present,
            Sink::Absent => DisplayState::Absent,
        }
    }

    /// Bus address of the attached display.
    pub fn display_address(&self) -> Option<u8> {
        match self.sink {
            Sink::Present { address, .. } => Some(address),
            _ => None,
        }
    }

    /// Show `lines`, or toggle the indicator once when there is no display.
    pub fn render(&mut self, lines: &[StatusLine]) {
        let Sink::Present { display, .. } = &mut self.sink else {
            self.indicator.toggle();
            return;
        };

        if let Err(e) = draw(display, lines) {
            warn!("Display render failed, falling back to indicator: {}", e);
            self.indicator.toggle();
        }
    }

    /// Show a single line of text at the top row.
    pub fn message(&mut self, text: &str) {
        debug!(message = text, "status");
        self.render(&[StatusLine::new(text, 0)]);
    }

    pub fn indicator_mut(&mut self) -> &mut L {
        &mut self.indicator
    }
}

fn draw<D: DisplayDriver>(display: &mut D, lines: &[StatusLine]) -> Result<()> {
    display.clear()?;
    for line in lines {
        display.draw_text(&line.text, 0, line.row)?;
    }
    display.flush()
}
