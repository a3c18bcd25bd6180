//! Startup sequencing and the sense/accumulate/publish loop.
//!
//! Startup runs strictly in order:
//! Init → DisplayProbe → SensorInit → NetworkBootstrap → MessagingConnect → Running.
//! Any unrecoverable failure on the way yields a [`Fault`], and so does a
//! failed sensor read once Running. A fault reports itself once and then
//! blinks the indicator forever.

use crate::config::AgentConfig;
use crate::drivers::traits::{
    DisplayDriver, Platform, PlatformDisplay, SensorDriver, StatusIndicator,
};
use crate::error::{AgentError, Result};
use crate::network::{BootstrapFailure, ConnectivityState, NetworkBootstrap};
use crate::status::{DisplayState, StatusLine, StatusReporter};
use crate::telemetry::{
    Channel, SensorSample, SmoothedRecord, SmoothingWindow, TelemetryPublisher,
};
use std::convert::Infallible;
use std::fmt;
use std::time::Duration;
use tracing::{error, info, warn};

/// Pixel height of one text row on the status display.
const ROW_HEIGHT: i32 = 8;

/// Lifecycle phase of the agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Init,
    DisplayProbe,
    SensorInit,
    NetworkBootstrap,
    MessagingConnect,
    Running,
    Fault,
}

/// What drove the agent into its terminal fault state.
#[derive(Debug)]
pub enum FaultCause {
    /// The sensor could not be opened
    SensorInit(AgentError),
    /// Network bring-up failed
    Network(BootstrapFailure),
    /// The broker session could not be established
    Messaging(AgentError),
    /// A cycle failed while Running
    Sampling(AgentError),
}

impl FaultCause {
    /// Text shown on the display when the fault is reported.
    pub fn message(&self) -> &'static str {
        match self {
            FaultCause::SensorInit(_) | FaultCause::Sampling(_) => "Sensor error",
            FaultCause::Network(_) => "Network error",
            FaultCause::Messaging(_) => "MQTT error",
        }
    }

    /// Phase the fault was raised in.
    pub fn phase(&self) -> Phase {
        match self {
            FaultCause::SensorInit(_) => Phase::SensorInit,
            FaultCause::Network(_) => Phase::NetworkBootstrap,
            FaultCause::Messaging(_) => Phase::MessagingConnect,
            FaultCause::Sampling(_) => Phase::Running,
        }
    }
}

impl fmt::Display for FaultCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FaultCause::SensorInit(e) => write!(f, "sensor init failed: {}", e),
            FaultCause::Network(e) => write!(f, "network bootstrap failed: {}", e),
            FaultCause::Messaging(e) => write!(f, "messaging connect failed: {}", e),
            FaultCause::Sampling(e) => write!(f, "sampling failed: {}", e),
        }
    }
}

/// Terminal fault state. Owns the status channels it signals on.
pub struct Fault<D, L> {
    cause: FaultCause,
    reporter: StatusReporter<D, L>,
    blink_interval: Duration,
}

impl<D, L> Fault<D, L>
where
    D: DisplayDriver,
    L: StatusIndicator,
{
    pub fn new(cause: FaultCause, reporter: StatusReporter<D, L>, blink_interval: Duration) -> Self {
        Self {
            cause,
            reporter,
            blink_interval,
        }
    }

    pub fn cause(&self) -> &FaultCause {
        &self.cause
    }

    pub fn display_state(&self) -> DisplayState {
        self.reporter.state()
    }

    /// Report the fault once, then toggle the indicator forever.
    pub async fn signal(mut self) -> Infallible {
        error!(
            phase = ?Phase::Fault,
            raised_in = ?self.cause.phase(),
            "Entering fault state: {}",
            self.cause
        );
        self.reporter.message(self.cause.message());

        let indicator = self.reporter.indicator_mut();
        loop {
            indicator.toggle();
            tokio::time::sleep(self.blink_interval).await;
        }
    }
}

/// Fault type produced while booting or running on platform `P`.
pub type PlatformFault<P> = Fault<PlatformDisplay<P>, <P as Platform>::Indicator>;

/// What happened during one cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    pub sample: SensorSample,
    /// Record produced by this cycle's flush, if the window filled
    pub flushed: Option<SmoothedRecord>,
    /// Samples still needed before the next flush
    pub remaining: usize,
    pub publish_failures: usize,
}

/// Lines shown on the status display for the current state.
pub fn status_lines(latest: Option<&SmoothedRecord>, remaining: usize) -> Vec<StatusLine> {
    let mut lines = Vec::with_capacity(4);
    match latest {
        Some(record) => {
            for (row, channel) in Channel::ALL.iter().enumerate() {
                lines.push(StatusLine::new(
                    format!("{:<7}{:.1}", channel.label(), record.get(*channel)),
                    row as i32 * ROW_HEIGHT,
                ));
            }
        }
        None => lines.push(StatusLine::new("Waiting for data", 0)),
    }
    lines.push(StatusLine::new(format!("Next in {}", remaining), 3 * ROW_HEIGHT));
    lines
}

/// The running agent. Owns every collaborator exclusively.
pub struct Agent<P: Platform> {
    reporter: StatusReporter<PlatformDisplay<P>, P::Indicator>,
    sensor: P::Sensor,
    network: NetworkBootstrap<P::Network>,
    publisher: TelemetryPublisher<P::Messaging>,
    window: SmoothingWindow,
    latest: Option<SmoothedRecord>,
    cycle_interval: Duration,
    blink_interval: Duration,
    cycles: u64,
}

impl<P: Platform> Agent<P> {
    /// Boot on `platform` and run until a fault, which is then signalled forever.
    ///
    /// Only returns if the status indicator itself cannot be acquired.
    pub async fn start(mut platform: P, config: AgentConfig) -> Result<Infallible> {
        info!(phase = ?Phase::Init, "Starting telemetry agent");
        let indicator = platform.status_indicator()?;

        let agent = match Self::boot(&mut platform, indicator, &config).await {
            Ok(agent) => agent,
            Err(fault) => return Ok(fault.signal().await),
        };
        Ok(agent.run().await)
    }

    /// Run the startup sequence up to, but not including, the first cycle.
    pub async fn boot(
        platform: &mut P,
        indicator: P::Indicator,
        config: &AgentConfig,
    ) -> std::result::Result<Self, PlatformFault<P>> {
        let blink_interval = config.fault_blink_interval();
        let mut reporter = StatusReporter::new(indicator);

        info!(phase = ?Phase::DisplayProbe);
        let probed = match platform.display_bus() {
            Ok(bus) => reporter.probe(bus),
            Err(e) => {
                warn!("Display bus unavailable: {}", e);
                reporter.mark_absent()
            }
        };
        info!(display = ?probed, "Display probed");

        reporter.message("Init driver...");
        info!(phase = ?Phase::SensorInit);
        let sensor = match platform.sensor() {
            Ok(sensor) => sensor,
            Err(e) => return Err(Fault::new(FaultCause::SensorInit(e), reporter, blink_interval)),
        };

        reporter.message("Setup network...");
        info!(phase = ?Phase::NetworkBootstrap);
        let driver = match platform.network() {
            Ok(driver) => driver,
            Err(e) => {
                let cause = FaultCause::Network(BootstrapFailure::Driver(e));
                return Err(Fault::new(cause, reporter, blink_interval));
            }
        };
        let mut network = NetworkBootstrap::new(driver, &config.bootstrap);
        if let Err(failure) = network.connect(&config.wifi).await {
            return Err(Fault::new(FaultCause::Network(failure), reporter, blink_interval));
        }

        info!(phase = ?Phase::MessagingConnect, broker = %config.broker_address());
        let client = match platform.messaging() {
            Ok(client) => client,
            Err(e) => return Err(Fault::new(FaultCause::Messaging(e), reporter, blink_interval)),
        };
        let mut publisher = TelemetryPublisher::new(client, &config.mqtt);
        if let Err(e) = publisher.connect().await {
            return Err(Fault::new(FaultCause::Messaging(e), reporter, blink_interval));
        }

        reporter.message("Getting data...");
        info!(
            phase = ?Phase::Running,
            window = config.sampling.window_size,
            "Telemetry loop ready"
        );

        Ok(Self {
            reporter,
            sensor,
            network,
            publisher,
            window: SmoothingWindow::new(config.sampling.window_size),
            latest: None,
            cycle_interval: config.cycle_interval(),
            blink_interval,
            cycles: 0,
        })
    }

    /// Cycle forever at the configured cadence; a failed cycle becomes a fault.
    pub async fn run(mut self) -> Infallible {
        loop {
            match self.run_cycle().await {
                Ok(_) => tokio::time::sleep(self.cycle_interval).await,
                Err(e) => {
                    let fault = Fault::new(FaultCause::Sampling(e), self.reporter, self.blink_interval);
                    return fault.signal().await;
                }
            }
        }
    }

    /// One cycle: read, observe, flush and publish if full, render, heartbeat.
    ///
    /// A read or observe error leaves the window and the last record untouched.
    pub async fn run_cycle(&mut self) -> Result<CycleReport> {
        let sample = self.sensor.read().await?;
        if !sample.is_valid() {
            return Err(AgentError::sensor_error(format!(
                "sample out of range: {:?}",
                sample
            )));
        }
        self.window.observe(sample)?;

        let mut publish_failures = 0;
        let mut flushed = None;
        if self.window.is_window_full() {
            if let Some(record) = self.window.flush() {
                info!(
                    pm1_0 = record.pm1_0,
                    pm2_5 = record.pm2_5,
                    pm10 = record.pm10,
                    "Window flushed"
                );
                self.latest = Some(record);
                flushed = Some(record);
                if let Err(e) = self.publisher.publish_smoothed(&record).await {
                    warn!("Failed to publish smoothed record: {}", e);
                    publish_failures += 1;
                }
            }
        }

        let remaining = self.window.remaining();
        self.reporter
            .render(&status_lines(self.latest.as_ref(), remaining));

        if let Err(e) = self.publisher.publish_heartbeat().await {
            warn!("Failed to publish heartbeat: {}", e);
            publish_failures += 1;
        }

        self.cycles += 1;
        Ok(CycleReport {
            sample,
            flushed,
            remaining,
            publish_failures,
        })
    }

    /// Most recent smoothed record, `None` until the first window fills.
    pub fn latest(&self) -> Option<&SmoothedRecord> {
        self.latest.as_ref()
    }

    pub fn window(&self) -> &SmoothingWindow {
        &self.window
    }

    pub fn connectivity(&self) -> ConnectivityState {
        self.network.state()
    }

    pub fn display_state(&self) -> DisplayState {
        self.reporter.state()
    }

    /// Completed cycles since boot.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn publisher(&self) -> &TelemetryPublisher<P::Messaging> {
        &self.publisher
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_lines_waiting() {
        let lines = status_lines(None, 60);
        assert_eq!(
            lines,
            vec![
                StatusLine::new("Waiting for data", 0),
                StatusLine::new("Next in 60", 24),
            ]
        );
    }

    #[test]
    fn test_status_lines_with_record() {
        let record = SmoothedRecord {
            pm1_0: 2.0,
            pm2_5: 5.04,
            pm10: 8.26,
        };
        let texts: Vec<String> = status_lines(Some(&record), 3)
            .into_iter()
            .map(|l| l.text)
            .collect();
        assert_eq!(texts, vec!["PM1.0  2.0", "PM2.5  5.0", "PM10   8.3", "Next in 3"]);
    }

    #[test]
    fn test_fault_messages() {
        let cause = FaultCause::Network(BootstrapFailure::AttemptsExhausted(5));
        assert_eq!(cause.message(), "Network error");
        assert_eq!(cause.phase(), Phase::NetworkBootstrap);

        let cause = FaultCause::Messaging(AgentError::messaging_error("refused"));
        assert_eq!(cause.message(), "MQTT error");

        let cause = FaultCause::Sampling(AgentError::sensor_error("checksum"));
        assert_eq!(cause.message(), "Sensor error");
        assert!(cause.to_string().contains("checksum"));
    }
}
