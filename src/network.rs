//! Bounded-retry network bring-up.
//!
//! The bootstrap polls the network driver once per interval until the link
//! is associated and addressed. It gives up after `max_attempts` polls or
//! on the first definitive error status. `Failed` is terminal: a bootstrap
//! that failed refuses to run again.

use crate::config::{BootstrapConfig, WifiConfig};
use crate::drivers::traits::NetworkDriver;
use crate::error::AgentError;
use std::fmt;
use std::net::Ipv4Addr;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Connectivity as tracked by the bootstrap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityState {
    Disconnected,
    Connecting,
    Connected,
    /// Terminal; the agent never resumes from here
    Failed,
}

/// Link status reported by the network driver.
///
/// Integer codes follow the common station-mode convention: non-negative
/// codes are progress, negative codes are definitive failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkStatus {
    Idle,
    Joining,
    /// Associated but no address yet
    NoAddress,
    /// Associated and addressed
    Up,
    JoinFailed,
    NoAccessPoint,
    BadCredentials,
}

impl LinkStatus {
    pub fn code(self) -> i32 {
        match self {
            LinkStatus::Idle => 0,
            LinkStatus::Joining => 1,
            LinkStatus::NoAddress => 2,
            LinkStatus::Up => 3,
            LinkStatus::JoinFailed => -1,
            LinkStatus::NoAccessPoint => -2,
            LinkStatus::BadCredentials => -3,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(LinkStatus::Idle),
            1 => Some(LinkStatus::Joining),
            2 => Some(LinkStatus::NoAddress),
            3 => Some(LinkStatus::Up),
            -1 => Some(LinkStatus::JoinFailed),
            -2 => Some(LinkStatus::NoAccessPoint),
            -3 => Some(LinkStatus::BadCredentials),
            _ => None,
        }
    }

    pub fn is_up(self) -> bool {
        self == LinkStatus::Up
    }

    /// Whether the driver has given up on this association.
    pub fn is_failure(self) -> bool {
        self.code() < 0
    }
}

/// IPv4 address information of a connected interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IpConfig {
    pub address: Ipv4Addr,
    pub prefix_len: u8,
}

impl fmt::Display for IpConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.address, self.prefix_len)
    }
}

/// Why the bring-up ended in `Failed`.
#[derive(Debug, thiserror::Error)]
pub enum BootstrapFailure {
    #[error("network driver failed: {0}")]
    Driver(#[source] AgentError),

    #[error("link reported failure status {0:?}")]
    Link(LinkStatus),

    #[error("not connected after {0} attempts")]
    AttemptsExhausted(u32),

    #[error("bootstrap already failed")]
    AlreadyFailed,
}

/// Drives a [`NetworkDriver`] from power-up to an addressed link.
pub struct NetworkBootstrap<N> {
    driver: N,
    state: ConnectivityState,
    attempts: u32,
    max_attempts: u32,
    poll_interval: Duration,
}

impl<N: NetworkDriver> NetworkBootstrap<N> {
    pub fn new(driver: N, config: &BootstrapConfig) -> Self {
        Self {
            driver,
            state: ConnectivityState::Disconnected,
            attempts: 0,
            max_attempts: config.max_attempts.max(1),
            poll_interval: config.poll_interval(),
        }
    }

    pub fn state(&self) -> ConnectivityState {
        self.state
    }

    /// Status polls issued by the last bring-up.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Bring the link up with the given credentials.
    ///
    /// On success the address is returned when the driver can report it.
    pub async fn connect(
        &mut self,
        wifi: &WifiConfig,
    ) -> std::result::Result<Option<IpConfig>, BootstrapFailure> {
        if self.state == ConnectivityState::Failed {
            return Err(BootstrapFailure::AlreadyFailed);
        }

        self.state = ConnectivityState::Connecting;
        self.attempts = 0;
        info!("Connecting to {} on {}", wifi.ssid, wifi.interface);

        match self.poll_until_up(wifi).await {
            Ok(()) => {
                self.state = ConnectivityState::Connected;
                let ip = match self.driver.ifconfig().await {
                    Ok(ip) => {
                        info!("connected, ip = {}", ip);
                        Some(ip)
                    }
                    Err(e) => {
                        warn!("connected, but address lookup failed: {}", e);
                        None
                    }
                };
                Ok(ip)
            }
            Err(failure) => {
                self.state = ConnectivityState::Failed;
                warn!("Network bring-up failed: {}", failure);
                Err(failure)
            }
        }
    }

    async fn poll_until_up(&mut self, wifi: &WifiConfig) -> std::result::Result<(), BootstrapFailure> {
        self.driver
            .activate()
            .await
            .map_err(BootstrapFailure::Driver)?;
        self.driver
            .connect(&wifi.ssid, &wifi.password)
            .await
            .map_err(BootstrapFailure::Driver)?;

        loop {
            let status = self.driver.status().await;
            self.attempts += 1;
            let status = status.map_err(BootstrapFailure::Driver)?;

            if status.is_up() {
                return Ok(());
            }
            if status.is_failure() {
                return Err(BootstrapFailure::Link(status));
            }
            if self.attempts >= self.max_attempts {
                return Err(BootstrapFailure::AttemptsExhausted(self.attempts));
            }

            debug!(
                attempt = self.attempts,
                max = self.max_attempts,
                code = status.code(),
                "waiting for connection..."
            );
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}
