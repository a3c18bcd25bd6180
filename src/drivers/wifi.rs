//! Station-mode networking through NetworkManager.
//!
//! Association is requested with `nmcli` and then observed through the
//! device state NetworkManager reports; the address comes from `ip`.

use crate::drivers::traits::NetworkDriver;
use crate::error::{AgentError, Result};
use crate::network::{IpConfig, LinkStatus};
use std::net::Ipv4Addr;
use tokio::process::Command;

/// NetworkManager-backed wireless interface.
#[derive(Debug, Clone)]
pub struct NmcliNetwork {
    interface: String,
}

impl NmcliNetwork {
    pub fn new(interface: impl Into<String>) -> Self {
        Self {
            interface: interface.into(),
        }
    }

    async fn device_state(&self) -> Result<u32> {
        let output = run(
            "nmcli",
            &["-t", "-g", "GENERAL.STATE", "device", "show", &self.interface],
        )
        .await?;
        parse_device_state(&output).ok_or_else(|| {
            AgentError::network_error(format!("unexpected device state {:?}", output.trim()))
        })
    }

    async fn address(&self) -> Result<Option<IpConfig>> {
        let output = run("ip", &["-4", "-o", "addr", "show", "dev", &self.interface]).await?;
        Ok(parse_ipv4_address(&output))
    }
}

impl NetworkDriver for NmcliNetwork {
    async fn activate(&mut self) -> Result<()> {
        run("nmcli", &["radio", "wifi", "on"]).await?;
        Ok(())
    }

    async fn connect(&mut self, ssid: &str, password: &str) -> Result<()> {
        // --wait 0 returns as soon as activation is requested; progress is polled
        run(
            "nmcli",
            &[
                "--wait", "0", "device", "wifi", "connect", ssid, "password", password, "ifname",
                &self.interface,
            ],
        )
        .await?;
        Ok(())
    }

    async fn status(&mut self) -> Result<LinkStatus> {
        let state = self.device_state().await?;
        let has_address = state == NM_ACTIVATED && self.address().await?.is_some();
        Ok(link_status(state, has_address))
    }

    async fn ifconfig(&mut self) -> Result<IpConfig> {
        self.address().await?.ok_or_else(|| {
            AgentError::network_error(format!("no IPv4 address on {}", self.interface))
        })
    }
}

async fn run(program: &str, args: &[&str]) -> Result<String> {
    let output = Command::new(program).args(args).output().await?;
    if !output.status.success() {
        return Err(AgentError::network_error(format!(
            "{} {} failed ({}): {}",
            program,
            args.first().copied().unwrap_or_default(),
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

// NetworkManager device states (NMDeviceState)
const NM_DISCONNECTED: u32 = 30;
const NM_PREPARE: u32 = 40;
const NM_NEED_AUTH: u32 = 60;
const NM_IP_CONFIG: u32 = 70;
const NM_SECONDARIES: u32 = 90;
const NM_ACTIVATED: u32 = 100;
const NM_FAILED: u32 = 120;

/// Parse `nmcli -g GENERAL.STATE` output such as `100 (connected)`.
fn parse_device_state(output: &str) -> Option<u32> {
    output.split_whitespace().next()?.parse().ok()
}

fn link_status(state: u32, has_address: bool) -> LinkStatus {
    match state {
        NM_ACTIVATED if has_address => LinkStatus::Up,
        NM_ACTIVATED => LinkStatus::NoAddress,
        NM_IP_CONFIG..=NM_SECONDARIES => LinkStatus::NoAddress,
        NM_PREPARE..=NM_NEED_AUTH => LinkStatus::Joining,
        NM_FAILED => LinkStatus::JoinFailed,
        // unmanaged, unavailable (radio still powering up), disconnected, deactivating
        _ => LinkStatus::Idle,
    }
}

/// Extract the first `inet a.b.c.d/nn` entry from `ip -4 -o addr` output.
fn parse_ipv4_address(output: &str) -> Option<IpConfig> {
    output.lines().find_map(|line| {
        let mut fields = line.split_whitespace();
        fields.find(|&f| f == "inet")?;
        let (address, prefix) = fields.next()?.split_once('/')?;
        Some(IpConfig {
            address: address.parse::<Ipv4Addr>().ok()?,
            prefix_len: prefix.parse().ok()?,
        })
    })
}
