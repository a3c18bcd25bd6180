//! MQTT client built on rumqttc.
//!
//! rumqttc splits a session into a cloneable request handle and an event
//! loop that must be polled for anything to reach the wire. `connect` drives
//! the loop until the broker acknowledges, then hands it to a background task
//! which keeps polling (and reconnecting) for the life of the client.

use crate::config::MqttConfig;
use crate::drivers::traits::MessagingClient;
use crate::error::{AgentError, Result};
use rumqttc::{AsyncClient, ConnectReturnCode, Event, EventLoop, MqttOptions, Packet, QoS};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Requests buffered between the client handle and the event loop.
const REQUEST_CAPACITY: usize = 10;
const RECONNECT_DELAY: Duration = Duration::from_secs(1);

pub struct MqttClient {
    client: AsyncClient,
    eventloop: Option<EventLoop>,
    connect_timeout: Duration,
    driver: Option<JoinHandle<()>>,
}

impl MqttClient {
    pub fn new(config: &MqttConfig) -> Result<Self> {
        if config.host.is_empty() {
            return Err(AgentError::messaging_error("broker host is empty"));
        }

        let mut options = MqttOptions::new(&config.client_id, &config.host, config.port);
        options.set_keep_alive(Duration::from_secs(config.keep_alive_secs));
        let (client, eventloop) = AsyncClient::new(options, REQUEST_CAPACITY);

        Ok(Self {
            client,
            eventloop: Some(eventloop),
            connect_timeout: Duration::from_secs(config.connect_timeout_secs),
            driver: None,
        })
    }

    pub fn is_connected(&self) -> bool {
        self.driver.is_some()
    }

    /// The event loop can be driven by exactly one connect attempt.
    fn take_eventloop(&mut self) -> Result<EventLoop> {
        self.eventloop
            .take()
            .ok_or_else(|| AgentError::messaging_error("session already established"))
    }
}

async fn wait_for_connack(eventloop: &mut EventLoop) -> Result<()> {
    loop {
        let event = eventloop
            .poll()
            .await
            .map_err(|e| AgentError::messaging_error(format!("broker unreachable: {}", e)))?;

        if let Event::Incoming(Packet::ConnAck(ack)) = event {
            return match ack.code {
                ConnectReturnCode::Success => Ok(()),
                code => Err(AgentError::messaging_error(format!(
                    "broker refused connection: {:?}",
                    code
                ))),
            };
        }
    }
}

impl MessagingClient for MqttClient {
    async fn connect(&mut self) -> Result<()> {
        let mut eventloop = self.take_eventloop()?;

        tokio::time::timeout(self.connect_timeout, wait_for_connack(&mut eventloop))
            .await
            .map_err(|_| {
                AgentError::messaging_error(format!(
                    "no CONNACK within {}s",
                    self.connect_timeout.as_secs()
                ))
            })??;
        info!("MQTT session established");

        self.driver = Some(tokio::spawn(async move {
            loop {
                match eventloop.poll().await {
                    Ok(event) => debug!(?event, "mqtt"),
                    Err(e) => {
                        warn!("MQTT connection error: {}", e);
                        tokio::time::sleep(RECONNECT_DELAY).await;
                    }
                }
            }
        }));
        Ok(())
    }

    async fn publish(&mut self, topic: &str, payload: &str) -> Result<()> {
        // try_publish never waits on a full queue; a stalled broker costs a message, not a cycle
        self.client
            .try_publish(topic, QoS::AtMostOnce, false, payload.as_bytes().to_vec())
            .map_err(|e| AgentError::messaging_error(format!("publish to {} failed: {}", topic, e)))
    }
}

impl Drop for MqttClient {
    fn drop(&mut self) {
        if let Some(driver) = self.driver.take() {
            driver.abort();
        }
    }
}
