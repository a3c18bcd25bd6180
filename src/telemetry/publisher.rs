//! Publishing smoothed records and the liveness heartbeat.

use crate::config::MqttConfig;
use crate::drivers::traits::MessagingClient;
use crate::error::Result;
use crate::telemetry::data::SmoothedRecord;
use tracing::debug;

/// Constant payload sent to the heartbeat topic every cycle.
pub const HEARTBEAT_PAYLOAD: &str = "pong";

/// Fire-and-forget publisher over a [`MessagingClient`].
///
/// Failed publishes are returned to the caller and never retried here.
pub struct TelemetryPublisher<M> {
    client: M,
    data_topic: String,
    heartbeat_topic: String,
}

impl<M: MessagingClient> TelemetryPublisher<M> {
    pub fn new(client: M, config: &MqttConfig) -> Self {
        Self {
            client,
            data_topic: config.data_topic.clone(),
            heartbeat_topic: config.heartbeat_topic.clone(),
        }
    }

    /// Open the broker session.
    pub async fn connect(&mut self) -> Result<()> {
        self.client.connect().await
    }

    /// Send the liveness marker.
    pub async fn publish_heartbeat(&mut self) -> Result<()> {
        self.client
            .publish(&self.heartbeat_topic, HEARTBEAT_PAYLOAD)
            .await
    }

    /// Serialize `record` and send it to the data topic.
    pub async fn publish_smoothed(&mut self, record: &SmoothedRecord) -> Result<()> {
        let payload = record.to_payload()?;
        debug!(topic = %self.data_topic, %payload, "publishing smoothed record");
        self.client.publish(&self.data_topic, &payload).await
    }

    pub fn client(&self) -> &M {
        &self.client
    }
}
