use crate::config::CONFIG;
use crate::error::MQTTError;
use crate::plant::{TelemetryEvent, TelemetryPayload};
use parking_lot::Mutex;
use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Packet, Publish, QoS};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::mpsc::Sender;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

#[cfg(test)]
mod test;

pub const PLANT_TOPIC: &str = "plant";
pub const TELEMETRY_TOPIC: &str = "telemetry";
pub const WATER_CMD_TOPIC: &str = "cmd/water";
pub const TELEMETRY_SUBSCRIPTION: &str = "plant/+/telemetry";

#[derive(Debug, Serialize, Deserialize)]
pub struct WaterCommandPayload {
    pub duration_ms: i64,
}

type TelemetrySender = Sender<TelemetryEvent>;

/// Process-wide MQTT connection handle. Owns the subscription lifecycle and
/// the outbound command publishes; inbound telemetry is decoded and handed
/// to the ingestion loop through a bounded channel.
pub struct MqttPlantClient {
    cli: AsyncClient,
    eventloop: Mutex<Option<EventLoop>>,
    sender: TelemetrySender,
}

impl MqttPlantClient {
    pub fn new(sender: TelemetrySender) -> Self {
        let mut options =
            MqttOptions::new(CONFIG.mqtt_client_id(), CONFIG.mqtt_host(), CONFIG.mqtt_port());
        options.set_keep_alive(Duration::from_secs(5));

        let (cli, eventloop) = AsyncClient::new(options, 10);
        MqttPlantClient {
            cli,
            eventloop: Mutex::new(Some(eventloop)),
            sender,
        }
    }

    /// Starts the transport event loop task: connects, subscribes the
    /// wildcard telemetry topic on every (re)connect and feeds decoded
    /// messages into the telemetry channel until shutdown.
    pub fn connect(&self, mut shutdown: watch::Receiver<bool>) {
        let eventloop_opt = self.eventloop.lock().take();
        let mut eventloop = match eventloop_opt {
            Some(eventloop) => eventloop,
            None => {
                error!("connect() already called");
                return;
            }
        };

        let cli = self.cli.clone();
        let sender = self.sender.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown.changed() => {
                        let _ = cli.disconnect().await;
                        break;
                    }
                    polled = eventloop.poll() => match polled {
                        Ok(Event::Incoming(Packet::ConnAck(_))) => {
                            info!("Connected to MQTT broker");
                            if let Err(e) = cli
                                .subscribe(TELEMETRY_SUBSCRIPTION, QoS::AtLeastOnce)
                                .await
                            {
                                error!("Failed subscribing {}: {}", TELEMETRY_SUBSCRIPTION, e);
                            } else {
                                info!("Subscribed topic: {}", TELEMETRY_SUBSCRIPTION);
                            }
                        }
                        Ok(Event::Incoming(Packet::Publish(msg))) => {
                            Self::on_plant_message(&sender, msg);
                        }
                        Ok(_) => {}
                        Err(e) => {
                            error!("MQTT connection error: {}", e);
                            tokio::time::sleep(Duration::from_secs(1)).await;
                        }
                    }
                }
            }
            info!("Ended MQTT event loop");
        });
    }

    /// Decodes and dispatches one inbound message. A malformed message or a
    /// full telemetry queue is logged and dropped, never propagated.
    fn on_plant_message(sender: &TelemetrySender, msg: Publish) {
        let event = match decode(&msg.topic, &msg.payload) {
            Ok(event) => event,
            Err(e) => {
                warn!(topic = %msg.topic, payload = ?msg.payload, "Undecodable message: {}", e);
                return;
            }
        };

        match sender.try_send(event) {
            Ok(_) => {}
            Err(TrySendError::Full(event)) => {
                warn!(plant_id = event.plant_id, "Telemetry queue full, dropping event");
            }
            Err(TrySendError::Closed(_)) => {
                error!("Telemetry queue closed, dropping event");
            }
        }
    }

    /// At-least-once publish of a watering command. The caller logs a
    /// failure and moves on; the next qualifying measurement re-triggers it.
    pub async fn publish_water_cmd(
        &self,
        plant_id: i64,
        duration_ms: i64,
    ) -> Result<(), MQTTError> {
        let topic = water_cmd_topic(plant_id);
        let payload = serde_json::to_vec(&WaterCommandPayload { duration_ms })?;
        self.cli
            .publish(topic.clone(), QoS::AtLeastOnce, false, payload)
            .await?;
        debug!(plant_id, duration_ms, "Sent watering command to {}", topic);
        Ok(())
    }
}

/// Parses a raw transport message into a telemetry event.
///
/// Pure and synchronous: topic must be `plant/<id>/telemetry` with a numeric
/// id, the payload UTF-8 JSON. Absent payload fields decode to `None`.
pub fn decode(topic: &str, payload: &[u8]) -> Result<TelemetryEvent, MQTTError> {
    let path: Vec<&str> = topic.splitn(3, '/').collect();
    if path.len() != 3 || path[0] != PLANT_TOPIC || path[2] != TELEMETRY_TOPIC {
        return Err(MQTTError::Path(format!("Unexpected topic: {}", topic)));
    }

    let plant_id: i64 = path[1]
        .parse()
        .map_err(|_| MQTTError::Path(format!("Couldn't parse plant id: {}", path[1])))?;

    let text = std::str::from_utf8(payload)
        .map_err(|_| MQTTError::Payload("Payload is not valid UTF-8".to_owned()))?;
    let data = serde_json::from_str::<TelemetryPayload>(text)?;

    Ok(TelemetryEvent { plant_id, data })
}

pub fn water_cmd_topic(plant_id: i64) -> String {
    format!("{}/{}/{}", PLANT_TOPIC, plant_id, WATER_CMD_TOPIC)
}
