use super::{policy, NewMeasurement, TelemetryEvent};
use crate::config::CONFIG;
use crate::error::{ApiError, DBError, ObserverError, TelemetryError};
use crate::models::{measurement, plant};
use crate::models::{measurement::MeasurementDao, plant::PlantDao};
use crate::mqtt::MqttPlantClient;
use sqlx::SqlitePool;
use std::fmt::Debug;
use std::sync::Arc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::mpsc::{channel, Receiver, Sender};
use tokio::sync::{watch, Mutex};
use tracing::{debug, error, info, warn};

/// Orchestrator of the ingestion pipeline.
///
/// Owns the MQTT client, the storage pool and the bounded telemetry queue.
/// Shared via `Arc` between the dispatch loop, the REST layer and the
/// SIGINT handler.
pub struct ConcurrentObserver {
    pub(crate) mqtt_client: MqttPlantClient,
    pub(crate) db_conn: SqlitePool,
    telemetry_receiver: Mutex<Option<Receiver<TelemetryEvent>>>,
    shutdown: watch::Sender<bool>,
}

impl Debug for ConcurrentObserver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConcurrentObserver").finish()
    }
}

impl ConcurrentObserver {
    pub fn new(db_conn: SqlitePool) -> Arc<Self> {
        let (telemetry_sender, telemetry_receiver) = channel(CONFIG.telemetry_queue_size());
        let (shutdown, _) = watch::channel(false);
        let mqtt_client = MqttPlantClient::new(telemetry_sender);

        Arc::new(ConcurrentObserver {
            mqtt_client,
            db_conn,
            telemetry_receiver: Mutex::new(Some(telemetry_receiver)),
            shutdown,
        })
    }

    /// Connects the transport; the event loop task resubscribes the
    /// telemetry wildcard after every reconnect.
    pub fn init(&self) {
        self.mqtt_client.connect(self.shutdown.subscribe());
    }

    /// Signals every loop to stop intake, drain and disconnect.
    pub fn shutdown(&self) {
        self.shutdown.send_replace(true);
    }

    pub fn shutdown_signal(&self) -> watch::Receiver<bool> {
        self.shutdown.subscribe()
    }

    /// Consumes the telemetry queue and fans events out to a bounded worker
    /// pool keyed by plant id: same-plant events stay in arrival order on
    /// one worker, distinct plants process concurrently.
    /// Blocks the caller until shutdown, then drains in-flight work.
    pub async fn dispatch_telemetry_loop(self: Arc<ConcurrentObserver>) {
        let receiver_opt = self.telemetry_receiver.lock().await.take();
        let mut receiver = match receiver_opt {
            Some(receiver) => receiver,
            None => {
                error!("dispatch_telemetry_loop() already called!");
                return;
            }
        };

        let worker_count = CONFIG.telemetry_workers();
        let mut workers: Vec<Sender<TelemetryEvent>> = Vec::with_capacity(worker_count);
        let mut worker_handles = Vec::with_capacity(worker_count);
        for _ in 0..worker_count {
            let (tx, mut rx) = channel::<TelemetryEvent>(CONFIG.telemetry_queue_size());
            let worker_self = self.clone();
            worker_handles.push(tokio::spawn(async move {
                while let Some(event) = rx.recv().await {
                    worker_self.process_telemetry(event).await;
                }
            }));
            workers.push(tx);
        }

        let mut shutdown = self.shutdown.subscribe();
        info!(
            "Start capturing telemetry events on {} workers",
            worker_count
        );
        loop {
            tokio::select! {
                _ = shutdown.changed() => break,
                received = receiver.recv() => match received {
                    Some(event) => {
                        let index = (event.plant_id.unsigned_abs() as usize) % worker_count;
                        match workers[index].try_send(event) {
                            Ok(_) => {}
                            Err(TrySendError::Full(event)) => {
                                warn!(
                                    plant_id = event.plant_id,
                                    "Worker queue full, dropping telemetry event"
                                );
                            }
                            Err(TrySendError::Closed(_)) => {
                                error!("Telemetry worker gone, stopping dispatch");
                                break;
                            }
                        }
                    }
                    None => break,
                }
            }
        }

        // closing the queues lets the workers drain what is in flight
        drop(workers);
        for handle in worker_handles {
            let _ = handle.await;
        }
        info!("Drained telemetry workers");
    }

    /// Runs one event through the gate, storage and policy stages. Any
    /// failure is logged and contained; the message is never retried.
    pub(crate) async fn process_telemetry(&self, event: TelemetryEvent) {
        let plant_id = event.plant_id;
        let validated = match attribute(&self.db_conn, &event).await {
            Ok(validated) => validated,
            Err(e) => {
                warn!(plant_id, payload = ?event.data, "Rejected telemetry: {}", e);
                return;
            }
        };

        let dao = match measurement::insert(
            &self.db_conn,
            validated.plant_id,
            validated.timestamp,
            validated.moisture,
            validated.temperature,
        )
        .await
        {
            Ok(dao) => dao,
            Err(e) => {
                error!(plant_id, "Failed persisting measurement: {}", e);
                return;
            }
        };
        debug!(plant_id, measurement_id = dao.id(), "Persisted measurement");

        // the measurement is durable at this point, a failed publish must
        // not undo it
        if let Some(cmd) = policy::decide(&validated) {
            if let Err(e) = self
                .mqtt_client
                .publish_water_cmd(cmd.plant_id, cmd.duration_ms)
                .await
            {
                error!(plant_id, "Failed publishing water command: {}", e);
            }
        }
    }

    /*
     * Resource API, called by the REST layer with an already-resolved
     * principal. Measurements are never created through here.
     */

    pub async fn register_plant(
        &self,
        name: &str,
        owner_id: i64,
        preferred_id: Option<i64>,
    ) -> Result<PlantDao, ObserverError> {
        if name.trim().is_empty() {
            return Err(ApiError::EmptyName().into());
        }
        let dao = plant::create(&self.db_conn, name, owner_id, preferred_id).await?;
        info!(plant_id = dao.id(), "Registered new plant");
        Ok(dao)
    }

    pub async fn unregister_plant(&self, plant_id: i64) -> Result<(), ObserverError> {
        plant::delete(&self.db_conn, plant_id).await?;
        info!(plant_id, "Removed plant");
        Ok(())
    }

    pub async fn plants_by_owner(&self, owner_id: i64) -> Result<Vec<PlantDao>, ObserverError> {
        Ok(plant::list_by_owner(&self.db_conn, owner_id).await?)
    }

    pub async fn measurements(
        &self,
        plant_id: i64,
        limit: Option<i64>,
    ) -> Result<Vec<MeasurementDao>, ObserverError> {
        let limit = limit.unwrap_or(measurement::DEFAULT_MEASUREMENT_LIMIT);
        Ok(measurement::get_latest(&self.db_conn, plant_id, limit).await?)
    }

    /// Manual watering trigger; dispatches into the same publisher as the
    /// automatic policy.
    pub async fn trigger_water(
        &self,
        plant_id: i64,
        duration_ms: i64,
    ) -> Result<(), ObserverError> {
        if duration_ms <= 0 {
            return Err(ApiError::InvalidDuration(duration_ms).into());
        }
        plant::get(&self.db_conn, plant_id)
            .await?
            .ok_or(DBError::PlantNotFound(plant_id))?;

        self.mqtt_client
            .publish_water_cmd(plant_id, duration_ms)
            .await?;
        info!(plant_id, duration_ms, "Queued manual watering");
        Ok(())
    }
}

/// Attribution and validation gate: rejects incomplete records, then binds
/// the event to an existing plant. Performs no writes.
pub(crate) async fn attribute(
    conn: &SqlitePool,
    event: &TelemetryEvent,
) -> Result<NewMeasurement, TelemetryError> {
    let timestamp = event
        .data
        .timestamp
        .ok_or(TelemetryError::Incomplete("timestamp"))?;
    let moisture = event
        .data
        .moisture
        .ok_or(TelemetryError::Incomplete("moisture"))?;
    let temperature = event
        .data
        .temperature
        .ok_or(TelemetryError::Incomplete("temperature"))?;

    plant::get(conn, event.plant_id)
        .await?
        .ok_or(TelemetryError::UnknownPlant(event.plant_id))?;

    Ok(NewMeasurement {
        plant_id: event.plant_id,
        timestamp,
        moisture,
        temperature,
    })
}
