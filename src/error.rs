use std::error;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DBError {
    #[error(transparent)]
    SQLError(#[from] sqlx::Error),
    #[error(transparent)]
    MigrateError(#[from] sqlx::migrate::MigrateError),
    #[error("Did not find plant: {0}")]
    PlantNotFound(i64),
    #[error("Plant id already in use: {0}")]
    IdConflict(i64),
}

#[derive(Debug, Error)]
pub enum MQTTError {
    #[error("Invalid Path: {0}")]
    Path(String),
    #[error("Invalid Payload: {0}")]
    Payload(String),
    #[error("Invalid JSON: {0}")]
    Parse(#[from] serde_json::error::Error),
    #[error("Send Failed: {0}")]
    Send(#[from] rumqttc::ClientError),
}

/// Per-message failure of the ingestion pipeline.
///
/// Contained at the loop boundary: logged with topic and payload context,
/// then discarded. Never aborts the loop.
#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("Missing field: {0}")]
    Incomplete(&'static str),
    #[error("Unknown plant: {0}")]
    UnknownPlant(i64),
    #[error(transparent)]
    Storage(#[from] DBError),
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("duration_ms must be positive, got {0}")]
    InvalidDuration(i64),
    #[error("Plant name must not be empty")]
    EmptyName(),
}

type BoxedError = Box<dyn error::Error + Send + Sync>;

#[derive(Debug, Error)]
#[error(transparent)]
pub enum ObserverError {
    User(BoxedError),
    NotFound(BoxedError),
    Conflict(BoxedError),
    Internal(BoxedError),
}

impl From<DBError> for ObserverError {
    fn from(err: DBError) -> Self {
        match err {
            DBError::PlantNotFound(_) => ObserverError::NotFound(Box::from(err)),
            DBError::IdConflict(_) => ObserverError::Conflict(Box::from(err)),
            DBError::SQLError(_) | DBError::MigrateError(_) => {
                ObserverError::Internal(Box::from(err))
            }
        }
    }
}

impl From<MQTTError> for ObserverError {
    fn from(err: MQTTError) -> Self {
        ObserverError::Internal(Box::from(err))
    }
}

impl From<ApiError> for ObserverError {
    fn from(err: ApiError) -> Self {
        ObserverError::User(Box::from(err))
    }
}
