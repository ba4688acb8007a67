use serde::{Deserialize, Serialize};

pub mod observer;
pub mod policy;


pub use observer::ConcurrentObserver;

/// Device-supplied telemetry payload. Every field is optional at the decode
/// boundary; completeness is enforced by the validation gate, not the parser.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TelemetryPayload {
    #[serde(default)]
    pub timestamp: Option<i64>,
    #[serde(default)]
    pub moisture: Option<f64>,
    #[serde(default)]
    pub temperature: Option<f64>,
}

/// One decoded inbound transport message, attributed to nothing yet.
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetryEvent {
    pub plant_id: i64,
    pub data: TelemetryPayload,
}

/// A validated measurement, bound to a confirmed plant but not yet persisted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NewMeasurement {
    pub plant_id: i64,
    pub timestamp: i64,
    pub moisture: f64,
    pub temperature: f64,
}
