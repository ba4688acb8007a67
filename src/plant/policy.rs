use super::NewMeasurement;

pub const MOISTURE_THRESHOLD_PERCENT: f64 = 30.0;
pub const DEFAULT_WATER_DURATION_MS: i64 = 5000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaterCommand {
    pub plant_id: i64,
    pub duration_ms: i64,
}

/// Maps a persisted measurement to at most one watering command.
///
/// Pure and stateless: the seam for future per-plant thresholds or
/// hysteresis without touching pipeline or storage code.
pub fn decide(measurement: &NewMeasurement) -> Option<WaterCommand> {
    if measurement.moisture < MOISTURE_THRESHOLD_PERCENT {
        Some(WaterCommand {
            plant_id: measurement.plant_id,
            duration_ms: DEFAULT_WATER_DURATION_MS,
        })
    } else {
        None
    }
}
