use crate::error::DBError;
use sqlx::SqlitePool;

pub const DEFAULT_MEASUREMENT_LIMIT: i64 = 100;

#[derive(sqlx::FromRow, Debug, Clone, PartialEq)]
pub struct MeasurementDao {
    pub(crate) id: i64,
    pub(crate) plant_id: i64,
    pub(crate) timestamp: i64,
    pub(crate) moisture: f64,
    pub(crate) temperature: f64,
}

impl MeasurementDao {
    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn plant_id(&self) -> i64 {
        self.plant_id
    }

    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn moisture(&self) -> f64 {
        self.moisture
    }

    pub fn temperature(&self) -> f64 {
        self.temperature
    }
}

/// Appends one measurement. The owning plant is confirmed inside the same
/// transaction as the insert, which guards against a concurrent cascade
/// delete sneaking in between.
pub async fn insert(
    conn: &SqlitePool,
    plant_id: i64,
    timestamp: i64,
    moisture: f64,
    temperature: f64,
) -> Result<MeasurementDao, DBError> {
    let mut tx = conn.begin().await?;
    let plant: Option<(i64,)> = sqlx::query_as("SELECT id FROM plants WHERE id = ?1")
        .bind(plant_id)
        .fetch_optional(&mut *tx)
        .await?;
    if plant.is_none() {
        return Err(DBError::PlantNotFound(plant_id));
    }

    let dao = sqlx::query_as::<_, MeasurementDao>(
        r#"INSERT INTO measurements (plant_id, timestamp, moisture, temperature)
            VALUES (?1, ?2, ?3, ?4) RETURNING *"#,
    )
    .bind(plant_id)
    .bind(timestamp)
    .bind(moisture)
    .bind(temperature)
    .fetch_one(&mut *tx)
    .await?;
    tx.commit().await?;
    Ok(dao)
}

/// Newest-timestamp-first, capped at `limit`. Duplicate timestamps are
/// tie-broken by descending id so repeated reads stay identical.
pub async fn get_latest(
    conn: &SqlitePool,
    plant_id: i64,
    limit: i64,
) -> Result<Vec<MeasurementDao>, DBError> {
    Ok(sqlx::query_as::<_, MeasurementDao>(
        r#"SELECT * FROM measurements
            WHERE plant_id = ?1
            ORDER BY timestamp DESC, id DESC
            LIMIT ?2"#,
    )
    .bind(plant_id)
    .bind(limit)
    .fetch_all(conn)
    .await?)
}
