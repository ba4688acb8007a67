use crate::error::DBError;
use sqlx::SqlitePool;

#[derive(sqlx::FromRow, Debug, Clone, PartialEq)]
pub struct PlantDao {
    pub(crate) id: i64,
    pub(crate) name: String,
    pub(crate) owner_id: i64,
}

impl PlantDao {
    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn name(&self) -> &String {
        &self.name
    }

    pub fn owner_id(&self) -> i64 {
        self.owner_id
    }
}

/// Registers a plant, either with a store-assigned id or a caller
/// preferred one. A taken preferred id fails with `IdConflict`.
pub async fn create(
    conn: &SqlitePool,
    name: &str,
    owner_id: i64,
    preferred_id: Option<i64>,
) -> Result<PlantDao, DBError> {
    let mut tx = conn.begin().await?;
    let dao = match preferred_id {
        Some(id) => {
            let taken: Option<(i64,)> = sqlx::query_as("SELECT id FROM plants WHERE id = ?1")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
            if taken.is_some() {
                return Err(DBError::IdConflict(id));
            }
            sqlx::query_as::<_, PlantDao>(
                "INSERT INTO plants (id, name, owner_id) VALUES (?1, ?2, ?3) RETURNING *",
            )
            .bind(id)
            .bind(name)
            .bind(owner_id)
            .fetch_one(&mut *tx)
            .await?
        }
        None => sqlx::query_as::<_, PlantDao>(
            "INSERT INTO plants (name, owner_id) VALUES (?1, ?2) RETURNING *",
        )
        .bind(name)
        .bind(owner_id)
        .fetch_one(&mut *tx)
        .await?,
    };
    tx.commit().await?;
    Ok(dao)
}

pub async fn get(conn: &SqlitePool, id: i64) -> Result<Option<PlantDao>, DBError> {
    Ok(
        sqlx::query_as::<_, PlantDao>("SELECT * FROM plants WHERE id = ?1")
            .bind(id)
            .fetch_optional(conn)
            .await?,
    )
}

pub async fn list_by_owner(conn: &SqlitePool, owner_id: i64) -> Result<Vec<PlantDao>, DBError> {
    Ok(
        sqlx::query_as::<_, PlantDao>("SELECT * FROM plants WHERE owner_id = ?1 ORDER BY id")
            .bind(owner_id)
            .fetch_all(conn)
            .await?,
    )
}

/// Deletes a plant and all its measurements in one transaction.
/// No intermediate state is observable from outside the transaction.
pub async fn delete(conn: &SqlitePool, remove_id: i64) -> Result<(), DBError> {
    let mut tx = conn.begin().await?;
    sqlx::query("DELETE FROM measurements WHERE plant_id = ?1")
        .bind(remove_id)
        .execute(&mut *tx)
        .await?;
    let deleted = sqlx::query("DELETE FROM plants WHERE id = ?1")
        .bind(remove_id)
        .execute(&mut *tx)
        .await?;
    if deleted.rows_affected() == 0 {
        return Err(DBError::PlantNotFound(remove_id));
    }
    tx.commit().await?;
    Ok(())
}
