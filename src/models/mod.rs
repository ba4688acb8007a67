use crate::config::CONFIG;
use crate::error::DBError;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

pub async fn establish_db_connection() -> Result<SqlitePool, DBError> {
    let options = SqliteConnectOptions::from_str(&CONFIG.database_url())?
        .create_if_missing(true)
        .foreign_keys(true);
    let conn = SqlitePoolOptions::new().connect_with(options).await?;
    MIGRATOR.run(&conn).await?;
    Ok(conn)
}

pub mod measurement;
pub mod plant;

#[cfg(test)]
pub(crate) async fn establish_test_db_connection() -> SqlitePool {
    // in-memory databases exist per connection, so the pool must not grow
    let options = SqliteConnectOptions::from_str("sqlite::memory:")
        .unwrap()
        .foreign_keys(true);
    let conn = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .unwrap();
    MIGRATOR.run(&conn).await.unwrap();
    conn
}
