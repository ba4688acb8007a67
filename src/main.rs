mod config;
mod error;
mod logging;
mod models;
mod mqtt;
mod plant;
mod rest;

use std::io;
use tracing::{error, info};

#[tokio::main]
pub async fn main() -> io::Result<()> {
    logging::init();

    let db_conn = match models::establish_db_connection().await {
        Ok(conn) => conn,
        Err(e) => {
            error!("Failed connecting database: {}", e);
            return Err(io::Error::new(io::ErrorKind::Other, e.to_string()));
        }
    };

    let observer = plant::ConcurrentObserver::new(db_conn);
    observer.init();

    let sigint_observer = observer.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        info!("Received SIGINT, shutting down");
        sigint_observer.shutdown();
    }) {
        error!("Failed registering SIGINT handler: {}", e);
    }

    let telemetry_loop = plant::ConcurrentObserver::dispatch_telemetry_loop(observer.clone());
    let server_daemon = rest::dispatch_server(observer.clone());

    let _ = tokio::join!(telemetry_loop, server_daemon);
    Ok(())
}
