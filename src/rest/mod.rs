use crate::config::CONFIG;
use crate::error::ObserverError;
use crate::plant::ConcurrentObserver;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};
use warp::http::StatusCode;
use warp::Reply;

mod plant_routes;

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponseDto {
    pub error: String,
}

pub(crate) fn build_response<T: Serialize>(
    resp: Result<T, ObserverError>,
) -> Result<warp::reply::Response, warp::Rejection> {
    match resp {
        Ok(data) => Ok(warp::reply::json(&data).into_response()),
        Err(ObserverError::User(err)) => {
            warn!("{}", err);
            Ok(error_response(err.to_string(), StatusCode::BAD_REQUEST))
        }
        Err(ObserverError::NotFound(err)) => {
            warn!("{}", err);
            Ok(error_response(err.to_string(), StatusCode::NOT_FOUND))
        }
        Err(ObserverError::Conflict(err)) => {
            warn!("{}", err);
            Ok(error_response(err.to_string(), StatusCode::CONFLICT))
        }
        Err(ObserverError::Internal(err)) => {
            error!("{}", err);
            Ok(StatusCode::INTERNAL_SERVER_ERROR.into_response())
        }
    }
}

fn error_response(error: String, status: StatusCode) -> warp::reply::Response {
    warp::reply::with_status(warp::reply::json(&ErrorResponseDto { error }), status).into_response()
}

/// Serves the resource API until shutdown is signalled.
pub async fn dispatch_server(observer: Arc<ConcurrentObserver>) {
    let mut shutdown = observer.shutdown_signal();
    let routes = plant_routes::routes(&observer);

    let (addr, server) = warp::serve(routes).bind_with_graceful_shutdown(
        ([0, 0, 0, 0], CONFIG.server_port()),
        async move {
            let _ = shutdown.changed().await;
        },
    );
    info!("Starting webserver at: {}", addr);
    server.await;
}
