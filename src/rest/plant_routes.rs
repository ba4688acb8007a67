use super::build_response;
use crate::plant::ConcurrentObserver;
use std::sync::Arc;
use warp::http::StatusCode;
use warp::{Filter, Reply};

pub fn routes(
    observer: &Arc<ConcurrentObserver>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    register_plant(observer.clone())
        .or(list_plants(observer.clone()))
        .or(unregister_plant(observer.clone()))
        .or(get_measurements(observer.clone()))
        .or(water_plant(observer.clone()))
}

/// POST /api/plant
///
/// Register a new plant for the given owner; an optional preferred id is
/// honored unless it is already taken (409)
fn register_plant(
    observer: Arc<ConcurrentObserver>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::any()
        .map(move || observer.clone())
        .and(warp::post())
        .and(warp::path!("api" / "plant"))
        .and(warp::body::json())
        .and_then(
            |observer: Arc<ConcurrentObserver>, body: dto::PlantRegisterRequestDto| async move {
                let resp = observer
                    .register_plant(&body.name, body.owner_id, body.preferred_id)
                    .await
                    .map(dto::PlantDto::from);
                build_response(resp)
            },
        )
        .boxed()
}

/// GET /api/plant?owner_id=
///
/// List the plants of one owner; the owner id is trusted as an
/// already-resolved principal
fn list_plants(
    observer: Arc<ConcurrentObserver>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::any()
        .map(move || observer.clone())
        .and(warp::get())
        .and(warp::path!("api" / "plant"))
        .and(warp::query::<dto::OwnerQuery>())
        .and_then(
            |observer: Arc<ConcurrentObserver>, query: dto::OwnerQuery| async move {
                let resp = observer.plants_by_owner(query.owner_id).await.map(|daos| {
                    daos.into_iter()
                        .map(dto::PlantDto::from)
                        .collect::<Vec<_>>()
                });
                build_response(resp)
            },
        )
        .boxed()
}

/// DELETE /api/plant/:id
///
/// Unregister a plant and cascade-delete its measurements
fn unregister_plant(
    observer: Arc<ConcurrentObserver>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::any()
        .map(move || observer.clone())
        .and(warp::delete())
        .and(warp::path!("api" / "plant" / i64))
        .and_then(
            |observer: Arc<ConcurrentObserver>, plant_id: i64| async move {
                let resp = observer.unregister_plant(plant_id).await;
                build_response(resp)
            },
        )
        .boxed()
}

/// GET /api/measurements/:plant_id?limit=
///
/// Newest measurements first, capped at limit (default 100)
fn get_measurements(
    observer: Arc<ConcurrentObserver>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::any()
        .map(move || observer.clone())
        .and(warp::get())
        .and(warp::path!("api" / "measurements" / i64))
        .and(warp::query::<dto::MeasurementQuery>())
        .and_then(
            |observer: Arc<ConcurrentObserver>, plant_id: i64, query: dto::MeasurementQuery| async move {
                let resp = observer.measurements(plant_id, query.limit).await.map(|daos| {
                    daos.into_iter()
                        .map(dto::MeasurementDto::from)
                        .collect::<Vec<_>>()
                });
                build_response(resp)
            },
        )
        .boxed()
}

/// POST /api/plant/:id/water
///
/// Queue a manual watering command; replies 202 once the publish is
/// accepted by the transport
fn water_plant(
    observer: Arc<ConcurrentObserver>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::any()
        .map(move || observer.clone())
        .and(warp::post())
        .and(warp::path!("api" / "plant" / i64 / "water"))
        .and(warp::body::json())
        .and_then(
            |observer: Arc<ConcurrentObserver>, plant_id: i64, body: dto::WaterRequestDto| async move {
                let duration_ms = body
                    .duration_ms
                    .unwrap_or(crate::plant::policy::DEFAULT_WATER_DURATION_MS);
                match observer.trigger_water(plant_id, duration_ms).await {
                    Ok(_) => Ok(warp::reply::with_status(
                        warp::reply::json(&dto::WaterResponseDto {
                            status: "queued".to_owned(),
                        }),
                        StatusCode::ACCEPTED,
                    )
                    .into_response()),
                    Err(err) => build_response(Err::<(), _>(err)),
                }
            },
        )
        .boxed()
}

///
/// DTO
///
pub mod dto {
    use crate::models::{measurement::MeasurementDao, plant::PlantDao};
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize, Deserialize)]
    pub struct PlantRegisterRequestDto {
        pub name: String,
        pub owner_id: i64,
        pub preferred_id: Option<i64>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct PlantDto {
        pub id: i64,
        pub name: String,
        pub owner_id: i64,
    }

    impl From<PlantDao> for PlantDto {
        fn from(dao: PlantDao) -> Self {
            PlantDto {
                id: dao.id(),
                name: dao.name().clone(),
                owner_id: dao.owner_id(),
            }
        }
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct MeasurementDto {
        pub timestamp: i64,
        pub moisture: f64,
        pub temperature: f64,
    }

    impl From<MeasurementDao> for MeasurementDto {
        fn from(dao: MeasurementDao) -> Self {
            MeasurementDto {
                timestamp: dao.timestamp(),
                moisture: dao.moisture(),
                temperature: dao.temperature(),
            }
        }
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct OwnerQuery {
        pub owner_id: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct MeasurementQuery {
        pub limit: Option<i64>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct WaterRequestDto {
        pub duration_ms: Option<i64>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct WaterResponseDto {
        pub status: String,
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::models::{establish_test_db_connection, measurement};

    async fn build_mocked_observer() -> Arc<ConcurrentObserver> {
        let db_conn = establish_test_db_connection().await;
        ConcurrentObserver::new(db_conn)
    }

    #[tokio::test]
    async fn test_rest_register_plant() {
        // Prepare
        let observer = build_mocked_observer().await;
        let routes = routes(&observer);

        // Execute
        let body = dto::PlantRegisterRequestDto {
            name: "Fern".to_owned(),
            owner_id: 3,
            preferred_id: None,
        };
        let res = warp::test::request()
            .path("/api/plant")
            .method("POST")
            .json(&body)
            .reply(&routes)
            .await;

        // Validate
        assert_eq!(res.status(), 200);
        let plant: dto::PlantDto = serde_json::from_slice(res.body()).unwrap();
        assert_eq!(plant.name, "Fern");
        assert_eq!(plant.owner_id, 3);
    }

    #[tokio::test]
    async fn test_rest_register_plant_conflict() {
        // Prepare
        let observer = build_mocked_observer().await;
        let routes = routes(&observer);
        let body = dto::PlantRegisterRequestDto {
            name: "Fern".to_owned(),
            owner_id: 3,
            preferred_id: Some(7),
        };
        let first = warp::test::request()
            .path("/api/plant")
            .method("POST")
            .json(&body)
            .reply(&routes)
            .await;
        assert_eq!(first.status(), 200);

        // Execute
        let second = warp::test::request()
            .path("/api/plant")
            .method("POST")
            .json(&dto::PlantRegisterRequestDto {
                name: "Oak".to_owned(),
                owner_id: 3,
                preferred_id: Some(7),
            })
            .reply(&routes)
            .await;

        // Validate
        assert_eq!(second.status(), 409);
    }

    #[tokio::test]
    async fn test_rest_register_plant_empty_name() {
        // Prepare
        let observer = build_mocked_observer().await;
        let routes = routes(&observer);

        // Execute
        let res = warp::test::request()
            .path("/api/plant")
            .method("POST")
            .json(&dto::PlantRegisterRequestDto {
                name: "".to_owned(),
                owner_id: 3,
                preferred_id: None,
            })
            .reply(&routes)
            .await;

        // Validate
        assert_eq!(res.status(), 400);
    }

    #[tokio::test]
    async fn test_rest_list_plants() {
        // Prepare
        let observer = build_mocked_observer().await;
        let routes = routes(&observer);
        observer.register_plant("Fern", 3, None).await.unwrap();
        observer.register_plant("Oak", 3, None).await.unwrap();
        observer.register_plant("Cactus", 4, None).await.unwrap();

        // Execute
        let res = warp::test::request()
            .path("/api/plant?owner_id=3")
            .reply(&routes)
            .await;

        // Validate
        assert_eq!(res.status(), 200);
        let plants: Vec<dto::PlantDto> = serde_json::from_slice(res.body()).unwrap();
        assert_eq!(plants.len(), 2);
    }

    #[tokio::test]
    async fn test_rest_unregister_plant() {
        // Prepare
        let observer = build_mocked_observer().await;
        let routes = routes(&observer);
        let fern = observer.register_plant("Fern", 3, None).await.unwrap();

        // Execute
        let res = warp::test::request()
            .path(&format!("/api/plant/{}", fern.id()))
            .method("DELETE")
            .reply(&routes)
            .await;

        // Validate
        assert_eq!(res.status(), 200);
        let res = warp::test::request()
            .path(&format!("/api/plant/{}", fern.id()))
            .method("DELETE")
            .reply(&routes)
            .await;
        assert_eq!(res.status(), 404);
    }

    #[tokio::test]
    async fn test_rest_get_measurements() {
        // Prepare
        let observer = build_mocked_observer().await;
        let routes = routes(&observer);
        let fern = observer.register_plant("Fern", 3, Some(7)).await.unwrap();
        for ts in [1000, 2000] {
            measurement::insert(&observer.db_conn, fern.id(), ts, 25.0, 22.0)
                .await
                .unwrap();
        }

        // Execute
        let res = warp::test::request()
            .path("/api/measurements/7")
            .reply(&routes)
            .await;

        // Validate
        assert_eq!(res.status(), 200);
        let rows: Vec<dto::MeasurementDto> = serde_json::from_slice(res.body()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].timestamp, 2000);

        // limited read
        let res = warp::test::request()
            .path("/api/measurements/7?limit=1")
            .reply(&routes)
            .await;
        let rows: Vec<dto::MeasurementDto> = serde_json::from_slice(res.body()).unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn test_rest_water_plant() {
        // Prepare
        let observer = build_mocked_observer().await;
        let routes = routes(&observer);
        observer.register_plant("Fern", 3, Some(7)).await.unwrap();

        // Execute
        let res = warp::test::request()
            .path("/api/plant/7/water")
            .method("POST")
            .json(&dto::WaterRequestDto {
                duration_ms: Some(3000),
            })
            .reply(&routes)
            .await;

        // Validate
        assert_eq!(res.status(), 202);
        let reply: dto::WaterResponseDto = serde_json::from_slice(res.body()).unwrap();
        assert_eq!(reply.status, "queued");
    }

    #[tokio::test]
    async fn test_rest_water_plant_invalid_duration() {
        // Prepare
        let observer = build_mocked_observer().await;
        let routes = routes(&observer);
        observer.register_plant("Fern", 3, Some(7)).await.unwrap();

        // Execute
        let res = warp::test::request()
            .path("/api/plant/7/water")
            .method("POST")
            .json(&dto::WaterRequestDto {
                duration_ms: Some(-1),
            })
            .reply(&routes)
            .await;

        // Validate
        assert_eq!(res.status(), 400);
    }

    #[tokio::test]
    async fn test_rest_water_unknown_plant() {
        // Prepare
        let observer = build_mocked_observer().await;
        let routes = routes(&observer);

        // Execute
        let res = warp::test::request()
            .path("/api/plant/42/water")
            .method("POST")
            .json(&dto::WaterRequestDto { duration_ms: None })
            .reply(&routes)
            .await;

        // Validate
        assert_eq!(res.status(), 404);
    }
}
