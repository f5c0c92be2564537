use std::convert::Infallible;

use serde::Serialize;
use warp::{reject, Filter, Rejection, Reply};

use crate::album_manager::AlbumManager;
use crate::db::DbPool;
use crate::errors::ServiceError;
use crate::photo_ingest::PhotoIngestor;
use crate::photo_mover::PhotoMover;
use crate::storage_paths::StoragePaths;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
    pub timestamp: String,
}

#[derive(Debug)]
pub struct ServiceFailure(pub ServiceError);

impl reject::Reject for ServiceFailure {}

pub fn service_reject(err: ServiceError) -> Rejection {
    reject::custom(ServiceFailure(err))
}

pub fn with_db(db_pool: DbPool) -> impl Filter<Extract = (DbPool,), Error = Infallible> + Clone {
    warp::any().map(move || db_pool.clone())
}

pub fn with_paths(
    paths: StoragePaths,
) -> impl Filter<Extract = (StoragePaths,), Error = Infallible> + Clone {
    warp::any().map(move || paths.clone())
}

pub fn with_albums(
    albums: AlbumManager,
) -> impl Filter<Extract = (AlbumManager,), Error = Infallible> + Clone {
    warp::any().map(move || albums.clone())
}

pub fn with_ingestor(
    ingestor: PhotoIngestor,
) -> impl Filter<Extract = (PhotoIngestor,), Error = Infallible> + Clone {
    warp::any().map(move || ingestor.clone())
}

pub fn with_mover(
    mover: PhotoMover,
) -> impl Filter<Extract = (PhotoMover,), Error = Infallible> + Clone {
    warp::any().map(move || mover.clone())
}

pub async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    let code;
    let message;
    let timestamp = chrono::Utc::now().to_rfc3339();

    if err.is_not_found() {
        code = warp::http::StatusCode::NOT_FOUND;
        message = "Not Found".to_string();
    } else if let Some(ServiceFailure(service_error)) = err.find::<ServiceFailure>() {
        code = service_error.http_status();
        if code.is_server_error() {
            log::error!("request failed: {}", service_error);
        }
        message = service_error.public_message();
    } else if let Some(body_error) = err.find::<warp::body::BodyDeserializeError>() {
        code = warp::http::StatusCode::BAD_REQUEST;
        message = body_error.to_string();
    } else if err.find::<warp::reject::InvalidQuery>().is_some() {
        code = warp::http::StatusCode::BAD_REQUEST;
        message = "Invalid query parameters".to_string();
    } else if err.find::<warp::reject::PayloadTooLarge>().is_some() {
        code = warp::http::StatusCode::PAYLOAD_TOO_LARGE;
        message = "Payload too large".to_string();
    } else if err.find::<warp::reject::UnsupportedMediaType>().is_some() {
        code = warp::http::StatusCode::UNSUPPORTED_MEDIA_TYPE;
        message = "Unsupported media type".to_string();
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        code = warp::http::StatusCode::METHOD_NOT_ALLOWED;
        message = "Method not allowed".to_string();
    } else {
        log::error!("Unhandled rejection: {:?}", err);
        code = warp::http::StatusCode::INTERNAL_SERVER_ERROR;
        message = "Internal server error".to_string();
    }

    let error_response = ErrorResponse {
        error: message,
        code: code.as_u16(),
        timestamp,
    };

    Ok(warp::reply::with_status(
        warp::reply::json(&error_response),
        code,
    ))
}

pub fn cors() -> warp::cors::Builder {
    warp::cors()
        .allow_any_origin()
        .allow_headers(vec!["content-type", "authorization"])
        .allow_methods(vec!["GET", "POST", "PUT", "PATCH", "DELETE", "OPTIONS"])
}
