use std::path::Path;
use std::str::FromStr;

use bytes::Buf;
use chrono::{DateTime, Utc};
use futures_util::TryStreamExt;
use serde::{Deserialize, Serialize};
use warp::multipart::{FormData, Part};
use warp::{Rejection, Reply};

use crate::album_manager::AlbumManager;
use crate::archive;
use crate::db::{Album, DbPool, Photo};
use crate::db_types::{SortField, SortOrder};
use crate::errors::ServiceError;
use crate::mimetype_detector;
use crate::photo_ingest::PhotoIngestor;
use crate::photo_mover::PhotoMover;
use crate::storage_paths::StoragePaths;
use crate::warp_helpers::service_reject;

/// How many recent thumbnails make up an album's cover strip.
const COVER_THUMB_COUNT: i64 = 4;

pub async fn health_check() -> Result<impl Reply, std::convert::Infallible> {
    Ok(warp::reply::json(&serde_json::json!({
        "status": "healthy",
        "timestamp": Utc::now().to_rfc3339()
    })))
}

pub async fn ready_check(db_pool: DbPool) -> Result<impl Reply, Rejection> {
    match db_pool.get() {
        Ok(_) => Ok(warp::reply::json(&serde_json::json!({
            "status": "ready",
            "database": "connected",
            "timestamp": Utc::now().to_rfc3339()
        }))),
        Err(e) => Err(service_reject(crate::db::DbError::from(e).into())),
    }
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub keyword: Option<String>,
    pub sort: Option<String>,
    #[serde(rename = "orderBy")]
    pub order_by: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DownloadQuery {
    #[serde(rename = "photoIds")]
    pub photo_ids: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateAlbumRequest {
    pub album_name: String,
}

#[derive(Debug, Deserialize)]
pub struct RenameAlbumRequest {
    pub album_name: String,
}

#[derive(Debug, Deserialize)]
pub struct MovePhotoRequest {
    pub to_album_id: i64,
}

#[derive(Debug, Serialize)]
pub struct AlbumResponse {
    pub album_id: i64,
    pub album_name: String,
    pub created_at: DateTime<Utc>,
    pub photo_count: i64,
    pub thumb_urls: Vec<String>,
}

impl AlbumResponse {
    fn build(album: Album, db_pool: &DbPool) -> Result<Self, Rejection> {
        let photo_count = Photo::count_by_album(db_pool, album.album_id)
            .map_err(|e| service_reject(e.into()))?;
        let thumb_urls = Photo::find_top_by_album(db_pool, album.album_id, COVER_THUMB_COUNT)
            .map_err(|e| service_reject(e.into()))?
            .into_iter()
            .map(|p| p.thumb_url)
            .collect();

        Ok(AlbumResponse {
            album_id: album.album_id,
            album_name: album.album_name,
            created_at: album.created_at,
            photo_count,
            thumb_urls,
        })
    }
}

fn parse_sort(query: &ListQuery) -> Result<(SortField, SortOrder), Rejection> {
    let sort = match query.sort.as_deref() {
        None => SortField::Date,
        Some(s) => SortField::from_str(s).map_err(|_| {
            service_reject(ServiceError::InvalidInput(format!("unknown sort key: {}", s)))
        })?,
    };
    let order = match query.order_by.as_deref() {
        None => SortOrder::Desc,
        Some(s) => SortOrder::from_str(s).map_err(|_| {
            service_reject(ServiceError::InvalidInput(format!("unknown sort order: {}", s)))
        })?,
    };
    Ok((sort, order))
}

// ===== Album handlers =====

pub async fn get_album(
    album_id: i64,
    db_pool: DbPool,
    albums: AlbumManager,
) -> Result<impl Reply, Rejection> {
    let album = albums.get(album_id).map_err(service_reject)?;
    let response = AlbumResponse::build(album, &db_pool)?;
    Ok(warp::reply::json(&response))
}

pub async fn list_albums(query: ListQuery, db_pool: DbPool) -> Result<impl Reply, Rejection> {
    let (sort, order) = parse_sort(&query)?;
    let keyword = query.keyword.as_deref().unwrap_or("");

    let albums = Album::list_by_name_substring(&db_pool, keyword, sort, order)
        .map_err(|e| service_reject(e.into()))?;

    let mut responses = Vec::with_capacity(albums.len());
    for album in albums {
        responses.push(AlbumResponse::build(album, &db_pool)?);
    }
    Ok(warp::reply::json(&responses))
}

pub async fn create_album(
    request: CreateAlbumRequest,
    db_pool: DbPool,
    albums: AlbumManager,
) -> Result<impl Reply, Rejection> {
    if request.album_name.trim().is_empty() {
        return Err(service_reject(ServiceError::InvalidInput(
            "album name must not be empty".to_string(),
        )));
    }

    let album = albums.create(&request.album_name).map_err(service_reject)?;
    let response = AlbumResponse::build(album, &db_pool)?;
    Ok(warp::reply::with_status(
        warp::reply::json(&response),
        warp::http::StatusCode::CREATED,
    ))
}

pub async fn rename_album(
    album_id: i64,
    request: RenameAlbumRequest,
    db_pool: DbPool,
    albums: AlbumManager,
) -> Result<impl Reply, Rejection> {
    if request.album_name.trim().is_empty() {
        return Err(service_reject(ServiceError::InvalidInput(
            "album name must not be empty".to_string(),
        )));
    }

    let album = albums
        .rename(album_id, &request.album_name)
        .map_err(service_reject)?;
    let response = AlbumResponse::build(album, &db_pool)?;
    Ok(warp::reply::json(&response))
}

pub async fn delete_album(album_id: i64, albums: AlbumManager) -> Result<impl Reply, Rejection> {
    albums.delete(album_id).map_err(service_reject)?;
    Ok(warp::reply::with_status(
        warp::reply(),
        warp::http::StatusCode::NO_CONTENT,
    ))
}

// ===== Photo handlers =====

pub async fn get_photo(
    _album_id: i64,
    photo_id: i64,
    db_pool: DbPool,
) -> Result<impl Reply, Rejection> {
    match Photo::find_by_id(&db_pool, photo_id) {
        Ok(Some(photo)) => Ok(warp::reply::json(&photo)),
        Ok(None) => Err(service_reject(ServiceError::PhotoNotFound(photo_id))),
        Err(e) => Err(service_reject(e.into())),
    }
}

pub async fn list_photos(
    album_id: i64,
    query: ListQuery,
    db_pool: DbPool,
) -> Result<impl Reply, Rejection> {
    let (sort, order) = parse_sort(&query)?;

    match Album::find_by_id(&db_pool, album_id) {
        Ok(Some(_)) => {}
        Ok(None) => return Err(service_reject(ServiceError::AlbumNotFound(album_id))),
        Err(e) => return Err(service_reject(e.into())),
    }

    let photos = Photo::list_by_album(&db_pool, album_id, sort, order)
        .map_err(|e| service_reject(e.into()))?;
    Ok(warp::reply::json(&photos))
}

pub async fn upload_photos(
    album_id: i64,
    form: FormData,
    ingestor: PhotoIngestor,
) -> Result<impl Reply, Rejection> {
    let parts: Vec<Part> = form.try_collect().await.map_err(|e| {
        service_reject(ServiceError::InvalidInput(format!(
            "invalid multipart body: {}",
            e
        )))
    })?;

    let mut photos = Vec::new();
    for part in parts {
        let filename = match part.filename() {
            Some(name) => name.to_string(),
            None => continue, // not a file field
        };
        let content_type = part.content_type().map(str::to_string);

        let bytes = part_bytes(part).await.map_err(|e| {
            service_reject(ServiceError::InvalidInput(format!(
                "failed to read upload {:?}: {}",
                filename, e
            )))
        })?;

        let photo = ingestor
            .ingest(&bytes, &filename, content_type.as_deref(), album_id)
            .map_err(service_reject)?;
        photos.push(photo);
    }

    if photos.is_empty() {
        return Err(service_reject(ServiceError::InvalidInput(
            "no file parts in upload".to_string(),
        )));
    }

    Ok(warp::reply::json(&photos))
}

async fn part_bytes(part: Part) -> Result<Vec<u8>, warp::Error> {
    part.stream()
        .try_fold(Vec::new(), |mut acc, mut buf| async move {
            while buf.has_remaining() {
                let chunk = buf.chunk();
                acc.extend_from_slice(chunk);
                let advanced = chunk.len();
                buf.advance(advanced);
            }
            Ok(acc)
        })
        .await
}

pub async fn download_photos(
    album_id: i64,
    query: DownloadQuery,
    db_pool: DbPool,
    paths: StoragePaths,
) -> Result<Box<dyn Reply>, Rejection> {
    let mut ids = Vec::new();
    for raw in query.photo_ids.split(',').filter(|s| !s.trim().is_empty()) {
        let id: i64 = raw.trim().parse().map_err(|_| {
            service_reject(ServiceError::InvalidInput(format!(
                "invalid photo id: {}",
                raw
            )))
        })?;
        ids.push(id);
    }
    if ids.is_empty() {
        return Err(service_reject(ServiceError::InvalidInput(
            "no photo ids given".to_string(),
        )));
    }

    let mut photos = Vec::with_capacity(ids.len());
    for id in &ids {
        match Photo::find_by_id(&db_pool, *id) {
            Ok(Some(photo)) => photos.push(photo),
            Ok(None) => return Err(service_reject(ServiceError::PhotoNotFound(*id))),
            Err(e) => return Err(service_reject(e.into())),
        }
    }

    if let [photo] = photos.as_slice() {
        let path = paths.resolve_url(&photo.original_url);
        let data = std::fs::read(&path).map_err(|source| {
            service_reject(ServiceError::StorageRead {
                path: path.clone(),
                source,
            })
        })?;

        let content_type = mimetype_detector::from_path(Path::new(&photo.file_name))
            .map(|m| m.to_string())
            .unwrap_or_else(|| "application/octet-stream".to_string());

        let reply = warp::reply::with_header(data, "content-type", content_type);
        let reply = warp::reply::with_header(
            reply,
            "content-disposition",
            format!("attachment; filename=\"{}\"", photo.file_name),
        );
        return Ok(Box::new(reply));
    }

    let entries: Vec<_> = photos
        .iter()
        .map(|p| (p.file_name.clone(), paths.resolve_url(&p.original_url)))
        .collect();
    let data = archive::zip_files(&entries).map_err(service_reject)?;

    let reply = warp::reply::with_header(data, "content-type", "application/zip");
    let reply = warp::reply::with_header(
        reply,
        "content-disposition",
        format!("attachment; filename=\"{}_dump.zip\"", album_id),
    );
    Ok(Box::new(reply))
}

pub async fn move_photo(
    from_album_id: i64,
    photo_id: i64,
    request: MovePhotoRequest,
    mover: PhotoMover,
) -> Result<impl Reply, Rejection> {
    let photo = mover
        .move_photo(photo_id, from_album_id, request.to_album_id)
        .map_err(service_reject)?;
    Ok(warp::reply::json(&photo))
}
