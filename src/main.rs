mod album_manager;
mod archive;
mod config;
mod db;
mod db_pool;
mod db_schema;
mod db_types;
mod errors;
mod filename_resolver;
mod mimetype_detector;
mod photo_ingest;
mod photo_mover;
mod storage_paths;
mod thumbnailer;
mod warp_handlers;
mod warp_helpers;

use log::{error, info};
use std::net::TcpListener;
use warp::Filter;

use album_manager::AlbumManager;
use db_pool::DbPool;
use photo_ingest::PhotoIngestor;
use photo_mover::PhotoMover;
use storage_paths::StoragePaths;
use thumbnailer::Thumbnailer;
use warp_helpers::{
    cors, handle_rejection, with_albums, with_db, with_ingestor, with_mover, with_paths,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let config = config::Config::from_env()?;
    let port = config.port;

    info!("Starting Shutterbox server on Port {}", port);
    info!("Storage root: {}", config.storage_root);
    info!("Database: {}", config.db_path);
    info!("Thumbnail bound: {}px", config.thumbnail_size);

    // Check if port is available BEFORE initializing services
    if !is_port_available(&config.host, port) {
        error!(
            "Port {} is already in use. Please stop any existing Shutterbox instances or use a different port.",
            port
        );
        return Err(format!("Port {} is already in use", port).into());
    }

    let addr: std::net::SocketAddr = format!("{}:{}", config.host, port).parse()?;

    let (db_pool, paths, albums, ingestor, mover) = initialize_services(&config)?;

    let health_routes = build_health_routes(db_pool.clone());
    let album_routes = build_album_routes(db_pool.clone(), albums);
    let photo_routes = build_photo_routes(db_pool, paths, ingestor, mover, &config);

    let routes = health_routes
        .or(album_routes)
        .or(photo_routes)
        .with(cors())
        .with(warp::log("shutterbox"))
        .recover(handle_rejection);

    info!(
        "Server started successfully, listening on http://localhost:{}",
        port
    );

    warp::serve(routes).run(addr).await;

    Ok(())
}

fn is_port_available(host: &str, port: u16) -> bool {
    TcpListener::bind((host, port)).is_ok()
}

type InitServicesResult = (DbPool, StoragePaths, AlbumManager, PhotoIngestor, PhotoMover);

fn initialize_services(
    config: &config::Config,
) -> Result<InitServicesResult, Box<dyn std::error::Error>> {
    let db_pool = db::create_db_pool(&config.db_path)?;
    info!("Database initialized successfully");

    std::fs::create_dir_all(&config.storage_root)?;
    let paths = StoragePaths::new(config.storage_root.as_str());

    let thumbnailer = Thumbnailer::new(config.thumbnail_size);
    let albums = AlbumManager::new(db_pool.clone(), paths.clone());
    let ingestor = PhotoIngestor::new(db_pool.clone(), paths.clone(), thumbnailer);
    let mover = PhotoMover::new(db_pool.clone(), paths.clone());
    info!("Storage and ingestion system initialized");

    Ok((db_pool, paths, albums, ingestor, mover))
}

fn build_health_routes(
    db_pool: DbPool,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    let health = warp::path("health")
        .and(warp::path::end())
        .and(warp::get())
        .and_then(warp_handlers::health_check);

    let ready = warp::path("ready")
        .and(warp::path::end())
        .and(warp::get())
        .and(with_db(db_pool))
        .and_then(warp_handlers::ready_check);

    health.or(ready)
}

fn build_album_routes(
    db_pool: DbPool,
    albums: AlbumManager,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    let albums_list = warp::path("albums")
        .and(warp::path::end())
        .and(warp::get())
        .and(warp::query::<warp_handlers::ListQuery>())
        .and(with_db(db_pool.clone()))
        .and_then(warp_handlers::list_albums);

    let album_get = warp::path("albums")
        .and(warp::path::param::<i64>())
        .and(warp::path::end())
        .and(warp::get())
        .and(with_db(db_pool.clone()))
        .and(with_albums(albums.clone()))
        .and_then(warp_handlers::get_album);

    let album_create = warp::path("albums")
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::body::json::<warp_handlers::CreateAlbumRequest>())
        .and(with_db(db_pool.clone()))
        .and(with_albums(albums.clone()))
        .and_then(warp_handlers::create_album);

    let album_rename = warp::path("albums")
        .and(warp::path::param::<i64>())
        .and(warp::path::end())
        .and(warp::put())
        .and(warp::body::json::<warp_handlers::RenameAlbumRequest>())
        .and(with_db(db_pool))
        .and(with_albums(albums.clone()))
        .and_then(warp_handlers::rename_album);

    let album_delete = warp::path("albums")
        .and(warp::path::param::<i64>())
        .and(warp::path::end())
        .and(warp::delete())
        .and(with_albums(albums))
        .and_then(warp_handlers::delete_album);

    albums_list
        .or(album_get)
        .or(album_create)
        .or(album_rename)
        .or(album_delete)
}

fn build_photo_routes(
    db_pool: DbPool,
    paths: StoragePaths,
    ingestor: PhotoIngestor,
    mover: PhotoMover,
    config: &config::Config,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    let photos_list = warp::path("albums")
        .and(warp::path::param::<i64>())
        .and(warp::path("photos"))
        .and(warp::path::end())
        .and(warp::get())
        .and(warp::query::<warp_handlers::ListQuery>())
        .and(with_db(db_pool.clone()))
        .and_then(warp_handlers::list_photos);

    let photos_download = warp::path("albums")
        .and(warp::path::param::<i64>())
        .and(warp::path("photos"))
        .and(warp::path("download"))
        .and(warp::path::end())
        .and(warp::get())
        .and(warp::query::<warp_handlers::DownloadQuery>())
        .and(with_db(db_pool.clone()))
        .and(with_paths(paths))
        .and_then(warp_handlers::download_photos);

    let photo_get = warp::path("albums")
        .and(warp::path::param::<i64>())
        .and(warp::path("photos"))
        .and(warp::path::param::<i64>())
        .and(warp::path::end())
        .and(warp::get())
        .and(with_db(db_pool))
        .and_then(warp_handlers::get_photo);

    let photos_upload = warp::path("albums")
        .and(warp::path::param::<i64>())
        .and(warp::path("photos"))
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::multipart::form().max_length(config.max_upload_mb * 1024 * 1024))
        .and(with_ingestor(ingestor))
        .and_then(warp_handlers::upload_photos);

    let photo_move = warp::path("albums")
        .and(warp::path::param::<i64>())
        .and(warp::path("photos"))
        .and(warp::path::param::<i64>())
        .and(warp::path("move"))
        .and(warp::path::end())
        .and(warp::put())
        .and(warp::body::json::<warp_handlers::MovePhotoRequest>())
        .and(with_mover(mover))
        .and_then(warp_handlers::move_photo);

    photos_list
        .or(photos_download)
        .or(photo_get)
        .or(photos_upload)
        .or(photo_move)
}
