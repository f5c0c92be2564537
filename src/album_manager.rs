use std::path::Path;

use log::warn;

use crate::db::{Album, DbPool};
use crate::errors::{ServiceError, ServiceResult};
use crate::storage_paths::StoragePaths;

/// Keeps album records and their on-disk directory pair in step: an album's
/// directories exist exactly as long as its record does.
#[derive(Clone)]
pub struct AlbumManager {
    pool: DbPool,
    paths: StoragePaths,
}

impl AlbumManager {
    pub fn new(pool: DbPool, paths: StoragePaths) -> Self {
        Self { pool, paths }
    }

    /// Two-phase create: record first, then the directory pair. If directory
    /// creation fails the record is deleted again, so "record exists but
    /// directories missing" never persists.
    pub fn create(&self, album_name: &str) -> ServiceResult<Album> {
        let album = Album::create(&self.pool, album_name)?;

        let dirs = [
            self.paths.original_dir(album.album_id),
            self.paths.thumb_dir(album.album_id),
        ];
        for dir in &dirs {
            if let Err(source) = std::fs::create_dir_all(dir) {
                let cause = ServiceError::StorageWrite {
                    path: dir.clone(),
                    source,
                };
                return Err(self.rollback_create(album.album_id, cause));
            }
        }

        Ok(album)
    }

    pub fn get(&self, album_id: i64) -> ServiceResult<Album> {
        Album::find_by_id(&self.pool, album_id)?
            .ok_or(ServiceError::AlbumNotFound(album_id))
    }

    pub fn rename(&self, album_id: i64, album_name: &str) -> ServiceResult<Album> {
        if !Album::rename(&self.pool, album_id, album_name)? {
            return Err(ServiceError::AlbumNotFound(album_id));
        }
        self.get(album_id)
    }

    /// Removes the album record (child photo records cascade with it), then
    /// every contained file, then the directories themselves. Already-absent
    /// files and directories count as deleted.
    pub fn delete(&self, album_id: i64) -> ServiceResult<()> {
        if Album::find_by_id(&self.pool, album_id)?.is_none() {
            return Err(ServiceError::AlbumNotFound(album_id));
        }

        Album::delete(&self.pool, album_id)?;

        for dir in [
            self.paths.original_dir(album_id),
            self.paths.thumb_dir(album_id),
        ] {
            clean_directory(&dir)?;
            remove_directory(&dir)?;
        }

        Ok(())
    }

    fn rollback_create(&self, album_id: i64, cause: ServiceError) -> ServiceError {
        let mut orphans = Vec::new();
        for dir in [
            self.paths.original_dir(album_id),
            self.paths.thumb_dir(album_id),
        ] {
            if let Err(e) = remove_directory(&dir) {
                warn!("create rollback: {}", e);
                orphans.push(dir);
            }
        }

        match Album::delete(&self.pool, album_id) {
            Ok(_) if orphans.is_empty() => cause,
            Ok(_) => ServiceError::PartialFailure {
                detail: format!("directories left behind after: {}", cause),
                paths: orphans,
            },
            Err(e) => {
                warn!("create rollback: record {} could not be deleted: {}", album_id, e);
                ServiceError::PartialFailure {
                    detail: format!("album record {} left without directories after: {}", album_id, cause),
                    paths: orphans,
                }
            }
        }
    }
}

fn clean_directory(dir: &Path) -> ServiceResult<()> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(source) => {
            return Err(ServiceError::StorageRead {
                path: dir.to_path_buf(),
                source,
            })
        }
    };

    for entry in entries {
        let entry = entry.map_err(|source| ServiceError::StorageRead {
            path: dir.to_path_buf(),
            source,
        })?;
        match std::fs::remove_file(entry.path()) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(source) => {
                return Err(ServiceError::StorageWrite {
                    path: entry.path(),
                    source,
                })
            }
        }
    }
    Ok(())
}

fn remove_directory(dir: &Path) -> ServiceResult<()> {
    match std::fs::remove_dir(dir) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(ServiceError::StorageWrite {
            path: dir.to_path_buf(),
            source,
        }),
    }
}
