use std::path::PathBuf;

use log::warn;

use crate::db::{Album, DbPool, Photo};
use crate::errors::{ServiceError, ServiceResult};
use crate::filename_resolver::next_available_filename;
use crate::storage_paths::StoragePaths;
use crate::thumbnailer::Thumbnailer;

/// Bound on re-resolving the filename after losing a uniqueness race to a
/// concurrent upload of the same name.
const NAME_RACE_RETRIES: u32 = 3;

enum AttemptError {
    /// Insert lost against UNIQUE(album_id, file_name); files already cleaned
    /// up, safe to retry with a fresh name.
    NameTaken,
    Failed(ServiceError),
}

/// Orchestrates an upload: collision resolution, original write, thumbnail
/// write, record insert. A failure after a file write rolls the files back;
/// nothing is observable unless the record insert succeeds.
#[derive(Clone)]
pub struct PhotoIngestor {
    pool: DbPool,
    paths: StoragePaths,
    thumbnailer: Thumbnailer,
}

impl PhotoIngestor {
    pub fn new(pool: DbPool, paths: StoragePaths, thumbnailer: Thumbnailer) -> Self {
        Self {
            pool,
            paths,
            thumbnailer,
        }
    }

    pub fn ingest(
        &self,
        bytes: &[u8],
        original_filename: &str,
        content_type_hint: Option<&str>,
        album_id: i64,
    ) -> ServiceResult<Photo> {
        if Album::find_by_id(&self.pool, album_id)?.is_none() {
            return Err(ServiceError::AlbumNotFound(album_id));
        }

        if let Some(hint) = content_type_hint {
            if !hint.starts_with("image") {
                return Err(ServiceError::InvalidInput(format!(
                    "not an image upload: {}",
                    hint
                )));
            }
        }

        let mut attempt = 0;
        loop {
            attempt += 1;
            let filename = next_available_filename(&self.pool, album_id, original_filename)?;

            match self.store_photo(bytes, &filename, album_id) {
                Ok(photo) => return Ok(photo),
                Err(AttemptError::Failed(e)) => return Err(e),
                Err(AttemptError::NameTaken) if attempt < NAME_RACE_RETRIES => {
                    warn!(
                        "filename {:?} in album {} was taken concurrently, retrying",
                        filename, album_id
                    );
                }
                Err(AttemptError::NameTaken) => {
                    return Err(ServiceError::InvalidInput(format!(
                        "could not store {:?}: filename kept being taken concurrently",
                        original_filename
                    )));
                }
            }
        }
    }

    fn store_photo(
        &self,
        bytes: &[u8],
        filename: &str,
        album_id: i64,
    ) -> Result<Photo, AttemptError> {
        let original_path = self.paths.original_path(album_id, filename);
        let thumb_path = self.paths.thumb_path(album_id, filename);

        std::fs::write(&original_path, bytes).map_err(|source| {
            AttemptError::Failed(ServiceError::StorageWrite {
                path: original_path.clone(),
                source,
            })
        })?;

        if let Err(e) = self
            .thumbnailer
            .render_to_path(bytes, filename, &thumb_path)
        {
            // A partially written thumbnail may exist alongside the original
            return Err(AttemptError::Failed(rollback_files(
                vec![thumb_path, original_path],
                e.into(),
            )));
        }

        let result = Photo::create(
            &self.pool,
            album_id,
            filename,
            &self.paths.original_url(album_id, filename),
            &self.paths.thumb_url(album_id, filename),
            bytes.len() as i64,
        );

        match result {
            Ok(photo) => Ok(photo),
            Err(e) if e.is_unique_violation() => {
                match remove_files(vec![thumb_path, original_path]) {
                    Ok(()) => Err(AttemptError::NameTaken),
                    Err(orphaned) => Err(AttemptError::Failed(ServiceError::PartialFailure {
                        detail: "files from a lost upload race could not be removed".to_string(),
                        paths: orphaned,
                    })),
                }
            }
            Err(e) => Err(AttemptError::Failed(rollback_files(
                vec![thumb_path, original_path],
                e.into(),
            ))),
        }
    }
}

/// Best-effort removal; already-absent files count as removed. Returns the
/// paths that could not be removed.
fn remove_files(paths: Vec<PathBuf>) -> Result<(), Vec<PathBuf>> {
    let mut orphaned = Vec::new();
    for path in paths {
        match std::fs::remove_file(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                warn!("rollback could not remove {}: {}", path.display(), e);
                orphaned.push(path);
            }
        }
    }
    if orphaned.is_empty() {
        Ok(())
    } else {
        Err(orphaned)
    }
}

/// Rolls back written files after a failed step. The original cause is
/// surfaced when cleanup succeeds; a PartialFailure naming the orphans when
/// it does not.
fn rollback_files(paths: Vec<PathBuf>, cause: ServiceError) -> ServiceError {
    match remove_files(paths) {
        Ok(()) => cause,
        Err(orphaned) => ServiceError::PartialFailure {
            detail: format!("rollback incomplete after: {}", cause),
            paths: orphaned,
        },
    }
}
