use std::path::{Path, PathBuf};

use log::warn;

use crate::db::{Album, DbPool, Photo};
use crate::errors::{ServiceError, ServiceResult};
use crate::storage_paths::StoragePaths;

/// Relocates a photo's file pair between album directories and rewrites its
/// record in step. The two renames and the record update behave as one unit:
/// a later failure reverts the earlier steps, and when a revert itself fails
/// the inconsistent paths are surfaced, never swallowed.
#[derive(Clone)]
pub struct PhotoMover {
    pool: DbPool,
    paths: StoragePaths,
}

impl PhotoMover {
    pub fn new(pool: DbPool, paths: StoragePaths) -> Self {
        Self { pool, paths }
    }

    pub fn move_photo(
        &self,
        photo_id: i64,
        from_album_id: i64,
        to_album_id: i64,
    ) -> ServiceResult<Photo> {
        let photo = Photo::find_by_id(&self.pool, photo_id)?
            .ok_or(ServiceError::PhotoNotFound(photo_id))?;

        // Stale-caller protection; nothing has touched the filesystem yet
        if photo.album_id != from_album_id {
            return Err(ServiceError::AlbumMismatch {
                photo_id,
                expected_album_id: from_album_id,
            });
        }

        if Album::find_by_id(&self.pool, to_album_id)?.is_none() {
            return Err(ServiceError::AlbumNotFound(to_album_id));
        }

        let src_original = self.paths.resolve_url(&photo.original_url);
        let src_thumb = self.paths.resolve_url(&photo.thumb_url);
        let dst_original = self.paths.original_path(to_album_id, &photo.file_name);
        let dst_thumb = self.paths.thumb_path(to_album_id, &photo.file_name);

        move_file(&src_original, &dst_original)?;

        if let Err(e) = move_file(&src_thumb, &dst_thumb) {
            if let Err(revert) = move_file(&dst_original, &src_original) {
                warn!("move revert failed: {}", revert);
                return Err(ServiceError::PartialFailure {
                    detail: format!(
                        "original moved but thumbnail did not follow, and the revert failed: {}",
                        e
                    ),
                    paths: vec![dst_original, src_thumb],
                });
            }
            return Err(e);
        }

        let original_url = self.paths.original_url(to_album_id, &photo.file_name);
        let thumb_url = self.paths.thumb_url(to_album_id, &photo.file_name);

        if let Err(db_err) =
            Photo::update_location(&self.pool, photo_id, to_album_id, &original_url, &thumb_url)
        {
            let mut stuck: Vec<PathBuf> = Vec::new();
            for (dst, src) in [(&dst_original, &src_original), (&dst_thumb, &src_thumb)] {
                if let Err(revert) = move_file(dst, src) {
                    warn!("move revert failed: {}", revert);
                    stuck.push(dst.clone());
                }
            }
            if stuck.is_empty() {
                return Err(db_err.into());
            }
            return Err(ServiceError::PartialFailure {
                detail: format!("files moved but the record update failed: {}", db_err),
                paths: stuck,
            });
        }

        Ok(Photo {
            album_id: to_album_id,
            original_url,
            thumb_url,
            ..photo
        })
    }
}

/// Rename with destination overwrite, matching the replace semantics of the
/// upload paths (a same-named file already at the destination is replaced).
fn move_file(src: &Path, dst: &Path) -> ServiceResult<()> {
    std::fs::rename(src, dst).map_err(|source| ServiceError::StorageWrite {
        path: dst.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_test_db_pool;
    use tempfile::TempDir;

    fn test_mover() -> (PhotoMover, DbPool, StoragePaths, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let pool = create_test_db_pool().unwrap();
        let paths = StoragePaths::new(temp_dir.path());
        let mover = PhotoMover::new(pool.clone(), paths.clone());
        (mover, pool, paths, temp_dir)
    }

    fn album_with_dirs(pool: &DbPool, paths: &StoragePaths, name: &str) -> Album {
        let album = Album::create(pool, name).unwrap();
        std::fs::create_dir_all(paths.original_dir(album.album_id)).unwrap();
        std::fs::create_dir_all(paths.thumb_dir(album.album_id)).unwrap();
        album
    }

    fn photo_with_files(pool: &DbPool, paths: &StoragePaths, album: &Album, name: &str) -> Photo {
        let photo = Photo::create(
            pool,
            album.album_id,
            name,
            &paths.original_url(album.album_id, name),
            &paths.thumb_url(album.album_id, name),
            9,
        )
        .unwrap();
        std::fs::write(paths.original_path(album.album_id, name), b"original!").unwrap();
        std::fs::write(paths.thumb_path(album.album_id, name), b"thumbnail").unwrap();
        photo
    }

    #[test]
    fn test_move_relocates_files_and_record() {
        let (mover, pool, paths, _tmp) = test_mover();
        let from = album_with_dirs(&pool, &paths, "From");
        let to = album_with_dirs(&pool, &paths, "To");
        let photo = photo_with_files(&pool, &paths, &from, "a.jpg");

        let moved = mover
            .move_photo(photo.photo_id, from.album_id, to.album_id)
            .unwrap();

        assert_eq!(moved.album_id, to.album_id);
        assert_eq!(
            moved.original_url,
            format!("/photos/original/{}/a.jpg", to.album_id)
        );

        assert!(!paths.original_path(from.album_id, "a.jpg").exists());
        assert!(!paths.thumb_path(from.album_id, "a.jpg").exists());
        assert!(paths.original_path(to.album_id, "a.jpg").exists());
        assert!(paths.thumb_path(to.album_id, "a.jpg").exists());

        let stored = Photo::find_by_id(&pool, photo.photo_id).unwrap().unwrap();
        assert_eq!(stored.album_id, to.album_id);
        assert_eq!(stored.thumb_url, format!("/photos/thumb/{}/a.jpg", to.album_id));
    }

    #[test]
    fn test_stale_caller_fails_without_filesystem_changes() {
        let (mover, pool, paths, _tmp) = test_mover();
        let from = album_with_dirs(&pool, &paths, "From");
        let to = album_with_dirs(&pool, &paths, "To");
        let wrong = album_with_dirs(&pool, &paths, "Wrong");
        let photo = photo_with_files(&pool, &paths, &from, "a.jpg");

        let err = mover
            .move_photo(photo.photo_id, wrong.album_id, to.album_id)
            .unwrap_err();

        assert!(matches!(err, ServiceError::AlbumMismatch { .. }));
        assert!(paths.original_path(from.album_id, "a.jpg").exists());
        assert!(paths.thumb_path(from.album_id, "a.jpg").exists());
        assert!(!paths.original_path(to.album_id, "a.jpg").exists());
    }

    #[test]
    fn test_move_missing_photo() {
        let (mover, pool, paths, _tmp) = test_mover();
        let from = album_with_dirs(&pool, &paths, "From");
        let to = album_with_dirs(&pool, &paths, "To");

        let err = mover.move_photo(555, from.album_id, to.album_id).unwrap_err();
        assert!(matches!(err, ServiceError::PhotoNotFound(555)));
    }

    #[test]
    fn test_move_to_missing_album() {
        let (mover, pool, paths, _tmp) = test_mover();
        let from = album_with_dirs(&pool, &paths, "From");
        let photo = photo_with_files(&pool, &paths, &from, "a.jpg");

        let err = mover.move_photo(photo.photo_id, from.album_id, 999).unwrap_err();
        assert!(matches!(err, ServiceError::AlbumNotFound(999)));
        assert!(paths.original_path(from.album_id, "a.jpg").exists());
    }

    #[test]
    fn test_move_overwrites_same_name_at_destination() {
        let (mover, pool, paths, _tmp) = test_mover();
        let from = album_with_dirs(&pool, &paths, "From");
        let to = album_with_dirs(&pool, &paths, "To");
        let photo = photo_with_files(&pool, &paths, &from, "a.jpg");

        std::fs::write(paths.original_path(to.album_id, "a.jpg"), b"old bytes").unwrap();
        std::fs::write(paths.thumb_path(to.album_id, "a.jpg"), b"old thumb").unwrap();

        mover
            .move_photo(photo.photo_id, from.album_id, to.album_id)
            .unwrap();

        let replaced = std::fs::read(paths.original_path(to.album_id, "a.jpg")).unwrap();
        assert_eq!(replaced, b"original!");
    }

    #[test]
    fn test_thumbnail_move_failure_reverts_original() {
        let (mover, pool, paths, _tmp) = test_mover();
        let from = album_with_dirs(&pool, &paths, "From");
        let to = album_with_dirs(&pool, &paths, "To");
        let photo = photo_with_files(&pool, &paths, &from, "a.jpg");

        // Losing the thumbnail makes the second rename fail after the first
        // one succeeded; the original must come back to the source album.
        std::fs::remove_file(paths.thumb_path(from.album_id, "a.jpg")).unwrap();

        let err = mover
            .move_photo(photo.photo_id, from.album_id, to.album_id)
            .unwrap_err();

        assert!(matches!(err, ServiceError::StorageWrite { .. }));
        assert!(paths.original_path(from.album_id, "a.jpg").exists());
        assert!(!paths.original_path(to.album_id, "a.jpg").exists());

        let stored = Photo::find_by_id(&pool, photo.photo_id).unwrap().unwrap();
        assert_eq!(stored.album_id, from.album_id);
    }
}
