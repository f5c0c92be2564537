use crate::db::{DbPool, DbResult, Photo};

/// Splits a filename at the last dot. A name without a dot yields an empty
/// extension; collision candidates still get the dot separator appended
/// ("name" -> "name (2)."), a quirk kept for parity with existing stored
/// names rather than normalized away.
pub fn split_filename(filename: &str) -> (&str, &str) {
    match filename.rsplit_once('.') {
        Some((base, ext)) => (base, ext),
        None => (filename, ""),
    }
}

/// Resolves a collision-free filename within an album: the desired name if
/// unused, otherwise "{base} (2).{ext}", "{base} (3).{ext}", ... counting up
/// until a free name is found.
///
/// The existence check and the eventual insert are not atomic; under
/// concurrent uploads two callers can resolve to the same candidate. The
/// store's UNIQUE(album_id, file_name) constraint catches that, and the
/// ingestion pipeline re-resolves and retries.
pub fn next_available_filename(
    pool: &DbPool,
    album_id: i64,
    desired: &str,
) -> DbResult<String> {
    if Photo::find_by_filename_and_album(pool, desired, album_id)?.is_none() {
        return Ok(desired.to_string());
    }

    let (base, ext) = split_filename(desired);
    let mut count = 2;
    loop {
        let candidate = format!("{} ({}).{}", base, count, ext);
        if Photo::find_by_filename_and_album(pool, &candidate, album_id)?.is_none() {
            return Ok(candidate);
        }
        count += 1;
    }
}
