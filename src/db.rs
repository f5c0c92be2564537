use chrono::{DateTime, Utc};
use rusqlite::{params, Result as SqlResult, Row};
use serde::Serialize;

pub use crate::db_pool::{create_db_pool, DbPool};
use crate::db_types::{SortField, SortOrder};

#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),
    #[error("database error: {0}")]
    Sql(#[from] rusqlite::Error),
}

impl DbError {
    /// True when an insert lost against the UNIQUE(album_id, file_name)
    /// constraint; the ingestion pipeline retries with a fresh name.
    pub fn is_unique_violation(&self) -> bool {
        matches!(
            self,
            DbError::Sql(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::ConstraintViolation
        )
    }
}

pub type DbResult<T> = Result<T, DbError>;

fn parse_datetime(idx: usize, value: String) -> SqlResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| {
            rusqlite::Error::InvalidColumnType(idx, value, rusqlite::types::Type::Text)
        })
}

#[derive(Debug, Clone, Serialize)]
pub struct Album {
    pub album_id: i64,
    pub album_name: String,
    pub created_at: DateTime<Utc>,
}

impl Album {
    pub fn from_row(row: &Row) -> SqlResult<Self> {
        Ok(Album {
            album_id: row.get(0)?,
            album_name: row.get(1)?,
            created_at: parse_datetime(2, row.get::<_, String>(2)?)?,
        })
    }

    /// Inserts the record; id and creation timestamp are assigned here.
    pub fn create(pool: &DbPool, album_name: &str) -> DbResult<Album> {
        let conn = pool.get()?;
        let created_at = Utc::now();
        conn.execute(
            "INSERT INTO albums (album_name, created_at) VALUES (?1, ?2)",
            params![album_name, created_at.to_rfc3339()],
        )?;
        Ok(Album {
            album_id: conn.last_insert_rowid(),
            album_name: album_name.to_string(),
            created_at,
        })
    }

    pub fn find_by_id(pool: &DbPool, album_id: i64) -> DbResult<Option<Album>> {
        let conn = pool.get()?;
        let mut stmt = conn.prepare(
            "SELECT album_id, album_name, created_at FROM albums WHERE album_id = ?",
        )?;

        match stmt.query_row([album_id], Album::from_row) {
            Ok(album) => Ok(Some(album)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Returns false when no album had this id.
    pub fn rename(pool: &DbPool, album_id: i64, album_name: &str) -> DbResult<bool> {
        let conn = pool.get()?;
        let changed = conn.execute(
            "UPDATE albums SET album_name = ?1 WHERE album_id = ?2",
            params![album_name, album_id],
        )?;
        Ok(changed > 0)
    }

    /// Child photo records go with the album via ON DELETE CASCADE.
    pub fn delete(pool: &DbPool, album_id: i64) -> DbResult<bool> {
        let conn = pool.get()?;
        let changed = conn.execute("DELETE FROM albums WHERE album_id = ?", [album_id])?;
        Ok(changed > 0)
    }

    /// Albums whose name contains `keyword` (empty keyword matches all),
    /// ordered by the requested dimension. The ORDER BY clause is built from
    /// validated enums only, never from raw request input.
    pub fn list_by_name_substring(
        pool: &DbPool,
        keyword: &str,
        sort: SortField,
        order: SortOrder,
    ) -> DbResult<Vec<Album>> {
        let conn = pool.get()?;

        let sort_column = match sort {
            SortField::Name => "album_name",
            SortField::Date => "created_at",
        };
        let sql = format!(
            "SELECT album_id, album_name, created_at FROM albums
             WHERE album_name LIKE ?1 ORDER BY {} {}",
            sort_column,
            order.as_sql()
        );

        let pattern = format!("%{}%", keyword);
        let mut stmt = conn.prepare(&sql)?;
        let album_iter = stmt.query_map([pattern], Album::from_row)?;

        let mut albums = Vec::new();
        for album in album_iter {
            albums.push(album?);
        }
        Ok(albums)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Photo {
    pub photo_id: i64,
    pub album_id: i64,
    pub file_name: String,
    pub original_url: String,
    pub thumb_url: String,
    pub file_size: i64,
    pub uploaded_at: DateTime<Utc>,
}

impl Photo {
    pub fn from_row(row: &Row) -> SqlResult<Self> {
        Ok(Photo {
            photo_id: row.get(0)?,
            album_id: row.get(1)?,
            file_name: row.get(2)?,
            original_url: row.get(3)?,
            thumb_url: row.get(4)?,
            file_size: row.get(5)?,
            uploaded_at: parse_datetime(6, row.get::<_, String>(6)?)?,
        })
    }

    const COLUMNS: &'static str =
        "photo_id, album_id, file_name, original_url, thumb_url, file_size, uploaded_at";

    /// Inserts the record; id and upload timestamp are assigned here. Fails
    /// with a unique violation when the filename is already taken in the
    /// album (see DbError::is_unique_violation).
    pub fn create(
        pool: &DbPool,
        album_id: i64,
        file_name: &str,
        original_url: &str,
        thumb_url: &str,
        file_size: i64,
    ) -> DbResult<Photo> {
        let conn = pool.get()?;
        let uploaded_at = Utc::now();
        conn.execute(
            r#"
            INSERT INTO photos (album_id, file_name, original_url, thumb_url, file_size, uploaded_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                album_id,
                file_name,
                original_url,
                thumb_url,
                file_size,
                uploaded_at.to_rfc3339(),
            ],
        )?;
        Ok(Photo {
            photo_id: conn.last_insert_rowid(),
            album_id,
            file_name: file_name.to_string(),
            original_url: original_url.to_string(),
            thumb_url: thumb_url.to_string(),
            file_size,
            uploaded_at,
        })
    }

    pub fn find_by_id(pool: &DbPool, photo_id: i64) -> DbResult<Option<Photo>> {
        let conn = pool.get()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM photos WHERE photo_id = ?",
            Self::COLUMNS
        ))?;

        match stmt.query_row([photo_id], Photo::from_row) {
            Ok(photo) => Ok(Some(photo)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn find_by_filename_and_album(
        pool: &DbPool,
        file_name: &str,
        album_id: i64,
    ) -> DbResult<Option<Photo>> {
        let conn = pool.get()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM photos WHERE file_name = ?1 AND album_id = ?2",
            Self::COLUMNS
        ))?;

        match stmt.query_row(params![file_name, album_id], Photo::from_row) {
            Ok(photo) => Ok(Some(photo)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn list_by_album(
        pool: &DbPool,
        album_id: i64,
        sort: SortField,
        order: SortOrder,
    ) -> DbResult<Vec<Photo>> {
        let conn = pool.get()?;

        let sort_column = match sort {
            SortField::Name => "file_name",
            SortField::Date => "uploaded_at",
        };
        let sql = format!(
            "SELECT {} FROM photos WHERE album_id = ? ORDER BY {} {}",
            Self::COLUMNS,
            sort_column,
            order.as_sql()
        );

        let mut stmt = conn.prepare(&sql)?;
        let photo_iter = stmt.query_map([album_id], Photo::from_row)?;

        let mut photos = Vec::new();
        for photo in photo_iter {
            photos.push(photo?);
        }
        Ok(photos)
    }

    /// Most recently uploaded photos of an album, for the cover strip.
    pub fn find_top_by_album(pool: &DbPool, album_id: i64, limit: i64) -> DbResult<Vec<Photo>> {
        let conn = pool.get()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM photos WHERE album_id = ?1 ORDER BY uploaded_at DESC LIMIT ?2",
            Self::COLUMNS
        ))?;
        let photo_iter = stmt.query_map(params![album_id, limit], Photo::from_row)?;

        let mut photos = Vec::new();
        for photo in photo_iter {
            photos.push(photo?);
        }
        Ok(photos)
    }

    pub fn count_by_album(pool: &DbPool, album_id: i64) -> DbResult<i64> {
        let conn = pool.get()?;
        let count = conn.query_row(
            "SELECT COUNT(*) FROM photos WHERE album_id = ?",
            [album_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Rewrites the album reference and both URLs after a relocation.
    pub fn update_location(
        pool: &DbPool,
        photo_id: i64,
        album_id: i64,
        original_url: &str,
        thumb_url: &str,
    ) -> DbResult<()> {
        let conn = pool.get()?;
        conn.execute(
            r#"
            UPDATE photos SET album_id = ?1, original_url = ?2, thumb_url = ?3
            WHERE photo_id = ?4
            "#,
            params![album_id, original_url, thumb_url, photo_id],
        )?;
        Ok(())
    }
}

#[cfg(test)]
pub fn create_test_db_pool() -> Result<DbPool, Box<dyn std::error::Error>> {
    crate::db_pool::create_in_memory_pool()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_album_create_and_find() {
        let pool = create_test_db_pool().unwrap();

        let album = Album::create(&pool, "Trip").unwrap();
        assert!(album.album_id > 0);

        let found = Album::find_by_id(&pool, album.album_id).unwrap().unwrap();
        assert_eq!(found.album_name, "Trip");
        assert_eq!(found.created_at, album.created_at);

        assert!(Album::find_by_id(&pool, album.album_id + 1)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_album_rename() {
        let pool = create_test_db_pool().unwrap();
        let album = Album::create(&pool, "Trip").unwrap();

        assert!(Album::rename(&pool, album.album_id, "Summer Trip").unwrap());
        let found = Album::find_by_id(&pool, album.album_id).unwrap().unwrap();
        assert_eq!(found.album_name, "Summer Trip");

        assert!(!Album::rename(&pool, 9999, "Nope").unwrap());
    }

    #[test]
    fn test_album_list_by_name_substring() {
        let pool = create_test_db_pool().unwrap();
        Album::create(&pool, "Summer 2023").unwrap();
        Album::create(&pool, "Winter 2023").unwrap();
        Album::create(&pool, "Summer 2024").unwrap();

        let summers =
            Album::list_by_name_substring(&pool, "Summer", SortField::Name, SortOrder::Asc)
                .unwrap();
        assert_eq!(summers.len(), 2);
        assert_eq!(summers[0].album_name, "Summer 2023");
        assert_eq!(summers[1].album_name, "Summer 2024");

        let all = Album::list_by_name_substring(&pool, "", SortField::Name, SortOrder::Desc)
            .unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].album_name, "Winter 2023");
    }

    #[test]
    fn test_photo_unique_violation_detection() {
        let pool = create_test_db_pool().unwrap();
        let album = Album::create(&pool, "Trip").unwrap();

        Photo::create(&pool, album.album_id, "a.jpg", "/o", "/t", 10).unwrap();
        let err = Photo::create(&pool, album.album_id, "a.jpg", "/o", "/t", 10).unwrap_err();
        assert!(err.is_unique_violation());

        // Same name in a different album is fine
        let other = Album::create(&pool, "Other").unwrap();
        assert!(Photo::create(&pool, other.album_id, "a.jpg", "/o", "/t", 10).is_ok());
    }

    #[test]
    fn test_photo_list_sorting() {
        let pool = create_test_db_pool().unwrap();
        let album = Album::create(&pool, "Trip").unwrap();

        // Upload timestamps must differ for the byDate assertion to be stable
        for name in ["b.jpg", "a.jpg", "c.jpg"] {
            Photo::create(&pool, album.album_id, name, "/o", "/t", 1).unwrap();
            std::thread::sleep(std::time::Duration::from_millis(5));
        }

        let by_name =
            Photo::list_by_album(&pool, album.album_id, SortField::Name, SortOrder::Asc).unwrap();
        let names: Vec<_> = by_name.iter().map(|p| p.file_name.as_str()).collect();
        assert_eq!(names, vec!["a.jpg", "b.jpg", "c.jpg"]);

        let by_date =
            Photo::list_by_album(&pool, album.album_id, SortField::Date, SortOrder::Asc).unwrap();
        let names: Vec<_> = by_date.iter().map(|p| p.file_name.as_str()).collect();
        assert_eq!(names, vec!["b.jpg", "a.jpg", "c.jpg"]);
    }

    #[test]
    fn test_photo_count_and_top() {
        let pool = create_test_db_pool().unwrap();
        let album = Album::create(&pool, "Trip").unwrap();

        for name in ["a.jpg", "b.jpg", "c.jpg", "d.jpg", "e.jpg"] {
            Photo::create(&pool, album.album_id, name, "/o", "/t", 1).unwrap();
        }

        assert_eq!(Photo::count_by_album(&pool, album.album_id).unwrap(), 5);
        assert_eq!(Photo::count_by_album(&pool, 9999).unwrap(), 0);

        let top = Photo::find_top_by_album(&pool, album.album_id, 4).unwrap();
        assert_eq!(top.len(), 4);
    }

    #[test]
    fn test_cascade_delete_removes_photos() {
        let pool = create_test_db_pool().unwrap();
        let album = Album::create(&pool, "Trip").unwrap();
        let photo = Photo::create(&pool, album.album_id, "a.jpg", "/o", "/t", 1).unwrap();

        assert!(Album::delete(&pool, album.album_id).unwrap());
        assert!(Photo::find_by_id(&pool, photo.photo_id).unwrap().is_none());
    }

    #[test]
    fn test_photo_update_location() {
        let pool = create_test_db_pool().unwrap();
        let from = Album::create(&pool, "From").unwrap();
        let to = Album::create(&pool, "To").unwrap();
        let photo = Photo::create(&pool, from.album_id, "a.jpg", "/o/old", "/t/old", 1).unwrap();

        Photo::update_location(&pool, photo.photo_id, to.album_id, "/o/new", "/t/new").unwrap();

        let moved = Photo::find_by_id(&pool, photo.photo_id).unwrap().unwrap();
        assert_eq!(moved.album_id, to.album_id);
        assert_eq!(moved.original_url, "/o/new");
        assert_eq!(moved.thumb_url, "/t/new");
        assert_eq!(moved.uploaded_at, photo.uploaded_at);
    }
}
