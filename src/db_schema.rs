use rusqlite::{Connection, Result as SqlResult};

// Schema definitions
pub const ALBUMS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS albums (
    album_id INTEGER PRIMARY KEY AUTOINCREMENT,
    album_name TEXT NOT NULL,
    created_at DATETIME NOT NULL
)
"#;

// Filename uniqueness per album is enforced here, not in application code:
// concurrent uploads that race the collision resolver fail the constraint and
// are retried with a fresh name (see photo_ingest).
pub const PHOTOS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS photos (
    photo_id INTEGER PRIMARY KEY AUTOINCREMENT,
    album_id INTEGER NOT NULL REFERENCES albums(album_id) ON DELETE CASCADE,
    file_name TEXT NOT NULL,
    original_url TEXT NOT NULL,
    thumb_url TEXT NOT NULL,
    file_size INTEGER NOT NULL,
    uploaded_at DATETIME NOT NULL,
    UNIQUE (album_id, file_name)
)
"#;

pub const SCHEMA_SQL: &[&str] = &[
    ALBUMS_TABLE,
    PHOTOS_TABLE,
    "CREATE INDEX IF NOT EXISTS idx_albums_album_name ON albums(album_name);",
    "CREATE INDEX IF NOT EXISTS idx_photos_album_id ON photos(album_id);",
    "CREATE INDEX IF NOT EXISTS idx_photos_uploaded_at ON photos(uploaded_at);",
];

pub fn initialize_schema(conn: &Connection) -> SqlResult<()> {
    for sql in SCHEMA_SQL {
        conn.execute(sql, [])?;
    }
    Ok(())
}
