use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

use crate::db_schema::initialize_schema;

pub type DbPool = r2d2::Pool<r2d2_sqlite::SqliteConnectionManager>;

pub fn create_db_pool(database_path: &str) -> Result<DbPool, Box<dyn std::error::Error>> {
    // Create parent directory if it doesn't exist
    if let Some(parent) = std::path::Path::new(database_path).parent() {
        std::fs::create_dir_all(parent)?;
    }

    // foreign_keys and busy_timeout are connection-scoped, so they run on every
    // pooled connection; cascade delete of photo records depends on the former.
    let manager = SqliteConnectionManager::file(database_path).with_init(|conn| {
        conn.execute_batch(
            "PRAGMA foreign_keys = ON;
             PRAGMA busy_timeout = 5000;",
        )
    });
    let pool = Pool::new(manager)?;

    // Initialize schema and configure database-level pragmas on a connection
    // from the pool. WAL improves concurrency between readers and writers.
    {
        let conn = pool.get()?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA temp_store = MEMORY;",
        )?;
        initialize_schema(&conn)?;
    }

    Ok(pool)
}

#[cfg(test)]
pub fn create_in_memory_pool() -> Result<DbPool, Box<dyn std::error::Error>> {
    let manager = SqliteConnectionManager::memory().with_init(|conn| {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(conn)?;
        Ok(())
    });
    let pool = Pool::new(manager)?;

    Ok(pool)
}
