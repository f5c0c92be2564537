use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub host: String,
    pub storage_root: String,
    pub db_path: String,
    pub thumbnail_size: u32,
    pub max_upload_mb: u64,
}

impl Config {
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        Ok(Config {
            port: env::var("SHUTTERBOX_PORT")
                .unwrap_or_else(|_| "18620".to_string())
                .parse()?,
            host: env::var("SHUTTERBOX_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            storage_root: env::var("SHUTTERBOX_STORAGE_ROOT")
                .unwrap_or_else(|_| "./data/storage".to_string()),
            db_path: env::var("SHUTTERBOX_DB_PATH")
                .unwrap_or_else(|_| "./data/database/shutterbox.db".to_string()),
            thumbnail_size: env::var("SHUTTERBOX_THUMBNAIL_SIZE")
                .unwrap_or_else(|_| "300".to_string())
                .parse()?,
            max_upload_mb: env::var("SHUTTERBOX_MAX_UPLOAD_MB")
                .unwrap_or_else(|_| "50".to_string())
                .parse()?,
        })
    }
}
