use std::path::PathBuf;

use crate::db::DbError;
use crate::thumbnailer::ThumbnailError;

/// Domain error taxonomy. Not-found and invalid-input variants carry
/// user-facing messages; storage variants keep their paths for the log and
/// are reported to clients with a generic message only.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("album {0} not found")]
    AlbumNotFound(i64),
    #[error("photo {0} not found")]
    PhotoNotFound(i64),
    #[error("{0}")]
    InvalidInput(String),
    #[error("photo {photo_id} does not belong to album {expected_album_id}")]
    AlbumMismatch {
        photo_id: i64,
        expected_album_id: i64,
    },
    #[error(transparent)]
    Thumbnail(#[from] ThumbnailError),
    #[error("failed to write {}: {source}", path.display())]
    StorageWrite {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to read {}: {source}", path.display())]
    StorageRead {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("{detail}; manual cleanup required for {paths:?}")]
    PartialFailure {
        detail: String,
        paths: Vec<PathBuf>,
    },
    #[error(transparent)]
    Database(#[from] DbError),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

impl ServiceError {
    pub fn http_status(&self) -> warp::http::StatusCode {
        use warp::http::StatusCode;

        match self {
            ServiceError::AlbumNotFound(_) | ServiceError::PhotoNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            ServiceError::InvalidInput(_)
            | ServiceError::AlbumMismatch { .. }
            | ServiceError::Thumbnail(ThumbnailError::MissingExtension)
            | ServiceError::Thumbnail(ThumbnailError::UnsupportedImageFormat(_)) => {
                StatusCode::BAD_REQUEST
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message returned to the client. Internal paths and SQL details stay in
    /// the server log.
    pub fn public_message(&self) -> String {
        if self.http_status().is_client_error() {
            self.to_string()
        } else {
            "internal storage error".to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use warp::http::StatusCode;

    #[test]
    fn test_not_found_messages_embed_id() {
        assert_eq!(
            ServiceError::AlbumNotFound(7).to_string(),
            "album 7 not found"
        );
        assert_eq!(
            ServiceError::PhotoNotFound(42).to_string(),
            "photo 42 not found"
        );
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ServiceError::AlbumNotFound(1).http_status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ServiceError::InvalidInput("bad sort".into()).http_status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ServiceError::Thumbnail(ThumbnailError::MissingExtension).http_status(),
            StatusCode::BAD_REQUEST
        );
        let storage = ServiceError::StorageWrite {
            path: PathBuf::from("/secret/path"),
            source: std::io::Error::other("disk full"),
        };
        assert_eq!(storage.http_status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_server_errors_do_not_leak_paths() {
        let err = ServiceError::PartialFailure {
            detail: "orphaned original".to_string(),
            paths: vec![PathBuf::from("/data/storage/photos/original/1/a.jpg")],
        };
        assert!(!err.public_message().contains("/data/storage"));
    }
}
