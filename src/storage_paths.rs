use std::path::{Path, PathBuf};

pub const ORIGINAL_URL_PREFIX: &str = "/photos/original";
pub const THUMB_URL_PREFIX: &str = "/photos/thumb";

/// Computes filesystem paths and stored URLs for album directories and photo
/// files. Pure functions of the configured root; no I/O. Stored URLs are
/// always `{prefix}/{albumId}/{filename}`, and `resolve_url` maps them back
/// under the same root, so a record's URL and its on-disk path cannot
/// diverge.
#[derive(Debug, Clone)]
pub struct StoragePaths {
    root: PathBuf,
}

impl StoragePaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn original_dir(&self, album_id: i64) -> PathBuf {
        self.root
            .join("photos")
            .join("original")
            .join(album_id.to_string())
    }

    pub fn thumb_dir(&self, album_id: i64) -> PathBuf {
        self.root
            .join("photos")
            .join("thumb")
            .join(album_id.to_string())
    }

    pub fn original_path(&self, album_id: i64, filename: &str) -> PathBuf {
        self.original_dir(album_id).join(filename)
    }

    pub fn thumb_path(&self, album_id: i64, filename: &str) -> PathBuf {
        self.thumb_dir(album_id).join(filename)
    }

    pub fn original_url(&self, album_id: i64, filename: &str) -> String {
        format!("{}/{}/{}", ORIGINAL_URL_PREFIX, album_id, filename)
    }

    pub fn thumb_url(&self, album_id: i64, filename: &str) -> String {
        format!("{}/{}/{}", THUMB_URL_PREFIX, album_id, filename)
    }

    /// Filesystem path for a stored URL.
    pub fn resolve_url(&self, url: &str) -> PathBuf {
        let mut path = self.root.clone();
        for segment in url.split('/').filter(|s| !s.is_empty()) {
            path.push(segment);
        }
        path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directory_pair() {
        let paths = StoragePaths::new("/srv/shutterbox");

        assert_eq!(
            paths.original_dir(7),
            PathBuf::from("/srv/shutterbox/photos/original/7")
        );
        assert_eq!(
            paths.thumb_dir(7),
            PathBuf::from("/srv/shutterbox/photos/thumb/7")
        );
    }

    #[test]
    fn test_photo_paths_and_urls_agree() {
        let paths = StoragePaths::new("/srv/shutterbox");

        let url = paths.original_url(3, "beach.png");
        assert_eq!(url, "/photos/original/3/beach.png");
        assert_eq!(paths.resolve_url(&url), paths.original_path(3, "beach.png"));

        let thumb = paths.thumb_url(3, "beach.png");
        assert_eq!(thumb, "/photos/thumb/3/beach.png");
        assert_eq!(paths.resolve_url(&thumb), paths.thumb_path(3, "beach.png"));
    }

    #[test]
    fn test_filenames_with_spaces() {
        let paths = StoragePaths::new("/data");

        assert_eq!(
            paths.original_path(1, "a (2).jpg"),
            PathBuf::from("/data/photos/original/1/a (2).jpg")
        );
        assert_eq!(paths.original_url(1, "a (2).jpg"), "/photos/original/1/a (2).jpg");
    }
}
