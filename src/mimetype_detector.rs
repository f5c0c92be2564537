use std::path::Path;

/// Detects MIME type based on file extension
pub fn from_path(path: &Path) -> Option<MimeType> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .and_then(from_extension)
}

/// Detects MIME type from file extension string
fn from_extension(ext: &str) -> Option<MimeType> {
    let ext_lower = ext.to_lowercase();
    match ext_lower.as_str() {
        "jpg" | "jpeg" => Some(MimeType::new("image", "jpeg")),
        "png" => Some(MimeType::new("image", "png")),
        "gif" => Some(MimeType::new("image", "gif")),
        "webp" => Some(MimeType::new("image", "webp")),
        "bmp" => Some(MimeType::new("image", "bmp")),
        "tiff" | "tif" => Some(MimeType::new("image", "tiff")),

        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MimeType {
    type_: String,
    subtype: String,
}

impl MimeType {
    fn new(type_: &str, subtype: &str) -> Self {
        Self {
            type_: type_.to_string(),
            subtype: subtype.to_string(),
        }
    }

}

impl std::fmt::Display for MimeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.type_, self.subtype)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_image_types() {
        assert_eq!(
            from_path(&PathBuf::from("photo.jpg")).unwrap().to_string(),
            "image/jpeg"
        );
        assert_eq!(
            from_path(&PathBuf::from("photo.JPG")).unwrap().to_string(),
            "image/jpeg"
        );
        assert_eq!(
            from_path(&PathBuf::from("photo.png")).unwrap().to_string(),
            "image/png"
        );
        assert_eq!(
            from_path(&PathBuf::from("scan.tif")).unwrap().to_string(),
            "image/tiff"
        );
    }

    #[test]
    fn test_unknown_extension() {
        assert!(from_path(&PathBuf::from("document.pdf")).is_none());
        assert!(from_path(&PathBuf::from("no_extension")).is_none());
    }

    #[test]
    fn test_webp_and_bmp() {
        assert_eq!(
            from_path(&PathBuf::from("a.webp")).unwrap().to_string(),
            "image/webp"
        );
        assert_eq!(
            from_path(&PathBuf::from("a.bmp")).unwrap().to_string(),
            "image/bmp"
        );
    }
}
