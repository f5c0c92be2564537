use std::io::Cursor;
use std::path::Path;

use image::{DynamicImage, ImageFormat};

#[derive(Debug, thiserror::Error)]
pub enum ThumbnailError {
    #[error("filename carries no extension to derive the thumbnail format from")]
    MissingExtension,
    #[error("unsupported image format: {0}")]
    UnsupportedImageFormat(String),
    #[error("image encoding failed: {0}")]
    Encode(image::ImageError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type ThumbnailResult<T> = Result<T, ThumbnailError>;

/// Produces bounded-size derivatives of uploaded images. The thumbnail is
/// encoded in the same format as the original upload, selected by the target
/// filename's extension.
#[derive(Debug, Clone, Copy)]
pub struct Thumbnailer {
    bound: u32,
}

impl Thumbnailer {
    pub fn new(bound: u32) -> Self {
        Self { bound }
    }

    /// Decodes `bytes`, scales so the longer side equals the bound exactly
    /// (shorter side proportional, no cropping or letterboxing) and encodes
    /// in the format named by `filename`'s extension.
    pub fn render(&self, bytes: &[u8], filename: &str) -> ThumbnailResult<Vec<u8>> {
        let format = self.output_format(filename)?;

        let img = image::load_from_memory(bytes)
            .map_err(|e| ThumbnailError::UnsupportedImageFormat(e.to_string()))?;
        let thumbnail = self.resize_image(img);

        let mut buffer = Cursor::new(Vec::new());
        thumbnail
            .write_to(&mut buffer, format)
            .map_err(ThumbnailError::Encode)?;
        Ok(buffer.into_inner())
    }

    /// Renders and writes the thumbnail to `path`.
    pub fn render_to_path(&self, bytes: &[u8], filename: &str, path: &Path) -> ThumbnailResult<()> {
        let data = self.render(bytes, filename)?;
        std::fs::write(path, data)?;
        Ok(())
    }

    fn output_format(&self, filename: &str) -> ThumbnailResult<ImageFormat> {
        let ext = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .ok_or(ThumbnailError::MissingExtension)?;

        ImageFormat::from_extension(ext)
            .ok_or_else(|| ThumbnailError::UnsupportedImageFormat(ext.to_string()))
    }

    fn resize_image(&self, img: DynamicImage) -> DynamicImage {
        let (width, height) = (img.width(), img.height());

        // DynamicImage::thumbnail never enlarges, but the bound is a contract
        // here: small sources scale up so the longer side always equals it.
        let (new_width, new_height) = if width >= height {
            let scaled = (height as u64 * self.bound as u64 / width as u64).max(1) as u32;
            (self.bound, scaled)
        } else {
            let scaled = (width as u64 * self.bound as u64 / height as u64).max(1) as u32;
            (scaled, self.bound)
        };

        img.resize_exact(new_width, new_height, image::imageops::FilterType::Triangle)
    }
}
