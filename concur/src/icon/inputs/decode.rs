use crate::icon::inputs::SourceFormat;
use crate::icon::render::Pixmap;
use image::ImageFormat;
use std::path::Path;
use thiserror::Error;

/// A source image after decoding.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pub pixmap: Pixmap,
    pub format: SourceFormat,
}

/// Turns raw file contents into RGBA8 pixels.
pub trait SourceDecoder: Send + Sync {
    /// Decodes the contents of the file at `path`.
    ///
    /// The path is only a hint for formats that can not be detected from their contents.
    fn decode(&self, data: &[u8], path: &Path) -> Result<DecodedImage, DecodeError>;
}

/// Decoder backed by the `image` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImageDecoder;

impl SourceDecoder for ImageDecoder {
    fn decode(&self, data: &[u8], path: &Path) -> Result<DecodedImage, DecodeError> {
        // TGA has no signature, fall back to the extension
        let format = image::guess_format(data).or_else(|_| ImageFormat::from_path(path))?;

        let image = image::load_from_memory_with_format(data, format)?.to_rgba8();
        let (width, height) = image.dimensions();

        let pixmap = Pixmap::from_rgba(width, height, image.into_raw())
            .ok_or(DecodeError::InvalidDimensions { width, height })?;

        let format = match format {
            ImageFormat::Png => SourceFormat::Png,
            _ => SourceFormat::Other,
        };

        Ok(DecodedImage { pixmap, format })
    }
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error(transparent)]
    Image(#[from] image::ImageError),

    #[error("the decoded image has invalid dimensions: {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },
}
