mod bmp;
mod png;

pub use self::bmp::{encode_dib_payload, dib_payload_len};
pub use self::png::encode_png_payload;

use crate::icon::inputs::{DeclaredKind, SourceFormat, SourceId};
use crate::icon::render::{self, Pixmap, TransparencyMask};
use thiserror::Error;

/// The way a single entry is stored inside the container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryEncoding {
    /// A complete PNG stream
    Png,

    /// A 32 bit DIB followed by an AND mask
    Bitmap,
}

impl EntryEncoding {
    /// Decides how entries derived from a source are encoded.
    ///
    /// Explicit declarations always win, so a PNG source stays PNG even when resized. Automatic
    /// sources keep PNG only if they were read from a PNG file.
    pub fn decide(declared: DeclaredKind, format: SourceFormat) -> Self {
        match (declared, format) {
            (DeclaredKind::Png, _) => Self::Png,
            (DeclaredKind::Bitmap, _) => Self::Bitmap,
            (DeclaredKind::Automatic, SourceFormat::Png) => Self::Png,
            (DeclaredKind::Automatic, SourceFormat::Other) => Self::Bitmap,
        }
    }
}

/// Encodes a resized image into an entry payload.
///
/// Bitmap entries use the given mask, or derive one from the alpha channel if none is passed.
/// PNG entries ignore the mask.
pub fn encode_entry(
    pixmap: &Pixmap,
    mask: Option<&TransparencyMask>,
    encoding: EntryEncoding,
) -> Result<Vec<u8>, EncodingError> {
    match encoding {
        EntryEncoding::Png => encode_png_payload(pixmap),
        EntryEncoding::Bitmap => match mask {
            Some(mask) => encode_dib_payload(pixmap, mask),
            None => encode_dib_payload(pixmap, &render::derive_and_mask(pixmap)),
        },
    }
}

#[derive(Debug, Error)]
pub enum EncodingError {
    #[error("the pixmap geometry is invalid: {width}x{height} with {len} bytes")]
    InvalidGeometry { width: u32, height: u32, len: usize },

    #[error("entries must be square, got {width}x{height}")]
    NotSquare { width: u32, height: u32 },

    #[error("the mask is {mask_width}x{mask_height} but the image is {width}x{height}")]
    MaskMismatch {
        width: u32,
        height: u32,
        mask_width: u32,
        mask_height: u32,
    },

    #[error("an error occurred while encoding the PNG: {0}")]
    PngEncoding(#[from] ::png::EncodingError),

    #[error("the encoded payload is {actual} bytes but {expected} bytes were expected")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("the pixel buffer could not be wrapped for resizing: {0}")]
    ResizeBuffer(#[from] fast_image_resize::ImageBufferError),

    #[error("an error occurred while resizing: {0}")]
    Resize(#[from] fast_image_resize::ResizeError),

    #[error("source {0} is not part of the catalog")]
    UnknownSource(SourceId),
}
