use crate::icon::targets::EncodingError;
use fast_image_resize as fr;
use std::borrow::Cow;

/// An owned RGBA8 pixel buffer, rows stored top to bottom.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pixmap {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl Pixmap {
    /// Wraps an RGBA8 buffer.
    ///
    /// Returns `None` if either dimension is zero or the buffer length does not match
    /// `width * height * 4`.
    pub fn from_rgba(width: u32, height: u32, data: Vec<u8>) -> Option<Self> {
        let expected = rgba_len(width, height)?;
        if width == 0 || height == 0 || data.len() != expected {
            return None;
        }

        Some(Self {
            width,
            height,
            data,
        })
    }

    /// Creates a pixmap filled with a single color.
    pub fn filled(width: u32, height: u32, color: [u8; 4]) -> Option<Self> {
        let len = rgba_len(width, height)?;
        Self::from_rgba(width, height, color.repeat(len / 4))
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// The raw RGBA8 bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Retrieves the pixel at the given position.
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let offset = (y as usize * self.width as usize + x as usize) * 4;
        [
            self.data[offset],
            self.data[offset + 1],
            self.data[offset + 2],
            self.data[offset + 3],
        ]
    }

    /// Consumes the pixmap and returns the raw RGBA8 bytes.
    pub fn take(self) -> Vec<u8> {
        self.data
    }

    /// Checks that the buffer still matches its geometry.
    pub(crate) fn validate(&self) -> Result<(), EncodingError> {
        match rgba_len(self.width, self.height) {
            Some(len) if self.width > 0 && self.height > 0 && len == self.data.len() => Ok(()),
            _ => Err(EncodingError::InvalidGeometry {
                width: self.width,
                height: self.height,
                len: self.data.len(),
            }),
        }
    }
}

fn rgba_len(width: u32, height: u32) -> Option<usize> {
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|pixels| pixels.checked_mul(4))
}

/// Resizes a pixmap to a `size` x `size` square.
///
/// A pixmap that already has the target dimensions is passed through untouched. Everything
/// else is resampled with a box filter, see [`resample_box`].
pub fn resize_to_square(source: &Pixmap, size: u32) -> Result<Cow<'_, Pixmap>, EncodingError> {
    source.validate()?;

    if size == 0 {
        return Err(EncodingError::InvalidGeometry {
            width: size,
            height: size,
            len: 0,
        });
    }

    if source.width == size && source.height == size {
        tracing::trace!("Source already is {}x{}, passing through", size, size);
        return Ok(Cow::Borrowed(source));
    }

    tracing::trace!(
        "Resampling {}x{} to {}x{}",
        source.width,
        source.height,
        size,
        size
    );

    Ok(Cow::Owned(resample_box(source, size, size)?))
}

/// Resamples a pixmap with a box convolution.
///
/// When downscaling, the box kernel is stretched over every source pixel the destination pixel
/// covers, so the result is an area average. Alpha is treated as a plain channel and not
/// premultiplied, so every channel is averaged on its own.
pub fn resample_box(source: &Pixmap, width: u32, height: u32) -> Result<Pixmap, EncodingError> {
    let src_image = fr::images::Image::from_vec_u8(
        source.width,
        source.height,
        source.data.clone(),
        fr::PixelType::U8x4,
    )?;

    let mut dst_image = fr::images::Image::new(width, height, fr::PixelType::U8x4);

    let mut resizer = fr::Resizer::new();
    let options = fr::ResizeOptions::new()
        .resize_alg(fr::ResizeAlg::Convolution(fr::FilterType::Box))
        .use_alpha(false);

    resizer.resize(&src_image, &mut dst_image, Some(&options))?;

    Ok(Pixmap {
        width,
        height,
        data: dst_image.into_vec(),
    })
}

/// A 1 bit per pixel transparency mask, rows stored top to bottom.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransparencyMask {
    width: u32,
    height: u32,
    transparent: Vec<bool>,
}

impl TransparencyMask {
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Whether the pixel at the given position is masked out.
    pub fn is_transparent(&self, x: u32, y: u32) -> bool {
        self.transparent[y as usize * self.width as usize + x as usize]
    }
}

/// Derives the AND mask of a pixmap.
///
/// A pixel is transparent exactly when its alpha is zero. The pixmap's alpha channel is left
/// as it is.
pub fn derive_and_mask(pixmap: &Pixmap) -> TransparencyMask {
    let transparent = pixmap.data.chunks_exact(4).map(|px| px[3] == 0).collect();

    TransparencyMask {
        width: pixmap.width,
        height: pixmap.height,
        transparent,
    }
}
