use crate::icon::render::{Pixmap, TransparencyMask};
use crate::icon::targets::EncodingError;

const BITMAPINFOHEADER_SIZE: usize = 40;
const BI_RGB: u32 = 0;
const COLOR_PLANES: u16 = 1;
const BITS_PER_PIXEL: u16 = 32;

/// Bytes per row of the AND mask, rows are padded to 32 bits.
fn mask_stride(size: u32) -> usize {
    (size as usize).div_ceil(32) * 4
}

/// The exact length of a bitmap payload for a `size` x `size` entry.
pub fn dib_payload_len(size: u32) -> usize {
    let size = size as usize;
    BITMAPINFOHEADER_SIZE + size * size * 4 + size * mask_stride(size as u32)
}

/// Encodes a pixmap and its AND mask as a bitmap entry payload.
///
/// The layout is a BITMAPINFOHEADER whose height covers both the color data and the mask,
/// followed by BGRA pixels starting with the bottom row, followed by the mask starting with
/// the bottom row. A set mask bit marks a transparent pixel.
pub fn encode_dib_payload(
    pixmap: &Pixmap,
    mask: &TransparencyMask,
) -> Result<Vec<u8>, EncodingError> {
    pixmap.validate()?;

    let size = pixmap.width();
    if pixmap.height() != size {
        return Err(EncodingError::NotSquare {
            width: pixmap.width(),
            height: pixmap.height(),
        });
    }

    if mask.width() != size || mask.height() != size {
        return Err(EncodingError::MaskMismatch {
            width: size,
            height: size,
            mask_width: mask.width(),
            mask_height: mask.height(),
        });
    }

    let expected = dib_payload_len(size);
    let color_len = size as usize * size as usize * 4;
    let mask_len = size as usize * mask_stride(size);

    let mut payload = Vec::with_capacity(expected);

    // BITMAPINFOHEADER
    payload.extend_from_slice(&(BITMAPINFOHEADER_SIZE as u32).to_le_bytes());
    payload.extend_from_slice(&(size as i32).to_le_bytes());
    payload.extend_from_slice(&((size * 2) as i32).to_le_bytes());
    payload.extend_from_slice(&COLOR_PLANES.to_le_bytes());
    payload.extend_from_slice(&BITS_PER_PIXEL.to_le_bytes());
    payload.extend_from_slice(&BI_RGB.to_le_bytes());
    payload.extend_from_slice(&((color_len + mask_len) as u32).to_le_bytes());
    payload.extend_from_slice(&0i32.to_le_bytes()); // X pixels per meter
    payload.extend_from_slice(&0i32.to_le_bytes()); // Y pixels per meter
    payload.extend_from_slice(&0u32.to_le_bytes()); // Colors used
    payload.extend_from_slice(&0u32.to_le_bytes()); // Important colors

    // Color data, bottom-up BGRA
    for y in (0..size).rev() {
        for x in 0..size {
            let [r, g, b, a] = pixmap.pixel(x, y);
            payload.extend_from_slice(&[b, g, r, a]);
        }
    }

    // AND mask, bottom-up, MSB first
    let stride = mask_stride(size);
    for y in (0..size).rev() {
        let mut row = vec![0u8; stride];
        for x in 0..size {
            if mask.is_transparent(x, y) {
                row[x as usize / 8] |= 0x80 >> (x % 8);
            }
        }
        payload.extend_from_slice(&row);
    }

    if payload.len() != expected {
        return Err(EncodingError::LengthMismatch {
            expected,
            actual: payload.len(),
        });
    }

    tracing::trace!("Encoded {}x{} bitmap payload", size, size);

    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::icon::render::derive_and_mask;

    fn read_u32(data: &[u8], offset: usize) -> u32 {
        u32::from_le_bytes(data[offset..offset + 4].try_into().unwrap())
    }

    fn read_i32(data: &[u8], offset: usize) -> i32 {
        i32::from_le_bytes(data[offset..offset + 4].try_into().unwrap())
    }

    #[test]
    fn payload_length_matches_formula() {
        for size in [1, 7, 16, 31, 32, 33, 48, 256] {
            let pixmap = Pixmap::filled(size, size, [0, 0, 0, 255]).unwrap();
            let payload = encode_dib_payload(&pixmap, &derive_and_mask(&pixmap)).unwrap();
            assert_eq!(payload.len(), dib_payload_len(size), "size {}", size);
        }

        assert_eq!(dib_payload_len(16), 40 + 16 * 16 * 4 + 16 * 4);
        assert_eq!(dib_payload_len(33), 40 + 33 * 33 * 4 + 33 * 8);
    }

    #[test]
    fn header_describes_color_and_mask() {
        let pixmap = Pixmap::filled(16, 16, [0, 0, 0, 255]).unwrap();
        let payload = encode_dib_payload(&pixmap, &derive_and_mask(&pixmap)).unwrap();

        assert_eq!(read_u32(&payload, 0), 40);
        assert_eq!(read_i32(&payload, 4), 16);
        assert_eq!(read_i32(&payload, 8), 32);
        assert_eq!(u16::from_le_bytes([payload[12], payload[13]]), 1);
        assert_eq!(u16::from_le_bytes([payload[14], payload[15]]), 32);
        assert_eq!(read_u32(&payload, 16), 0);
        assert_eq!(read_u32(&payload, 20), 16 * 16 * 4 + 16 * 4);
    }

    #[test]
    fn rows_are_stored_bottom_up_as_bgra() {
        // Top row red and opaque, bottom row blue and transparent
        let data = vec![
            255, 0, 0, 255, //
            255, 0, 0, 255, //
            0, 0, 255, 0, //
            0, 0, 255, 0,
        ];
        let pixmap = Pixmap::from_rgba(2, 2, data).unwrap();
        let payload = encode_dib_payload(&pixmap, &derive_and_mask(&pixmap)).unwrap();

        let color = &payload[40..40 + 16];
        // First stored row is the bottom (blue) row
        assert_eq!(&color[..4], &[255, 0, 0, 0]);
        // Second stored row is the top (red) row
        assert_eq!(&color[8..12], &[0, 0, 255, 255]);

        let mask = &payload[56..];
        assert_eq!(mask.len(), 8);
        assert_eq!(&mask[..4], &[0b1100_0000, 0, 0, 0]);
        assert_eq!(&mask[4..], &[0, 0, 0, 0]);
    }

    #[test]
    fn rejects_mismatched_masks() {
        let pixmap = Pixmap::filled(4, 4, [0; 4]).unwrap();
        let other = Pixmap::filled(8, 8, [0; 4]).unwrap();

        assert!(matches!(
            encode_dib_payload(&pixmap, &derive_and_mask(&other)),
            Err(EncodingError::MaskMismatch { .. })
        ));
    }
}
