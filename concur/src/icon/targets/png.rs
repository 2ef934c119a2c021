use crate::icon::render::Pixmap;
use crate::icon::targets::EncodingError;

/// Encodes a pixmap as a PNG entry payload.
///
/// The image is written as 8 bit RGBA with fixed encoder settings, so equal pixmaps always
/// produce equal bytes.
pub fn encode_png_payload(pixmap: &Pixmap) -> Result<Vec<u8>, EncodingError> {
    pixmap.validate()?;
    if pixmap.width() != pixmap.height() {
        return Err(EncodingError::NotSquare {
            width: pixmap.width(),
            height: pixmap.height(),
        });
    }

    let mut payload = Vec::new();

    let mut encoder = ::png::Encoder::new(&mut payload, pixmap.width(), pixmap.height());
    encoder.set_color(::png::ColorType::Rgba);
    encoder.set_depth(::png::BitDepth::Eight);
    encoder.set_compression(::png::Compression::Best);

    let mut writer = encoder.write_header()?;
    writer.write_image_data(pixmap.data())?;
    writer.finish()?;

    tracing::trace!(
        "Encoded {}x{} PNG payload with {} bytes",
        pixmap.width(),
        pixmap.height(),
        payload.len()
    );

    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_decodes_to_the_same_pixels() {
        let data: Vec<u8> = (0..=255u8).flat_map(|i| [i, 255 - i, 7, i / 3]).collect();
        let pixmap = Pixmap::from_rgba(16, 16, data.clone()).unwrap();

        let payload = encode_png_payload(&pixmap).unwrap();

        let decoder = ::png::Decoder::new(payload.as_slice());
        let mut reader = decoder.read_info().unwrap();
        let mut buffer = vec![0; reader.output_buffer_size()];
        let info = reader.next_frame(&mut buffer).unwrap();

        assert_eq!(info.width, 16);
        assert_eq!(info.height, 16);
        assert_eq!(info.color_type, ::png::ColorType::Rgba);
        assert_eq!(&buffer[..info.buffer_size()], data.as_slice());
    }

    #[test]
    fn encoding_is_deterministic() {
        let pixmap = Pixmap::filled(32, 32, [12, 34, 56, 78]).unwrap();
        assert_eq!(
            encode_png_payload(&pixmap).unwrap(),
            encode_png_payload(&pixmap).unwrap()
        );
    }

    #[test]
    fn rejects_non_square_pixmaps() {
        let pixmap = Pixmap::filled(4, 2, [0; 4]).unwrap();
        assert!(matches!(
            encode_png_payload(&pixmap),
            Err(EncodingError::NotSquare {
                width: 4,
                height: 2
            })
        ));
    }
}
