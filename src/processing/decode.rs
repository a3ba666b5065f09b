use std::io::Cursor;

use image::{ImageReader, RgbaImage, imageops};
use tracing::debug;

/// Decodes an in-memory still image to RGBA8 and applies its EXIF orientation.
///
/// The format is sniffed from the bytes. Missing or unreadable EXIF data leaves
/// the pixels as decoded.
pub fn decode_rgba8(bytes: &[u8]) -> image::ImageResult<RgbaImage> {
    let img = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()?
        .decode()?;
    let img = img.to_rgba8();

    Ok(match read_orientation(bytes).unwrap_or(1) {
        2 => imageops::flip_horizontal(&img),
        3 => imageops::rotate180(&img),
        4 => imageops::flip_vertical(&img),
        5 => imageops::flip_horizontal(&imageops::rotate90(&img)),
        6 => imageops::rotate90(&img),
        7 => imageops::flip_horizontal(&imageops::rotate270(&img)),
        8 => imageops::rotate270(&img),
        _ => img,
    })
}

fn read_orientation(bytes: &[u8]) -> Option<u16> {
    let exif = exif::Reader::new()
        .read_from_container(&mut Cursor::new(bytes))
        .ok()?;
    let field = exif.get_field(exif::Tag::Orientation, exif::In::PRIMARY)?;
    let orientation = field.value.get_uint(0)? as u16;
    debug!(orientation, "exif orientation");
    Some(orientation)
}
