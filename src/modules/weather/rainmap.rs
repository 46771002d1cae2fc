//! Rain area map compositing

use image::imageops::{self, FilterType};
use image::{ImageOutputFormat, ImageResult, RgbaImage};
use std::io::Cursor;

/// Opacity of the rain overlay, out of 255
pub const OVERLAY_ALPHA: u8 = 70;

fn decode_to(bytes: &[u8], width: u32, height: u32) -> ImageResult<RgbaImage> {
    let img = image::load_from_memory(bytes)?;
    if img.width() == width && img.height() == height {
        Ok(img.to_rgba8())
    } else {
        Ok(img.resize_exact(width, height, FilterType::Triangle).to_rgba8())
    }
}

/// Stack `overlay` and `town` onto `base` and encode the result as PNG
///
/// Layers are resized to the base map. The overlay keeps its own
/// transparency, scaled down to [`OVERLAY_ALPHA`].
pub fn stitch(base: &[u8], overlay: &[u8], town: &[u8]) -> ImageResult<Vec<u8>> {
    let mut canvas = image::load_from_memory(base)?.to_rgba8();
    let (width, height) = canvas.dimensions();

    let mut rain = decode_to(overlay, width, height)?;
    for pixel in rain.pixels_mut() {
        pixel[3] = (u16::from(pixel[3]) * u16::from(OVERLAY_ALPHA) / 255) as u8;
    }
    let town = decode_to(town, width, height)?;

    imageops::overlay(&mut canvas, &rain, 0, 0);
    imageops::overlay(&mut canvas, &town, 0, 0);

    let mut png = Vec::new();
    canvas.write_to(&mut Cursor::new(&mut png), ImageOutputFormat::Png)?;
    Ok(png)
}
