//! Still-image acquisition: decode, aspect-preserving resize, grid extraction.

use anyhow::Context as _;

use crate::foundation::{
    core::{PixelGrid, Rgb},
    error::{DotError, DotResult},
};

/// Decode raw bytes into an RGBA image.
///
/// Bytes that do not sniff as a supported image format are rejected before
/// the decoder runs; decoder failures after that point are decode errors.
pub fn decode_image(bytes: &[u8]) -> DotResult<image::RgbaImage> {
    if image::guess_format(bytes).is_err() {
        return Err(DotError::input_rejected("not an image"));
    }
    let dyn_img = image::load_from_memory(bytes)
        .context("decode image from memory")
        .map_err(|e| DotError::decode(format!("{e:#}")))?;
    Ok(dyn_img.to_rgba8())
}

/// Grid dimensions for a still source: constrain to `target_width` keeping
/// the native aspect ratio, then scale height by `aspect_multiplier`.
///
/// The multiplier compensates for non-square visual units; isotropic dots
/// use 1.0. Either dimension may round to zero for degenerate inputs; the
/// renderer treats such grids as a no-op.
pub fn still_grid_dimensions(
    native_width: u32,
    native_height: u32,
    target_width: u32,
    aspect_multiplier: f64,
) -> (u32, u32) {
    if native_width == 0 || native_height == 0 {
        return (0, 0);
    }
    let width = native_width.min(target_width);
    let aspect_height = f64::from(width) * f64::from(native_height) / f64::from(native_width);
    let height = (aspect_height * aspect_multiplier).round() as u32;
    (width, height)
}

/// Resize a decoded image to grid dimensions and extract RGB samples.
pub fn grid_from_image(
    img: &image::RgbaImage,
    target_width: u32,
    aspect_multiplier: f64,
) -> DotResult<PixelGrid> {
    let (width, height) =
        still_grid_dimensions(img.width(), img.height(), target_width, aspect_multiplier);
    if width == 0 || height == 0 {
        return PixelGrid::from_samples(width, height, Vec::new());
    }

    let resized = image::imageops::resize(img, width, height, image::imageops::FilterType::Triangle);
    let mut samples = Vec::with_capacity(width as usize * height as usize);
    for px in resized.pixels() {
        samples.push(Rgb::new(px[0], px[1], px[2]));
    }
    PixelGrid::from_samples(width, height, samples)
}

/// Premultiply straight-alpha RGBA8 bytes in place (background rasters are
/// handed to the renderer premultiplied).
pub fn premultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = px[3] as u16;
        if a == 0 {
            px[0] = 0;
            px[1] = 0;
            px[2] = 0;
            continue;
        }
        px[0] = ((px[0] as u16 * a + 127) / 255) as u8;
        px[1] = ((px[1] as u16 * a + 127) / 255) as u8;
        px[2] = ((px[2] as u16 * a + 127) / 255) as u8;
    }
}
