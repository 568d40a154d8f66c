//! Pixel transform stage: raw grid + adjustment parameters → processed frame.

use crate::{
    color::{adjust, luminance},
    foundation::core::{PixelGrid, ProcessedFrame, Rgb},
    params::AdjustParams,
};

/// Transform a source grid into aligned adjusted/original grids.
///
/// Both grids are produced in one row-major pass. Each sample is independent,
/// so the output is a pure function of `(grid, params)`.
pub fn process_grid(grid: &PixelGrid, params: &AdjustParams) -> ProcessedFrame {
    let mut adjusted = Vec::with_capacity(grid.samples().len());

    for &px in grid.samples() {
        adjusted.push(adjust_sample(px, params));
    }

    ProcessedFrame {
        adjusted: PixelGrid::from_samples_unchecked(grid.width(), grid.height(), adjusted),
        original: grid.clone(),
    }
}

fn adjust_sample(px: Rgb, params: &AdjustParams) -> Rgb {
    let lum = luminance(px.r, px.g, px.b);
    let adjusted_lum = adjust(lum, params.brightness, params.contrast, params.gamma);

    if params.use_colors {
        // Scale each channel by the luminance adjustment ratio so hue is
        // preserved while brightness follows the pipeline.
        let factor = if lum > 0.0 { adjusted_lum / lum } else { 1.0 };
        let scale = |c: u8| (f64::from(c) * factor).round().clamp(0.0, 255.0) as u8;
        let (mut r, mut g, mut b) = (scale(px.r), scale(px.g), scale(px.b));
        if params.color_inverted {
            r = 255 - r;
            g = 255 - g;
            b = 255 - b;
        }
        Rgb::new(r, g, b)
    } else {
        let grey = if params.color_inverted {
            255.0 - adjusted_lum
        } else {
            adjusted_lum
        };
        let grey = grey.round().clamp(0.0, 255.0) as u8;
        Rgb::new(grey, grey, grey)
    }
}
