use crate::foundation::error::{DotError, DotResult};

/// One source sample: three 8-bit channels. Immutable once produced.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Channel mean in [0, 255], used by the white-point suppression rule.
    pub fn channel_mean(self) -> f64 {
        (f64::from(self.r) + f64::from(self.g) + f64::from(self.b)) / 3.0
    }

    /// Mean brightness as a fraction of full white, in [0, 1].
    pub fn brightness_frac(self) -> f64 {
        (f64::from(self.r) + f64::from(self.g) + f64::from(self.b)) / (3.0 * 255.0)
    }
}

/// Rectangular row-major grid of RGB samples with explicit dimensions.
///
/// Samples are stored flat (`y * width + x`), so every row has exactly
/// `width` entries by construction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PixelGrid {
    width: u32,
    height: u32,
    samples: Vec<Rgb>,
}

impl PixelGrid {
    /// Build a grid from flat row-major samples.
    pub fn from_samples(width: u32, height: u32, samples: Vec<Rgb>) -> DotResult<Self> {
        let expected = width as usize * height as usize;
        if samples.len() != expected {
            return Err(DotError::validation(format!(
                "grid sample count mismatch: got {}, expected {expected} ({width}x{height})",
                samples.len()
            )));
        }
        Ok(Self {
            width,
            height,
            samples,
        })
    }

    /// Internal constructor for callers that guarantee the sample count by
    /// construction (e.g. mapping over an existing grid).
    pub(crate) fn from_samples_unchecked(width: u32, height: u32, samples: Vec<Rgb>) -> Self {
        debug_assert_eq!(samples.len(), width as usize * height as usize);
        Self {
            width,
            height,
            samples,
        }
    }

    /// Grid filled with a single sample value.
    pub fn filled(width: u32, height: u32, sample: Rgb) -> Self {
        Self {
            width,
            height,
            samples: vec![sample; width as usize * height as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// True when either dimension is zero (nothing to transform or draw).
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn get(&self, x: u32, y: u32) -> Rgb {
        debug_assert!(x < self.width && y < self.height);
        self.samples[y as usize * self.width as usize + x as usize]
    }

    /// Row-major sample slice, top-to-bottom, left-to-right.
    pub fn samples(&self) -> &[Rgb] {
        &self.samples
    }

    /// Tightly packed opaque RGBA8 bytes (used as a background raster).
    pub fn to_rgba8(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.samples.len() * 4);
        for px in &self.samples {
            out.extend_from_slice(&[px.r, px.g, px.b, 255]);
        }
        out
    }
}

/// Output of the pixel transform stage: two same-shaped grids.
///
/// `adjusted` carries the post brightness/contrast/gamma/invert samples,
/// `original` the untouched source samples. A frame is built fresh on every
/// acquisition or parameter change and never mutated afterwards.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProcessedFrame {
    pub adjusted: PixelGrid,
    pub original: PixelGrid,
}

impl ProcessedFrame {
    pub fn width(&self) -> u32 {
        self.adjusted.width()
    }

    pub fn height(&self) -> u32 {
        self.adjusted.height()
    }
}

/// Rendered surface readback: tightly packed opaque RGBA8, row-major.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameRgba {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}
