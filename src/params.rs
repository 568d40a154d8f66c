use crate::foundation::error::{DotError, DotResult};

/// Inputs to the pixel transform stage. Pure, stateless values.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AdjustParams {
    /// Contrast multiplier around the 127.5 midpoint (> 0, typical 0.1–50).
    pub contrast: f64,
    /// Additive brightness shift (−255..=255).
    pub brightness: f64,
    /// Gamma exponent (> 0, typical 0.4–2.5).
    pub gamma: f64,
    /// Invert channel values after adjustment.
    pub color_inverted: bool,
    /// Color path when true, greyscale path when false.
    pub use_colors: bool,
}

impl Default for AdjustParams {
    fn default() -> Self {
        Self {
            contrast: 1.0,
            brightness: 0.0,
            gamma: 1.0,
            color_inverted: false,
            use_colors: true,
        }
    }
}

impl AdjustParams {
    pub fn validate(&self) -> DotResult<()> {
        if !(self.contrast > 0.0) || !self.contrast.is_finite() {
            return Err(DotError::validation("contrast must be finite and > 0"));
        }
        if !(-255.0..=255.0).contains(&self.brightness) {
            return Err(DotError::validation("brightness must be in -255..=255"));
        }
        if !(self.gamma > 0.0) || !self.gamma.is_finite() {
            return Err(DotError::validation("gamma must be finite and > 0"));
        }
        Ok(())
    }
}

/// The closed set of drawable dot shapes.
///
/// Each kind carries its own geometry contract in the renderer; presentation
/// labels (glyphs, display names) are a UI concern and do not live here.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum DotShape {
    Circle,
    Square,
    Diamond,
    Triangle,
    Cross,
    /// Stroked outline circle (no fill).
    Ring,
}

/// Inputs to the render loop.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RenderParams {
    /// Target grid width in cells (>= 1).
    pub resolution: u32,
    /// Visual magnification (> 0).
    pub zoom: f64,
    /// Size fraction at zero brightness. May be negative so very dark cells
    /// collapse below the draw threshold.
    pub min_dot_size: f64,
    /// Size fraction at full brightness.
    pub max_dot_size: f64,
    pub shape: DotShape,
    /// Draw with the original sample's color; sizing still follows the
    /// adjusted sample.
    pub force_original_colors: bool,
    /// Suppress cells whose drawn color averages at or above `white_point`.
    pub remove_white: bool,
    pub white_point: u8,
    /// Draw the source raster stretched beneath the dots.
    pub show_original_background: bool,
    /// Video sampling rate in frames per second (1..=60).
    pub frame_rate: u32,
}

impl Default for RenderParams {
    fn default() -> Self {
        Self {
            resolution: 100,
            zoom: 1.0,
            min_dot_size: 0.8,
            max_dot_size: 0.8,
            shape: DotShape::Circle,
            force_original_colors: false,
            remove_white: false,
            white_point: 240,
            show_original_background: false,
            frame_rate: 10,
        }
    }
}

impl RenderParams {
    pub fn validate(&self) -> DotResult<()> {
        if self.resolution == 0 {
            return Err(DotError::validation("resolution must be >= 1"));
        }
        if !(self.zoom > 0.0) || !self.zoom.is_finite() {
            return Err(DotError::validation("zoom must be finite and > 0"));
        }
        if !self.min_dot_size.is_finite() || !self.max_dot_size.is_finite() {
            return Err(DotError::validation("dot sizes must be finite"));
        }
        if !(1..=60).contains(&self.frame_rate) {
            return Err(DotError::validation("frame_rate must be in 1..=60"));
        }
        Ok(())
    }
}

/// A named, immutable bundle of adjustment and render parameters, applied
/// atomically. Read-only reference data.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Preset {
    pub name: String,
    pub adjust: AdjustParams,
    pub render: RenderParams,
}

impl Preset {
    pub fn validate(&self) -> DotResult<()> {
        if self.name.trim().is_empty() {
            return Err(DotError::validation("preset name must be non-empty"));
        }
        self.adjust.validate()?;
        self.render.validate()
    }
}

/// The built-in preset table.
pub fn builtin_presets() -> Vec<Preset> {
    vec![
        Preset {
            name: "delanceyessexsnow".to_string(),
            adjust: AdjustParams {
                contrast: 12.1,
                brightness: 113.0,
                gamma: 1.2,
                color_inverted: false,
                use_colors: true,
            },
            render: RenderParams {
                resolution: 82,
                zoom: 1.0,
                min_dot_size: -5.0,
                max_dot_size: 0.7,
                shape: DotShape::Circle,
                force_original_colors: false,
                remove_white: true,
                white_point: 248,
                show_original_background: true,
                frame_rate: 10,
            },
        },
        Preset {
            name: "default".to_string(),
            adjust: AdjustParams::default(),
            render: RenderParams::default(),
        },
        Preset {
            name: "wall st ferry".to_string(),
            adjust: AdjustParams {
                contrast: 6.9,
                brightness: 88.0,
                gamma: 1.2,
                color_inverted: true,
                use_colors: false,
            },
            render: RenderParams {
                resolution: 466,
                zoom: 1.0,
                min_dot_size: -5.0,
                max_dot_size: 2.0,
                shape: DotShape::Circle,
                force_original_colors: false,
                remove_white: false,
                white_point: 240,
                show_original_background: true,
                frame_rate: 10,
            },
        },
    ]
}

/// Look up a built-in preset by name.
pub fn find_preset(name: &str) -> Option<Preset> {
    builtin_presets().into_iter().find(|p| p.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        AdjustParams::default().validate().unwrap();
        RenderParams::default().validate().unwrap();
    }

    #[test]
    fn validation_rejects_out_of_range_values() {
        let mut a = AdjustParams::default();
        a.contrast = 0.0;
        assert!(a.validate().is_err());

        let mut a = AdjustParams::default();
        a.brightness = 300.0;
        assert!(a.validate().is_err());

        let mut a = AdjustParams::default();
        a.gamma = -1.0;
        assert!(a.validate().is_err());

        let mut r = RenderParams::default();
        r.resolution = 0;
        assert!(r.validate().is_err());

        let mut r = RenderParams::default();
        r.zoom = 0.0;
        assert!(r.validate().is_err());

        let mut r = RenderParams::default();
        r.frame_rate = 61;
        assert!(r.validate().is_err());
    }

    #[test]
    fn negative_min_dot_size_is_legal() {
        let mut r = RenderParams::default();
        r.min_dot_size = -5.0;
        r.max_dot_size = 0.7;
        r.validate().unwrap();
    }

    #[test]
    fn builtin_presets_validate_and_round_trip() {
        for preset in builtin_presets() {
            preset.validate().unwrap();
            let s = serde_json::to_string(&preset).unwrap();
            let de: Preset = serde_json::from_str(&s).unwrap();
            assert_eq!(de, preset);
        }
    }

    #[test]
    fn find_preset_matches_exact_name() {
        let p = find_preset("wall st ferry").unwrap();
        assert_eq!(p.render.resolution, 466);
        assert!(p.adjust.color_inverted);
        assert!(!p.adjust.use_colors);
        assert!(find_preset("nope").is_none());
    }

    #[test]
    fn shape_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&DotShape::Circle).unwrap(),
            "\"circle\""
        );
        let de: DotShape = serde_json::from_str("\"ring\"").unwrap();
        assert_eq!(de, DotShape::Ring);
    }
}
