//! Per-value color adjustment functions.
//!
//! All functions are pure and total over `f64` and clamp into [0, 255].
//! The pipeline order is fixed: brightness, then contrast, then gamma.
//! Contrast recenters around 127.5 after the brightness shift, so reordering
//! changes the visual output.

/// Perceptual brightness from weighted RGB channels (relative luminance).
pub fn luminance(r: u8, g: u8, b: u8) -> f64 {
    0.2126 * f64::from(r) + 0.7152 * f64::from(g) + 0.0722 * f64::from(b)
}

/// Additive brightness shift. A zero shift is the identity.
pub fn apply_brightness(value: f64, brightness: f64) -> f64 {
    if brightness == 0.0 {
        return value;
    }
    (value + brightness).clamp(0.0, 255.0)
}

/// Contrast scaling around the 127.5 midpoint.
///
/// Only zero short-circuits; `contrast = 1` still runs the recentering
/// arithmetic. Preset reproducibility depends on this exact guard.
pub fn apply_contrast(value: f64, contrast: f64) -> f64 {
    if contrast == 0.0 {
        return value;
    }
    ((value - 127.5) * contrast + 127.5).clamp(0.0, 255.0)
}

/// Gamma curve on the normalized value, rounded to the nearest integer.
/// Gamma of exactly 1, or any non-positive gamma, is the identity.
pub fn apply_gamma(value: f64, gamma: f64) -> f64 {
    if gamma == 1.0 || gamma <= 0.0 {
        return value;
    }
    (255.0 * (value / 255.0).powf(gamma)).round().clamp(0.0, 255.0)
}

/// The full adjustment pipeline in its fixed order.
pub fn adjust(value: f64, brightness: f64, contrast: f64, gamma: f64) -> f64 {
    apply_gamma(
        apply_contrast(apply_brightness(value, brightness), contrast),
        gamma,
    )
}
