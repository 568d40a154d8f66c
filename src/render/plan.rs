//! Pure compilation of a processed frame into a list of dot draw ops.
//!
//! All sizing and suppression policy lives here; the CPU backend only
//! executes the resulting plan. This keeps the skip rules testable without
//! touching a pixmap.

use crate::{
    foundation::core::{ProcessedFrame, Rgb},
    params::{DotShape, RenderParams},
};

/// Scale anchor for dot spacing. Chosen so apparent dot size stays roughly
/// constant as resolution changes: doubling resolution and zoom cancels out.
pub const UNIT_BASE: f64 = 1000.0;

/// Fraction of the cell left to the dot; the rest is gutter.
pub const CELL_FILL: f64 = 0.95;

/// Threshold below which a dot is suppressed entirely.
pub const MIN_DRAWN_SIZE: f64 = 0.5;

/// On-screen distance between adjacent grid cell centers.
pub fn dot_spacing(resolution: u32, zoom: f64) -> f64 {
    (UNIT_BASE / f64::from(resolution.max(1))) * zoom
}

/// One dot to draw: shape centered at `center` with base `size`, filled (or
/// stroked, for rings) with `color`. Shape-specific factors (ring diameter,
/// diamond side) are applied by the backend's geometry, not here.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DotOp {
    pub shape: DotShape,
    pub center: kurbo::Point,
    pub size: f64,
    pub color: Rgb,
}

/// A compiled frame: exact canvas dimensions plus the ops to draw.
#[derive(Clone, Debug, PartialEq)]
pub struct DotPlan {
    pub width_px: u32,
    pub height_px: u32,
    pub spacing: f64,
    /// Stretch the source raster beneath the dots.
    pub draw_background: bool,
    pub ops: Vec<DotOp>,
}

impl DotPlan {
    /// True when the derived canvas has no drawable area. Rendering such a
    /// plan is a no-op, never an error.
    pub fn is_degenerate(&self) -> bool {
        self.width_px == 0 || self.height_px == 0
    }
}

/// Compile a processed frame against the render parameters.
///
/// Cells are visited in row-major order so op order is deterministic.
pub fn plan_dots(frame: &ProcessedFrame, params: &RenderParams) -> DotPlan {
    let spacing = dot_spacing(params.resolution, params.zoom);
    let width_px = (f64::from(frame.width()) * spacing).round() as u32;
    let height_px = (f64::from(frame.height()) * spacing).round() as u32;

    let mut plan = DotPlan {
        width_px,
        height_px,
        spacing,
        draw_background: params.show_original_background,
        ops: Vec::new(),
    };
    if plan.is_degenerate() {
        return plan;
    }

    let max_size = spacing * CELL_FILL;
    let white_point = f64::from(params.white_point);

    for y in 0..frame.height() {
        for x in 0..frame.width() {
            let pixel = frame.adjusted.get(x, y);
            let color = if params.force_original_colors {
                frame.original.get(x, y)
            } else {
                pixel
            };

            // Size always follows the adjusted pixel, even when the drawn
            // color comes from the original.
            let frac = pixel.brightness_frac();
            let size_multiplier =
                params.min_dot_size + (params.max_dot_size - params.min_dot_size) * frac;
            let size = max_size * size_multiplier;

            if size < MIN_DRAWN_SIZE {
                continue;
            }
            if params.remove_white && color.channel_mean() >= white_point {
                continue;
            }

            plan.ops.push(DotOp {
                shape: params.shape,
                center: kurbo::Point::new(
                    f64::from(x) * spacing + spacing / 2.0,
                    f64::from(y) * spacing + spacing / 2.0,
                ),
                size,
                color,
            });
        }
    }
    plan
}
