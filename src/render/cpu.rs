//! CPU raster backend: executes a [`DotPlan`](crate::render::plan::DotPlan)
//! onto a pixmap surface and reads back RGBA frames.

use std::sync::Arc;

use vello_cpu::kurbo::{Affine, BezPath, Circle, Rect, Shape as _};

use crate::{
    foundation::{
        core::{FrameRgba, PixelGrid},
        error::{DotError, DotResult},
    },
    params::DotShape,
    render::plan::{DotOp, DotPlan},
};

struct CpuSurface {
    width: u16,
    height: u16,
    pixmap: vello_cpu::Pixmap,
}

impl CpuSurface {
    fn new(width: u16, height: u16) -> Self {
        Self {
            width,
            height,
            pixmap: vello_cpu::Pixmap::new(width, height),
        }
    }
}

struct BackgroundRaster {
    paint: vello_cpu::Image,
    width: u32,
    height: u32,
}

/// Owns the drawing surface and the background raster cache.
///
/// The surface is recreated only when the plan's derived dimensions change.
/// The background raster is replaced wholesale on source change and released
/// explicitly via [`clear_background`](CpuRenderer::clear_background).
#[derive(Default)]
pub struct CpuRenderer {
    surface: Option<CpuSurface>,
    background: Option<BackgroundRaster>,
    last: Option<FrameRgba>,
}

impl CpuRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a background raster from premultiplied RGBA8 bytes. Replaces
    /// any previous raster.
    pub fn set_background(&mut self, rgba8_premul: &[u8], width: u32, height: u32) -> DotResult<()> {
        let pixmap = premul_bytes_to_pixmap(rgba8_premul, width, height)?;
        self.background = Some(BackgroundRaster {
            paint: vello_cpu::Image {
                image: vello_cpu::ImageSource::Pixmap(Arc::new(pixmap)),
                sampler: vello_cpu::peniko::ImageSampler::default(),
            },
            width,
            height,
        });
        Ok(())
    }

    /// Install a background raster from an opaque pixel grid (a sampled
    /// video frame).
    pub fn set_background_grid(&mut self, grid: &PixelGrid) -> DotResult<()> {
        if grid.is_empty() {
            self.clear_background();
            return Ok(());
        }
        self.set_background(&grid.to_rgba8(), grid.width(), grid.height())
    }

    /// Drop the cached background raster.
    pub fn clear_background(&mut self) {
        self.background = None;
    }

    pub fn has_background(&self) -> bool {
        self.background.is_some()
    }

    /// Execute one plan. Degenerate plans draw nothing and leave the surface
    /// at its last valid size.
    pub fn render(&mut self, plan: &DotPlan) -> DotResult<()> {
        if plan.is_degenerate() {
            return Ok(());
        }

        let width: u16 = plan
            .width_px
            .try_into()
            .map_err(|_| DotError::validation("canvas width exceeds u16"))?;
        let height: u16 = plan
            .height_px
            .try_into()
            .map_err(|_| DotError::validation("canvas height exceeds u16"))?;

        let surface = self.surface.get_or_insert_with(|| CpuSurface::new(width, height));
        if surface.width != width || surface.height != height {
            *surface = CpuSurface::new(width, height);
        }

        clear_pixmap(&mut surface.pixmap, [255, 255, 255, 255]);

        let mut ctx = vello_cpu::RenderContext::new(width, height);

        if plan.draw_background
            && let Some(bg) = &self.background
        {
            ctx.set_paint_transform(Affine::IDENTITY);
            ctx.set_transform(Affine::scale_non_uniform(
                f64::from(plan.width_px) / f64::from(bg.width),
                f64::from(plan.height_px) / f64::from(bg.height),
            ));
            ctx.set_paint(bg.paint.clone());
            ctx.fill_rect(&Rect::new(0.0, 0.0, f64::from(bg.width), f64::from(bg.height)));
        }

        ctx.set_paint_transform(Affine::IDENTITY);
        ctx.set_transform(Affine::IDENTITY);
        for op in &plan.ops {
            draw_dot(&mut ctx, op);
        }

        ctx.flush();
        ctx.render_to_pixmap(&mut surface.pixmap);

        self.last = Some(FrameRgba {
            width: plan.width_px,
            height: plan.height_px,
            data: surface.pixmap.data_as_u8_slice().to_vec(),
        });
        Ok(())
    }

    /// The most recent readback, surviving degenerate redraws.
    pub fn last_frame(&self) -> Option<&FrameRgba> {
        self.last.as_ref()
    }
}

fn draw_dot(ctx: &mut vello_cpu::RenderContext, op: &DotOp) {
    let (cx, cy) = (op.center.x, op.center.y);
    let size = op.size;
    let half = size / 2.0;
    ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(
        op.color.r, op.color.g, op.color.b, 255,
    ));

    match op.shape {
        DotShape::Circle => {
            ctx.fill_path(&Circle::new((cx, cy), half).to_path(0.1));
        }
        DotShape::Square => {
            ctx.fill_rect(&Rect::new(cx - half, cy - half, cx + half, cy + half));
        }
        DotShape::Diamond => {
            // Square of side 0.7*size rotated 45 degrees.
            let d = 0.7 * size * std::f64::consts::FRAC_1_SQRT_2;
            let mut path = BezPath::new();
            path.move_to((cx, cy - d));
            path.line_to((cx + d, cy));
            path.line_to((cx, cy + d));
            path.line_to((cx - d, cy));
            path.close_path();
            ctx.fill_path(&path);
        }
        DotShape::Triangle => {
            // Isoceles, apex up.
            let mut path = BezPath::new();
            path.move_to((cx, cy - half));
            path.line_to((cx - half, cy + half * 0.6));
            path.line_to((cx + half, cy + half * 0.6));
            path.close_path();
            ctx.fill_path(&path);
        }
        DotShape::Cross => {
            let t = 0.3 * size;
            ctx.fill_rect(&Rect::new(cx - half, cy - t / 2.0, cx + half, cy + t / 2.0));
            ctx.fill_rect(&Rect::new(cx - t / 2.0, cy - half, cx + t / 2.0, cy + half));
        }
        DotShape::Ring => {
            // Outline only: a circle of diameter 0.85*size with outline
            // thickness 0.15*size, filled as an annulus (inner contour
            // wound the opposite way so non-zero filling leaves the hole).
            let ring_radius = 0.85 * size / 2.0;
            let band = 0.15 * size / 2.0;
            let mut path = circle_contour(cx, cy, ring_radius + band, false);
            for el in circle_contour(cx, cy, (ring_radius - band).max(0.0), true).elements() {
                path.push(*el);
            }
            ctx.fill_path(&path);
        }
    }
}

/// Cubic-arc circle contour with selectable winding direction.
fn circle_contour(cx: f64, cy: f64, r: f64, reversed: bool) -> BezPath {
    // Standard 4-arc kappa approximation.
    let k = 0.552_284_749_830_793_4 * r;
    let mut path = BezPath::new();
    if reversed {
        path.move_to((cx + r, cy));
        path.curve_to((cx + r, cy - k), (cx + k, cy - r), (cx, cy - r));
        path.curve_to((cx - k, cy - r), (cx - r, cy - k), (cx - r, cy));
        path.curve_to((cx - r, cy + k), (cx - k, cy + r), (cx, cy + r));
        path.curve_to((cx + k, cy + r), (cx + r, cy + k), (cx + r, cy));
    } else {
        path.move_to((cx + r, cy));
        path.curve_to((cx + r, cy + k), (cx + k, cy + r), (cx, cy + r));
        path.curve_to((cx - k, cy + r), (cx - r, cy + k), (cx - r, cy));
        path.curve_to((cx - r, cy - k), (cx - k, cy - r), (cx, cy - r));
        path.curve_to((cx + k, cy - r), (cx + r, cy - k), (cx + r, cy));
    }
    path.close_path();
    path
}

fn clear_pixmap(pixmap: &mut vello_cpu::Pixmap, rgba: [u8; 4]) {
    for px in pixmap.data_as_u8_slice_mut().chunks_exact_mut(4) {
        px.copy_from_slice(&rgba);
    }
}

fn premul_bytes_to_pixmap(
    rgba8_premul: &[u8],
    width: u32,
    height: u32,
) -> DotResult<vello_cpu::Pixmap> {
    let w: u16 = width
        .try_into()
        .map_err(|_| DotError::validation("background width exceeds u16"))?;
    let h: u16 = height
        .try_into()
        .map_err(|_| DotError::validation("background height exceeds u16"))?;
    if rgba8_premul.len() != width as usize * height as usize * 4 {
        return Err(DotError::validation("background byte length mismatch"));
    }

    let mut may_have_opacities = false;
    let mut pixels = Vec::with_capacity(width as usize * height as usize);
    for px in rgba8_premul.chunks_exact(4) {
        let a = px[3];
        may_have_opacities |= a != 255;
        pixels.push(vello_cpu::peniko::color::PremulRgba8 {
            r: px[0],
            g: px[1],
            b: px[2],
            a,
        });
    }

    Ok(vello_cpu::Pixmap::from_parts_with_opacity(
        pixels,
        w,
        h,
        may_have_opacities,
    ))
}
