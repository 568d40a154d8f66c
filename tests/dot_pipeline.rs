//! End-to-end pipeline checks through the public API: PNG bytes in,
//! rendered RGBA surface out.

use std::io::Cursor;

use dotfield::{
    AdjustParams, DotSession, DotShape, RenderParams, dot_spacing, plan_dots, process_grid,
    PixelGrid, Rgb,
};

fn png_bytes(width: u32, height: u32, rgba: [u8; 4]) -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(width, height, image::Rgba(rgba));
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

fn pixel_at(frame: &dotfield::FrameRgba, x: u32, y: u32) -> [u8; 4] {
    let i = (y * frame.width + x) as usize * 4;
    frame.data[i..i + 4].try_into().unwrap()
}

#[test]
fn canvas_dimensions_follow_the_spacing_contract() {
    // 100x60 grid at resolution 100 / zoom 1: spacing 10, canvas 1000x600.
    let mut session = DotSession::new(AdjustParams::default(), RenderParams::default()).unwrap();
    session
        .load_image(&png_bytes(100, 60, [128, 128, 128, 255]))
        .unwrap();

    assert_eq!(dot_spacing(100, 1.0), 10.0);
    let surface = session.surface().unwrap();
    assert_eq!((surface.width, surface.height), (1000, 600));
}

#[test]
fn zoom_and_resolution_cancel_in_apparent_size() {
    let grid = PixelGrid::filled(10, 10, Rgb::new(200, 200, 200));
    let frame = process_grid(&grid, &AdjustParams::default());

    let mut base = RenderParams::default();
    base.resolution = 100;
    base.zoom = 1.0;
    let mut doubled = base;
    doubled.resolution = 200;
    doubled.zoom = 2.0;

    let a = plan_dots(&frame, &base);
    let b = plan_dots(&frame, &doubled);
    assert_eq!(a.ops[0].size, b.ops[0].size);
    assert_eq!(a.spacing, b.spacing);
}

#[test]
fn dark_image_with_negative_min_size_draws_nothing() {
    let mut render = RenderParams::default();
    render.min_dot_size = -5.0;
    render.max_dot_size = 0.7;

    let mut session = DotSession::new(AdjustParams::default(), render).unwrap();
    session.load_image(&png_bytes(10, 10, [0, 0, 0, 255])).unwrap();

    let surface = session.surface().unwrap();
    // Every dot was suppressed: the canvas is pure background white.
    assert!(surface.data.chunks_exact(4).all(|px| px == [255, 255, 255, 255]));
}

#[test]
fn remove_white_leaves_background_only() {
    let mut render = RenderParams::default();
    render.remove_white = true;
    render.white_point = 240;

    let mut session = DotSession::new(AdjustParams::default(), render).unwrap();
    session
        .load_image(&png_bytes(10, 10, [250, 250, 250, 255]))
        .unwrap();

    let surface = session.surface().unwrap();
    assert!(surface.data.chunks_exact(4).all(|px| px == [255, 255, 255, 255]));
}

#[test]
fn bright_image_paints_dots_in_the_source_color() {
    let mut render = RenderParams::default();
    render.min_dot_size = 1.0;
    render.max_dot_size = 1.0;

    let mut session = DotSession::new(AdjustParams::default(), render).unwrap();
    session
        .load_image(&png_bytes(10, 10, [180, 30, 30, 255]))
        .unwrap();

    let surface = session.surface().unwrap();
    // Cell centers carry the dot color; spacing 10 puts the first at (5,5).
    assert_eq!(pixel_at(surface, 5, 5), [180, 30, 30, 255]);
    assert_eq!(pixel_at(surface, 15, 15), [180, 30, 30, 255]);
}

#[test]
fn transform_is_idempotent_through_the_public_api() {
    let samples: Vec<Rgb> = (0..100u32)
        .map(|i| Rgb::new((i % 256) as u8, (i * 2 % 256) as u8, (i * 3 % 256) as u8))
        .collect();
    let grid = PixelGrid::from_samples(10, 10, samples).unwrap();
    let params = AdjustParams {
        contrast: 12.1,
        brightness: 113.0,
        gamma: 1.2,
        color_inverted: false,
        use_colors: true,
    };

    let a = process_grid(&grid, &params);
    let b = process_grid(&grid, &params);
    assert_eq!(a, b);
}

#[test]
fn every_shape_renders_without_error() {
    for shape in [
        DotShape::Circle,
        DotShape::Square,
        DotShape::Diamond,
        DotShape::Triangle,
        DotShape::Cross,
        DotShape::Ring,
    ] {
        let mut render = RenderParams::default();
        render.shape = shape;
        render.min_dot_size = 0.9;
        render.max_dot_size = 0.9;

        let mut session = DotSession::new(AdjustParams::default(), render).unwrap();
        session
            .load_image(&png_bytes(6, 6, [60, 120, 180, 255]))
            .unwrap();
        let surface = session.surface().unwrap();
        // Something was painted over the white clear for every shape kind.
        assert!(
            surface.data.chunks_exact(4).any(|px| px != [255, 255, 255, 255]),
            "shape {shape:?} drew nothing"
        );
    }
}

#[test]
fn degenerate_geometry_is_a_no_op_not_an_error() {
    // A 400x1 image downscaled to width 100 rounds to zero rows. Loading
    // succeeds, nothing is drawn, and no surface is produced.
    let mut session = DotSession::new(AdjustParams::default(), RenderParams::default()).unwrap();
    session
        .load_image(&png_bytes(400, 1, [90, 90, 90, 255]))
        .unwrap();
    assert!(session.frame().is_some());
    assert_eq!(session.frame().unwrap().height(), 0);
    assert!(session.surface().is_none());
}
