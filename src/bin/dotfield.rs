use std::{
    path::PathBuf,
    time::{Duration, Instant},
};

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand, ValueEnum};

use dotfield::{
    AdjustParams, DotSession, DotShape, EncodeConfig, FfmpegEncoder, FileVideoSource,
    RenderParams, TickOutcome, find_preset,
};

#[derive(Parser, Debug)]
#[command(name = "dotfield", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a still image as a dot-art PNG.
    Frame(FrameArgs),
    /// Render a video as a dot-art MP4 (requires `ffmpeg` on PATH).
    Video(VideoArgs),
    /// List the built-in presets.
    Presets,
}

#[derive(Parser, Debug)]
struct FrameArgs {
    /// Input image path.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,

    #[command(flatten)]
    params: ParamArgs,
}

#[derive(Parser, Debug)]
struct VideoArgs {
    /// Input video path.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output MP4 path.
    #[arg(long)]
    out: PathBuf,

    #[command(flatten)]
    params: ParamArgs,
}

/// Parameter flags. A preset (if given) supplies the base values; individual
/// flags override it.
#[derive(Args, Debug)]
struct ParamArgs {
    /// Built-in preset name to start from.
    #[arg(long)]
    preset: Option<String>,

    /// Target grid width in cells.
    #[arg(long)]
    resolution: Option<u32>,

    #[arg(long)]
    zoom: Option<f64>,

    /// Contrast multiplier around the midpoint.
    #[arg(long)]
    contrast: Option<f64>,

    /// Additive brightness shift (-255..=255).
    #[arg(long)]
    brightness: Option<f64>,

    /// Gamma exponent.
    #[arg(long)]
    gamma: Option<f64>,

    /// Invert colors.
    #[arg(long)]
    invert: bool,

    /// Greyscale output instead of the color path.
    #[arg(long)]
    greyscale: bool,

    /// Dot size fraction at zero brightness (may be negative).
    #[arg(long)]
    min_dot_size: Option<f64>,

    /// Dot size fraction at full brightness.
    #[arg(long)]
    max_dot_size: Option<f64>,

    #[arg(long, value_enum)]
    shape: Option<ShapeChoice>,

    /// Draw dots with the original colors (sizing still follows adjustment).
    #[arg(long)]
    force_original_colors: bool,

    /// Suppress near-white cells.
    #[arg(long)]
    remove_white: bool,

    /// Brightness threshold for --remove-white (0-255).
    #[arg(long)]
    white_point: Option<u8>,

    /// Draw the source stretched beneath the dots.
    #[arg(long)]
    background: bool,

    /// Video sampling rate in frames per second (1-60).
    #[arg(long)]
    frame_rate: Option<u32>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ShapeChoice {
    Circle,
    Square,
    Diamond,
    Triangle,
    Cross,
    Ring,
}

impl From<ShapeChoice> for DotShape {
    fn from(choice: ShapeChoice) -> Self {
        match choice {
            ShapeChoice::Circle => DotShape::Circle,
            ShapeChoice::Square => DotShape::Square,
            ShapeChoice::Diamond => DotShape::Diamond,
            ShapeChoice::Triangle => DotShape::Triangle,
            ShapeChoice::Cross => DotShape::Cross,
            ShapeChoice::Ring => DotShape::Ring,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.cmd {
        Command::Frame(args) => cmd_frame(args),
        Command::Video(args) => cmd_video(args),
        Command::Presets => cmd_presets(),
    }
}

fn resolve_params(args: &ParamArgs) -> anyhow::Result<(AdjustParams, RenderParams)> {
    let (mut adjust, mut render) = match &args.preset {
        Some(name) => {
            let preset = find_preset(name)
                .with_context(|| format!("unknown preset '{name}' (see `dotfield presets`)"))?;
            (preset.adjust, preset.render)
        }
        None => (AdjustParams::default(), RenderParams::default()),
    };

    if let Some(v) = args.contrast {
        adjust.contrast = v;
    }
    if let Some(v) = args.brightness {
        adjust.brightness = v;
    }
    if let Some(v) = args.gamma {
        adjust.gamma = v;
    }
    if args.invert {
        adjust.color_inverted = true;
    }
    if args.greyscale {
        adjust.use_colors = false;
    }

    if let Some(v) = args.resolution {
        render.resolution = v;
    }
    if let Some(v) = args.zoom {
        render.zoom = v;
    }
    if let Some(v) = args.min_dot_size {
        render.min_dot_size = v;
    }
    if let Some(v) = args.max_dot_size {
        render.max_dot_size = v;
    }
    if let Some(v) = args.shape {
        render.shape = v.into();
    }
    if args.force_original_colors {
        render.force_original_colors = true;
    }
    if args.remove_white {
        render.remove_white = true;
    }
    if let Some(v) = args.white_point {
        render.white_point = v;
    }
    if args.background {
        render.show_original_background = true;
    }
    if let Some(v) = args.frame_rate {
        render.frame_rate = v;
    }

    adjust.validate()?;
    render.validate()?;
    Ok((adjust, render))
}

fn cmd_frame(args: FrameArgs) -> anyhow::Result<()> {
    let (adjust, render) = resolve_params(&args.params)?;
    let bytes = std::fs::read(&args.in_path)
        .with_context(|| format!("read input image '{}'", args.in_path.display()))?;

    let mut session = DotSession::new(adjust, render)?;
    session.load_image(&bytes)?;

    let frame = session
        .surface()
        .context("source produced a degenerate (zero-sized) canvas; nothing to write")?;
    let img = image::RgbaImage::from_raw(frame.width, frame.height, frame.data.clone())
        .context("rendered frame buffer has unexpected size")?;
    img.save(&args.out)
        .with_context(|| format!("write output PNG '{}'", args.out.display()))?;

    println!(
        "wrote {} ({}x{}, {} dots)",
        args.out.display(),
        frame.width,
        frame.height,
        session.frame().map_or(0, |f| {
            dotfield::plan_dots(f, session.render_params()).ops.len()
        }),
    );
    Ok(())
}

fn cmd_video(args: VideoArgs) -> anyhow::Result<()> {
    let (adjust, render) = resolve_params(&args.params)?;
    let fps = render.frame_rate;

    let source = FileVideoSource::open(&args.in_path, render.resolution, fps)?;
    let (grid_w, grid_h) = source.grid_dimensions();
    anyhow::ensure!(
        grid_w > 0 && grid_h > 0,
        "video dimensions collapse to a degenerate grid at resolution {}",
        render.resolution
    );

    let mut session = DotSession::new(adjust, render)?;
    session.start_stream(Box::new(source));

    // Offline sources are paced by ffmpeg's resampler, so the session is
    // driven by a synthetic clock stepping one capture interval per tick.
    let step = Duration::from_secs_f64(1.0 / f64::from(fps));
    let mut now = Instant::now();
    let mut encoder: Option<FfmpegEncoder> = None;
    let mut frames = 0u64;

    loop {
        match session.tick(now) {
            TickOutcome::Rendered => {
                let frame = session.surface().context("rendered tick left no surface")?;
                if encoder.is_none() {
                    encoder = Some(FfmpegEncoder::new(EncodeConfig {
                        width: frame.width,
                        height: frame.height,
                        fps,
                        out_path: args.out.clone(),
                        overwrite: true,
                    })?);
                }
                if let Some(enc) = encoder.as_mut() {
                    enc.encode_frame(frame)?;
                    frames += 1;
                }
            }
            TickOutcome::Idle => {}
            TickOutcome::StreamEnded => break,
        }
        now += step;
    }

    let encoder = encoder.context("video produced no frames (degenerate dimensions?)")?;
    encoder.finish()?;
    println!("wrote {} ({frames} frames at {fps} fps)", args.out.display());
    Ok(())
}

fn cmd_presets() -> anyhow::Result<()> {
    for preset in dotfield::builtin_presets() {
        println!(
            "{:<20} resolution={:<4} contrast={:<5} brightness={:<5} gamma={:<4} {} {}",
            preset.name,
            preset.render.resolution,
            preset.adjust.contrast,
            preset.adjust.brightness,
            preset.adjust.gamma,
            if preset.adjust.use_colors {
                "color"
            } else {
                "greyscale"
            },
            if preset.render.remove_white {
                "remove-white"
            } else {
                ""
            },
        );
    }
    Ok(())
}
