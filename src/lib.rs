//! Dotfield renders still images and video streams as dot art: a grid of
//! shapes whose per-cell size and color encode the source pixel's brightness
//! and color.
//!
//! The pipeline is acquisition → pixel transform → plan → CPU raster:
//!
//! - Decode a still image (or sample a [`VideoSource`]) into a [`PixelGrid`]
//! - Transform it with [`AdjustParams`] into a [`ProcessedFrame`]
//! - Compile the frame against [`RenderParams`] into a [`DotPlan`]
//! - Execute the plan on a [`CpuRenderer`] and read back [`FrameRgba`]
//!
//! [`DotSession`] wires the stages together behind a cooperative `tick`
//! scheduler with debounced parameter changes and rate-gated video sampling.
#![forbid(unsafe_code)]

pub mod acquire;
pub mod color;
pub mod encode;
pub mod foundation;
pub mod params;
pub mod render;
pub mod session;
pub mod transform;

pub use acquire::image::{decode_image, grid_from_image, still_grid_dimensions};
pub use acquire::sampler::FrameSampler;
pub use acquire::video::{
    FileVideoSource, VideoInfo, VideoSource, probe_video, streaming_grid_height,
};
pub use encode::{EncodeConfig, FfmpegEncoder, is_ffmpeg_on_path};
pub use foundation::core::{FrameRgba, PixelGrid, ProcessedFrame, Rgb};
pub use foundation::error::{DotError, DotResult};
pub use params::{AdjustParams, DotShape, Preset, RenderParams, builtin_presets, find_preset};
pub use render::cpu::CpuRenderer;
pub use render::plan::{DotOp, DotPlan, UNIT_BASE, dot_spacing, plan_dots};
pub use session::{DotSession, DotSessionOpts, TickOutcome};
pub use transform::process_grid;
