//! Session façade: owns parameters, sources, the current frame, and the
//! renderer, and drives them from a cooperative scheduler tick.

use std::time::{Duration, Instant};

use crate::{
    acquire::{
        image::{decode_image, grid_from_image, premultiply_rgba8_in_place},
        sampler::FrameSampler,
        video::VideoSource,
    },
    foundation::{
        core::{FrameRgba, PixelGrid, ProcessedFrame},
        error::DotResult,
    },
    params::{AdjustParams, Preset, RenderParams},
    render::{cpu::CpuRenderer, plan::plan_dots},
    transform::process_grid,
};

/// Session tuning knobs.
#[derive(Clone, Copy, Debug)]
pub struct DotSessionOpts {
    /// Trailing coalescing window for parameter changes. The last value
    /// submitted within a burst is always the one applied.
    pub debounce_window: Duration,
    /// Height multiplier for still-image acquisition. Isotropic dots use
    /// 1.0; non-square visual units need a different ratio.
    pub aspect_multiplier: f64,
}

impl Default for DotSessionOpts {
    fn default() -> Self {
        Self {
            debounce_window: Duration::from_millis(50),
            aspect_multiplier: 1.0,
        }
    }
}

/// Result of one scheduler tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    /// Nothing was due.
    Idle,
    /// A fresh frame was drawn (parameter flush or video sample).
    Rendered,
    /// The video source reported end of stream and was released.
    StreamEnded,
}

struct PendingParams {
    adjust: AdjustParams,
    render: RenderParams,
    deadline: Instant,
}

struct VideoStream {
    source: Box<dyn VideoSource>,
    sampler: FrameSampler,
}

/// Interactive dot-art session for one source at a time.
///
/// All work happens on the caller's single execution context; `tick` is the
/// only scheduling entry point. Failures inside a tick are logged and leave
/// the previous frame visible, never crashing the loop.
pub struct DotSession {
    opts: DotSessionOpts,
    adjust: AdjustParams,
    render: RenderParams,
    pending: Option<PendingParams>,
    still_image: Option<image::RgbaImage>,
    raw_grid: Option<PixelGrid>,
    frame: Option<ProcessedFrame>,
    stream: Option<VideoStream>,
    renderer: CpuRenderer,
}

impl DotSession {
    pub fn new(adjust: AdjustParams, render: RenderParams) -> DotResult<Self> {
        Self::with_opts(adjust, render, DotSessionOpts::default())
    }

    pub fn with_opts(
        adjust: AdjustParams,
        render: RenderParams,
        opts: DotSessionOpts,
    ) -> DotResult<Self> {
        adjust.validate()?;
        render.validate()?;
        Ok(Self {
            opts,
            adjust,
            render,
            pending: None,
            still_image: None,
            raw_grid: None,
            frame: None,
            stream: None,
            renderer: CpuRenderer::new(),
        })
    }

    pub fn adjust_params(&self) -> &AdjustParams {
        &self.adjust
    }

    pub fn render_params(&self) -> &RenderParams {
        &self.render
    }

    pub fn is_streaming(&self) -> bool {
        self.stream.is_some()
    }

    /// The current processed frame, if any source has produced one.
    pub fn frame(&self) -> Option<&ProcessedFrame> {
        self.frame.as_ref()
    }

    /// The most recently rendered surface.
    pub fn surface(&self) -> Option<&FrameRgba> {
        self.renderer.last_frame()
    }

    /// Load a still image from raw bytes and render it immediately.
    ///
    /// On failure nothing changes: the previous source, frame, and surface
    /// all stay as they were.
    #[tracing::instrument(skip_all, fields(len = bytes.len()))]
    pub fn load_image(&mut self, bytes: &[u8]) -> DotResult<()> {
        let img = decode_image(bytes)?;
        let grid = grid_from_image(&img, self.render.resolution, self.opts.aspect_multiplier)?;
        let frame = process_grid(&grid, &self.adjust);

        let mut bg = img.as_raw().clone();
        premultiply_rgba8_in_place(&mut bg);
        self.renderer.set_background(&bg, img.width(), img.height())?;

        // Decode succeeded: commit the new source wholesale.
        self.stream = None;
        self.still_image = Some(img);
        self.raw_grid = Some(grid);
        self.frame = Some(frame);
        self.draw()
    }

    /// Attach a live video source. Clears the still source; the first frame
    /// arrives on the next tick (the sampler gate opens immediately).
    pub fn start_stream(&mut self, source: Box<dyn VideoSource>) {
        self.still_image = None;
        self.raw_grid = None;
        self.frame = None;
        self.renderer.clear_background();
        self.stream = Some(VideoStream {
            source,
            sampler: FrameSampler::new(self.render.frame_rate),
        });
    }

    /// Detach and release the video source. The last rendered frame stays.
    pub fn stop_stream(&mut self) {
        self.stream = None;
    }

    /// Queue new adjustment parameters; applied on a later tick once the
    /// coalescing window closes.
    pub fn set_adjust(&mut self, adjust: AdjustParams, now: Instant) -> DotResult<()> {
        adjust.validate()?;
        let render = self.pending.as_ref().map_or(self.render, |p| p.render);
        self.queue(adjust, render, now);
        Ok(())
    }

    /// Queue new render parameters; applied on a later tick once the
    /// coalescing window closes.
    pub fn set_render(&mut self, render: RenderParams, now: Instant) -> DotResult<()> {
        render.validate()?;
        let adjust = self.pending.as_ref().map_or(self.adjust, |p| p.adjust);
        self.queue(adjust, render, now);
        Ok(())
    }

    /// Apply a preset atomically and redraw immediately (preset selection is
    /// a discrete action, not a slider drag).
    pub fn apply_preset(&mut self, preset: &Preset) -> DotResult<()> {
        preset.validate()?;
        self.pending = None;
        self.commit_params(preset.adjust, preset.render)
    }

    /// One scheduler step: flush due parameter changes, then sample video if
    /// streaming and the capture gate is open.
    pub fn tick(&mut self, now: Instant) -> TickOutcome {
        let mut outcome = TickOutcome::Idle;

        if let Some(pending) = self.pending.take() {
            if pending.deadline <= now {
                match self.commit_params(pending.adjust, pending.render) {
                    Ok(()) if self.frame.is_some() => outcome = TickOutcome::Rendered,
                    Ok(()) => {}
                    Err(e) => tracing::warn!(error = %e, "parameter flush failed; keeping previous frame"),
                }
            } else {
                self.pending = Some(pending);
            }
        }

        let sampled = {
            let Some(stream) = self.stream.as_mut() else {
                return outcome;
            };
            if !stream.sampler.should_capture(now) || !stream.source.is_ready() {
                return outcome;
            }
            stream.source.next_grid()
        };

        match sampled {
            Ok(Some(grid)) => {
                if self.render.show_original_background
                    && let Err(e) = self.renderer.set_background_grid(&grid)
                {
                    tracing::warn!(error = %e, "background update failed");
                }
                self.frame = Some(process_grid(&grid, &self.adjust));
                self.raw_grid = Some(grid);
                match self.draw() {
                    Ok(()) => TickOutcome::Rendered,
                    Err(e) => {
                        tracing::warn!(error = %e, "video frame render failed; keeping previous frame");
                        outcome
                    }
                }
            }
            Ok(None) => {
                self.stream = None;
                TickOutcome::StreamEnded
            }
            Err(e) => {
                tracing::warn!(error = %e, "video frame decode failed; keeping previous frame");
                outcome
            }
        }
    }

    fn queue(&mut self, adjust: AdjustParams, render: RenderParams, now: Instant) {
        self.pending = Some(PendingParams {
            adjust,
            render,
            deadline: now + self.opts.debounce_window,
        });
    }

    fn commit_params(&mut self, adjust: AdjustParams, render: RenderParams) -> DotResult<()> {
        let resolution_changed = render.resolution != self.render.resolution;
        let rate_changed = render.frame_rate != self.render.frame_rate;
        let adjust_changed = adjust != self.adjust;

        self.adjust = adjust;
        self.render = render;

        if let Some(stream) = self.stream.as_mut() {
            if resolution_changed || rate_changed {
                stream
                    .source
                    .restart(self.render.resolution, self.render.frame_rate)?;
                stream.sampler = FrameSampler::new(self.render.frame_rate);
                // The stale frame no longer matches the stream dimensions.
                if resolution_changed {
                    self.raw_grid = None;
                    self.frame = None;
                }
            }
        } else if resolution_changed
            && let Some(img) = &self.still_image
        {
            let grid = grid_from_image(img, self.render.resolution, self.opts.aspect_multiplier)?;
            self.raw_grid = Some(grid);
        }

        if (adjust_changed || resolution_changed)
            && let Some(grid) = &self.raw_grid
        {
            self.frame = Some(process_grid(grid, &self.adjust));
        }

        self.draw()
    }

    fn draw(&mut self) -> DotResult<()> {
        let Some(frame) = &self.frame else {
            return Ok(());
        };
        let plan = plan_dots(frame, &self.render);
        self.renderer.render(&plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::core::Rgb;
    use crate::foundation::error::DotError;

    fn session() -> DotSession {
        DotSession::new(AdjustParams::default(), RenderParams::default()).unwrap()
    }

    fn png_bytes(width: u32, height: u32, rgba: [u8; 4]) -> Vec<u8> {
        use std::io::Cursor;
        let img = image::RgbaImage::from_pixel(width, height, image::Rgba(rgba));
        let mut buf = Vec::new();
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();
        buf
    }

    #[test]
    fn load_image_renders_immediately() {
        let mut s = session();
        s.load_image(&png_bytes(40, 20, [90, 90, 90, 255])).unwrap();
        let frame = s.frame().unwrap();
        assert_eq!((frame.width(), frame.height()), (40, 20));
        let surface = s.surface().unwrap();
        // spacing 10 at resolution 100 / zoom 1
        assert_eq!((surface.width, surface.height), (400, 200));
    }

    #[test]
    fn rejected_input_leaves_previous_state() {
        let mut s = session();
        s.load_image(&png_bytes(4, 4, [10, 10, 10, 255])).unwrap();
        let before = s.surface().unwrap().clone();

        let err = s.load_image(b"not an image at all").unwrap_err();
        assert!(matches!(err, DotError::InputRejected(_)));
        assert_eq!(s.surface().unwrap(), &before);
        assert!(s.frame().is_some());
    }

    #[test]
    fn debounce_applies_only_the_final_value() {
        let mut s = session();
        s.load_image(&png_bytes(8, 8, [120, 120, 120, 255])).unwrap();

        let t0 = Instant::now();
        for step in 0..5u32 {
            let mut a = AdjustParams::default();
            a.brightness = f64::from(step * 10);
            s.set_adjust(a, t0 + Duration::from_millis(u64::from(step) * 5))
                .unwrap();
        }
        // Inside the window nothing is applied yet.
        assert_eq!(s.tick(t0 + Duration::from_millis(30)), TickOutcome::Idle);
        assert_eq!(s.adjust_params().brightness, 0.0);

        // After the window closes, exactly the last value lands.
        assert_eq!(s.tick(t0 + Duration::from_secs(1)), TickOutcome::Rendered);
        assert_eq!(s.adjust_params().brightness, 40.0);
    }

    #[test]
    fn preset_applies_atomically_without_debounce() {
        let mut s = session();
        s.load_image(&png_bytes(8, 8, [120, 120, 120, 255])).unwrap();
        let preset = crate::params::find_preset("delanceyessexsnow").unwrap();
        s.apply_preset(&preset).unwrap();
        assert_eq!(s.adjust_params().contrast, 12.1);
        assert_eq!(s.render_params().resolution, 82);
        // Re-acquired at the preset's resolution.
        assert_eq!(s.frame().unwrap().width(), 8); // native smaller than target
    }

    #[test]
    fn resolution_change_reacquires_the_still_grid() {
        let mut s = session();
        s.load_image(&png_bytes(200, 100, [50, 60, 70, 255])).unwrap();
        assert_eq!(s.frame().unwrap().width(), 100);

        let t0 = Instant::now();
        let mut r = RenderParams::default();
        r.resolution = 50;
        s.set_render(r, t0).unwrap();
        s.tick(t0 + Duration::from_secs(1));
        assert_eq!(s.frame().unwrap().width(), 50);
        assert_eq!(s.frame().unwrap().height(), 25);
    }

    struct ScriptedSource {
        frames: Vec<PixelGrid>,
        cursor: usize,
    }

    impl ScriptedSource {
        fn new(frames: Vec<PixelGrid>) -> Self {
            Self { frames, cursor: 0 }
        }
    }

    impl VideoSource for ScriptedSource {
        fn native_dimensions(&self) -> (u32, u32) {
            (640, 480)
        }

        fn is_ready(&self) -> bool {
            true
        }

        fn next_grid(&mut self) -> DotResult<Option<PixelGrid>> {
            let Some(grid) = self.frames.get(self.cursor) else {
                return Ok(None);
            };
            self.cursor += 1;
            Ok(Some(grid.clone()))
        }

        fn restart(&mut self, _target_width: u32, _frame_rate: u32) -> DotResult<()> {
            self.cursor = 0;
            Ok(())
        }
    }

    #[test]
    fn streaming_respects_the_sampling_gate() {
        let mut s = session();
        let frames = vec![PixelGrid::filled(10, 6, Rgb::new(128, 0, 0)); 20];
        s.start_stream(Box::new(ScriptedSource::new(frames)));

        // 10 fps gate ticked every 10 ms for one second: ~10 captures.
        let t0 = Instant::now();
        let mut rendered = 0;
        for i in 0..100u64 {
            if s.tick(t0 + Duration::from_millis(i * 10)) == TickOutcome::Rendered {
                rendered += 1;
            }
        }
        assert!(rendered >= 9 && rendered <= 11, "rendered {rendered} frames");
        assert!(s.frame().is_some());
    }

    #[test]
    fn stream_end_releases_the_source() {
        let mut s = session();
        let frames = vec![PixelGrid::filled(4, 4, Rgb::new(200, 200, 200))];
        s.start_stream(Box::new(ScriptedSource::new(frames)));

        let t0 = Instant::now();
        assert_eq!(s.tick(t0), TickOutcome::Rendered);
        assert_eq!(
            s.tick(t0 + Duration::from_millis(200)),
            TickOutcome::StreamEnded
        );
        assert!(!s.is_streaming());
        // Last frame stays visible.
        assert!(s.surface().is_some());
    }

    #[test]
    fn rate_change_restarts_the_stream() {
        let mut s = session();
        let frames = vec![PixelGrid::filled(4, 4, Rgb::new(1, 2, 3)); 4];
        s.start_stream(Box::new(ScriptedSource::new(frames)));

        let t0 = Instant::now();
        let mut r = RenderParams::default();
        r.frame_rate = 30;
        s.set_render(r, t0).unwrap();
        let outcome = s.tick(t0 + Duration::from_secs(1));
        // Flush restarted the source, and the same tick may also sample.
        assert_ne!(outcome, TickOutcome::Idle);
        assert!(s.is_streaming());
    }

    #[test]
    fn loading_an_image_detaches_the_stream() {
        let mut s = session();
        s.start_stream(Box::new(ScriptedSource::new(vec![])));
        assert!(s.is_streaming());
        s.load_image(&png_bytes(4, 4, [5, 5, 5, 255])).unwrap();
        assert!(!s.is_streaming());
    }
}
