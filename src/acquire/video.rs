//! Streaming acquisition: a polymorphic video source contract plus a
//! file-backed implementation that decodes through an ffmpeg child process.

use std::{
    io::Read as _,
    path::{Path, PathBuf},
    process::{Child, ChildStdout, Command, Stdio},
};

use crate::foundation::{
    core::{PixelGrid, Rgb},
    error::{DotError, DotResult},
};

/// A live producer of RGB pixel grids at a fixed target width.
///
/// Implementations own whatever decoding resources they need and must
/// release them on drop. `restart` tears the decoder down and brings it back
/// up for a new width/rate, which is how dimension-affecting parameter
/// changes are applied mid-stream.
pub trait VideoSource {
    /// Native frame dimensions of the underlying stream.
    fn native_dimensions(&self) -> (u32, u32);

    /// True when the source has decoded data available to read.
    fn is_ready(&self) -> bool;

    /// Produce the next frame as a grid of `target_width` columns, or `None`
    /// once the stream has ended.
    fn next_grid(&mut self) -> DotResult<Option<PixelGrid>>;

    /// Restart decoding with a new target width and sample rate.
    fn restart(&mut self, target_width: u32, frame_rate: u32) -> DotResult<()>;
}

/// Streaming grid height: `floor(width / aspect)` from the true frame
/// aspect ratio. Dots are isotropic so no multiplier applies here.
pub fn streaming_grid_height(native_width: u32, native_height: u32, target_width: u32) -> u32 {
    if native_width == 0 || native_height == 0 {
        return 0;
    }
    let aspect = f64::from(native_width) / f64::from(native_height);
    (f64::from(target_width) / aspect).floor() as u32
}

/// Probed metadata for a video file.
#[derive(Clone, Debug)]
pub struct VideoInfo {
    pub source_path: PathBuf,
    pub width: u32,
    pub height: u32,
    pub fps_num: u32,
    pub fps_den: u32,
    pub duration_sec: f64,
}

impl VideoInfo {
    pub fn source_fps(&self) -> f64 {
        if self.fps_den == 0 {
            0.0
        } else {
            f64::from(self.fps_num) / f64::from(self.fps_den)
        }
    }
}

/// Probe a video file with ffprobe.
pub fn probe_video(source_path: &Path) -> DotResult<VideoInfo> {
    #[derive(serde::Deserialize)]
    struct ProbeStream {
        codec_type: Option<String>,
        width: Option<u32>,
        height: Option<u32>,
        r_frame_rate: Option<String>,
    }
    #[derive(serde::Deserialize)]
    struct ProbeFormat {
        duration: Option<String>,
    }
    #[derive(serde::Deserialize)]
    struct ProbeOut {
        streams: Vec<ProbeStream>,
        format: Option<ProbeFormat>,
    }

    let out = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-print_format",
            "json",
            "-show_streams",
            "-show_format",
        ])
        .arg(source_path)
        .output()
        .map_err(|e| DotError::decode(format!("failed to run ffprobe: {e}")))?;
    if !out.status.success() {
        return Err(DotError::input_rejected(format!(
            "'{}' is not readable as video: {}",
            source_path.display(),
            String::from_utf8_lossy(&out.stderr).trim()
        )));
    }

    let parsed: ProbeOut = serde_json::from_slice(&out.stdout)
        .map_err(|e| DotError::decode(format!("ffprobe json parse failed: {e}")))?;
    let video_stream = parsed
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .ok_or_else(|| DotError::input_rejected("no video stream found"))?;
    let width = video_stream
        .width
        .ok_or_else(|| DotError::decode("missing video width from ffprobe"))?;
    let height = video_stream
        .height
        .ok_or_else(|| DotError::decode("missing video height from ffprobe"))?;
    let (fps_num, fps_den) = parse_ff_ratio(video_stream.r_frame_rate.as_deref().unwrap_or("0/1"))
        .ok_or_else(|| DotError::decode("invalid video r_frame_rate"))?;
    let duration_sec = parsed
        .format
        .as_ref()
        .and_then(|f| f.duration.as_ref())
        .and_then(|s| s.parse::<f64>().ok())
        .unwrap_or(0.0);

    Ok(VideoInfo {
        source_path: source_path.to_path_buf(),
        width,
        height,
        fps_num,
        fps_den,
        duration_sec,
    })
}

/// File-backed [`VideoSource`]: an ffmpeg child scales frames to the target
/// grid size and resamples them to the configured rate, piping tightly
/// packed rgb24 frames over stdout.
pub struct FileVideoSource {
    info: VideoInfo,
    grid_width: u32,
    grid_height: u32,
    frame_rate: u32,
    decoder: Option<(Child, ChildStdout)>,
    ended: bool,
}

impl FileVideoSource {
    pub fn open(source_path: &Path, target_width: u32, frame_rate: u32) -> DotResult<Self> {
        let info = probe_video(source_path)?;
        let mut source = Self {
            info,
            grid_width: 0,
            grid_height: 0,
            frame_rate: frame_rate.max(1),
            decoder: None,
            ended: false,
        };
        source.configure(target_width, source.frame_rate)?;
        Ok(source)
    }

    pub fn info(&self) -> &VideoInfo {
        &self.info
    }

    pub fn grid_dimensions(&self) -> (u32, u32) {
        (self.grid_width, self.grid_height)
    }

    fn configure(&mut self, target_width: u32, frame_rate: u32) -> DotResult<()> {
        self.shutdown();
        self.grid_width = target_width;
        self.grid_height = streaming_grid_height(self.info.width, self.info.height, target_width);
        self.frame_rate = frame_rate.max(1);
        self.ended = false;

        if self.grid_width == 0 || self.grid_height == 0 {
            // Degenerate target: nothing to decode, stream reads as ended.
            self.ended = true;
            return Ok(());
        }

        let mut child = Command::new("ffmpeg")
            .args(["-v", "error", "-i"])
            .arg(&self.info.source_path)
            .args([
                "-f",
                "rawvideo",
                "-pix_fmt",
                "rgb24",
                "-vf",
                &format!(
                    "scale={}:{},fps={}",
                    self.grid_width, self.grid_height, self.frame_rate
                ),
                "pipe:1",
            ])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| {
                DotError::decode(format!("failed to spawn ffmpeg for video decode: {e}"))
            })?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| DotError::decode("failed to open ffmpeg stdout (unexpected)"))?;
        self.decoder = Some((child, stdout));
        Ok(())
    }

    fn shutdown(&mut self) {
        if let Some((mut child, stdout)) = self.decoder.take() {
            drop(stdout);
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

impl VideoSource for FileVideoSource {
    fn native_dimensions(&self) -> (u32, u32) {
        (self.info.width, self.info.height)
    }

    fn is_ready(&self) -> bool {
        // A piped decoder either has frames buffered or is still producing.
        // End-of-stream is surfaced through `next_grid` returning `None`, so
        // the capture gate must keep letting reads through.
        true
    }

    fn next_grid(&mut self) -> DotResult<Option<PixelGrid>> {
        if self.ended {
            return Ok(None);
        }
        let Some((_, stdout)) = self.decoder.as_mut() else {
            return Ok(None);
        };

        let frame_len = self.grid_width as usize * self.grid_height as usize * 3;
        let mut buf = vec![0u8; frame_len];
        match stdout.read_exact(&mut buf) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                self.ended = true;
                self.shutdown();
                return Ok(None);
            }
            Err(e) => {
                self.ended = true;
                self.shutdown();
                return Err(DotError::decode(format!(
                    "reading video frame from ffmpeg failed: {e}"
                )));
            }
        }

        let mut samples = Vec::with_capacity(frame_len / 3);
        for px in buf.chunks_exact(3) {
            samples.push(Rgb::new(px[0], px[1], px[2]));
        }
        Ok(Some(PixelGrid::from_samples(
            self.grid_width,
            self.grid_height,
            samples,
        )?))
    }

    fn restart(&mut self, target_width: u32, frame_rate: u32) -> DotResult<()> {
        self.configure(target_width, frame_rate)
    }
}

impl Drop for FileVideoSource {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn parse_ff_ratio(s: &str) -> Option<(u32, u32)> {
    let mut parts = s.split('/');
    let a = parts.next()?.parse::<u32>().ok()?;
    let b = parts.next()?.parse::<u32>().ok()?;
    if b == 0 {
        return None;
    }
    Some((a, b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn streaming_height_uses_floor_of_true_aspect() {
        // 16:9 at width 100: 100 / (16/9) = 56.25 -> 56.
        assert_eq!(streaming_grid_height(1920, 1080, 100), 56);
        assert_eq!(streaming_grid_height(1080, 1920, 100), 177);
        assert_eq!(streaming_grid_height(640, 480, 80), 60);
    }

    #[test]
    fn streaming_height_degenerates_to_zero() {
        assert_eq!(streaming_grid_height(0, 1080, 100), 0);
        assert_eq!(streaming_grid_height(1920, 0, 100), 0);
        // Extreme aspect ratios floor to zero rows.
        assert_eq!(streaming_grid_height(10_000, 1, 4), 0);
    }

    #[test]
    fn ff_ratio_parsing() {
        assert_eq!(parse_ff_ratio("30/1"), Some((30, 1)));
        assert_eq!(parse_ff_ratio("30000/1001"), Some((30000, 1001)));
        assert_eq!(parse_ff_ratio("30"), None);
        assert_eq!(parse_ff_ratio("30/0"), None);
        assert_eq!(parse_ff_ratio("x/y"), None);
    }

    #[test]
    fn source_fps_guards_zero_denominator() {
        let info = VideoInfo {
            source_path: PathBuf::from("a.mp4"),
            width: 100,
            height: 100,
            fps_num: 30,
            fps_den: 0,
            duration_sec: 0.0,
        };
        assert_eq!(info.source_fps(), 0.0);
    }
}
