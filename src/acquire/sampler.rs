//! Elapsed-time capture gate for video sampling.

use std::time::{Duration, Instant};

/// Decides when the streaming loop may capture a frame.
///
/// The scheduler ticks at whatever cadence drives it (often far above the
/// configured rate); a frame is captured only when at least `1000/rate` ms
/// have elapsed since the previous capture. The first tick after
/// construction or [`reset`](FrameSampler::reset) always captures.
#[derive(Clone, Debug)]
pub struct FrameSampler {
    interval: Duration,
    last_capture: Option<Instant>,
}

impl FrameSampler {
    pub fn new(frame_rate: u32) -> Self {
        let rate = frame_rate.max(1);
        Self {
            interval: Duration::from_secs_f64(1.0 / f64::from(rate)),
            last_capture: None,
        }
    }

    /// Minimum spacing between captures.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Gate check for one scheduler tick. Records the capture time when it
    /// fires, so callers must only invoke it when they intend to capture.
    pub fn should_capture(&mut self, now: Instant) -> bool {
        match self.last_capture {
            Some(last) if now.duration_since(last) < self.interval => false,
            _ => {
                self.last_capture = Some(now);
                true
            }
        }
    }

    /// Forget pacing state; the next tick captures immediately. Used when
    /// streaming restarts after a dimension or rate change.
    pub fn reset(&mut self) {
        self.last_capture = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_tick_captures() {
        let mut sampler = FrameSampler::new(10);
        assert!(sampler.should_capture(Instant::now()));
    }

    #[test]
    fn captures_never_land_closer_than_the_interval() {
        // 10 fps gate ticked at 60 Hz: no two captures within 100 ms.
        let mut sampler = FrameSampler::new(10);
        let start = Instant::now();
        let tick = Duration::from_micros(16_667);

        let mut captures = Vec::new();
        for i in 0..120u64 {
            let now = start + tick * i as u32;
            if sampler.should_capture(now) {
                captures.push(now);
            }
        }

        assert!(captures.len() >= 2);
        for pair in captures.windows(2) {
            assert!(pair[1].duration_since(pair[0]) >= Duration::from_millis(100));
        }
    }

    #[test]
    fn gate_holds_until_interval_elapses() {
        let mut sampler = FrameSampler::new(10);
        let start = Instant::now();
        assert!(sampler.should_capture(start));
        assert!(!sampler.should_capture(start + Duration::from_millis(50)));
        assert!(!sampler.should_capture(start + Duration::from_millis(99)));
        assert!(sampler.should_capture(start + Duration::from_millis(100)));
    }

    #[test]
    fn reset_reopens_the_gate() {
        let mut sampler = FrameSampler::new(10);
        let start = Instant::now();
        assert!(sampler.should_capture(start));
        assert!(!sampler.should_capture(start + Duration::from_millis(10)));
        sampler.reset();
        assert!(sampler.should_capture(start + Duration::from_millis(20)));
    }
}
