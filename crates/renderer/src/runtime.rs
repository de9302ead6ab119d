use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// High-level behaviour requested by the caller.
///
/// The render policy decides whether frames animate continuously or hold a
/// single timestamp (useful for screenshots and deterministic previews).
#[derive(Debug, Clone, PartialEq)]
pub enum RenderPolicy {
    /// Run the render loop continuously, optionally clamping the frame rate.
    Animate {
        /// Optional requested frames-per-second cap.
        target_fps: Option<f32>,
    },
    /// Keep evaluating the scene at one fixed timestamp.
    Still {
        /// Timestamp (seconds) the animation law is evaluated at.
        time: f64,
    },
}

impl Default for RenderPolicy {
    fn default() -> Self {
        Self::Animate { target_fps: None }
    }
}

impl RenderPolicy {
    pub fn target_fps(&self) -> Option<f32> {
        match self {
            RenderPolicy::Animate { target_fps } => target_fps.filter(|fps| *fps > 0.0),
            RenderPolicy::Still { .. } => None,
        }
    }
}

/// Abstraction over where time values originate from.
pub trait TimeSource: Send {
    /// Resets the source to its initial state.
    fn reset(&mut self);
    /// Seconds elapsed since the source was created or last reset.
    fn now_seconds(&mut self) -> f64;
}

/// Time source backed by the system monotonic clock.
#[derive(Debug, Clone, Copy)]
pub struct SystemTimeSource {
    origin: Instant,
}

impl SystemTimeSource {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Default for SystemTimeSource {
    fn default() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl TimeSource for SystemTimeSource {
    fn reset(&mut self) {
        self.origin = Instant::now();
    }

    fn now_seconds(&mut self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }
}

/// Time source that always reports a fixed timestamp.
#[derive(Debug, Clone, Copy)]
pub struct FixedTimeSource {
    time: f64,
}

impl FixedTimeSource {
    pub fn new(time: f64) -> Self {
        Self { time }
    }

    pub fn time(&self) -> f64 {
        self.time
    }
}

impl TimeSource for FixedTimeSource {
    fn reset(&mut self) {}

    fn now_seconds(&mut self) -> f64 {
        self.time
    }
}

/// Externally driven time source; clones share the same timeline.
///
/// Used for deterministic replays and tests, where the caller decides exactly
/// how much time passes between frames.
#[derive(Debug, Clone, Default)]
pub struct ManualTimeSource {
    seconds: Arc<Mutex<f64>>,
}

impl ManualTimeSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, seconds: f64) {
        if let Ok(mut guard) = self.seconds.lock() {
            *guard = seconds;
        }
    }

    pub fn advance(&self, delta: f64) {
        if let Ok(mut guard) = self.seconds.lock() {
            *guard += delta;
        }
    }
}

impl TimeSource for ManualTimeSource {
    fn reset(&mut self) {
        self.set(0.0);
    }

    fn now_seconds(&mut self) -> f64 {
        self.seconds.lock().map(|guard| *guard).unwrap_or(0.0)
    }
}

/// Convenient alias for owning time sources behind trait objects.
pub type BoxedTimeSource = Box<dyn TimeSource + Send>;

/// Builds a time source suited to the requested render policy.
pub fn time_source_for_policy(policy: &RenderPolicy) -> BoxedTimeSource {
    match policy {
        RenderPolicy::Animate { .. } => Box::new(SystemTimeSource::new()),
        RenderPolicy::Still { time } => Box::new(FixedTimeSource::new(*time)),
    }
}

/// One sample of the frame clock.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameTick {
    /// Seconds since the clock started; never decreases.
    pub elapsed: f64,
    /// Seconds since the previous tick; zero on the first tick, unbounded above.
    pub delta: f64,
    /// Monotonic frame counter for the running session.
    pub frame_index: u64,
}

/// Monotonic elapsed/delta producer that drives every time-based update.
pub struct FrameClock {
    source: BoxedTimeSource,
    last_elapsed: Option<f64>,
    frame: u64,
}

impl FrameClock {
    pub fn new(source: BoxedTimeSource) -> Self {
        Self {
            source,
            last_elapsed: None,
            frame: 0,
        }
    }

    pub fn for_policy(policy: &RenderPolicy) -> Self {
        Self::new(time_source_for_policy(policy))
    }

    /// Samples the source and advances the frame counter.
    ///
    /// A source that steps backwards is held at the previous elapsed value so
    /// consumers always observe a non-negative delta.
    pub fn tick(&mut self) -> FrameTick {
        let sampled = self.source.now_seconds();
        let sampled = if sampled.is_finite() { sampled } else { 0.0 };
        let (elapsed, delta) = match self.last_elapsed {
            None => (sampled.max(0.0), 0.0),
            Some(previous) => {
                let elapsed = sampled.max(previous);
                (elapsed, elapsed - previous)
            }
        };
        self.last_elapsed = Some(elapsed);
        let tick = FrameTick {
            elapsed,
            delta,
            frame_index: self.frame,
        };
        self.frame = self.frame.saturating_add(1);
        tick
    }

    /// Re-seeds the underlying source and forgets the previous sample.
    pub fn reset(&mut self) {
        self.source.reset();
        self.last_elapsed = None;
        self.frame = 0;
    }

    pub fn frames(&self) -> u64 {
        self.frame
    }
}

/// Smallest FPS cap accepted from user input. Lower values are rejected
/// before they reach the scheduler.
pub const MIN_TARGET_FPS: f32 = 0.01;

/// Decides when the next frame may be drawn under an optional FPS cap.
#[derive(Debug, Clone)]
pub struct FrameScheduler {
    interval: Option<Duration>,
    last_render: Option<Instant>,
}

impl FrameScheduler {
    pub fn new(policy: &RenderPolicy) -> Self {
        let interval = policy.target_fps().and_then(|fps| {
            let interval = Duration::try_from_secs_f32(1.0 / fps).ok();
            if interval.is_none() {
                tracing::warn!(fps, "fps cap is out of range; rendering uncapped");
            }
            interval
        });
        Self {
            interval,
            last_render: None,
        }
    }

    pub fn ready_for_frame(&self, now: Instant) -> bool {
        match (self.interval, self.last_render) {
            (Some(interval), Some(last)) => now.saturating_duration_since(last) >= interval,
            _ => true,
        }
    }

    pub fn mark_rendered(&mut self, now: Instant) {
        self.last_render = Some(now);
    }

    /// Earliest instant the next frame is allowed, if the cap is active.
    pub fn next_deadline(&self) -> Option<Instant> {
        match (self.interval, self.last_render) {
            (Some(interval), Some(last)) => last.checked_add(interval),
            _ => None,
        }
    }

    pub fn reset(&mut self) {
        self.last_render = None;
    }
}
