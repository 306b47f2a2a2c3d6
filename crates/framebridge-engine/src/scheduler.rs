//! Frame-pacing scheduler.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::task_queue::{TaskQueue, STOP_TIMEOUT};

/// Floor on the capture interval regardless of the configured rate.
pub const MIN_FRAME_INTERVAL: Duration = Duration::from_millis(1);

type CaptureCallback = Box<dyn FnMut() + Send>;

struct PacingState {
    max_framerate_fps: u32,
    paused: bool,
    last_capture_start: Instant,
    has_callback: bool,
}

/// Paces a capture callback to a dynamically adjustable target
/// framerate on its own cooperative task queue.
///
/// Pausing is cooperative: an in-flight tick completes and the *next*
/// scheduling decision observes the flag. Resuming restarts the
/// repeating task immediately from "now" without replaying missed
/// ticks. Framerate changes take effect at the next recomputation.
pub struct FrameScheduler {
    queue: TaskQueue,
    state: Arc<Mutex<PacingState>>,
    callback: Arc<Mutex<Option<CaptureCallback>>>,
    generation: Arc<AtomicU64>,
}

impl FrameScheduler {
    /// Create a scheduler targeting `max_framerate_fps`.
    pub fn new(max_framerate_fps: u32) -> Self {
        Self {
            queue: TaskQueue::new(),
            state: Arc::new(Mutex::new(PacingState {
                max_framerate_fps,
                paused: false,
                last_capture_start: Instant::now(),
                has_callback: false,
            })),
            callback: Arc::new(Mutex::new(None)),
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Register the capture callback and begin the repeating task.
    pub fn start(&self, callback: impl FnMut() + Send + 'static) {
        *self.callback.lock() = Some(Box::new(callback));
        {
            let mut state = self.state.lock();
            state.has_callback = true;
            state.last_capture_start = Instant::now();
        }
        if let Some(initial) = self.schedule_next_frame() {
            self.arm(initial);
        }
    }

    /// The delay until the next capture should run. `None` when
    /// paused, unconfigured, or the framerate is zero.
    pub fn schedule_next_frame(&self) -> Option<Duration> {
        let state = self.state.lock();
        next_delay(&state, Instant::now())
    }

    /// Pause or resume pacing.
    pub fn pause(&self, paused: bool) {
        if paused {
            debug!("Pausing frame scheduler");
            self.state.lock().paused = true;
            return;
        }

        debug!("Resuming frame scheduler");
        {
            let mut state = self.state.lock();
            state.paused = false;
            state.last_capture_start = Instant::now();
        }
        // Restart immediately rather than waiting out the previously
        // scheduled tick.
        self.arm(Duration::ZERO);
    }

    /// Change the target framerate. Applies at the next scheduling
    /// decision; the currently armed delay is not recomputed.
    pub fn set_max_framerate_fps(&self, max_framerate_fps: u32) {
        self.state.lock().max_framerate_fps = max_framerate_fps;
    }

    fn arm(&self, initial: Duration) {
        // Bumping the generation orphans any previously armed task; it
        // observes the mismatch on its next run and stops.
        let my_generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let state = Arc::clone(&self.state);
        let callback = Arc::clone(&self.callback);
        let generation = Arc::clone(&self.generation);

        self.queue.post_repeating(initial, move || {
            if generation.load(Ordering::SeqCst) != my_generation {
                return None;
            }
            {
                let state = state.lock();
                if state.paused || state.max_framerate_fps == 0 {
                    return None;
                }
            }

            if let Some(capture) = callback.lock().as_mut() {
                capture();
            }

            let now = Instant::now();
            let mut state = state.lock();
            state.last_capture_start = now;
            next_delay(&state, now)
        });
    }
}

impl Drop for FrameScheduler {
    fn drop(&mut self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        if !self.queue.stop(STOP_TIMEOUT) {
            warn!("Frame scheduler queue did not stop in time");
        }
    }
}

fn next_delay(state: &PacingState, now: Instant) -> Option<Duration> {
    if state.paused || !state.has_callback || state.max_framerate_fps == 0 {
        return None;
    }
    let interval = (Duration::from_secs(1) / state.max_framerate_fps).max(MIN_FRAME_INTERVAL);
    let target = (state.last_capture_start + interval).max(now);
    Some(target - now)
}
