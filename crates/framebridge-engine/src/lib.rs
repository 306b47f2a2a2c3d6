//! Frame pacing and capture control for the GPU video pipeline.
//!
//! The host rendering engine drives [`CaptureController::on_render_tick`]
//! from its render thread; the [`FrameScheduler`] paces those ticks to a
//! target framerate on a cooperative [`TaskQueue`] and hands pooled,
//! adapted frames to a consumer (typically the hardware encoder).

mod controller;
mod metrics;
mod scheduler;
mod task_queue;

pub use controller::{CaptureController, FrameConsumer};
pub use metrics::{PipelineMetrics, PipelineStats};
pub use scheduler::{FrameScheduler, MIN_FRAME_INTERVAL};
pub use task_queue::{TaskQueue, STOP_TIMEOUT};
