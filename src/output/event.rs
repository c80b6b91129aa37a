//! Per-surface completion events emitted by output handlers

use std::path::PathBuf;
use tokio::sync::mpsc;

use crate::surface::Surface;

/// Channel endpoint handed to each output handler at creation time.
///
/// One channel exists per handler; the coordinator runtime drains both into
/// a single control loop, so event processing is ordered and non-reentrant.
pub type OutputEventSender = mpsc::UnboundedSender<SurfaceEvent>;
pub type OutputEventReceiver = mpsc::UnboundedReceiver<SurfaceEvent>;

/// A completion event tagged with the surface it came from.
#[derive(Debug, Clone)]
pub struct SurfaceEvent {
    pub surface: Surface,
    pub event: OutputEvent,
}

impl SurfaceEvent {
    pub fn new(surface: Surface, event: OutputEvent) -> Self {
        Self { surface, event }
    }
}

/// Asynchronous completion notifications from one output pipeline.
///
/// Start/stop calls on a handler return immediately; what actually happened
/// is reported later through these events, in the order the pipeline emitted
/// them.
#[derive(Debug, Clone)]
pub enum OutputEvent {
    /// Stream-delay countdown is running before the stream goes live
    StreamDelayStarting { sec: i32 },
    /// Stream-delay countdown is running before the stream fully stops
    StreamDelayStopping { sec: i32 },
    /// Streaming actually began
    StreamingStarted,
    /// Stream shutdown began
    StreamStopping,
    /// Streaming ended; `code` is zero on a clean stop
    StreamingStopped { code: i32, error: String },

    RecordingStarted,
    RecordStopping,
    RecordingStopped { code: i32, error: String },
    RecordingFileChanged { path: PathBuf },

    ReplayBufferStarted,
    ReplayBufferSaved,
    ReplayBufferStopping,
    ReplayBufferStopped { code: i32 },

    VirtualCamStarted,
    VirtualCamStopped { code: i32 },
}
