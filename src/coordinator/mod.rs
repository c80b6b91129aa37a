//! Dual-output coordination
//!
//! Presents the two output pipelines as a single logical output. The
//! consumer drives the coordinator through [`CoordinatorHandle`] and hears
//! back through [`StreamSignal`]s; per-surface pipeline events never reach
//! it directly.

mod dual;
mod runtime;
mod state;

pub use dual::DualOutputCoordinator;
pub use runtime::{spawn_coordinator, CoordinatorHandle, CoordinatorRuntime};
pub use state::{StreamLifecycle, StreamStateTable, SurfaceRecord};

use std::path::PathBuf;

use tokio::sync::oneshot;

use crate::config::{Config, OutputProfile, ServiceConfig};
use crate::surface::{StopTarget, Surface};

/// Commands accepted by the coordinator runtime.
#[derive(Debug)]
pub enum CoordinatorCommand {
    /// Destroy and recreate the output handlers for the given profile
    Reset { profile: OutputProfile },
    /// Drop both handlers without replacements (shutdown path)
    Detach,
    /// Enable or disable the secondary (vertical) surface
    SetDualOutputEnabled(bool),
    StartStreaming {
        primary: Option<ServiceConfig>,
        secondary: Option<ServiceConfig>,
        reply: oneshot::Sender<bool>,
    },
    StopStreaming {
        force: bool,
        target: StopTarget,
    },
    StartRecording {
        reply: oneshot::Sender<bool>,
    },
    StopRecording {
        force: bool,
    },
    StartReplayBuffer {
        reply: oneshot::Sender<bool>,
    },
    StopReplayBuffer {
        force: bool,
    },
    StartVirtualCam {
        reply: oneshot::Sender<bool>,
    },
    StopVirtualCam,
    /// Apply updated configuration to the outputs
    UpdateOutputs(Box<Config>),
    UpdateVirtualCamOutputSource,
    QueryStatus {
        reply: oneshot::Sender<OutputStatus>,
    },
    Shutdown,
}

/// Terminal status of one surface in the aggregate stop payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StopInfo {
    /// Zero on a clean stop (or after the error was already surfaced)
    pub code: i32,
    pub error: String,
}

/// Aggregate notifications delivered to the consumer.
///
/// The streaming variants are derived from the settling of both surfaces;
/// recording, replay-buffer and virtual-camera variants are single-surface
/// passthroughs from the primary output.
#[derive(Debug, Clone)]
pub enum StreamSignal {
    /// Both requested surfaces are in their start-delay countdown
    StreamDelayStarting {
        horizontal_sec: i32,
        vertical_sec: i32,
    },
    /// Both requested surfaces are in their stop-delay countdown
    StreamDelayStopping {
        horizontal_sec: i32,
        vertical_sec: i32,
    },
    /// The logical stream is up. Fires at most once per streaming cycle,
    /// even when one surface settled by failing.
    StreamingStarted,
    /// The logical stream began shutting down
    StreamStopping,
    /// The logical stream is down, with each surface's terminal status
    StreamingStopped {
        horizontal: StopInfo,
        vertical: StopInfo,
    },
    /// A surface failed mid-cycle. Raised once, at the moment the failure
    /// unblocked the aggregate start decision; the error is cleared from
    /// the eventual [`StreamSignal::StreamingStopped`] payload.
    StreamWarning {
        surface: Surface,
        code: i32,
        error: String,
    },

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

/// Snapshot of coordinator and output activity.
#[derive(Debug, Clone)]
pub struct OutputStatus {
    /// Primary handler exists, and the secondary one too when dual-output
    /// mode is enabled
    pub usable: bool,
    pub lifecycle: StreamLifecycle,
    pub streaming_active: bool,
    pub horizontal_streaming_active: bool,
    pub vertical_streaming_active: bool,
    pub recording_active: bool,
    pub replay_buffer_active: bool,
    pub virtual_cam_active: bool,
    /// Any output kind running on either handler
    pub active: bool,
}
