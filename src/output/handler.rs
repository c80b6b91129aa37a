//! Output handler contract
//!
//! One handler wraps one physical output pipeline (streaming, recording,
//! replay buffer and virtual camera on a single rendering surface). The
//! coordinator is the sole caller; engine-backed implementations live
//! outside this crate.

use crate::config::{Config, OutputProfile, ServiceConfig};
use crate::surface::Surface;

use super::event::OutputEventSender;

/// One physical output pipeline.
///
/// Every start/stop method is non-blocking: the return value of a start call
/// says whether the request was accepted, not whether the output is live.
/// Completion arrives later as [`OutputEvent`](super::OutputEvent)s on the
/// channel the handler was created with, in pipeline emission order.
pub trait OutputHandler: Send {
    /// The surface this handler was created for.
    fn surface(&self) -> Surface;

    /// Request that streaming begin on the given service.
    fn start_streaming(&mut self, service: &ServiceConfig) -> bool;

    /// Request that streaming stop. `force` skips any graceful shutdown
    /// (and any configured stream-delay countdown).
    fn stop_streaming(&mut self, force: bool);

    fn start_recording(&mut self) -> bool;
    fn stop_recording(&mut self, force: bool);

    fn start_replay_buffer(&mut self) -> bool;
    fn stop_replay_buffer(&mut self, force: bool);

    fn start_virtual_cam(&mut self) -> bool;
    fn stop_virtual_cam(&mut self);

    fn streaming_active(&self) -> bool;
    fn recording_active(&self) -> bool;
    fn replay_buffer_active(&self) -> bool;
    fn virtual_cam_active(&self) -> bool;

    /// Apply updated configuration to the pipeline.
    fn update(&mut self, config: &Config);

    /// Repoint the virtual camera at the current output source.
    fn update_virtual_cam_output_source(&mut self);

    /// Whether any output kind on this handler is running.
    fn active(&self) -> bool {
        self.streaming_active()
            || self.recording_active()
            || self.replay_buffer_active()
            || self.virtual_cam_active()
    }
}

/// Builds output handlers for the coordinator.
///
/// This is the boundary to the media engine: an implementation constructs a
/// pipeline for the given profile and surface and reports its lifecycle on
/// `events`.
pub trait OutputHandlerFactory: Send {
    fn create(
        &self,
        profile: OutputProfile,
        surface: Surface,
        events: OutputEventSender,
    ) -> Box<dyn OutputHandler>;
}
