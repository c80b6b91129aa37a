//! Dual-output coordinator core
//!
//! Owns up to two output handlers and folds their per-surface lifecycle
//! events into aggregate signals, so the rest of the application can treat
//! "the stream" as one entity no matter how many surfaces are live.
//!
//! All methods run on the coordinator runtime's control task; the struct
//! needs no internal locking.

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::{Config, OutputProfile, ServiceConfig};
use crate::output::{
    OutputEvent, OutputEventReceiver, OutputHandler, OutputHandlerFactory, SurfaceEvent,
};
use crate::surface::{StopTarget, Surface};

use super::state::{StreamLifecycle, StreamStateTable};
use super::{StopInfo, StreamSignal};

pub struct DualOutputCoordinator {
    factory: Box<dyn OutputHandlerFactory>,
    horizontal: Option<Box<dyn OutputHandler>>,
    vertical: Option<Box<dyn OutputHandler>>,
    dual_output_enabled: bool,
    state: StreamStateTable,
    signal_tx: mpsc::UnboundedSender<StreamSignal>,
}

impl DualOutputCoordinator {
    /// Create a coordinator with no handlers yet; call [`reset`](Self::reset)
    /// to build them.
    pub fn new(
        factory: Box<dyn OutputHandlerFactory>,
        signal_tx: mpsc::UnboundedSender<StreamSignal>,
        dual_output_enabled: bool,
    ) -> Self {
        Self {
            factory,
            horizontal: None,
            vertical: None,
            dual_output_enabled,
            state: StreamStateTable::default(),
            signal_tx,
        }
    }

    /// Drop both handlers without replacements. Shutdown path.
    pub fn detach(&mut self) {
        self.horizontal = None;
        self.vertical = None;
    }

    /// Destroy the current handlers and build a fresh pair for `profile`.
    ///
    /// The sole place handler ownership is established. The previous pair is
    /// released first, so no handler survives across a reset. Returns the
    /// per-handler event receivers for the runtime to drain; the vertical
    /// receiver exists only when dual-output mode is enabled.
    pub fn reset(
        &mut self,
        profile: OutputProfile,
    ) -> (OutputEventReceiver, Option<OutputEventReceiver>) {
        self.detach();

        info!(
            ?profile,
            dual_output = self.dual_output_enabled,
            "rebuilding output handlers"
        );

        let (horizontal_tx, horizontal_rx) = mpsc::unbounded_channel();
        self.horizontal = Some(
            self.factory
                .create(profile, Surface::Horizontal, horizontal_tx),
        );

        let vertical_rx = if self.dual_output_enabled {
            let (vertical_tx, vertical_rx) = mpsc::unbounded_channel();
            self.vertical = Some(self.factory.create(profile, Surface::Vertical, vertical_tx));
            Some(vertical_rx)
        } else {
            None
        };

        (horizontal_rx, vertical_rx)
    }

    /// Single validity check for callers: the horizontal handler exists,
    /// and so does the vertical one whenever dual-output mode is enabled.
    pub fn is_usable(&self) -> bool {
        if self.horizontal.is_none() {
            false
        } else if !self.dual_output_enabled {
            true
        } else {
            self.vertical.is_some()
        }
    }

    pub fn dual_output_enabled(&self) -> bool {
        self.dual_output_enabled
    }

    /// Record the mode. Stop targeting honors it immediately; handler
    /// creation honors it at the next [`reset`](Self::reset).
    pub fn set_dual_output_enabled(&mut self, enabled: bool) {
        self.dual_output_enabled = enabled;
    }

    pub fn lifecycle(&self) -> StreamLifecycle {
        self.state.lifecycle()
    }

    /// Begin a new streaming cycle.
    ///
    /// Resets the whole state table first, then fans the start out to the
    /// surfaces with a config present. Returns true when at least one
    /// surface accepted its start request.
    pub fn start_streaming(
        &mut self,
        primary: Option<&ServiceConfig>,
        secondary: Option<&ServiceConfig>,
    ) -> bool {
        self.state.reset();

        // Secondary is asked first, then primary. The order carries no known
        // semantic dependency; it is kept fixed for determinism.
        if let Some(service) = secondary {
            match self.vertical.as_mut() {
                Some(output) => {
                    let accepted = output.start_streaming(service);
                    self.state.mark_start_requested(Surface::Vertical, accepted);
                }
                None => {
                    warn!("secondary service configured but no vertical output exists, skipping")
                }
            }
        }
        if let Some(service) = primary {
            match self.horizontal.as_mut() {
                Some(output) => {
                    let accepted = output.start_streaming(service);
                    self.state
                        .mark_start_requested(Surface::Horizontal, accepted);
                }
                None => warn!("primary service configured but no horizontal output exists"),
            }
        }

        let accepted = self.state.any_start_requested();
        if !accepted {
            warn!("no output accepted the streaming start request");
        }
        accepted
    }

    /// Stop streaming on the targeted surface(s). Targeting the vertical
    /// surface while dual-output mode is disabled is a no-op.
    pub fn stop_streaming(&mut self, force: bool, target: StopTarget) {
        if target.includes(Surface::Horizontal) {
            if let Some(output) = self.horizontal.as_mut() {
                output.stop_streaming(force);
            }
        }
        if self.dual_output_enabled && target.includes(Surface::Vertical) {
            if let Some(output) = self.vertical.as_mut() {
                output.stop_streaming(force);
            }
        }
    }

    // Recording, replay buffer and virtual camera run on the primary output
    // only; dual-output duplication is scoped to streaming.

    pub fn start_recording(&mut self) -> bool {
        match self.horizontal.as_mut() {
            Some(output) => output.start_recording(),
            None => false,
        }
    }

    pub fn stop_recording(&mut self, force: bool) {
        if let Some(output) = self.horizontal.as_mut() {
            output.stop_recording(force);
        }
    }

    pub fn start_replay_buffer(&mut self) -> bool {
        match self.horizontal.as_mut() {
            Some(output) => output.start_replay_buffer(),
            None => false,
        }
    }

    pub fn stop_replay_buffer(&mut self, force: bool) {
        if let Some(output) = self.horizontal.as_mut() {
            output.stop_replay_buffer(force);
        }
    }

    pub fn start_virtual_cam(&mut self) -> bool {
        match self.horizontal.as_mut() {
            Some(output) => output.start_virtual_cam(),
            None => false,
        }
    }

    pub fn stop_virtual_cam(&mut self) {
        if let Some(output) = self.horizontal.as_mut() {
            output.stop_virtual_cam();
        }
    }

    pub fn update(&mut self, config: &Config) {
        if let Some(output) = self.horizontal.as_mut() {
            output.update(config);
        }
    }

    pub fn update_virtual_cam_output_source(&mut self) {
        if let Some(output) = self.horizontal.as_mut() {
            output.update_virtual_cam_output_source();
        }
    }

    pub fn streaming_active(&self) -> bool {
        self.surface_streaming_active(Surface::Horizontal)
            || self.surface_streaming_active(Surface::Vertical)
    }

    pub fn surface_streaming_active(&self, surface: Surface) -> bool {
        let handler = match surface {
            Surface::Horizontal => self.horizontal.as_ref(),
            Surface::Vertical => self.vertical.as_ref(),
        };
        handler.map(|output| output.streaming_active()).unwrap_or(false)
    }

    pub fn recording_active(&self) -> bool {
        self.horizontal
            .as_ref()
            .map(|output| output.recording_active())
            .unwrap_or(false)
    }

    pub fn replay_buffer_active(&self) -> bool {
        self.horizontal
            .as_ref()
            .map(|output| output.replay_buffer_active())
            .unwrap_or(false)
    }

    pub fn virtual_cam_active(&self) -> bool {
        self.horizontal
            .as_ref()
            .map(|output| output.virtual_cam_active())
            .unwrap_or(false)
    }

    /// Any output kind running on either handler.
    pub fn active(&self) -> bool {
        self.horizontal
            .as_ref()
            .map(|output| output.active())
            .unwrap_or(false)
            || self
                .vertical
                .as_ref()
                .map(|output| output.active())
                .unwrap_or(false)
    }

    /// Apply one pipeline event to the state table and emit whatever
    /// aggregate signals the gating predicates now allow.
    pub fn handle_surface_event(&mut self, event: SurfaceEvent) {
        let SurfaceEvent { surface, event } = event;
        match event {
            OutputEvent::StreamDelayStarting { sec } => self.on_stream_delay_starting(surface, sec),
            OutputEvent::StreamDelayStopping { sec } => self.on_stream_delay_stopping(surface, sec),
            OutputEvent::StreamingStarted => self.on_streaming_started(surface),
            OutputEvent::StreamStopping => self.on_stream_stopping(surface),
            OutputEvent::StreamingStopped { code, error } => {
                self.on_streaming_stopped(surface, code, error)
            }

            // Single-surface passthroughs, forwarded unaggregated
            OutputEvent::RecordingStarted => self.emit(StreamSignal::RecordingStarted),
            OutputEvent::RecordStopping => self.emit(StreamSignal::RecordStopping),
            OutputEvent::RecordingStopped { code, error } => {
                self.emit(StreamSignal::RecordingStopped { code, error })
            }
            OutputEvent::RecordingFileChanged { path } => {
                self.emit(StreamSignal::RecordingFileChanged { path })
            }
            OutputEvent::ReplayBufferStarted => self.emit(StreamSignal::ReplayBufferStarted),
            OutputEvent::ReplayBufferSaved => self.emit(StreamSignal::ReplayBufferSaved),
            OutputEvent::ReplayBufferStopping => self.emit(StreamSignal::ReplayBufferStopping),
            OutputEvent::ReplayBufferStopped { code } => {
                self.emit(StreamSignal::ReplayBufferStopped { code })
            }
            OutputEvent::VirtualCamStarted => self.emit(StreamSignal::VirtualCamStarted),
            OutputEvent::VirtualCamStopped { code } => {
                self.emit(StreamSignal::VirtualCamStopped { code })
            }
        }
    }

    fn emit(&self, signal: StreamSignal) {
        let _ = self.signal_tx.send(signal);
    }

    fn on_stream_delay_starting(&mut self, surface: Surface, sec: i32) {
        debug!(?surface, sec, "stream delay starting");
        self.state.mark_delay_starting(surface, sec);
        if self.state.all_settled(|r| r.delay_starting) {
            self.emit(StreamSignal::StreamDelayStarting {
                horizontal_sec: self.state.record(Surface::Horizontal).delay_starting_sec,
                vertical_sec: self.state.record(Surface::Vertical).delay_starting_sec,
            });
        }
    }

    fn on_stream_delay_stopping(&mut self, surface: Surface, sec: i32) {
        debug!(?surface, sec, "stream delay stopping");
        self.state.mark_delay_stopping(surface, sec);
        if self.state.all_settled(|r| r.delay_stopping) {
            self.emit(StreamSignal::StreamDelayStopping {
                horizontal_sec: self.state.record(Surface::Horizontal).delay_stopping_sec,
                vertical_sec: self.state.record(Surface::Vertical).delay_stopping_sec,
            });
        }
    }

    fn on_streaming_started(&mut self, surface: Surface) {
        info!(?surface, "streaming started");
        self.state.mark_started(surface);

        if !self.state.start_signaled() && self.state.all_settled(|r| r.started || r.stopped) {
            self.state.note_start_signaled();

            // A surface that settled by failing unblocked the start; surface
            // its error here, once, and keep the final stop payload clean.
            for other in Surface::ALL {
                if self.state.record(other).stopped {
                    self.warn_and_clear_stop_error(other);
                    break;
                }
            }

            self.emit(StreamSignal::StreamingStarted);
        }
    }

    fn on_stream_stopping(&mut self, surface: Surface) {
        debug!(?surface, "stream stopping");
        self.state.mark_stop_in_progress(surface);
        if self.state.all_settled(|r| r.stop_in_progress) {
            self.state.note_stopping();
            self.emit(StreamSignal::StreamStopping);
        }
    }

    fn on_streaming_stopped(&mut self, surface: Surface, code: i32, error: String) {
        info!(?surface, code, "streaming stopped");
        self.state.mark_stopped(surface, code, error);

        // A failure can be exactly what unblocks the aggregate start: the
        // other surface is already live and this stop settles the failed one.
        if !self.state.start_signaled()
            && self.state.any_started()
            && self.state.all_settled(|r| r.started || r.stopped)
        {
            self.state.note_start_signaled();
            self.warn_and_clear_stop_error(surface);
            self.emit(StreamSignal::StreamingStarted);
        }

        if self.state.all_settled(|r| r.stopped) {
            self.state.note_stopped();
            let horizontal = self.stop_info(Surface::Horizontal);
            let vertical = self.stop_info(Surface::Vertical);
            self.emit(StreamSignal::StreamingStopped {
                horizontal,
                vertical,
            });
        }
    }

    fn warn_and_clear_stop_error(&mut self, surface: Surface) {
        let (code, error) = {
            let record = self.state.record(surface);
            (record.stop_error_code, record.stop_error.clone())
        };
        warn!(?surface, code, %error, "stream failed on one surface");
        self.emit(StreamSignal::StreamWarning {
            surface,
            code,
            error,
        });
        self.state.clear_stop_error(surface);
    }

    fn stop_info(&self, surface: Surface) -> StopInfo {
        let record = self.state.record(surface);
        StopInfo {
            code: record.stop_error_code,
            error: record.stop_error.clone(),
        }
    }
}
