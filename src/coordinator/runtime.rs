//! Coordinator runtime loop and consumer handle
//!
//! Handler events and consumer commands are marshaled onto one control task,
//! so the coordinator's state mutations stay single-threaded: one message is
//! processed at a time, per-surface order is the channel's FIFO order, and
//! nothing is reentrant.

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use crate::config::{Config, OutputProfile, ServiceConfig};
use crate::error::CoordinatorError;
use crate::output::{OutputEventReceiver, OutputHandlerFactory, SurfaceEvent};
use crate::surface::{StopTarget, Surface};

use super::dual::DualOutputCoordinator;
use super::{CoordinatorCommand, OutputStatus, StreamSignal};

const COMMAND_CHANNEL_CAPACITY: usize = 32;

/// Spawn the coordinator control loop.
///
/// Returns the handle the consumer drives it with and the channel its
/// aggregate signals arrive on. The coordinator starts with no handlers;
/// call [`CoordinatorHandle::reset`] to build them.
pub fn spawn_coordinator(
    factory: Box<dyn OutputHandlerFactory>,
    dual_output_enabled: bool,
) -> (CoordinatorHandle, mpsc::UnboundedReceiver<StreamSignal>) {
    let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
    let (signal_tx, signal_rx) = mpsc::unbounded_channel();

    let runtime = CoordinatorRuntime::new(
        DualOutputCoordinator::new(factory, signal_tx, dual_output_enabled),
        cmd_rx,
    );
    tokio::spawn(runtime.run());

    (CoordinatorHandle { cmd_tx }, signal_rx)
}

/// The single control task that owns the coordinator.
pub struct CoordinatorRuntime {
    coordinator: DualOutputCoordinator,
    cmd_rx: mpsc::Receiver<CoordinatorCommand>,
    horizontal_events: Option<OutputEventReceiver>,
    vertical_events: Option<OutputEventReceiver>,
}

impl CoordinatorRuntime {
    pub fn new(
        coordinator: DualOutputCoordinator,
        cmd_rx: mpsc::Receiver<CoordinatorCommand>,
    ) -> Self {
        Self {
            coordinator,
            cmd_rx,
            horizontal_events: None,
            vertical_events: None,
        }
    }

    /// Run until shutdown is commanded or every handle is dropped.
    pub async fn run(mut self) {
        info!("coordinator runtime started");

        loop {
            tokio::select! {
                maybe_cmd = self.cmd_rx.recv() => {
                    match maybe_cmd {
                        Some(cmd) => {
                            if self.handle_command(cmd) {
                                break;
                            }
                        }
                        None => {
                            debug!("all coordinator handles dropped");
                            break;
                        }
                    }
                }

                Some(event) = recv_surface_event(&mut self.horizontal_events) => {
                    self.coordinator.handle_surface_event(event);
                }

                Some(event) = recv_surface_event(&mut self.vertical_events) => {
                    self.coordinator.handle_surface_event(event);
                }
            }
        }

        info!("coordinator runtime stopped");
    }

    /// Returns true when the runtime should shut down.
    fn handle_command(&mut self, cmd: CoordinatorCommand) -> bool {
        match cmd {
            CoordinatorCommand::Reset { profile } => {
                let (horizontal_rx, vertical_rx) = self.coordinator.reset(profile);
                self.horizontal_events = Some(horizontal_rx);
                self.vertical_events = vertical_rx;
            }
            CoordinatorCommand::Detach => {
                self.coordinator.detach();
                self.horizontal_events = None;
                self.vertical_events = None;
            }
            CoordinatorCommand::SetDualOutputEnabled(enabled) => {
                self.coordinator.set_dual_output_enabled(enabled);
            }
            CoordinatorCommand::StartStreaming {
                primary,
                secondary,
                reply,
            } => {
                let accepted = self
                    .coordinator
                    .start_streaming(primary.as_ref(), secondary.as_ref());
                let _ = reply.send(accepted);
            }
            CoordinatorCommand::StopStreaming { force, target } => {
                self.coordinator.stop_streaming(force, target);
            }
            CoordinatorCommand::StartRecording { reply } => {
                let _ = reply.send(self.coordinator.start_recording());
            }
            CoordinatorCommand::StopRecording { force } => {
                self.coordinator.stop_recording(force);
            }
            CoordinatorCommand::StartReplayBuffer { reply } => {
                let _ = reply.send(self.coordinator.start_replay_buffer());
            }
            CoordinatorCommand::StopReplayBuffer { force } => {
                self.coordinator.stop_replay_buffer(force);
            }
            CoordinatorCommand::StartVirtualCam { reply } => {
                let _ = reply.send(self.coordinator.start_virtual_cam());
            }
            CoordinatorCommand::StopVirtualCam => {
                self.coordinator.stop_virtual_cam();
            }
            CoordinatorCommand::UpdateOutputs(config) => {
                self.coordinator.update(&config);
            }
            CoordinatorCommand::UpdateVirtualCamOutputSource => {
                self.coordinator.update_virtual_cam_output_source();
            }
            CoordinatorCommand::QueryStatus { reply } => {
                let _ = reply.send(self.status());
            }
            CoordinatorCommand::Shutdown => {
                info!("shutdown command received");
                self.coordinator.detach();
                return true;
            }
        }
        false
    }

    fn status(&self) -> OutputStatus {
        let coordinator = &self.coordinator;
        OutputStatus {
            usable: coordinator.is_usable(),
            lifecycle: coordinator.lifecycle(),
            streaming_active: coordinator.streaming_active(),
            horizontal_streaming_active: coordinator.surface_streaming_active(Surface::Horizontal),
            vertical_streaming_active: coordinator.surface_streaming_active(Surface::Vertical),
            recording_active: coordinator.recording_active(),
            replay_buffer_active: coordinator.replay_buffer_active(),
            virtual_cam_active: coordinator.virtual_cam_active(),
            active: coordinator.active(),
        }
    }
}

async fn recv_surface_event(rx: &mut Option<OutputEventReceiver>) -> Option<SurfaceEvent> {
    match rx.as_mut() {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

/// Cloneable consumer-side handle to the coordinator runtime.
#[derive(Clone)]
pub struct CoordinatorHandle {
    cmd_tx: mpsc::Sender<CoordinatorCommand>,
}

impl CoordinatorHandle {
    async fn send(&self, cmd: CoordinatorCommand) -> Result<(), CoordinatorError> {
        self.cmd_tx
            .send(cmd)
            .await
            .map_err(|_| CoordinatorError::Closed)
    }

    async fn request<T>(
        &self,
        cmd: CoordinatorCommand,
        reply_rx: oneshot::Receiver<T>,
    ) -> Result<T, CoordinatorError> {
        self.send(cmd).await?;
        reply_rx.await.map_err(|_| CoordinatorError::Closed)
    }

    /// Destroy and recreate the output handlers for `profile`.
    pub async fn reset(&self, profile: OutputProfile) -> Result<(), CoordinatorError> {
        self.send(CoordinatorCommand::Reset { profile }).await
    }

    /// Drop both handlers without replacements.
    pub async fn detach(&self) -> Result<(), CoordinatorError> {
        self.send(CoordinatorCommand::Detach).await
    }

    pub async fn set_dual_output_enabled(&self, enabled: bool) -> Result<(), CoordinatorError> {
        self.send(CoordinatorCommand::SetDualOutputEnabled(enabled))
            .await
    }

    /// Begin a new streaming cycle. Resolves with the synchronous accept
    /// result; the asynchronous outcome arrives as signals.
    pub async fn start_streaming(
        &self,
        primary: Option<ServiceConfig>,
        secondary: Option<ServiceConfig>,
    ) -> Result<bool, CoordinatorError> {
        let (reply, reply_rx) = oneshot::channel();
        self.request(
            CoordinatorCommand::StartStreaming {
                primary,
                secondary,
                reply,
            },
            reply_rx,
        )
        .await
    }

    pub async fn stop_streaming(
        &self,
        force: bool,
        target: StopTarget,
    ) -> Result<(), CoordinatorError> {
        self.send(CoordinatorCommand::StopStreaming { force, target })
            .await
    }

    pub async fn start_recording(&self) -> Result<bool, CoordinatorError> {
        let (reply, reply_rx) = oneshot::channel();
        self.request(CoordinatorCommand::StartRecording { reply }, reply_rx)
            .await
    }

    pub async fn stop_recording(&self, force: bool) -> Result<(), CoordinatorError> {
        self.send(CoordinatorCommand::StopRecording { force }).await
    }

    pub async fn start_replay_buffer(&self) -> Result<bool, CoordinatorError> {
        let (reply, reply_rx) = oneshot::channel();
        self.request(CoordinatorCommand::StartReplayBuffer { reply }, reply_rx)
            .await
    }

    pub async fn stop_replay_buffer(&self, force: bool) -> Result<(), CoordinatorError> {
        self.send(CoordinatorCommand::StopReplayBuffer { force })
            .await
    }

    pub async fn start_virtual_cam(&self) -> Result<bool, CoordinatorError> {
        let (reply, reply_rx) = oneshot::channel();
        self.request(CoordinatorCommand::StartVirtualCam { reply }, reply_rx)
            .await
    }

    pub async fn stop_virtual_cam(&self) -> Result<(), CoordinatorError> {
        self.send(CoordinatorCommand::StopVirtualCam).await
    }

    /// Apply updated configuration to the outputs.
    pub async fn update_outputs(&self, config: Config) -> Result<(), CoordinatorError> {
        self.send(CoordinatorCommand::UpdateOutputs(Box::new(config)))
            .await
    }

    pub async fn update_virtual_cam_output_source(&self) -> Result<(), CoordinatorError> {
        self.send(CoordinatorCommand::UpdateVirtualCamOutputSource)
            .await
    }

    /// Snapshot coordinator validity and output activity.
    pub async fn status(&self) -> Result<OutputStatus, CoordinatorError> {
        let (reply, reply_rx) = oneshot::channel();
        self.request(CoordinatorCommand::QueryStatus { reply }, reply_rx)
            .await
    }

    /// Stop the runtime. Pending handler events are discarded.
    pub async fn shutdown(&self) -> Result<(), CoordinatorError> {
        self.send(CoordinatorCommand::Shutdown).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::{OutputEvent, OutputEventSender, OutputHandler};
    use crate::StopInfo;

    /// Handler that confirms every request immediately through its event
    /// channel, the way a healthy pipeline would.
    struct ConfirmingOutput {
        surface: Surface,
        events: OutputEventSender,
        streaming: bool,
    }

    impl ConfirmingOutput {
        fn emit(&self, event: OutputEvent) {
            let _ = self.events.send(SurfaceEvent::new(self.surface, event));
        }
    }

    impl OutputHandler for ConfirmingOutput {
        fn surface(&self) -> Surface {
            self.surface
        }

        fn start_streaming(&mut self, _service: &ServiceConfig) -> bool {
            self.streaming = true;
            self.emit(OutputEvent::StreamingStarted);
            true
        }

        fn stop_streaming(&mut self, _force: bool) {
            self.streaming = false;
            self.emit(OutputEvent::StreamStopping);
            self.emit(OutputEvent::StreamingStopped {
                code: 0,
                error: String::new(),
            });
        }

        fn start_recording(&mut self) -> bool {
            self.emit(OutputEvent::RecordingStarted);
            true
        }

        fn stop_recording(&mut self, _force: bool) {
            self.emit(OutputEvent::RecordingStopped {
                code: 0,
                error: String::new(),
            });
        }

        fn start_replay_buffer(&mut self) -> bool {
            self.emit(OutputEvent::ReplayBufferStarted);
            true
        }

        fn stop_replay_buffer(&mut self, _force: bool) {
            self.emit(OutputEvent::ReplayBufferStopped { code: 0 });
        }

        fn start_virtual_cam(&mut self) -> bool {
            self.emit(OutputEvent::VirtualCamStarted);
            true
        }

        fn stop_virtual_cam(&mut self) {
            self.emit(OutputEvent::VirtualCamStopped { code: 0 });
        }

        fn streaming_active(&self) -> bool {
            self.streaming
        }

        fn recording_active(&self) -> bool {
            false
        }

        fn replay_buffer_active(&self) -> bool {
            false
        }

        fn virtual_cam_active(&self) -> bool {
            false
        }

        fn update(&mut self, _config: &Config) {}

        fn update_virtual_cam_output_source(&mut self) {}
    }

    struct ConfirmingFactory;

    impl crate::output::OutputHandlerFactory for ConfirmingFactory {
        fn create(
            &self,
            _profile: OutputProfile,
            surface: Surface,
            events: OutputEventSender,
        ) -> Box<dyn OutputHandler> {
            Box::new(ConfirmingOutput {
                surface,
                events,
                streaming: false,
            })
        }
    }

    fn service(server: &str) -> ServiceConfig {
        ServiceConfig::new(server, "key")
    }

    #[tokio::test]
    async fn test_full_streaming_cycle_through_runtime() {
        let (handle, mut signals) = spawn_coordinator(Box::new(ConfirmingFactory), true);
        handle.reset(OutputProfile::Simple).await.unwrap();

        let accepted = handle
            .start_streaming(Some(service("rtmp://h")), Some(service("rtmp://v")))
            .await
            .unwrap();
        assert!(accepted);

        // Both surfaces confirm, so exactly one aggregate start arrives
        match signals.recv().await.unwrap() {
            StreamSignal::StreamingStarted => {}
            other => panic!("unexpected signal: {:?}", other),
        }

        handle.stop_streaming(false, StopTarget::All).await.unwrap();

        match signals.recv().await.unwrap() {
            StreamSignal::StreamStopping => {}
            other => panic!("unexpected signal: {:?}", other),
        }
        match signals.recv().await.unwrap() {
            StreamSignal::StreamingStopped {
                horizontal,
                vertical,
            } => {
                assert_eq!(horizontal, StopInfo::default());
                assert_eq!(vertical, StopInfo::default());
            }
            other => panic!("unexpected signal: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_status_reflects_reset_and_dual_mode() {
        let (handle, _signals) = spawn_coordinator(Box::new(ConfirmingFactory), true);

        let status = handle.status().await.unwrap();
        assert!(!status.usable);

        handle.reset(OutputProfile::Advanced).await.unwrap();
        let status = handle.status().await.unwrap();
        assert!(status.usable);
        assert!(!status.streaming_active);
        assert!(!status.active);
    }

    #[tokio::test]
    async fn test_stop_on_disabled_vertical_surface_is_noop() {
        let (handle, mut signals) = spawn_coordinator(Box::new(ConfirmingFactory), false);
        handle.reset(OutputProfile::Simple).await.unwrap();

        handle
            .stop_streaming(false, StopTarget::Vertical)
            .await
            .unwrap();

        // Queries still work and no stop events were produced
        let status = handle.status().await.unwrap();
        assert!(status.usable);
        assert!(signals.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_recording_passthrough_signals() {
        let (handle, mut signals) = spawn_coordinator(Box::new(ConfirmingFactory), false);
        handle.reset(OutputProfile::Simple).await.unwrap();

        assert!(handle.start_recording().await.unwrap());
        match signals.recv().await.unwrap() {
            StreamSignal::RecordingStarted => {}
            other => panic!("unexpected signal: {:?}", other),
        }

        handle.stop_recording(false).await.unwrap();
        match signals.recv().await.unwrap() {
            StreamSignal::RecordingStopped { code: 0, .. } => {}
            other => panic!("unexpected signal: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_handle_errors_after_shutdown() {
        let (handle, _signals) = spawn_coordinator(Box::new(ConfirmingFactory), false);
        handle.shutdown().await.unwrap();

        // The runtime drains its queue and exits; subsequent requests fail
        // with Closed once the command channel is gone.
        let mut saw_closed = false;
        for _ in 0..10 {
            match handle.status().await {
                Err(CoordinatorError::Closed) => {
                    saw_closed = true;
                    break;
                }
                Ok(_) => tokio::task::yield_now().await,
            }
        }
        assert!(saw_closed);
    }
}
