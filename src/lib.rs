//! dualcast output core
//!
//! Coordinates a pair of independent output pipelines - a horizontal
//! (primary) and a vertical (secondary) surface - as one logical output.
//! The consumer starts and stops "the stream" once; the coordinator fans
//! the request out, tracks how each surface settles, and reports back a
//! single aggregate lifecycle regardless of how many surfaces are live.
//!
//! The media engine is out of scope: outputs are reached through the
//! [`output::OutputHandler`] trait and built by an
//! [`output::OutputHandlerFactory`] supplied by the embedding application.
//!
//! ```no_run
//! use dualcast::{spawn_coordinator, OutputProfile, ServiceConfig, StreamSignal};
//! # fn factory() -> Box<dyn dualcast::output::OutputHandlerFactory> { unimplemented!() }
//!
//! # async fn demo() -> anyhow::Result<()> {
//! let (handle, mut signals) = spawn_coordinator(factory(), true);
//! handle.reset(OutputProfile::Simple).await?;
//!
//! handle
//!     .start_streaming(
//!         Some(ServiceConfig::new("rtmp://a.example.com/live", "key-a")),
//!         Some(ServiceConfig::new("rtmp://b.example.com/live", "key-b")),
//!     )
//!     .await?;
//!
//! while let Some(signal) = signals.recv().await {
//!     if let StreamSignal::StreamingStarted = signal {
//!         break;
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod coordinator;
pub mod error;
pub mod logging;
pub mod output;
pub mod surface;

pub use config::{Config, OutputProfile, ServiceConfig};
pub use coordinator::{
    spawn_coordinator, CoordinatorHandle, DualOutputCoordinator, OutputStatus, StopInfo,
    StreamLifecycle, StreamSignal,
};
pub use error::CoordinatorError;
pub use output::{OutputEvent, OutputHandler, OutputHandlerFactory, SurfaceEvent};
pub use surface::{PerSurface, StopTarget, Surface};
