//! Output pipeline boundary - handler contract and completion events

mod event;
mod handler;

pub use event::{OutputEvent, OutputEventReceiver, OutputEventSender, SurfaceEvent};
pub use handler::{OutputHandler, OutputHandlerFactory};
