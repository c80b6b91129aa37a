//! Per-surface streaming lifecycle state
//!
//! Bookkeeping for one streaming cycle. Every write goes through a named
//! transition method and every read happens in a gating predicate, which
//! keeps the settling rules auditable in one place.
//!
//! Invariant: a surface whose start was never requested (or was rejected)
//! is vacuously settled for every event class. It can neither block nor
//! trigger an aggregate decision.

use crate::surface::{PerSurface, Surface};

/// Where the current streaming cycle stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StreamLifecycle {
    #[default]
    Idle,
    /// Start requested on at least one surface, waiting for them to settle
    Starting,
    /// The aggregate start has been signaled; at least one surface is live
    Started,
    /// Every requested surface failed before any went live
    StartFailed,
    /// Shutdown is underway
    Stopping,
    /// All requested surfaces have stopped
    Stopped,
}

/// Lifecycle flags for one surface within the current cycle.
#[derive(Debug, Clone, Default)]
pub struct SurfaceRecord {
    /// Whether a start was issued and accepted for this surface this cycle
    pub start_requested: bool,

    pub delay_starting: bool,
    pub delay_starting_sec: i32,

    pub delay_stopping: bool,
    pub delay_stopping_sec: i32,

    /// Asynchronous confirmation that streaming actually began
    pub started: bool,

    pub stop_in_progress: bool,

    pub stopped: bool,
    pub stop_error_code: i32,
    pub stop_error: String,
}

/// The coordinator's per-surface state table for one streaming cycle.
#[derive(Debug, Default)]
pub struct StreamStateTable {
    records: PerSurface<SurfaceRecord>,
    /// Guard: the aggregate start signal fires at most once per cycle
    start_signaled: bool,
    lifecycle: StreamLifecycle,
}

impl StreamStateTable {
    /// Wipe everything. Called unconditionally at the top of every
    /// start-streaming cycle so nothing leaks across cycles.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn record(&self, surface: Surface) -> &SurfaceRecord {
        self.records.get(surface)
    }

    pub fn lifecycle(&self) -> StreamLifecycle {
        self.lifecycle
    }

    pub fn start_signaled(&self) -> bool {
        self.start_signaled
    }

    // Named transitions. The five event marks set exactly one flag (plus its
    // payload); the notes record aggregate decisions already taken.

    pub fn mark_start_requested(&mut self, surface: Surface, accepted: bool) {
        self.records.get_mut(surface).start_requested = accepted;
        if accepted {
            self.lifecycle = StreamLifecycle::Starting;
        }
    }

    pub fn mark_delay_starting(&mut self, surface: Surface, sec: i32) {
        let record = self.records.get_mut(surface);
        record.delay_starting = true;
        record.delay_starting_sec = sec;
    }

    pub fn mark_delay_stopping(&mut self, surface: Surface, sec: i32) {
        let record = self.records.get_mut(surface);
        record.delay_stopping = true;
        record.delay_stopping_sec = sec;
    }

    pub fn mark_started(&mut self, surface: Surface) {
        self.records.get_mut(surface).started = true;
    }

    pub fn mark_stop_in_progress(&mut self, surface: Surface) {
        self.records.get_mut(surface).stop_in_progress = true;
    }

    pub fn mark_stopped(&mut self, surface: Surface, code: i32, error: String) {
        let record = self.records.get_mut(surface);
        record.stopped = true;
        record.stop_error_code = code;
        record.stop_error = error;
    }

    /// Zero a surface's recorded stop error after it has been surfaced, so
    /// the eventual aggregate stop payload does not report it again.
    pub fn clear_stop_error(&mut self, surface: Surface) {
        let record = self.records.get_mut(surface);
        record.stop_error_code = 0;
        record.stop_error.clear();
    }

    /// The aggregate start decision has been made.
    pub fn note_start_signaled(&mut self) {
        self.start_signaled = true;
        self.lifecycle = StreamLifecycle::Started;
    }

    /// The aggregate stopping notification has been made.
    pub fn note_stopping(&mut self) {
        if matches!(
            self.lifecycle,
            StreamLifecycle::Starting | StreamLifecycle::Started
        ) {
            self.lifecycle = StreamLifecycle::Stopping;
        }
    }

    /// The aggregate stop decision has been made.
    pub fn note_stopped(&mut self) {
        self.lifecycle = if self.start_signaled || self.any_started() {
            StreamLifecycle::Stopped
        } else {
            StreamLifecycle::StartFailed
        };
    }

    // Gating predicates.

    /// True when every surface is settled for the given flag: either its
    /// start was never requested, or the flag is set.
    pub fn all_settled(&self, flag: impl Fn(&SurfaceRecord) -> bool) -> bool {
        Surface::ALL.iter().all(|&surface| {
            let record = self.records.get(surface);
            !record.start_requested || flag(record)
        })
    }

    pub fn any_started(&self) -> bool {
        Surface::ALL
            .iter()
            .any(|&surface| self.records.get(surface).started)
    }

    pub fn any_start_requested(&self) -> bool {
        Surface::ALL
            .iter()
            .any(|&surface| self.records.get(surface).start_requested)
    }
}
