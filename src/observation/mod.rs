//! Performance-counter sink (spec.md §6 "Performance sink" collaborator).
//!
//! The taxonomy of events is explicitly a non-goal (spec.md §1); this
//! module only needs to be *an* event sink the B+tree and lock manager
//! can emit named events to. Grounded on the teacher's
//! `observation::{Event, Span, Ob}` trio, generalized into the
//! `PerfSink` trait named in SPEC_FULL.md §6 so callers can swap in a
//! real counter table without this crate depending on one.

mod event;
mod ob;
mod span;

pub use event::Event;
pub use ob::Ob;
pub use span::{Span, Spans};

use std::time::Instant;

/// Named events the core emits. Intentionally a small open enum-like
/// string newtype rather than a fixed enum: the real taxonomy lives in
/// the host application's counter table (spec.md §1 non-goals), this
/// crate just needs stable names to hand it.
pub type EventName = &'static str;

/// The contract consumed at the boundary (spec.md §6 "Performance sink").
pub trait PerfSink: Send + Sync {
    /// Record `delta` against `event`, optionally timed from `start_time`.
    fn counter(&self, event: EventName, delta: i64, start_time: Option<Instant>);

    fn event_on(&self, event: EventName);
    fn event_off(&self, event: EventName);

    /// Push/pop a nested timing scope (used to attribute latch-wait time
    /// to a call stack without changing every call site's signature).
    fn track_push(&self, event: EventName);
    fn track_pop(&self, event: EventName);
}

/// A no-op sink, useful as the default when a caller doesn't care about
/// instrumentation (e.g. unit tests).
pub struct NullSink;

impl PerfSink for NullSink {
    fn counter(&self, _event: EventName, _delta: i64, _start_time: Option<Instant>) {}
    fn event_on(&self, _event: EventName) {}
    fn event_off(&self, _event: EventName) {}
    fn track_push(&self, _event: EventName) {}
    fn track_pop(&self, _event: EventName) {}
}
