use std::{
    collections::HashMap,
    sync::{Mutex, RwLock},
    time::Instant,
};

use super::{Event, EventName, PerfSink, Spans};

/// The default in-process `PerfSink`: buffers events in memory and can
/// report simple aggregates. Grounded on the teacher's `observation::Ob`
/// (`analyze()` groups events and classifies acquired/released pairs);
/// generalized here to the open event-name surface instead of a fixed
/// lock-span taxonomy.
pub struct Ob {
    events: Mutex<Vec<Event>>,
    enabled: RwLock<HashMap<&'static str, bool>>,
    spans: Mutex<Spans>,
}

impl Ob {
    pub fn new() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            enabled: RwLock::new(HashMap::new()),
            spans: Mutex::new(Spans::new()),
        }
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    /// Group buffered events by name and report per-name totals. Mirrors
    /// the intent of the teacher's `analyze()` without hard-coding a
    /// lock-specific "acquired"/"released" pairing.
    pub fn summarize(&self) -> HashMap<&'static str, i64> {
        let mut totals: HashMap<&'static str, i64> = HashMap::new();
        for event in self.events.lock().unwrap().iter() {
            *totals.entry(event.name).or_insert(0) += event.delta;
        }
        totals
    }

    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }
}

impl Default for Ob {
    fn default() -> Self {
        Self::new()
    }
}

impl PerfSink for Ob {
    fn counter(&self, event: EventName, delta: i64, start_time: Option<Instant>) {
        if !*self.enabled.read().unwrap().get(event).unwrap_or(&true) {
            return;
        }
        let mut e = Event::new(event, delta);
        if let Some(start) = start_time {
            e = e.with_tag("elapsed_us", start.elapsed().as_micros().to_string());
        }
        self.events.lock().unwrap().push(e);
    }

    fn event_on(&self, event: EventName) {
        self.enabled.write().unwrap().insert(event, true);
    }

    fn event_off(&self, event: EventName) {
        self.enabled.write().unwrap().insert(event, false);
    }

    fn track_push(&self, event: EventName) {
        let mut tags = HashMap::new();
        tags.insert("event".to_string(), event.to_string());
        self.spans
            .lock()
            .unwrap()
            .push(super::Span::new(tags));
    }

    fn track_pop(&self, event: EventName) {
        if let Some(span) = self.spans.lock().unwrap().pop() {
            let elapsed = span.finish();
            self.counter(event, elapsed.as_micros() as i64, None);
        }
    }
}
