use std::{collections::HashMap, time::{Duration, Instant}};

/// A `Span` times a single unit of work and can be tagged with metadata.
/// Used to attribute latch-wait / lock-wait time to a call stack.
pub struct Span {
    tags: HashMap<String, String>,
    start: Instant,
}

impl Span {
    pub fn new(tags: HashMap<String, String>) -> Self {
        Self {
            tags,
            start: Instant::now(),
        }
    }

    pub fn finish(&self) -> Duration {
        self.start.elapsed()
    }

    pub fn tags(&self) -> &HashMap<String, String> {
        &self.tags
    }
}

/// A stack of in-flight spans, one per worker thread's `track_push`/
/// `track_pop` call pairs.
pub struct Spans {
    stack: Vec<Span>,
}

impl Spans {
    pub fn new() -> Self {
        Self { stack: Vec::new() }
    }

    pub fn push(&mut self, span: Span) {
        self.stack.push(span);
    }

    pub fn pop(&mut self) -> Option<Span> {
        self.stack.pop()
    }
}

impl Default for Spans {
    fn default() -> Self {
        Self::new()
    }
}
