use std::{collections::HashMap, time::Instant};

#[derive(Clone, Debug)]
pub struct Event {
    pub name: &'static str,
    pub delta: i64,
    pub tags: HashMap<String, String>,
    pub timestamp: Instant,
}

impl Event {
    pub fn new(name: &'static str, delta: i64) -> Self {
        Self {
            name,
            delta,
            tags: HashMap::new(),
            timestamp: Instant::now(),
        }
    }

    pub fn with_tag(mut self, key: &str, value: impl Into<String>) -> Self {
        self.tags.insert(key.to_string(), value.into());
        self
    }
}
