// Bookkeeping for rows a stage had to drop.

use serde::Serialize;

/// Count of dropped items for one reason, plus the first few of them.
///
/// Every stage that can lose rows (odds reshaping, the three joins) records
/// its losses in one of these so they can be logged, summarized and, if
/// configured, turned into a hard failure.
#[derive(Debug, Clone, Serialize)]
pub struct Drops<T> {
    pub count: usize,
    pub samples: Vec<T>,
    #[serde(skip)]
    cap: usize,
}

impl<T> Drops<T> {
    pub fn new(cap: usize) -> Self {
        Self {
            count: 0,
            samples: Vec::new(),
            cap,
        }
    }

    pub fn record(&mut self, item: T) {
        self.count += 1;
        if self.samples.len() < self.cap {
            self.samples.push(item);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}
