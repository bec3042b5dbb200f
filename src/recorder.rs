use crate::util::rounded_mean_ms;

/// Accumulates a session's per-round reaction latencies and derives the
/// session average. Grows by exactly one entry per scored round; early
/// clicks never append.
#[derive(Debug, Clone, Default)]
pub struct ScoreRecorder {
    times: Vec<u32>,
}

impl ScoreRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, ms: u32) {
        self.times.push(ms);
    }

    pub fn times(&self) -> &[u32] {
        &self.times
    }

    /// Rounded arithmetic mean of the recorded times. `None` while empty.
    pub fn average(&self) -> Option<u32> {
        rounded_mean_ms(&self.times)
    }

    pub fn is_complete(&self, target: usize) -> bool {
        self.times.len() >= target
    }
}
