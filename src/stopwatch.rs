use std::time::{Duration, Instant};
use tdigest::TDigest;

/// Collects durations of repeated work, e.g. one prediction run per user.
#[derive(Clone, Debug)]
pub struct Stopwatch {
    start_time: Instant,
    durations_in_micros: Vec<f64>,
}

impl Default for Stopwatch {
    fn default() -> Self {
        Self::new()
    }
}

impl Stopwatch {
    pub fn new() -> Stopwatch {
        Stopwatch {
            start_time: Instant::now(),
            durations_in_micros: Vec::new(),
        }
    }

    pub fn start(&mut self) {
        self.start_time = Instant::now();
    }

    /// Records the time since the last `start` and returns it.
    pub fn stop(&mut self) -> Duration {
        let duration = self.start_time.elapsed();
        self.record(duration);
        duration
    }

    pub fn record(&mut self, duration: Duration) {
        self.durations_in_micros.push(duration.as_micros() as f64);
    }

    pub fn get_n(&self) -> usize {
        self.durations_in_micros.len()
    }

    pub fn get_total(&self) -> Duration {
        let micros: f64 = self.durations_in_micros.iter().sum();
        Duration::from_micros(micros as u64)
    }

    /// Estimated quantile `q` in `[0, 1]` of the recorded durations, 0 when nothing was recorded.
    pub fn get_percentile_in_micros(&self, q: f64) -> f64 {
        if self.durations_in_micros.is_empty() {
            return 0.0;
        }
        let t_digest = TDigest::new_with_size(100);
        let sorted_digest = t_digest.merge_unsorted(self.durations_in_micros.clone());
        sorted_digest.estimate_quantile(q)
    }
}
