//! Session counters.
//!
//! Every session start (including self-restarts) swaps in a fresh set of
//! counters and hands the pipelines a [`StatsHandle`] bound to that set.
//! Pipelines of a stopped or superseded session keep writing into their own
//! orphaned counters and can never touch a newer session's numbers.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Instant;

use super::types::ProbeStatus;

#[derive(Debug)]
struct Counters {
    generation: u64,
    started_at: Instant,
    hashes_processed: AtomicU64,
    matches_found: AtomicU64,
}

impl Counters {
    fn new(generation: u64) -> Self {
        Self {
            generation,
            started_at: Instant::now(),
            hashes_processed: AtomicU64::new(0),
            matches_found: AtomicU64::new(0),
        }
    }
}

/// Process-wide state of the current session.
#[derive(Debug)]
pub struct SessionStats {
    running: AtomicBool,
    current: RwLock<Arc<Counters>>,
}

impl Default for SessionStats {
    fn default() -> Self {
        Self {
            running: AtomicBool::new(false),
            current: RwLock::new(Arc::new(Counters::new(0))),
        }
    }
}

impl SessionStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset the counters, mark running and return a handle to the new set.
    pub fn begin(&self) -> StatsHandle {
        let mut current = self.current.write().unwrap_or_else(|e| e.into_inner());
        let counters = Arc::new(Counters::new(current.generation + 1));
        *current = Arc::clone(&counters);
        self.running.store(true, Ordering::SeqCst);
        StatsHandle { counters }
    }

    /// Mark idle. Counters keep their last values.
    pub fn finish(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Generation of the current counter set. Increments on every `begin`.
    pub fn generation(&self) -> u64 {
        self.counters().generation
    }

    pub fn snapshot(&self) -> ProbeStatus {
        let counters = self.counters();
        let running = self.is_running();
        let hashes_processed = counters.hashes_processed.load(Ordering::Relaxed);
        let matches = counters.matches_found.load(Ordering::Relaxed);

        let elapsed_seconds = if running {
            counters.started_at.elapsed().as_secs_f64()
        } else {
            0.0
        };
        let hashes_per_second = if running && elapsed_seconds > 0.0 {
            hashes_processed as f64 / elapsed_seconds
        } else {
            0.0
        };

        ProbeStatus {
            running,
            hashes_per_second,
            elapsed_seconds,
            matches,
            hashes_processed,
        }
    }

    fn counters(&self) -> Arc<Counters> {
        Arc::clone(&self.current.read().unwrap_or_else(|e| e.into_inner()))
    }
}

/// Write access to one session generation's counters.
#[derive(Debug, Clone)]
pub struct StatsHandle {
    counters: Arc<Counters>,
}

impl StatsHandle {
    pub fn record_hash(&self) {
        self.counters.hashes_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_match(&self) {
        self.counters.matches_found.fetch_add(1, Ordering::Relaxed);
    }

    pub fn generation(&self) -> u64 {
        self.counters.generation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_idle_snapshot_reports_zero_rate() {
        let stats = SessionStats::new();
        let status = stats.snapshot();
        assert!(!status.running);
        assert_eq!(status.hashes_per_second, 0.0);
        assert_eq!(status.elapsed_seconds, 0.0);
    }

    #[test]
    fn test_begin_resets_counters() {
        let stats = SessionStats::new();
        let first = stats.begin();
        first.record_hash();
        first.record_match();
        assert_eq!(stats.snapshot().hashes_processed, 1);

        let second = stats.begin();
        let status = stats.snapshot();
        assert!(status.running);
        assert_eq!(status.hashes_processed, 0);
        assert_eq!(status.matches, 0);
        assert_eq!(second.generation(), first.generation() + 1);
    }

    #[test]
    fn test_stale_handle_cannot_write_into_new_session() {
        let stats = SessionStats::new();
        let stale = stats.begin();
        let _current = stats.begin();

        stale.record_hash();
        stale.record_match();

        let status = stats.snapshot();
        assert_eq!(status.hashes_processed, 0);
        assert_eq!(status.matches, 0);
    }

    #[test]
    fn test_rate_is_hashes_over_elapsed() {
        let stats = SessionStats::new();
        let handle = stats.begin();
        for _ in 0..5 {
            handle.record_hash();
        }
        std::thread::sleep(std::time::Duration::from_millis(20));

        let status = stats.snapshot();
        assert!(status.elapsed_seconds > 0.0);
        let expected = 5.0 / status.elapsed_seconds;
        assert!((status.hashes_per_second - expected).abs() < expected * 0.05);
    }

    #[test]
    fn test_finish_keeps_counts_but_zeroes_rate() {
        let stats = SessionStats::new();
        let handle = stats.begin();
        handle.record_hash();
        stats.finish();

        let status = stats.snapshot();
        assert!(!status.running);
        assert_eq!(status.hashes_processed, 1);
        assert_eq!(status.hashes_per_second, 0.0);
    }
}
