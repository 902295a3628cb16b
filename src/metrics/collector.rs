use crate::handler::Outcome;
use dashmap::DashMap;
use hostcount_common::Increment;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Point-in-time copy of [`ReplayStats`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReplaySummary {
    pub invocations: u64,
    pub short_frames: u64,
    pub parsed: u64,
    pub counted: u64,
    pub inserted: u64,
    pub missed: u64,
    pub verdicts: BTreeMap<&'static str, u64>,
}

/// Tallies of replayed invocations, shared by all replay workers.
///
/// Recorded by the runner after each invocation returns; handlers never
/// see this.
#[derive(Clone, Default)]
pub struct ReplayStats {
    invocations: Arc<AtomicU64>,
    short_frames: Arc<AtomicU64>,
    parsed: Arc<AtomicU64>,
    counted: Arc<AtomicU64>,
    inserted: Arc<AtomicU64>,
    missed: Arc<AtomicU64>,
    verdicts: Arc<DashMap<&'static str, u64>>,
}

impl ReplayStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, verdict: &'static str, outcome: Outcome) {
        self.invocations.fetch_add(1, Ordering::Relaxed);

        let bucket = match outcome {
            Outcome::InsufficientData => &self.short_frames,
            Outcome::Parsed => &self.parsed,
            Outcome::Counted(Increment::Updated(_)) => &self.counted,
            Outcome::Counted(Increment::Inserted) => &self.inserted,
            Outcome::Counted(Increment::NotFound) => &self.missed,
        };
        bucket.fetch_add(1, Ordering::Relaxed);

        *self.verdicts.entry(verdict).or_insert(0) += 1;
    }

    pub fn invocations(&self) -> u64 {
        self.invocations.load(Ordering::Relaxed)
    }

    pub fn summary(&self) -> ReplaySummary {
        ReplaySummary {
            invocations: self.invocations(),
            short_frames: self.short_frames.load(Ordering::Relaxed),
            parsed: self.parsed.load(Ordering::Relaxed),
            counted: self.counted.load(Ordering::Relaxed),
            inserted: self.inserted.load(Ordering::Relaxed),
            missed: self.missed.load(Ordering::Relaxed),
            verdicts: self
                .verdicts
                .iter()
                .map(|entry| (*entry.key(), *entry.value()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_buckets() {
        let stats = ReplayStats::new();
        stats.record("XDP_PASS", Outcome::InsufficientData);
        stats.record("XDP_PASS", Outcome::Counted(Increment::Updated(4)));
        stats.record("XDP_PASS", Outcome::Counted(Increment::NotFound));
        stats.record("TC_ACT_OK", Outcome::Parsed);

        let summary = stats.summary();
        assert_eq!(summary.invocations, 4);
        assert_eq!(summary.short_frames, 1);
        assert_eq!(summary.counted, 1);
        assert_eq!(summary.missed, 1);
        assert_eq!(summary.parsed, 1);
        assert_eq!(summary.verdicts.get("XDP_PASS"), Some(&3));
        assert_eq!(summary.verdicts.get("TC_ACT_OK"), Some(&1));
    }
}
