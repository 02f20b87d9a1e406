//! Run lifecycle: WARMUP → ACTIVE → FINALIZED.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunPhase {
    /// Indicators are priming; signals are discarded.
    Warmup,
    /// Signals become orders and fills.
    Active,
    /// Stream exhausted, results computed.
    Finalized,
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RunPhase::Warmup => "WARMUP",
            RunPhase::Active => "ACTIVE",
            RunPhase::Finalized => "FINALIZED",
        };
        f.write_str(s)
    }
}

/// Counts primary-symbol bars and moves the phase forward.
#[derive(Debug, Clone)]
pub struct PhaseTracker {
    warmup_bars: usize,
    primary_bars: usize,
    phase: RunPhase,
    warmup_end: Option<DateTime<Utc>>,
}

impl PhaseTracker {
    /// With zero warmup the run starts `Active` and has no warmup end.
    pub fn new(warmup_bars: usize) -> Self {
        Self {
            warmup_bars,
            primary_bars: 0,
            phase: if warmup_bars == 0 {
                RunPhase::Active
            } else {
                RunPhase::Warmup
            },
            warmup_end: None,
        }
    }

    /// Record one primary bar. Returns `true` on the WARMUP → ACTIVE edge.
    pub fn on_primary_bar(&mut self, timestamp: DateTime<Utc>) -> bool {
        self.primary_bars += 1;
        if self.phase == RunPhase::Warmup && self.primary_bars > self.warmup_bars {
            self.phase = RunPhase::Active;
            self.warmup_end = Some(timestamp);
            return true;
        }
        false
    }

    pub fn finalize(&mut self) {
        self.phase = RunPhase::Finalized;
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    pub fn is_active(&self) -> bool {
        self.phase == RunPhase::Active
    }

    /// Timestamp of the first primary bar processed while active.
    pub fn warmup_end(&self) -> Option<DateTime<Utc>> {
        self.warmup_end
    }

    pub fn warmup_bars(&self) -> usize {
        self.warmup_bars
    }

    pub fn primary_bars(&self) -> usize {
        self.primary_bars
    }

    /// Warmup was configured but the stream ended before it completed.
    pub fn warmup_incomplete(&self) -> bool {
        self.warmup_bars > 0 && self.warmup_end.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn ts(i: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::days(i)
    }

    #[test]
    fn warmup_then_active() {
        let mut tracker = PhaseTracker::new(3);
        assert_eq!(tracker.phase(), RunPhase::Warmup);
        for i in 0..3 {
            assert!(!tracker.on_primary_bar(ts(i)));
        }
        assert!(tracker.on_primary_bar(ts(3)));
        assert_eq!(tracker.phase(), RunPhase::Active);
        assert_eq!(tracker.warmup_end(), Some(ts(3)));
        assert!(!tracker.on_primary_bar(ts(4)));
        assert_eq!(tracker.warmup_end(), Some(ts(3)));
    }

    #[test]
    fn zero_warmup_starts_active() {
        let mut tracker = PhaseTracker::new(0);
        assert!(tracker.is_active());
        assert!(!tracker.on_primary_bar(ts(0)));
        assert_eq!(tracker.warmup_end(), None);
        assert!(!tracker.warmup_incomplete());
    }

    #[test]
    fn short_stream_never_activates() {
        let mut tracker = PhaseTracker::new(10);
        for i in 0..5 {
            tracker.on_primary_bar(ts(i));
        }
        tracker.finalize();
        assert_eq!(tracker.phase(), RunPhase::Finalized);
        assert!(tracker.warmup_incomplete());
    }

    #[test]
    fn display_is_upper_case() {
        assert_eq!(RunPhase::Warmup.to_string(), "WARMUP");
        assert_eq!(RunPhase::Finalized.to_string(), "FINALIZED");
    }
}
