//! Process readiness state.
//!
//! A `StatusContext` is created once at process start and handed by
//! reference to whatever needs to report or change readiness. State only
//! moves through the transition methods:
//!
//! ```text
//! Starting ──► Ready ◄──► Degraded(reason)
//!     │          │              │
//!     └──────────┴──────────────┴──► ShuttingDown
//! ```
//!
//! `Starting` may also go straight to `Degraded`. `ShuttingDown` is terminal.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "reason", rename_all = "snake_case")]
pub enum Readiness {
    Starting,
    Ready,
    Degraded(String),
    ShuttingDown,
}

impl Readiness {
    fn label(&self) -> &'static str {
        match self {
            Readiness::Starting => "starting",
            Readiness::Ready => "ready",
            Readiness::Degraded(_) => "degraded",
            Readiness::ShuttingDown => "shutting_down",
        }
    }
}

impl fmt::Display for Readiness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Readiness::Degraded(reason) => write!(f, "degraded ({reason})"),
            other => f.write_str(other.label()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid readiness transition: {from} -> {to}")]
pub struct StatusError {
    pub from: &'static str,
    pub to: &'static str,
}

/// Read-only view for health reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub readiness: Readiness,
    pub started_at: DateTime<Utc>,
    pub changed_at: DateTime<Utc>,
    pub transitions: usize,
    pub runs_completed: usize,
}

impl StatusSnapshot {
    pub fn is_ready(&self) -> bool {
        self.readiness == Readiness::Ready
    }
}

#[derive(Debug, Clone)]
pub struct StatusContext {
    readiness: Readiness,
    started_at: DateTime<Utc>,
    changed_at: DateTime<Utc>,
    transitions: usize,
    runs_completed: usize,
}

impl Default for StatusContext {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusContext {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            readiness: Readiness::Starting,
            started_at: now,
            changed_at: now,
            transitions: 0,
            runs_completed: 0,
        }
    }

    pub fn readiness(&self) -> &Readiness {
        &self.readiness
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        StatusSnapshot {
            readiness: self.readiness.clone(),
            started_at: self.started_at,
            changed_at: self.changed_at,
            transitions: self.transitions,
            runs_completed: self.runs_completed,
        }
    }

    /// `Starting` or `Degraded` → `Ready`.
    pub fn mark_ready(&mut self) -> Result<(), StatusError> {
        match self.readiness {
            Readiness::Starting | Readiness::Degraded(_) => {
                self.set(Readiness::Ready);
                Ok(())
            }
            Readiness::Ready => Ok(()),
            Readiness::ShuttingDown => Err(self.invalid("ready")),
        }
    }

    /// Any live state → `Degraded(reason)`. A new reason replaces the old one.
    pub fn mark_degraded(&mut self, reason: impl Into<String>) -> Result<(), StatusError> {
        if self.readiness == Readiness::ShuttingDown {
            return Err(self.invalid("degraded"));
        }
        let reason = reason.into();
        warn!(%reason, "status degraded");
        self.set(Readiness::Degraded(reason));
        Ok(())
    }

    /// Any state → `ShuttingDown`. Repeated calls are no-ops.
    pub fn begin_shutdown(&mut self) {
        if self.readiness != Readiness::ShuttingDown {
            self.set(Readiness::ShuttingDown);
        }
    }

    /// Count a finished run. Rejected once shutdown has begun.
    pub fn record_run(&mut self) -> Result<(), StatusError> {
        if self.readiness == Readiness::ShuttingDown {
            return Err(self.invalid("run"));
        }
        self.runs_completed += 1;
        Ok(())
    }

    fn invalid(&self, to: &'static str) -> StatusError {
        StatusError {
            from: self.readiness.label(),
            to,
        }
    }

    fn set(&mut self, next: Readiness) {
        info!(from = %self.readiness, to = %next, "status transition");
        self.readiness = next;
        self.changed_at = Utc::now();
        self.transitions += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_in_starting() {
        let status = StatusContext::new();
        let snap = status.snapshot();
        assert_eq!(snap.readiness, Readiness::Starting);
        assert_eq!(snap.transitions, 0);
        assert!(!snap.is_ready());
    }

    #[test]
    fn normal_lifecycle() {
        let mut status = StatusContext::new();
        status.mark_ready().unwrap();
        assert!(status.snapshot().is_ready());
        status.record_run().unwrap();
        status.begin_shutdown();
        let snap = status.snapshot();
        assert_eq!(snap.readiness, Readiness::ShuttingDown);
        assert_eq!(snap.transitions, 2);
        assert_eq!(snap.runs_completed, 1);
    }

    #[test]
    fn degraded_and_recovered() {
        let mut status = StatusContext::new();
        status.mark_degraded("data file missing").unwrap();
        assert_eq!(
            status.readiness(),
            &Readiness::Degraded("data file missing".into())
        );
        status.mark_ready().unwrap();
        assert_eq!(status.readiness(), &Readiness::Ready);
    }

    #[test]
    fn shutdown_is_terminal() {
        let mut status = StatusContext::new();
        status.begin_shutdown();
        assert_eq!(
            status.mark_ready().unwrap_err(),
            StatusError {
                from: "shutting_down",
                to: "ready"
            }
        );
        assert!(status.mark_degraded("late").is_err());
        assert!(status.record_run().is_err());
        status.begin_shutdown();
        assert_eq!(status.snapshot().transitions, 1);
    }

    #[test]
    fn ready_is_idempotent() {
        let mut status = StatusContext::new();
        status.mark_ready().unwrap();
        status.mark_ready().unwrap();
        assert_eq!(status.snapshot().transitions, 1);
    }

    #[test]
    fn snapshot_serializes_with_reason() {
        let mut status = StatusContext::new();
        status.mark_degraded("slow disk").unwrap();
        let json = serde_json::to_value(status.snapshot()).unwrap();
        assert_eq!(json["readiness"]["state"], "degraded");
        assert_eq!(json["readiness"]["reason"], "slow disk");
    }
}
