//! Session layer for validation runs.
//!
//! A session owns one piece of content, the context it was submitted
//! under, and everything the run derives from it: tasks, results,
//! quality history, and refinement decisions. Sessions move through a
//! fixed status machine and end purged; the in-memory store in
//! [`store`] enforces capacity and idle timeouts.

mod store;

#[cfg(test)]
#[path = "types_tests.rs"]
mod types_tests;

pub use store::{
    ArchivalEventHandler, Clock, SessionArchived, SessionStore, SweepStats, SystemClock,
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::pipeline::StageResult;
use crate::quality::{QualityMetrics, RefinementDecision};
use crate::task::{ProblemContext, TaskResult, ValidationTask};

/// A validation run over one piece of content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Unique session identifier.
    pub id: String,
    /// The content under validation.
    pub content: String,
    /// The context the content was submitted under.
    pub context: ProblemContext,
    /// Where the run currently stands.
    pub status: SessionStatus,
    /// When the session was created.
    pub created_at: DateTime<Utc>,
    /// When the session was last touched.
    pub updated_at: DateTime<Utc>,
    /// Everything the run has derived so far.
    pub state: SessionState,
}

impl Session {
    /// Create a fresh session at the given instant
    pub fn new(content: impl Into<String>, context: ProblemContext, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            content: content.into(),
            context,
            status: SessionStatus::Created,
            created_at: now,
            updated_at: now,
            state: SessionState::default(),
        }
    }
}

/// Status machine for a session.
///
/// Forward-only: `created -> strategy_selected -> processing ->
/// synthesizing -> finalized -> archived -> purged`, with the idle
/// sweep allowed to archive from any non-terminal status. `purged` is
/// the only terminal status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Session exists; nothing has run yet.
    Created,
    /// Tasks decomposed and a policy generated.
    StrategySelected,
    /// Pipeline passes and refinement in flight.
    Processing,
    /// Boundary synthesis over the final results.
    Synthesizing,
    /// Report produced; session complete.
    Finalized,
    /// Idle or complete; kept only until the purge sweep.
    Archived,
    /// Gone from the store.
    Purged,
}

impl SessionStatus {
    /// Stable string identifier
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Created => "created",
            SessionStatus::StrategySelected => "strategy_selected",
            SessionStatus::Processing => "processing",
            SessionStatus::Synthesizing => "synthesizing",
            SessionStatus::Finalized => "finalized",
            SessionStatus::Archived => "archived",
            SessionStatus::Purged => "purged",
        }
    }

    /// Whether this status permits a move to `next`.
    pub fn can_transition(&self, next: SessionStatus) -> bool {
        use SessionStatus::*;
        match (self, next) {
            // The idle sweep may archive anything not yet purged
            (Purged, _) => false,
            (_, Archived) => *self != Archived,
            (Created, StrategySelected) => true,
            (StrategySelected, Processing) => true,
            // Refinement iterations stay in processing
            (Processing, Processing) => true,
            (Processing, Synthesizing) => true,
            (Synthesizing, Finalized) => true,
            (Archived, Purged) => true,
            _ => false,
        }
    }

    /// Whether no further transition is possible
    pub fn is_terminal(&self) -> bool {
        *self == SessionStatus::Purged
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for SessionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "created" => Ok(SessionStatus::Created),
            "strategy_selected" => Ok(SessionStatus::StrategySelected),
            "processing" => Ok(SessionStatus::Processing),
            "synthesizing" => Ok(SessionStatus::Synthesizing),
            "finalized" => Ok(SessionStatus::Finalized),
            "archived" => Ok(SessionStatus::Archived),
            "purged" => Ok(SessionStatus::Purged),
            _ => Err(format!("Unknown session status: {}", s)),
        }
    }
}

/// Accumulated run state owned by a session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionState {
    /// Tasks produced by decomposition, including refinements.
    pub tasks: Vec<ValidationTask>,
    /// Latest result per task.
    pub results: Vec<TaskResult>,
    /// Stage results from the most recent pass.
    pub stage_results: Vec<StageResult>,
    /// One decision per completed iteration.
    pub decisions: Vec<RefinementDecision>,
    /// Quality snapshots, one per iteration.
    pub quality_history: Vec<QualityMetrics>,
    /// Tasks processed across all iterations.
    pub tasks_processed: usize,
    /// Processing steps consumed across all iterations.
    pub processing_steps: u64,
    /// Completed pipeline iterations.
    pub iterations: u32,
}
