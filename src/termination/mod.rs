//! Termination policy.
//!
//! Decides when the whole session must stop and when an individual
//! task result is settled enough to leave alone. All checks are pure
//! functions over counters and results; nothing here reads the clock
//! or takes locks.

use serde::{Deserialize, Serialize};

use crate::policy::TerminationParams;
use crate::task::{TaskResult, ValidationTask};

/// Why processing stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    /// Wall-clock budget exhausted.
    MaxTimeExceeded,
    /// Accumulated results are adequate; more work is waste.
    SufficiencyReached,
    /// Too many tasks processed across iterations.
    TaskCountExceeded,
    /// Too many processing steps across iterations.
    StepBudgetExhausted,
    /// Quality posterior crossed the stop threshold.
    QualityConverged,
    /// Refinement iteration budget spent.
    RefinementExhausted,
    /// Nothing left to refine.
    Completed,
}

impl TerminationReason {
    /// Stable string identifier
    pub fn as_str(&self) -> &'static str {
        match self {
            TerminationReason::MaxTimeExceeded => "max_time_exceeded",
            TerminationReason::SufficiencyReached => "sufficiency_reached",
            TerminationReason::TaskCountExceeded => "task_count_exceeded",
            TerminationReason::StepBudgetExhausted => "step_budget_exhausted",
            TerminationReason::QualityConverged => "quality_converged",
            TerminationReason::RefinementExhausted => "refinement_exhausted",
            TerminationReason::Completed => "completed",
        }
    }
}

impl std::fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Extra processing time granted to harder tasks.
pub fn complexity_multiplier(complexity: f64) -> f64 {
    if complexity < 0.33 {
        1.5
    } else if complexity < 0.66 {
        2.0
    } else {
        3.0
    }
}

/// Session-level and task-level stop rules.
#[derive(Debug, Clone)]
pub struct TerminationPolicy {
    params: TerminationParams,
}

impl TerminationPolicy {
    /// Build a policy from scaled termination parameters
    pub fn new(params: TerminationParams) -> Self {
        Self { params }
    }

    /// The parameters this policy enforces
    pub fn params(&self) -> &TerminationParams {
        &self.params
    }

    /// Check the global stop rules, in priority order.
    pub fn should_stop(
        &self,
        elapsed_ms: u64,
        tasks_processed: usize,
        processing_steps: u64,
        results: &[TaskResult],
    ) -> Option<TerminationReason> {
        if elapsed_ms > self.params.max_processing_time_ms {
            return Some(TerminationReason::MaxTimeExceeded);
        }
        if self.is_sufficient(results) {
            return Some(TerminationReason::SufficiencyReached);
        }
        if tasks_processed > self.params.max_tasks_processed {
            return Some(TerminationReason::TaskCountExceeded);
        }
        if processing_steps > self.params.max_processing_steps {
            return Some(TerminationReason::StepBudgetExhausted);
        }
        None
    }

    /// Whether accumulated results are adequate to stop on.
    ///
    /// Requires at least two processed tasks, then either the
    /// importance-weighted adequacy clears the adaptive threshold or
    /// three results are individually high-confidence.
    pub fn is_sufficient(&self, results: &[TaskResult]) -> bool {
        if results.len() < 2 {
            return false;
        }
        let weighted = weighted_adequacy(results);
        if weighted >= self.adaptive_threshold(results.len()) {
            return true;
        }
        results.iter().filter(|r| r.confidence >= 0.8).count() >= 3
    }

    /// Sufficiency threshold adjusted for how much has been processed.
    ///
    /// Lots of evidence relaxes the bar by 10%; scant evidence raises
    /// it by 10%. Clamped to [0.5, 0.9] either way.
    pub fn adaptive_threshold(&self, tasks_processed: usize) -> f64 {
        let base = self.params.sufficiency_threshold;
        let adjusted = if tasks_processed >= 5 {
            base * 0.9
        } else if tasks_processed <= 2 {
            base * 1.1
        } else {
            base
        };
        adjusted.clamp(0.5, 0.9)
    }

    /// Whether a task result is settled and not worth reprocessing
    pub fn task_is_settled(&self, result: &TaskResult) -> bool {
        result.confidence >= 0.9 || result.adequacy_contribution >= 0.8
    }

    /// Hard timeout for one task, scaled by its complexity
    pub fn task_timeout_ms(&self, task: &ValidationTask) -> u64 {
        (self.params.task_timeout_ms as f64 * complexity_multiplier(task.estimated_complexity))
            as u64
    }
}

/// Importance-weighted mean adequacy across results.
pub fn weighted_adequacy(results: &[TaskResult]) -> f64 {
    let total_weight: f64 = results.iter().map(|r| r.importance_weight).sum();
    if total_weight <= 0.0 {
        return 0.0;
    }
    let weighted_sum: f64 = results
        .iter()
        .map(|r| r.adequacy_contribution * r.importance_weight)
        .sum();
    weighted_sum / total_weight
}
