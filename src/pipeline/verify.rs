//! Solution verification.
//!
//! Checks the selected readings against hard acceptance criteria.
//! Failing a criterion never drops a candidate: the candidate is kept
//! with its verification score multiplied down, its confidence halved,
//! and an explanatory issue attached, so reports can show what failed
//! and why.

use serde::Serialize;
use serde_json::json;
use tracing::debug;

use crate::error::StageOpResult;
use crate::task::{
    Issue, IssueCategory, IssueSeverity, ProblemContext, Stakes, TaskCategory, TaskResult,
};

use super::{PassState, SolutionCandidate, StageId, StageResult};

const LOGICAL_CONSISTENCY: &str = "logical_consistency";
const FACTUAL_ACCURACY: &str = "factual_accuracy";
const CONTEXT_COMPLIANCE: &str = "context_compliance";
const QUALITY_STANDARDS: &str = "quality_standards";

/// One criterion checked against one candidate.
#[derive(Debug, Clone, Serialize)]
pub struct CriterionOutcome {
    pub name: &'static str,
    pub applicable: bool,
    pub passed: bool,
    /// Multiplier applied to the verification score on failure.
    pub penalty: f64,
}

impl CriterionOutcome {
    fn skipped(name: &'static str, penalty: f64) -> Self {
        Self {
            name,
            applicable: false,
            passed: true,
            penalty,
        }
    }

    fn checked(name: &'static str, passed: bool, penalty: f64) -> Self {
        Self {
            name,
            applicable: true,
            passed,
            penalty,
        }
    }
}

/// Check one candidate against every criterion and apply the outcome.
pub fn verify_candidate(
    candidate: &mut SolutionCandidate,
    results: &[TaskResult],
    context: &ProblemContext,
) -> Vec<CriterionOutcome> {
    let total_blockers: usize = results.iter().map(|r| r.unresolved_blockers()).sum();
    let factual_blockers: usize = results
        .iter()
        .flat_map(|r| r.issues.iter())
        .filter(|i| {
            i.category == IssueCategory::Factual && i.severity.is_blocking() && !i.resolved
        })
        .count();
    let factual_checked = results
        .iter()
        .any(|r| r.task_type.category() == TaskCategory::FactChecking);

    let outcomes = vec![
        CriterionOutcome::checked(LOGICAL_CONSISTENCY, total_blockers == 0, 0.5),
        if context.requires_factual_accuracy() {
            // Unverified factual claims also fail the criterion
            CriterionOutcome::checked(
                FACTUAL_ACCURACY,
                factual_blockers == 0 && factual_checked,
                0.6,
            )
        } else {
            CriterionOutcome::skipped(FACTUAL_ACCURACY, 0.6)
        },
        CriterionOutcome::checked(
            CONTEXT_COMPLIANCE,
            candidate.confidence > 0.5 && candidate.adequacy > 0.5,
            0.7,
        ),
        if context.stakes == Stakes::Critical {
            CriterionOutcome::checked(
                QUALITY_STANDARDS,
                candidate.confidence > 0.8 && candidate.adequacy > 0.7,
                0.8,
            )
        } else {
            CriterionOutcome::skipped(QUALITY_STANDARDS, 0.8)
        },
    ];

    candidate.verification_score = 1.0;
    let mut all_passed = true;
    for outcome in &outcomes {
        if outcome.applicable && !outcome.passed {
            all_passed = false;
            candidate.verification_score *= outcome.penalty;
            candidate.issues.push(
                Issue::new(
                    IssueCategory::Compliance,
                    IssueSeverity::Warning,
                    format!("verification criterion failed: {}", outcome.name),
                )
                .with_confidence(0.8),
            );
        }
    }
    candidate.verified = all_passed;
    if !all_passed {
        candidate.confidence *= 0.5;
    }
    outcomes
}

/// Run verification as a pipeline stage.
///
/// Verifies the ensemble when selection ran, otherwise every
/// candidate, and keeps the selection clones in sync.
pub(super) fn verify_stage(
    context: &ProblemContext,
    state: &mut PassState,
) -> StageOpResult<StageResult> {
    let results: Vec<TaskResult> = state.results.values().cloned().collect();
    let chosen_ids: Option<Vec<String>> = state
        .selection
        .as_ref()
        .map(|s| s.selected.iter().map(|c| c.id.clone()).collect());

    let mut checked = 0usize;
    let mut passed = 0usize;
    let mut score_sum = 0.0;
    for candidate in state.candidates.iter_mut().filter(|c| match &chosen_ids {
        Some(ids) => ids.contains(&c.id),
        None => true,
    }) {
        verify_candidate(candidate, &results, context);
        checked += 1;
        if candidate.verified {
            passed += 1;
        }
        score_sum += candidate.verification_score;
    }

    if let Some(selection) = &mut state.selection {
        for chosen in &mut selection.selected {
            if let Some(updated) = state.candidates.iter().find(|c| c.id == chosen.id) {
                *chosen = updated.clone();
            }
        }
    }

    let quality = if checked == 0 {
        0.0
    } else {
        score_sum / checked as f64
    };
    let confidence = if checked == 0 {
        0.0
    } else {
        passed as f64 / checked as f64
    };

    debug!(checked, passed, "Verification finished");
    state.steps_used += checked as u64;
    Ok(StageResult::ok(
        StageId::Verification,
        json!({
            "checked": checked,
            "passed": passed,
            "mean_verification_score": quality,
        }),
    )
    .with_quality(quality)
    .with_confidence(confidence)
    .with_resource("steps", checked as f64))
}
