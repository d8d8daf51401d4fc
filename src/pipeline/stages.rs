//! Stage implementations.
//!
//! Each stage reads and mutates the pass state and reports a
//! [`StageResult`]. Only the reasoning stage is genuinely async; the
//! rest are cheap transformations kept behind the same interface so
//! the pass loop can treat every stage alike.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::json;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::detect::ContentScan;
use crate::error::StageOpResult;
use crate::policy::ScoringPolicy;
use crate::processors::{ProcessRequest, ProcessorRegistry, TaskProcessor};
use crate::task::{ProblemContext, TaskResult, TaskType, ValidationTask};
use crate::termination::complexity_multiplier;

use super::{PassState, SolutionCandidate, StageId, StageResult};

// ==================== Structuring ====================

/// Split content into paragraphs, or sentences when there is only one.
pub(super) fn structure(content: &str, state: &mut PassState) -> StageOpResult<StageResult> {
    let text = content.trim();
    let mut segments: Vec<String> = text
        .split("\n\n")
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .map(|p| p.to_string())
        .collect();
    if segments.len() == 1 {
        segments = segments[0]
            .split_inclusive(['.', '!', '?'])
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string())
            .collect();
    }

    let word_count = text.split_whitespace().count();
    let output = json!({
        "segments": segments.len(),
        "word_count": word_count,
    });
    let quality = if segments.is_empty() { 0.2 } else { 1.0 };

    state.segments = segments;
    state.steps_used += 1;
    Ok(StageResult::ok(StageId::Structuring, output)
        .with_quality(quality)
        .with_confidence(0.9)
        .with_resource("steps", 1.0))
}

// ==================== Normalization ====================

/// Canonicalize whitespace and quoting without touching wording.
pub(super) fn normalize(content: &str, state: &mut PassState) -> StageOpResult<StageResult> {
    let normalized = normalize_text(content);
    let changed = normalized != content;
    let output = json!({
        "changed": changed,
        "original_chars": content.len(),
        "normalized_chars": normalized.len(),
    });

    state.normalized = Some(normalized);
    state.steps_used += 1;
    Ok(StageResult::ok(StageId::Normalization, output)
        .with_confidence(0.95)
        .with_resource("steps", 1.0))
}

fn normalize_text(content: &str) -> String {
    let mut out = String::with_capacity(content.len());
    let mut blank_pending = false;
    for raw_line in content.lines() {
        let line = raw_line
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .replace(&['\u{2018}', '\u{2019}'][..], "'")
            .replace(&['\u{201C}', '\u{201D}'][..], "\"");
        if line.is_empty() {
            blank_pending = !out.is_empty();
            continue;
        }
        if !out.is_empty() {
            out.push('\n');
            if blank_pending {
                out.push('\n');
            }
        }
        blank_pending = false;
        out.push_str(&line);
    }
    out
}

// ==================== Knowledge fusion ====================

/// Merge what the content asserts with what the context demands.
///
/// The notes are working hints for later stages and for the report;
/// nothing downstream branches on their exact wording.
pub(super) fn fuse(
    content: &str,
    context: &ProblemContext,
    state: &mut PassState,
) -> StageOpResult<StageResult> {
    let scan = ContentScan::analyze(state.effective_content(content));
    let mut notes: Vec<String> = Vec::new();

    if scan.has_statistical_claims() {
        notes.push("content asserts statistical claims".to_string());
    }
    if scan.has_comparative_claims() {
        notes.push("content makes comparative claims".to_string());
    }
    if scan.has_causal_claims() {
        notes.push("content makes causal claims".to_string());
    }
    if scan.certainty_without_citations() {
        notes.push("certainty markers appear without citation support".to_string());
    }
    if scan.has_mathematical_content {
        notes.push("mathematical content present".to_string());
    }
    if context.requires_factual_accuracy() {
        notes.push("context demands verifiable claims".to_string());
    }
    if context.characteristics.has_risk_factors {
        notes.push("context carries risk factors".to_string());
    }
    if context.characteristics.requires_conservatism {
        notes.push("context expects conservative claims".to_string());
    }

    let output = json!({
        "notes": notes.len(),
        "word_count": scan.word_count,
        "statistical_claims": scan.statistical_claims,
        "comparative_claims": scan.comparative_claims,
        "causal_claims": scan.causal_claims,
        "citations": scan.citation_count,
    });
    let quality = if scan.is_empty() { 0.3 } else { 1.0 };

    state.fusion_notes = notes;
    state.steps_used += 1;
    Ok(StageResult::ok(StageId::KnowledgeFusion, output)
        .with_quality(quality)
        .with_confidence(0.85)
        .with_resource("steps", 1.0))
}

// ==================== Reasoning ====================

/// Fan pending tasks out across processors.
///
/// Dependencies are honored in two waves: tasks whose dependencies sit
/// in the same batch wait for the first wave to finish. Dependencies
/// on absent tasks are treated as satisfied. Processor errors and
/// timeouts become failed task results; the stage itself only fails
/// on infrastructure problems.
pub(super) async fn reason(
    registry: &Arc<ProcessorRegistry>,
    content: &Arc<str>,
    context: &ProblemContext,
    policy: &ScoringPolicy,
    max_concurrency: usize,
    state: &mut PassState,
) -> StageOpResult<StageResult> {
    let pending: Vec<ValidationTask> = state
        .tasks
        .iter()
        .filter(|t| !state.results.contains_key(&t.id))
        .cloned()
        .collect();
    let carried = state.results.len();
    if pending.is_empty() {
        debug!(carried, "No pending tasks, reasoning carries prior results");
        return Ok(
            StageResult::ok(StageId::Reasoning, json!({"processed": 0, "carried": carried}))
                .with_confidence(0.5),
        );
    }

    let pending_ids: HashSet<String> = pending.iter().map(|t| t.id.clone()).collect();
    let (first_wave, second_wave): (Vec<ValidationTask>, Vec<ValidationTask>) =
        pending.into_iter().partition(|task| {
            !task
                .dependencies
                .iter()
                .any(|dep| pending_ids.contains(dep.as_str()))
        });

    let semaphore = Arc::new(Semaphore::new(max_concurrency));
    let mut processed = 0usize;

    for wave in [first_wave, second_wave] {
        if wave.is_empty() {
            continue;
        }
        let mut join_set = JoinSet::new();
        for task in wave {
            let semaphore = Arc::clone(&semaphore);
            let processor = registry.get(task.task_type);
            let timeout_ms = (policy.termination.task_timeout_ms as f64
                * complexity_multiplier(task.estimated_complexity)) as u64;
            let request = ProcessRequest::new(Arc::clone(content), task, context.clone());
            join_set.spawn(process_one(semaphore, processor, request, timeout_ms));
        }
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok(result) => {
                    processed += 1;
                    state.processed.push(result.task_id.clone());
                    state.results.insert(result.task_id.clone(), result);
                }
                Err(e) => {
                    warn!(error = %e, "Task processing worker panicked");
                }
            }
        }
    }

    // A panicked worker leaves its task without a result; record the
    // gap as a failure so downstream stages see the full task set
    let missing: Vec<(String, TaskType, f64)> = state
        .tasks
        .iter()
        .filter(|t| !state.results.contains_key(&t.id))
        .map(|t| (t.id.clone(), t.task_type, t.importance))
        .collect();
    for (task_id, task_type, importance) in missing {
        processed += 1;
        state.processed.push(task_id.clone());
        state.results.insert(
            task_id.clone(),
            TaskResult::failed(&task_id, task_type, "processing worker panicked")
                .with_importance_weight(importance),
        );
    }

    state.steps_used += processed as u64;

    let batch: Vec<&TaskResult> = state
        .processed
        .iter()
        .filter_map(|id| state.results.get(id))
        .collect();
    let failed = batch.iter().filter(|r| !r.success).count();
    let mean_adequacy = if batch.is_empty() {
        0.0
    } else {
        batch.iter().map(|r| r.adequacy_contribution).sum::<f64>() / batch.len() as f64
    };
    let mean_confidence = if batch.is_empty() {
        0.0
    } else {
        batch.iter().map(|r| r.confidence).sum::<f64>() / batch.len() as f64
    };

    info!(
        processed,
        failed, carried, "Reasoning stage dispatched task batch"
    );
    Ok(StageResult::ok(
        StageId::Reasoning,
        json!({
            "processed": processed,
            "failed": failed,
            "carried": carried,
        }),
    )
    .with_quality(mean_adequacy)
    .with_confidence(mean_confidence)
    .with_resource("tasks", processed as f64))
}

async fn process_one(
    semaphore: Arc<Semaphore>,
    processor: Arc<dyn TaskProcessor>,
    request: ProcessRequest,
    timeout_ms: u64,
) -> TaskResult {
    let task_id = request.task.id.clone();
    let task_type = request.task.task_type;
    let importance = request.task.importance;

    let _permit = match semaphore.acquire_owned().await {
        Ok(permit) => permit,
        Err(_) => {
            return TaskResult::failed(&task_id, task_type, "concurrency limiter closed")
                .with_importance_weight(importance);
        }
    };

    let started = Instant::now();
    let outcome = tokio::time::timeout(
        Duration::from_millis(timeout_ms),
        processor.process(request),
    )
    .await;
    let elapsed_ms = started.elapsed().as_millis() as u64;

    match outcome {
        Ok(Ok(result)) => result.with_processing_time(elapsed_ms),
        Ok(Err(e)) => {
            warn!(task_id = %task_id, error = %e, "Task processor failed");
            TaskResult::failed(&task_id, task_type, e.to_string())
                .with_importance_weight(importance)
                .with_processing_time(elapsed_ms)
        }
        Err(_) => {
            warn!(task_id = %task_id, timeout_ms, "Task processor timed out");
            TaskResult::failed(&task_id, task_type, format!("timed out after {timeout_ms}ms"))
                .with_importance_weight(importance)
                .with_processing_time(elapsed_ms)
        }
    }
}

// ==================== Candidate generation ====================

/// Draft alternative overall readings of the task results.
pub(super) fn generate_candidates(state: &mut PassState) -> StageOpResult<StageResult> {
    let results: Vec<&TaskResult> = state.results.values().collect();

    if results.is_empty() {
        state.candidates = vec![SolutionCandidate::new("unassessed")
            .with_assessment("no task results available")
            .with_confidence(0.2)
            .with_adequacy(0.2)];
        state.steps_used += 1;
        return Ok(
            StageResult::ok(StageId::CandidateGeneration, json!({"generated": 1}))
                .with_quality(0.3)
                .with_confidence(0.3)
                .with_resource("steps", 1.0),
        );
    }

    let count = results.len() as f64;
    let mean_confidence = results.iter().map(|r| r.confidence).sum::<f64>() / count;
    let mean_adequacy = results.iter().map(|r| r.adequacy_contribution).sum::<f64>() / count;
    let min_confidence = results.iter().map(|r| r.confidence).fold(f64::MAX, f64::min);
    let min_adequacy = results
        .iter()
        .map(|r| r.adequacy_contribution)
        .fold(f64::MAX, f64::min);
    let max_confidence = results.iter().map(|r| r.confidence).fold(f64::MIN, f64::max);
    let max_adequacy = results
        .iter()
        .map(|r| r.adequacy_contribution)
        .fold(f64::MIN, f64::max);
    let total_weight: f64 = results.iter().map(|r| r.importance_weight).sum();
    let weighted = if total_weight > 0.0 {
        results
            .iter()
            .map(|r| r.adequacy_contribution * r.importance_weight)
            .sum::<f64>()
            / total_weight
    } else {
        mean_adequacy
    };
    let blockers: usize = results.iter().map(|r| r.unresolved_blockers()).sum();

    state.candidates = vec![
        SolutionCandidate::new("balanced")
            .with_assessment(format!(
                "mean reading over {} results, {} blocking issues",
                results.len(),
                blockers
            ))
            .with_confidence(mean_confidence)
            .with_adequacy(mean_adequacy),
        SolutionCandidate::new("strict")
            .with_assessment("worst-case reading, every weakness counted")
            .with_confidence(min_confidence)
            .with_adequacy(min_adequacy),
        SolutionCandidate::new("lenient")
            .with_assessment("best-case reading, strongest signals trusted")
            .with_confidence(max_confidence)
            .with_adequacy(max_adequacy),
        SolutionCandidate::new("importance_weighted")
            .with_assessment("importance-weighted reading")
            .with_confidence(mean_confidence)
            .with_adequacy(weighted),
    ];

    state.steps_used += 1;
    Ok(StageResult::ok(
        StageId::CandidateGeneration,
        json!({"generated": state.candidates.len()}),
    )
    .with_confidence(mean_confidence)
    .with_resource("steps", 1.0))
}

// ==================== Candidate scoring ====================

/// Score candidates on adequacy, confidence, and outstanding blockers.
pub(super) fn score_candidates(state: &mut PassState) -> StageOpResult<StageResult> {
    if state.candidates.is_empty() {
        // Generation was disabled or produced nothing; derive one
        // baseline reading so later stages have material
        let results: Vec<&TaskResult> = state.results.values().collect();
        let candidate = if results.is_empty() {
            SolutionCandidate::new("baseline")
                .with_assessment("no task results available")
                .with_confidence(0.2)
                .with_adequacy(0.2)
        } else {
            let count = results.len() as f64;
            let mean_confidence = results.iter().map(|r| r.confidence).sum::<f64>() / count;
            let mean_adequacy =
                results.iter().map(|r| r.adequacy_contribution).sum::<f64>() / count;
            SolutionCandidate::new("baseline")
                .with_assessment(format!("baseline reading over {} results", results.len()))
                .with_confidence(mean_confidence)
                .with_adequacy(mean_adequacy)
        };
        info!("Synthesized baseline candidate for scoring");
        state.candidates.push(candidate);
    }

    let blockers: usize = state.results.values().map(|r| r.unresolved_blockers()).sum();
    let issue_factor = (1.0 - blockers as f64 * 0.15).clamp(0.0, 1.0);

    for candidate in &mut state.candidates {
        let quality =
            0.5 * candidate.adequacy + 0.3 * candidate.confidence + 0.2 * issue_factor;
        candidate.quality = quality.clamp(0.0, 1.0);
    }

    let mean_quality =
        state.candidates.iter().map(|c| c.quality).sum::<f64>() / state.candidates.len() as f64;
    state.steps_used += 1;
    Ok(StageResult::ok(
        StageId::CandidateScoring,
        json!({
            "scored": state.candidates.len(),
            "mean_quality": mean_quality,
            "blocking_issues": blockers,
        }),
    )
    .with_quality(mean_quality)
    .with_confidence(0.9)
    .with_resource("steps", 1.0))
}
