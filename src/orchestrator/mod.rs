//! Session orchestration.
//!
//! Drives a validation session through its full lifecycle:
//!
//! - decompose the content into weighted tasks and derive a scoring
//!   policy from the problem context
//! - run pipeline passes, assessing quality between them and
//!   refining while each pass still pays for itself
//! - synthesize solution boundaries for the surviving results
//! - finalize the session and report
//!
//! Every loop is bounded. Wall clock, task count, step budget, and
//! the refinement iteration cap can each end a run; the report names
//! which one did.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::boundary::{BoundaryReport, ContrastiveBoundarySynthesizer, Verdict};
use crate::config::Config;
use crate::decompose::TaskDecomposer;
use crate::error::AppResult;
use crate::pipeline::{PassOutcome, Pipeline};
use crate::policy::{dimensions, PolicyGenerator};
use crate::processors::ProcessorRegistry;
use crate::quality::{QualityMetrics, QualityMonitor, RefinementDecision};
use crate::session::{SessionStatus, SessionStore};
use crate::task::{ProblemContext, TaskResult, TaskType, ValidationTask};
use crate::termination::{TerminationPolicy, TerminationReason};

/// Strict reporting minimums checked after processing ends.
///
/// These are deliberately harsher than the in-run thresholds; a miss
/// here is reported, never acted on.
const STRICT_MINIMUMS: [(&str, f64); 5] = [
    (dimensions::COMPLETENESS, 0.8),
    (dimensions::CORRECTNESS, 0.8),
    (dimensions::CONSISTENCY, 0.85),
    (dimensions::CONFIDENCE, 0.75),
    (dimensions::COMPLIANCE, 0.9),
];

/// One dimension checked against its strict minimum.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinalCheck {
    pub dimension: String,
    pub score: f64,
    pub minimum: f64,
    pub passed: bool,
}

/// Final quality held against the strict minimums.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinalQualityReport {
    pub checks: Vec<FinalCheck>,
    pub passed: bool,
}

/// Everything one validation run produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    pub session_id: String,
    /// Combined boundary verdict over the final results.
    pub verdict: Verdict,
    pub final_results: Vec<TaskResult>,
    /// One refinement decision per completed iteration.
    pub decisions: Vec<RefinementDecision>,
    /// Quality metrics from the last assessment.
    pub quality: QualityMetrics,
    pub final_quality: FinalQualityReport,
    pub boundaries: BoundaryReport,
    pub termination_reason: TerminationReason,
    pub iterations: u32,
    pub elapsed_ms: u64,
}

/// Aggregate statistics across completed runs.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunStats {
    pub sessions_completed: u64,
    pub sessions_failed: u64,
    pub verdict_counts: HashMap<String, u64>,
    pub mean_iterations: f64,
}

#[derive(Debug, Default)]
struct RunTotals {
    completed: u64,
    failed: u64,
    verdicts: HashMap<String, u64>,
    iterations: u64,
}

/// Coordinates decomposition, the pipeline, quality monitoring,
/// termination, and boundary synthesis for the `validate` entry point.
pub struct Orchestrator {
    config: Config,
    store: Arc<SessionStore>,
    decomposer: TaskDecomposer,
    policies: PolicyGenerator,
    pipeline: Pipeline,
    synthesizer: ContrastiveBoundarySynthesizer,
    totals: RwLock<RunTotals>,
}

impl Orchestrator {
    /// Build an orchestrator with the builtin processor registry.
    pub fn new(config: Config) -> Self {
        Self::with_registry(config, Arc::new(ProcessorRegistry::new()))
    }

    /// Build an orchestrator around a caller-supplied registry.
    pub fn with_registry(config: Config, registry: Arc<ProcessorRegistry>) -> Self {
        Self {
            store: Arc::new(SessionStore::with_system_clock(&config.session)),
            decomposer: TaskDecomposer::new(config.decompose.clone()),
            policies: PolicyGenerator::new(config.termination.clone(), config.quality.clone()),
            pipeline: Pipeline::new(&config.pipeline, &config.ensemble, registry),
            synthesizer: ContrastiveBoundarySynthesizer::new(config.boundary.clone()),
            totals: RwLock::new(RunTotals::default()),
            config,
        }
    }

    /// The session store backing this orchestrator.
    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    /// Validate content against its problem context.
    ///
    /// Creates a session, drives it to a final report, and archives
    /// it. Returns the report; the archived session remains readable
    /// from the store until the sweep purges it.
    pub async fn validate(
        &self,
        content: impl Into<String>,
        context: ProblemContext,
    ) -> AppResult<ValidationReport> {
        let started = Instant::now();
        let content = content.into();
        let session = self.store.create(content.clone(), context.clone())?;
        let session_id = session.id.clone();
        info!(
            session_id = %session_id,
            context_type = %context.context_type,
            stakes = %context.stakes,
            "Validation started"
        );

        let report = self.run(&session_id, content, &context, started).await;
        match &report {
            Ok(report) => self.record_completed(report),
            Err(error) => {
                warn!(session_id = %session_id, error = %error, "Validation failed");
                self.record_failed();
            }
        }
        if let Err(error) = self.store.archive(&session_id) {
            debug!(session_id = %session_id, error = %error, "Archive after run failed");
        }
        report
    }

    /// Aggregate statistics for all runs so far.
    pub fn stats(&self) -> RunStats {
        let totals = self.totals.read().unwrap();
        let mean_iterations = if totals.completed == 0 {
            0.0
        } else {
            totals.iterations as f64 / totals.completed as f64
        };
        RunStats {
            sessions_completed: totals.completed,
            sessions_failed: totals.failed,
            verdict_counts: totals.verdicts.clone(),
            mean_iterations,
        }
    }

    async fn run(
        &self,
        session_id: &str,
        content: String,
        context: &ProblemContext,
        started: Instant,
    ) -> AppResult<ValidationReport> {
        let content: Arc<str> = Arc::from(content);

        // Strategy selection: policy and initial task set.
        let policy = self.policies.generate(context);
        let mut tasks = self.decomposer.decompose(&content, context, &policy);
        self.store
            .set_status(session_id, SessionStatus::StrategySelected)?;
        let initial_tasks = tasks.clone();
        self.store.update(session_id, |s| {
            s.state.tasks = initial_tasks;
        })?;

        let termination = TerminationPolicy::new(policy.termination.clone());
        let mut monitor = QualityMonitor::new(self.config.quality.clone());
        let max_passes = policy.max_refinement_iterations + 1;

        let mut results: Vec<TaskResult> = Vec::new();
        let mut decisions: Vec<RefinementDecision> = Vec::new();
        let mut quality: Option<QualityMetrics> = None;
        let mut prior: Vec<TaskResult> = Vec::new();
        let mut pass_context = context.clone();
        let mut pass_policy = policy;
        let mut tasks_processed = 0usize;
        let mut steps_used = 0u64;
        let mut iterations = 0u32;
        let termination_reason;

        loop {
            self.store.set_status(session_id, SessionStatus::Processing)?;
            let outcome = self
                .pipeline
                .run_pass(
                    Arc::clone(&content),
                    &pass_context,
                    &pass_policy,
                    tasks.clone(),
                    prior,
                )
                .await;
            let PassOutcome {
                stage_results,
                task_results,
                tasks_processed: pass_tasks,
                steps_used: pass_steps,
                ..
            } = outcome;
            iterations += 1;
            tasks_processed += pass_tasks;
            steps_used += pass_steps;
            results = task_results;

            let metrics = monitor.assess(&results, &pass_context, &pass_policy);
            let decision = monitor.decide_refinement(&metrics);
            decisions.push(decision.clone());
            quality = Some(metrics.clone());

            let state_results = results.clone();
            self.store.update(session_id, |s| {
                s.state.results = state_results;
                s.state.stage_results = stage_results;
                s.state.decisions.push(decision.clone());
                s.state.quality_history.push(metrics.clone());
                s.state.tasks_processed = tasks_processed;
                s.state.processing_steps = steps_used;
                s.state.iterations = iterations;
            })?;

            let elapsed_ms = started.elapsed().as_millis() as u64;
            if let Some(reason) =
                termination.should_stop(elapsed_ms, tasks_processed, steps_used, &results)
            {
                termination_reason = reason;
                break;
            }
            if monitor.should_stop(&metrics) {
                termination_reason = TerminationReason::QualityConverged;
                break;
            }
            if !decision.needs_refinement {
                termination_reason = TerminationReason::Completed;
                break;
            }
            if iterations >= max_passes {
                termination_reason = TerminationReason::RefinementExhausted;
                break;
            }

            // Next pass: derive a focused context, regenerate the
            // policy, add tasks for uncovered target areas, and seed
            // settled results so only unsettled work repeats.
            let target_names: Vec<String> = decision
                .target_areas
                .iter()
                .map(|t| t.to_string())
                .collect();
            pass_context = context.refined_for(&target_names);
            pass_policy = self.policies.generate(&pass_context);

            let mut added = 0;
            for area in &decision.target_areas {
                if !tasks.iter().any(|t| t.task_type == *area) {
                    tasks.push(refinement_task(*area));
                    added += 1;
                }
            }
            if added > 0 {
                let tasks_snapshot = tasks.clone();
                self.store.update(session_id, |s| {
                    s.state.tasks = tasks_snapshot;
                })?;
            }
            prior = results
                .iter()
                .filter(|r| termination.task_is_settled(r))
                .cloned()
                .collect();
            debug!(
                session_id,
                iteration = iterations,
                added,
                seeded = prior.len(),
                "Prepared refinement pass"
            );
        }

        self.store
            .set_status(session_id, SessionStatus::Synthesizing)?;
        let boundaries = self.synthesizer.synthesize(&tasks, &results, context.stakes);

        let quality = match quality {
            Some(metrics) => metrics,
            None => monitor.assess(&results, &pass_context, &pass_policy),
        };
        let final_quality = final_quality_report(&quality);

        self.store.set_status(session_id, SessionStatus::Finalized)?;
        let elapsed_ms = started.elapsed().as_millis() as u64;
        info!(
            session_id,
            verdict = %boundaries.verdict,
            reason = %termination_reason,
            iterations,
            elapsed_ms,
            "Validation finalized"
        );

        Ok(ValidationReport {
            session_id: session_id.to_string(),
            verdict: boundaries.verdict,
            final_results: results,
            decisions,
            quality,
            final_quality,
            boundaries,
            termination_reason,
            iterations,
            elapsed_ms,
        })
    }

    fn record_completed(&self, report: &ValidationReport) {
        let mut totals = self.totals.write().unwrap();
        totals.completed += 1;
        totals.iterations += u64::from(report.iterations);
        *totals
            .verdicts
            .entry(report.verdict.as_str().to_string())
            .or_insert(0) += 1;
    }

    fn record_failed(&self) {
        self.totals.write().unwrap().failed += 1;
    }
}

/// Task injected when a deficient dimension points at an area the
/// current task set does not cover.
fn refinement_task(area: TaskType) -> ValidationTask {
    ValidationTask::new(
        area,
        format!("Focused re-check of {area} after a quality shortfall"),
    )
    .with_importance(0.9)
    .with_complexity(0.5)
}

fn final_quality_report(metrics: &QualityMetrics) -> FinalQualityReport {
    let checks: Vec<FinalCheck> = STRICT_MINIMUMS
        .iter()
        .map(|(dimension, minimum)| {
            let score = metrics
                .dimension_scores
                .get(*dimension)
                .copied()
                .unwrap_or(0.0);
            FinalCheck {
                dimension: (*dimension).to_string(),
                score,
                minimum: *minimum,
                passed: score >= *minimum,
            }
        })
        .collect();
    let passed = checks.iter().all(|c| c.passed);
    FinalQualityReport { checks, passed }
}

// ==================== Tests ====================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::ContextType;

    fn clean_content() -> &'static str {
        "The team reviewed the deployment checklist. Each step was \
         verified against the runbook before the release went out. No \
         further action is required."
    }

    #[tokio::test]
    async fn test_validate_produces_complete_report() {
        let orchestrator = Orchestrator::new(Config::default());
        let context = ProblemContext::new(ContextType::General);

        let report = orchestrator
            .validate(clean_content(), context)
            .await
            .unwrap();

        assert!(!report.session_id.is_empty());
        assert!(report.iterations >= 1);
        assert_eq!(report.decisions.len(), report.iterations as usize);
        // Universal checks guarantee at least two results
        assert!(report.final_results.len() >= 2);
        assert_eq!(report.final_quality.checks.len(), 5);
        assert!(!report.quality.dimension_scores.is_empty());
    }

    #[tokio::test]
    async fn test_validate_archives_session() {
        let orchestrator = Orchestrator::new(Config::default());
        let context = ProblemContext::new(ContextType::General);

        let report = orchestrator
            .validate(clean_content(), context)
            .await
            .unwrap();

        let session = orchestrator.store().get(&report.session_id).unwrap();
        assert_eq!(session.status, SessionStatus::Archived);
        assert_eq!(session.state.iterations, report.iterations);
        assert_eq!(session.state.decisions.len(), report.decisions.len());
    }

    #[tokio::test]
    async fn test_decision_iterations_strictly_increase() {
        let orchestrator = Orchestrator::new(Config::default());
        let context = ProblemContext::new(ContextType::Professional);

        let report = orchestrator
            .validate(
                "Revenue was probably much better than last year, everyone says so.",
                context,
            )
            .await
            .unwrap();

        for (index, decision) in report.decisions.iter().enumerate() {
            assert_eq!(decision.iteration, index as u32 + 1);
        }
        // At most max_refinement_iterations + 1 decisions
        assert!(report.decisions.len() <= 4);
    }

    #[tokio::test]
    async fn test_stats_accumulate() {
        let orchestrator = Orchestrator::new(Config::default());
        assert_eq!(orchestrator.stats().sessions_completed, 0);

        orchestrator
            .validate(clean_content(), ProblemContext::new(ContextType::General))
            .await
            .unwrap();
        orchestrator
            .validate(clean_content(), ProblemContext::new(ContextType::General))
            .await
            .unwrap();

        let stats = orchestrator.stats();
        assert_eq!(stats.sessions_completed, 2);
        assert_eq!(stats.sessions_failed, 0);
        assert!(stats.mean_iterations >= 1.0);
        assert_eq!(stats.verdict_counts.values().sum::<u64>(), 2);
    }

    #[test]
    fn test_final_quality_strict_minimums() {
        let mut scores = std::collections::BTreeMap::new();
        scores.insert(dimensions::COMPLETENESS.to_string(), 0.85);
        scores.insert(dimensions::CORRECTNESS.to_string(), 0.85);
        scores.insert(dimensions::CONSISTENCY.to_string(), 0.86);
        scores.insert(dimensions::CONFIDENCE.to_string(), 0.76);
        scores.insert(dimensions::COMPLIANCE.to_string(), 0.95);
        let metrics = QualityMetrics {
            dimension_scores: scores,
            overall_score: 0.85,
            confidence: 0.76,
            critical_issues: 0,
            stop_probability: 0.5,
            deficiencies: Vec::new(),
            recommendations: Vec::new(),
            timestamp: chrono::Utc::now(),
        };

        let report = final_quality_report(&metrics);
        assert!(report.passed);
        assert_eq!(report.checks.len(), 5);

        // Consistency at 0.84 misses its 0.85 minimum
        let mut metrics = metrics;
        metrics
            .dimension_scores
            .insert(dimensions::CONSISTENCY.to_string(), 0.84);
        let report = final_quality_report(&metrics);
        assert!(!report.passed);
        let consistency = report
            .checks
            .iter()
            .find(|c| c.dimension == dimensions::CONSISTENCY)
            .unwrap();
        assert!(!consistency.passed);
    }

    #[test]
    fn test_refinement_task_shape() {
        let task = refinement_task(TaskType::FactualVerification);
        assert_eq!(task.task_type, TaskType::FactualVerification);
        assert!(task.importance > 0.8);
        assert!(task.description.contains("re-check"));
    }
}
