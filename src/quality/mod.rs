//! Quality monitoring.
//!
//! Scores accumulated task results along the policy's quality
//! dimensions, flags deficiencies against the policy thresholds, and
//! estimates whether processing can stop early. Five core dimensions
//! are always scored; contextual dimensions only when the problem
//! context asks for them.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::QualityConfig;
use crate::policy::{dimensions, ScoringPolicy};
use crate::task::{IssueCategory, ProblemContext, TaskCategory, TaskResult, TaskType};

/// One dimension scored below its policy threshold.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deficiency {
    pub dimension: String,
    pub score: f64,
    pub threshold: f64,
    pub recommendation: String,
}

/// Snapshot of quality at one point in a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityMetrics {
    /// Scores per dimension, core plus applicable contextual.
    pub dimension_scores: BTreeMap<String, f64>,
    /// Weighted overall score (0.0-1.0).
    pub overall_score: f64,
    /// Mean processor confidence across results.
    pub confidence: f64,
    /// Unresolved error-severity issues across all results.
    pub critical_issues: usize,
    /// Posterior probability that processing can stop.
    pub stop_probability: f64,
    /// Dimensions below threshold, with remediation hints.
    pub deficiencies: Vec<Deficiency>,
    /// One remediation hint per deficiency, worst shortfall first.
    pub recommendations: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

/// Whether another refinement iteration is worth running.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefinementDecision {
    pub needs_refinement: bool,
    pub reason: String,
    /// Task types to re-run when refining.
    pub target_areas: Vec<TaskType>,
    /// Confidence in the inputs the decision was made from.
    pub confidence: f64,
    /// Ordinal of the assessment this decision follows, from 1.
    pub iteration: u32,
}

/// Tracks quality across iterations of a session.
#[derive(Debug, Clone)]
pub struct QualityMonitor {
    config: QualityConfig,
    history: Vec<f64>,
}

impl QualityMonitor {
    pub fn new(config: QualityConfig) -> Self {
        Self {
            config,
            history: Vec::new(),
        }
    }

    /// Score results against the policy and record the overall value.
    pub fn assess(
        &mut self,
        results: &[TaskResult],
        context: &ProblemContext,
        policy: &ScoringPolicy,
    ) -> QualityMetrics {
        let mut scores = BTreeMap::new();

        scores.insert(dimensions::COMPLETENESS.to_string(), completeness(results));
        scores.insert(dimensions::CONSISTENCY.to_string(), consistency(results));
        scores.insert(
            dimensions::CONFIDENCE.to_string(),
            mean_confidence(results),
        );
        scores.insert(dimensions::COMPLIANCE.to_string(), compliance(results));
        scores.insert(dimensions::CORRECTNESS.to_string(), correctness(results));

        let flags = &context.characteristics;
        if flags.requires_professional_tone {
            scores.insert(
                dimensions::PROFESSIONALISM.to_string(),
                category_adequacy(results, TaskCategory::Tone),
            );
        }
        if flags.requires_technical_accuracy {
            scores.insert(
                dimensions::TECHNICAL_ACCURACY.to_string(),
                technical_accuracy(results),
            );
        }
        if flags.has_risk_factors {
            scores.insert(
                dimensions::RISK_MITIGATION.to_string(),
                risk_mitigation(results),
            );
        }
        if flags.requires_conservatism {
            scores.insert(
                dimensions::CONSERVATIVENESS.to_string(),
                conservativeness(results),
            );
        }

        let overall = overall_score(&scores);
        let mean_conf = mean_confidence(results);
        let stop_probability = self.stop_posterior(overall, mean_conf);
        let deficiencies = collect_deficiencies(&scores, policy);
        let critical_issues = results.iter().map(|r| r.unresolved_blockers()).sum();
        let recommendations = deficiencies
            .iter()
            .map(|d| d.recommendation.clone())
            .collect();

        self.history.push(overall);
        debug!(
            overall = format!("{:.3}", overall),
            stop_probability = format!("{:.3}", stop_probability),
            critical_issues,
            deficiencies = deficiencies.len(),
            "Quality assessed"
        );

        QualityMetrics {
            dimension_scores: scores,
            overall_score: overall,
            confidence: mean_conf,
            critical_issues,
            stop_probability,
            deficiencies,
            recommendations,
            timestamp: Utc::now(),
        }
    }

    /// Posterior that processing can stop, from a Bernoulli update.
    ///
    /// Likelihood is overall quality discounted by confidence; the
    /// prior comes from configuration.
    fn stop_posterior(&self, overall: f64, mean_confidence: f64) -> f64 {
        let likelihood = (overall * mean_confidence).clamp(0.0, 1.0);
        let prior = self.config.stop_prior;
        let numerator = likelihood * prior;
        let denominator = numerator + (1.0 - likelihood) * (1.0 - prior);
        if denominator <= 0.0 {
            return 0.0;
        }
        numerator / denominator
    }

    /// Whether the posterior clears the early-stop threshold
    pub fn should_stop(&self, metrics: &QualityMetrics) -> bool {
        metrics.stop_probability > self.config.stop_posterior_threshold
    }

    /// Overall quality delta between the last two assessments
    pub fn trend(&self) -> f64 {
        let n = self.history.len();
        if n < 2 {
            return 0.0;
        }
        self.history[n - 1] - self.history[n - 2]
    }

    /// Number of assessments recorded so far
    pub fn assessments(&self) -> usize {
        self.history.len()
    }

    /// Decide whether another refinement pass is worth its cost.
    ///
    /// Call once per assessment; the decision's iteration is the
    /// ordinal of the latest assessment, so successive decisions
    /// carry strictly increasing iterations.
    pub fn decide_refinement(&self, metrics: &QualityMetrics) -> RefinementDecision {
        let iteration = self.history.len() as u32;
        if metrics.deficiencies.is_empty() {
            return RefinementDecision {
                needs_refinement: false,
                reason: "all dimensions at or above threshold".to_string(),
                target_areas: Vec::new(),
                confidence: metrics.confidence,
                iteration,
            };
        }
        if self.history.len() >= 2 && self.trend() <= 0.0 {
            return RefinementDecision {
                needs_refinement: false,
                reason: format!(
                    "quality plateaued at {:.2} with {} deficient dimensions",
                    metrics.overall_score,
                    metrics.deficiencies.len()
                ),
                target_areas: Vec::new(),
                confidence: metrics.confidence,
                iteration,
            };
        }
        let mut target_areas: Vec<TaskType> = Vec::new();
        for deficiency in &metrics.deficiencies {
            for task_type in focus_for(&deficiency.dimension) {
                if !target_areas.contains(task_type) {
                    target_areas.push(*task_type);
                }
            }
        }
        let names: Vec<&str> = metrics
            .deficiencies
            .iter()
            .map(|d| d.dimension.as_str())
            .collect();
        RefinementDecision {
            needs_refinement: true,
            reason: format!("deficient dimensions: {}", names.join(", ")),
            target_areas,
            confidence: metrics.confidence,
            iteration,
        }
    }
}

// ==================== Dimension scoring ====================

/// Mean adequacy across all results.
fn completeness(results: &[TaskResult]) -> f64 {
    if results.is_empty() {
        return 0.0;
    }
    results
        .iter()
        .map(|r| r.adequacy_contribution)
        .sum::<f64>()
        / results.len() as f64
}

/// Agreement between processors: narrow confidence spread scores high.
fn consistency(results: &[TaskResult]) -> f64 {
    if results.is_empty() {
        return 0.0;
    }
    if results.len() == 1 {
        return 1.0;
    }
    let mut min = f64::MAX;
    let mut max = f64::MIN;
    for result in results {
        min = min.min(result.confidence);
        max = max.max(result.confidence);
    }
    (1.0 - (max - min)).clamp(0.0, 1.0)
}

fn mean_confidence(results: &[TaskResult]) -> f64 {
    if results.is_empty() {
        return 0.0;
    }
    results.iter().map(|r| r.confidence).sum::<f64>() / results.len() as f64
}

/// Share of results that completed cleanly, with no unresolved blockers.
fn compliance(results: &[TaskResult]) -> f64 {
    if results.is_empty() {
        return 0.0;
    }
    let clean = results
        .iter()
        .filter(|r| r.success && r.unresolved_blockers() == 0)
        .count();
    clean as f64 / results.len() as f64
}

/// Adequacy over the accuracy-bearing categories.
fn correctness(results: &[TaskResult]) -> f64 {
    let accuracy: Vec<&TaskResult> = results
        .iter()
        .filter(|r| {
            matches!(
                r.task_type.category(),
                TaskCategory::FactChecking | TaskCategory::Mathematical | TaskCategory::Logical
            )
        })
        .collect();
    if accuracy.is_empty() {
        return completeness(results);
    }
    accuracy
        .iter()
        .map(|r| r.adequacy_contribution)
        .sum::<f64>()
        / accuracy.len() as f64
}

fn category_adequacy(results: &[TaskResult], category: TaskCategory) -> f64 {
    let matching: Vec<&TaskResult> = results
        .iter()
        .filter(|r| r.task_type.category() == category)
        .collect();
    if matching.is_empty() {
        return 0.5;
    }
    matching
        .iter()
        .map(|r| r.adequacy_contribution)
        .sum::<f64>()
        / matching.len() as f64
}

fn technical_accuracy(results: &[TaskResult]) -> f64 {
    let technical: Vec<&TaskResult> = results
        .iter()
        .filter(|r| {
            matches!(
                r.task_type,
                TaskType::TerminologyPrecision
                    | TaskType::UnitConsistency
                    | TaskType::MethodologyCheck
                    | TaskType::FactualVerification
            )
        })
        .collect();
    if technical.is_empty() {
        return 0.5;
    }
    technical
        .iter()
        .map(|r| r.adequacy_contribution)
        .sum::<f64>()
        / technical.len() as f64
}

/// Each unresolved blocker is an unmitigated risk.
fn risk_mitigation(results: &[TaskResult]) -> f64 {
    let blockers: usize = results.iter().map(|r| r.unresolved_blockers()).sum();
    (1.0 - blockers as f64 * 0.2).clamp(0.0, 1.0)
}

/// Unresolved factual findings read as overclaiming.
fn conservativeness(results: &[TaskResult]) -> f64 {
    let overclaims: usize = results
        .iter()
        .flat_map(|r| r.issues.iter())
        .filter(|i| i.category == IssueCategory::Factual && !i.resolved)
        .count();
    (1.0 - overclaims as f64 * 0.2).clamp(0.0, 1.0)
}

const CORE_DIMENSIONS: [&str; 5] = [
    dimensions::COMPLETENESS,
    dimensions::CONSISTENCY,
    dimensions::CONFIDENCE,
    dimensions::COMPLIANCE,
    dimensions::CORRECTNESS,
];

/// Core dimensions carry 80% of the overall score when any
/// contextual dimension is in play; 100% otherwise.
fn overall_score(scores: &BTreeMap<String, f64>) -> f64 {
    let core_sum: f64 = CORE_DIMENSIONS
        .iter()
        .filter_map(|name| scores.get(*name))
        .sum();
    let core_mean = core_sum / CORE_DIMENSIONS.len() as f64;

    let contextual: Vec<f64> = scores
        .iter()
        .filter(|(name, _)| !CORE_DIMENSIONS.contains(&name.as_str()))
        .map(|(_, score)| *score)
        .collect();
    if contextual.is_empty() {
        return core_mean;
    }
    let contextual_mean = contextual.iter().sum::<f64>() / contextual.len() as f64;
    core_mean * 0.8 + contextual_mean * 0.2
}

fn collect_deficiencies(
    scores: &BTreeMap<String, f64>,
    policy: &ScoringPolicy,
) -> Vec<Deficiency> {
    let mut deficiencies: Vec<Deficiency> = scores
        .iter()
        .filter_map(|(dimension, score)| {
            let threshold = policy.quality_threshold(dimension);
            if *score < threshold {
                Some(Deficiency {
                    dimension: dimension.clone(),
                    score: *score,
                    threshold,
                    recommendation: recommendation_for(dimension),
                })
            } else {
                None
            }
        })
        .collect();
    // Worst shortfall first
    deficiencies.sort_by(|a, b| {
        let gap_a = a.threshold - a.score;
        let gap_b = b.threshold - b.score;
        gap_b.partial_cmp(&gap_a).unwrap_or(std::cmp::Ordering::Equal)
    });
    deficiencies
}

fn recommendation_for(dimension: &str) -> String {
    match dimension {
        dimensions::COMPLETENESS => "re-run low-adequacy tasks with relaxed timeouts".to_string(),
        dimensions::CONSISTENCY => "re-check logical consistency to reconcile disagreement".to_string(),
        dimensions::CONFIDENCE => "gather corroborating results for low-confidence findings".to_string(),
        dimensions::COMPLIANCE => "resolve blocking issues before accepting the content".to_string(),
        dimensions::CORRECTNESS => "re-verify factual and logical findings".to_string(),
        dimensions::PROFESSIONALISM => "re-assess tone and voice against the expected register".to_string(),
        dimensions::TECHNICAL_ACCURACY => "re-check terminology, units, and methodology".to_string(),
        dimensions::RISK_MITIGATION => "address outstanding blockers flagged as risks".to_string(),
        dimensions::CONSERVATIVENESS => "soften or support unqualified claims".to_string(),
        other => format!("improve {other}"),
    }
}

fn focus_for(dimension: &str) -> &'static [TaskType] {
    match dimension {
        dimensions::CONSISTENCY => &[TaskType::LogicalConsistency],
        dimensions::CORRECTNESS => &[TaskType::FactualVerification, TaskType::LogicalConsistency],
        dimensions::PROFESSIONALISM => {
            &[TaskType::ToneAppropriateness, TaskType::VoiceConsistency]
        }
        dimensions::TECHNICAL_ACCURACY => {
            &[TaskType::TerminologyPrecision, TaskType::UnitConsistency]
        }
        dimensions::CONSERVATIVENESS => {
            &[TaskType::FactualVerification, TaskType::CausalClaims]
        }
        dimensions::RISK_MITIGATION => &[TaskType::FactualVerification],
        // Completeness, confidence, and compliance deficits have no
        // single culprit; leave the focus open.
        _ => &[],
    }
}
