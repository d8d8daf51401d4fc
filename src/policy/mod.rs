//! Scoring policy generation.
//!
//! A policy is derived from the problem context alone, with no session
//! state, so regenerating it for a refinement iteration is safe and
//! deterministic. It carries the task selection weights used to filter
//! decomposition output, the quality thresholds the monitor judges
//! against, and the termination parameters scaled for context
//! complexity.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::config::{QualityConfig, TerminationConfig};
use crate::task::{ContextType, ProblemContext, Stakes, TaskCategory, TaskType};

/// Quality dimension names used as threshold keys.
pub mod dimensions {
    pub const COMPLETENESS: &str = "completeness";
    pub const CONSISTENCY: &str = "consistency";
    pub const CONFIDENCE: &str = "confidence";
    pub const COMPLIANCE: &str = "compliance";
    pub const CORRECTNESS: &str = "correctness";
    pub const PROFESSIONALISM: &str = "professionalism";
    pub const TECHNICAL_ACCURACY: &str = "technical_accuracy";
    pub const RISK_MITIGATION: &str = "risk_mitigation";
    pub const CONSERVATIVENESS: &str = "conservativeness";
}

/// Termination parameters after context scaling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerminationParams {
    /// Wall-clock budget for the whole session.
    pub max_processing_time_ms: u64,
    /// Adequacy level at which processing is sufficient.
    pub sufficiency_threshold: f64,
    /// Expected per-task processing time; also the hard task timeout.
    pub task_timeout_ms: u64,
    /// Cap on tasks processed across all iterations.
    pub max_tasks_processed: usize,
    /// Cap on processing steps across all iterations.
    pub max_processing_steps: u64,
}

/// Context-derived weights and budgets for one validation session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringPolicy {
    /// Per-task-type selection weight (0.0-1.0).
    pub selection_weights: HashMap<TaskType, f64>,
    /// Minimum acceptable score per quality dimension.
    pub quality_thresholds: HashMap<String, f64>,
    /// Scaled termination parameters.
    pub termination: TerminationParams,
    /// Refinement iteration budget.
    pub max_refinement_iterations: u32,
}

impl ScoringPolicy {
    /// Selection weight for a task type, defaulting to neutral
    pub fn selection_weight(&self, task_type: TaskType) -> f64 {
        self.selection_weights.get(&task_type).copied().unwrap_or(0.5)
    }

    /// Threshold for a quality dimension, defaulting to permissive
    pub fn quality_threshold(&self, dimension: &str) -> f64 {
        self.quality_thresholds
            .get(dimension)
            .copied()
            .unwrap_or(0.5)
    }
}

/// Derives scoring policies from problem contexts.
#[derive(Debug, Clone)]
pub struct PolicyGenerator {
    termination: TerminationConfig,
    quality: QualityConfig,
}

impl PolicyGenerator {
    /// Create a generator seeded with configured base values
    pub fn new(termination: TerminationConfig, quality: QualityConfig) -> Self {
        Self {
            termination,
            quality,
        }
    }

    /// Generate the policy for a context.
    ///
    /// Same context in, same policy out; nothing here reads session
    /// state or the clock.
    pub fn generate(&self, context: &ProblemContext) -> ScoringPolicy {
        let mut weights = base_weights(context.context_type);

        // Accuracy-sensitive checks tighten when the stakes are critical
        if context.stakes == Stakes::Critical {
            for (task_type, weight) in weights.iter_mut() {
                if is_accuracy_sensitive(*task_type) {
                    *weight = (*weight * 1.1).min(1.0);
                }
            }
        }

        // Mathematical content leans harder on logical checking
        if context.characteristics.mathematical_content {
            let logical = weights.entry(TaskType::LogicalConsistency).or_insert(0.8);
            *logical = (*logical * 1.2).min(1.0);
            let units = weights.entry(TaskType::UnitConsistency).or_insert(0.6);
            *units = (*units * 1.2).min(1.0);
        }

        let quality_thresholds = self.quality_thresholds(context);

        // Harder problems get proportionally more time
        let scale = 1.0 + context.estimated_complexity;
        let termination = TerminationParams {
            max_processing_time_ms: (self.termination.max_processing_time_ms as f64 * scale)
                as u64,
            sufficiency_threshold: self.termination.sufficiency_threshold,
            task_timeout_ms: (self.termination.task_timeout_ms as f64 * scale) as u64,
            max_tasks_processed: self.termination.max_tasks_processed,
            max_processing_steps: self.termination.max_processing_steps,
        };

        let max_refinement_iterations = if context.stakes == Stakes::Critical {
            5
        } else {
            3
        };

        ScoringPolicy {
            selection_weights: weights,
            quality_thresholds,
            termination,
            max_refinement_iterations,
        }
    }

    fn quality_thresholds(&self, context: &ProblemContext) -> HashMap<String, f64> {
        let base = match context.stakes {
            Stakes::Critical => 0.75,
            Stakes::High => 0.72,
            _ => 0.7,
        };

        let mut thresholds = HashMap::new();
        thresholds.insert(dimensions::COMPLETENESS.to_string(), base);
        thresholds.insert(dimensions::CONSISTENCY.to_string(), base);
        thresholds.insert(dimensions::CORRECTNESS.to_string(), base);
        thresholds.insert(dimensions::COMPLIANCE.to_string(), base);
        thresholds.insert(
            dimensions::CONFIDENCE.to_string(),
            self.quality.acceptance_confidence_threshold,
        );

        let flags = &context.characteristics;
        if flags.requires_professional_tone {
            thresholds.insert(dimensions::PROFESSIONALISM.to_string(), base);
        }
        if flags.requires_technical_accuracy {
            thresholds.insert(dimensions::TECHNICAL_ACCURACY.to_string(), base);
        }
        if flags.has_risk_factors {
            thresholds.insert(dimensions::RISK_MITIGATION.to_string(), base);
        }
        if flags.requires_conservatism {
            thresholds.insert(dimensions::CONSERVATIVENESS.to_string(), base);
        }
        thresholds
    }
}

fn is_accuracy_sensitive(task_type: TaskType) -> bool {
    matches!(
        task_type.category(),
        TaskCategory::FactChecking | TaskCategory::Mathematical
    ) || task_type == TaskType::MethodologyCheck
}

fn base_weights(context_type: ContextType) -> HashMap<TaskType, f64> {
    let pairs: &[(TaskType, f64)] = match context_type {
        ContextType::General => &[
            (TaskType::LogicalConsistency, 0.8),
            (TaskType::LinguisticQuality, 0.75),
            (TaskType::StructuralOrganization, 0.6),
            (TaskType::FactualVerification, 0.6),
            (TaskType::StatisticalClaims, 0.6),
            (TaskType::ComparativeClaims, 0.6),
            (TaskType::CausalClaims, 0.6),
        ],
        ContextType::Professional => &[
            (TaskType::LogicalConsistency, 0.85),
            (TaskType::LinguisticQuality, 0.8),
            (TaskType::ToneAppropriateness, 0.85),
            (TaskType::FactualVerification, 0.9),
            (TaskType::StructuralOrganization, 0.75),
            (TaskType::StatisticalClaims, 0.8),
            (TaskType::ComparativeClaims, 0.8),
            (TaskType::CausalClaims, 0.8),
        ],
        ContextType::Creative => &[
            (TaskType::LogicalConsistency, 0.55),
            (TaskType::LinguisticQuality, 0.85),
            (TaskType::VoiceConsistency, 0.9),
            (TaskType::ToneAppropriateness, 0.7),
            (TaskType::FactualVerification, 0.4),
            (TaskType::StatisticalClaims, 0.5),
            (TaskType::ComparativeClaims, 0.4),
            (TaskType::CausalClaims, 0.4),
        ],
        ContextType::Technical => &[
            (TaskType::LogicalConsistency, 0.95),
            (TaskType::LinguisticQuality, 0.7),
            (TaskType::TerminologyPrecision, 0.9),
            (TaskType::UnitConsistency, 0.85),
            (TaskType::FactualVerification, 0.8),
            (TaskType::StructuralOrganization, 0.65),
            (TaskType::StatisticalClaims, 0.8),
            (TaskType::ComparativeClaims, 0.7),
            (TaskType::CausalClaims, 0.75),
        ],
        ContextType::Academic => &[
            (TaskType::LogicalConsistency, 0.9),
            (TaskType::LinguisticQuality, 0.75),
            (TaskType::CitationSupport, 0.95),
            (TaskType::MethodologyCheck, 0.9),
            (TaskType::FactualVerification, 0.85),
            (TaskType::StructuralOrganization, 0.7),
            (TaskType::StatisticalClaims, 0.85),
            (TaskType::ComparativeClaims, 0.75),
            (TaskType::CausalClaims, 0.85),
        ],
    };
    pairs.iter().copied().collect()
}
