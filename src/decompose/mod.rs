//! Task decomposition.
//!
//! Turns content plus its problem context into a weighted, filtered,
//! capped set of validation tasks. Universal checks are always
//! emitted, the context profile adds its own checks, and lexical
//! probes add claim-verification tasks for what the content actually
//! asserts. The scoring policy then filters out checks that are not
//! worth running here.

use tracing::debug;

use crate::config::DecomposeConfig;
use crate::detect::ContentScan;
use crate::policy::ScoringPolicy;
use crate::task::{ContextType, ProblemContext, Stakes, TaskType, ValidationTask};

/// Decomposes content into weighted validation tasks.
#[derive(Debug, Clone)]
pub struct TaskDecomposer {
    config: DecomposeConfig,
}

impl TaskDecomposer {
    /// Create a decomposer with the given limits
    pub fn new(config: DecomposeConfig) -> Self {
        Self { config }
    }

    /// Decompose content into tasks, filter by policy weight, and cap.
    ///
    /// An empty result is a legitimate outcome (reported downstream as
    /// a completeness deficiency), never an error.
    pub fn decompose(
        &self,
        content: &str,
        context: &ProblemContext,
        policy: &ScoringPolicy,
    ) -> Vec<ValidationTask> {
        let scan = ContentScan::analyze(content);
        let mut tasks = Vec::new();

        self.push_universal(&mut tasks);
        self.push_contextual(&mut tasks, context, &scan);
        self.push_content_triggered(&mut tasks, context, &scan);

        // Claim verification builds on the factual baseline when present
        if let Some(factual_id) = tasks
            .iter()
            .find(|t| t.task_type == TaskType::FactualVerification)
            .map(|t| t.id.clone())
        {
            for task in tasks.iter_mut() {
                if matches!(
                    task.task_type,
                    TaskType::ComparativeClaims | TaskType::CausalClaims
                ) {
                    task.dependencies.push(factual_id.clone());
                }
            }
        }

        let emitted = tasks.len();
        let mut kept: Vec<ValidationTask> = tasks
            .into_iter()
            .filter(|task| {
                task.importance * policy.selection_weight(task.task_type)
                    >= self.config.drop_threshold
            })
            .collect();
        let dropped = emitted - kept.len();

        // Cap keeps the highest weighted-importance tasks
        kept.sort_by(|a, b| {
            let wa = a.importance * policy.selection_weight(a.task_type);
            let wb = b.importance * policy.selection_weight(b.task_type);
            wb.partial_cmp(&wa).unwrap_or(std::cmp::Ordering::Equal)
        });
        kept.truncate(self.config.max_tasks);

        // Present in descending importance order
        kept.sort_by(|a, b| {
            b.importance
                .partial_cmp(&a.importance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        debug!(
            emitted,
            dropped,
            kept = kept.len(),
            context_type = %context.context_type,
            "Decomposed content into validation tasks"
        );

        kept
    }

    fn push_universal(&self, tasks: &mut Vec<ValidationTask>) {
        tasks.push(
            ValidationTask::new(
                TaskType::LogicalConsistency,
                "Check the argument for internal contradictions",
            )
            .with_importance(0.9)
            .with_complexity(0.6)
            .with_capability("logic_analysis")
            .as_known(),
        );
        tasks.push(
            ValidationTask::new(
                TaskType::LinguisticQuality,
                "Check grammar, spelling, and readability",
            )
            .with_importance(0.7)
            .with_complexity(0.3)
            .with_capability("text_analysis")
            .as_known(),
        );
    }

    fn push_contextual(
        &self,
        tasks: &mut Vec<ValidationTask>,
        context: &ProblemContext,
        scan: &ContentScan,
    ) {
        match context.context_type {
            ContextType::Professional => {
                tasks.push(
                    ValidationTask::new(
                        TaskType::ToneAppropriateness,
                        "Check register fit for a professional audience",
                    )
                    .with_importance(0.8)
                    .with_complexity(0.4)
                    .with_capability("tone_analysis"),
                );
                tasks.push(self.factual_task(context, scan, 0.9));
                tasks.push(
                    ValidationTask::new(
                        TaskType::StructuralOrganization,
                        "Check document structure and flow",
                    )
                    .with_importance(0.65)
                    .with_complexity(0.4)
                    .with_capability("text_analysis")
                    .as_known(),
                );
            }
            ContextType::Technical => {
                tasks.push(
                    ValidationTask::new(
                        TaskType::TerminologyPrecision,
                        "Check domain terminology for exactness",
                    )
                    .with_importance(0.85)
                    .with_complexity(0.6)
                    .with_capability("text_analysis"),
                );
                tasks.push(
                    ValidationTask::new(
                        TaskType::UnitConsistency,
                        "Check units and dimensions for coherence",
                    )
                    .with_importance(0.8)
                    .with_complexity(0.5)
                    .with_capability("mathematical_analysis")
                    .as_known(),
                );
            }
            ContextType::Academic => {
                tasks.push(
                    ValidationTask::new(
                        TaskType::CitationSupport,
                        "Check claims for citation backing",
                    )
                    .with_importance(0.95)
                    .with_complexity(0.7)
                    .with_capability("fact_checking"),
                );
                tasks.push(
                    ValidationTask::new(
                        TaskType::MethodologyCheck,
                        "Check described methodology for soundness",
                    )
                    .with_importance(0.85)
                    .with_complexity(0.8)
                    .with_capability("logic_analysis"),
                );
            }
            ContextType::Creative => {
                tasks.push(
                    ValidationTask::new(
                        TaskType::VoiceConsistency,
                        "Check narrative voice for stability",
                    )
                    .with_importance(0.85)
                    .with_complexity(0.5)
                    .with_capability("tone_analysis"),
                );
            }
            ContextType::General => {}
        }

        // Factual accuracy can be demanded outside the profiles that
        // imply it
        let has_factual = tasks
            .iter()
            .any(|t| t.task_type == TaskType::FactualVerification);
        if context.requires_factual_accuracy() && !has_factual {
            tasks.push(self.factual_task(context, scan, 0.85));
        }
    }

    fn factual_task(
        &self,
        context: &ProblemContext,
        scan: &ContentScan,
        base_importance: f64,
    ) -> ValidationTask {
        let mut importance = base_importance;
        // Strong unsupported assertions raise the urgency of checking them
        if scan.certainty_without_citations() {
            importance += 0.05;
        }
        if context.stakes == Stakes::Critical {
            importance *= 1.1;
        }
        ValidationTask::new(
            TaskType::FactualVerification,
            "Check factual claims for verifiability",
        )
        .with_importance(importance)
        .with_complexity(0.8)
        .with_capability("fact_checking")
    }

    fn push_content_triggered(
        &self,
        tasks: &mut Vec<ValidationTask>,
        context: &ProblemContext,
        scan: &ContentScan,
    ) {
        let factual_boost = if context.requires_factual_accuracy() {
            0.1
        } else {
            0.0
        };

        if scan.has_statistical_claims() {
            tasks.push(
                ValidationTask::new(
                    TaskType::StatisticalClaims,
                    "Check statistical claims for plausibility",
                )
                .with_importance(0.75 + factual_boost)
                .with_complexity(0.7)
                .with_capability("mathematical_analysis"),
            );
        }
        if scan.has_comparative_claims() {
            tasks.push(
                ValidationTask::new(
                    TaskType::ComparativeClaims,
                    "Check comparative claims for support",
                )
                .with_importance(0.7 + factual_boost)
                .with_complexity(0.6)
                .with_capability("fact_checking"),
            );
        }
        if scan.has_causal_claims() {
            tasks.push(
                ValidationTask::new(
                    TaskType::CausalClaims,
                    "Check causal claims for evidential support",
                )
                .with_importance(0.75 + factual_boost)
                .with_complexity(0.7)
                .with_capability("fact_checking"),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{QualityConfig, TerminationConfig};
    use crate::policy::PolicyGenerator;
    use crate::task::ContentCharacteristics;

    fn policy_for(context: &ProblemContext) -> ScoringPolicy {
        PolicyGenerator::new(TerminationConfig::default(), QualityConfig::default())
            .generate(context)
    }

    fn task_types(tasks: &[ValidationTask]) -> Vec<TaskType> {
        tasks.iter().map(|t| t.task_type).collect()
    }

    #[test]
    fn test_universal_tasks_always_emitted() {
        let decomposer = TaskDecomposer::new(DecomposeConfig::default());
        let ctx = ProblemContext::new(ContextType::General);
        let tasks = decomposer.decompose("Plain text with no claims.", &ctx, &policy_for(&ctx));

        let types = task_types(&tasks);
        assert!(types.contains(&TaskType::LogicalConsistency));
        assert!(types.contains(&TaskType::LinguisticQuality));
    }

    #[test]
    fn test_empty_content_still_gets_universal_tasks() {
        let decomposer = TaskDecomposer::new(DecomposeConfig::default());
        let ctx = ProblemContext::new(ContextType::General);
        let tasks = decomposer.decompose("", &ctx, &policy_for(&ctx));
        assert!(!tasks.is_empty());
        assert!(task_types(&tasks).contains(&TaskType::LogicalConsistency));
    }

    #[test]
    fn test_universal_tasks_are_known_solutions() {
        let decomposer = TaskDecomposer::new(DecomposeConfig::default());
        let ctx = ProblemContext::new(ContextType::General);
        let tasks = decomposer.decompose("Some text.", &ctx, &policy_for(&ctx));
        for task in &tasks {
            if matches!(
                task.task_type,
                TaskType::LogicalConsistency | TaskType::LinguisticQuality
            ) {
                assert!(task.known_solution, "{} should be known", task.task_type);
            }
        }
    }

    #[test]
    fn test_professional_context_tasks() {
        let decomposer = TaskDecomposer::new(DecomposeConfig::default());
        let ctx = ProblemContext::new(ContextType::Professional);
        let tasks = decomposer.decompose("Quarterly report text.", &ctx, &policy_for(&ctx));

        let types = task_types(&tasks);
        assert!(types.contains(&TaskType::ToneAppropriateness));
        assert!(types.contains(&TaskType::FactualVerification));
        assert!(types.contains(&TaskType::StructuralOrganization));

        // Tone is judged per context, not by a reusable rule
        let tone = tasks
            .iter()
            .find(|t| t.task_type == TaskType::ToneAppropriateness)
            .unwrap();
        assert!(!tone.known_solution);
        let structure = tasks
            .iter()
            .find(|t| t.task_type == TaskType::StructuralOrganization)
            .unwrap();
        assert!(structure.known_solution);
    }

    #[test]
    fn test_technical_context_tasks() {
        let decomposer = TaskDecomposer::new(DecomposeConfig::default());
        let ctx = ProblemContext::new(ContextType::Technical);
        let tasks = decomposer.decompose("The torque spec is 45 Nm.", &ctx, &policy_for(&ctx));

        let types = task_types(&tasks);
        assert!(types.contains(&TaskType::TerminologyPrecision));
        assert!(types.contains(&TaskType::UnitConsistency));
    }

    #[test]
    fn test_academic_context_tasks() {
        let decomposer = TaskDecomposer::new(DecomposeConfig::default());
        let ctx = ProblemContext::new(ContextType::Academic);
        let tasks = decomposer.decompose("We review prior work.", &ctx, &policy_for(&ctx));

        let types = task_types(&tasks);
        assert!(types.contains(&TaskType::CitationSupport));
        assert!(types.contains(&TaskType::MethodologyCheck));
        // Academic writing demands factual accuracy too
        assert!(types.contains(&TaskType::FactualVerification));
    }

    #[test]
    fn test_creative_context_tasks() {
        let decomposer = TaskDecomposer::new(DecomposeConfig::default());
        let ctx = ProblemContext::new(ContextType::Creative);
        let tasks = decomposer.decompose("The rain whispered.", &ctx, &policy_for(&ctx));
        assert!(task_types(&tasks).contains(&TaskType::VoiceConsistency));
    }

    #[test]
    fn test_content_triggered_claim_tasks() {
        let decomposer = TaskDecomposer::new(DecomposeConfig::default());
        let ctx = ProblemContext::new(ContextType::Professional);
        let content =
            "Studies show 80% prefer it. It is faster than X because better caching leads to wins.";
        let tasks = decomposer.decompose(content, &ctx, &policy_for(&ctx));

        let types = task_types(&tasks);
        assert!(types.contains(&TaskType::StatisticalClaims));
        assert!(types.contains(&TaskType::ComparativeClaims));
        assert!(types.contains(&TaskType::CausalClaims));
    }

    #[test]
    fn test_no_claim_tasks_without_claims() {
        let decomposer = TaskDecomposer::new(DecomposeConfig::default());
        let ctx = ProblemContext::new(ContextType::General);
        let tasks = decomposer.decompose("A calm description of a room.", &ctx, &policy_for(&ctx));

        let types = task_types(&tasks);
        assert!(!types.contains(&TaskType::StatisticalClaims));
        assert!(!types.contains(&TaskType::ComparativeClaims));
        assert!(!types.contains(&TaskType::CausalClaims));
    }

    #[test]
    fn test_claim_tasks_depend_on_factual_task() {
        let decomposer = TaskDecomposer::new(DecomposeConfig::default());
        let ctx = ProblemContext::new(ContextType::Professional);
        let content = "Our approach is better than theirs because caching leads to speedups.";
        let tasks = decomposer.decompose(content, &ctx, &policy_for(&ctx));

        let factual_id = tasks
            .iter()
            .find(|t| t.task_type == TaskType::FactualVerification)
            .map(|t| t.id.clone())
            .expect("factual task present");

        let causal = tasks
            .iter()
            .find(|t| t.task_type == TaskType::CausalClaims)
            .expect("causal task present");
        assert_eq!(causal.dependencies, vec![factual_id]);
    }

    #[test]
    fn test_low_weight_tasks_filtered_out() {
        let decomposer = TaskDecomposer::new(DecomposeConfig::default());
        // Creative context weights comparative claims at 0.4;
        // 0.7 * 0.4 = 0.28 < 0.3 drop threshold
        let ctx = ProblemContext::new(ContextType::Creative);
        let tasks = decomposer.decompose(
            "Her prose was better than his.",
            &ctx,
            &policy_for(&ctx),
        );
        assert!(!task_types(&tasks).contains(&TaskType::ComparativeClaims));
    }

    #[test]
    fn test_cap_keeps_highest_weighted_tasks() {
        let decomposer = TaskDecomposer::new(DecomposeConfig {
            max_tasks: 3,
            drop_threshold: 0.3,
        });
        let ctx = ProblemContext::new(ContextType::Professional);
        let content = "Studies show 80% prefer it. Faster than X because caching leads to wins.";
        let tasks = decomposer.decompose(content, &ctx, &policy_for(&ctx));

        assert_eq!(tasks.len(), 3);
        // The heavyweights survive the cap
        let types = task_types(&tasks);
        assert!(types.contains(&TaskType::FactualVerification));
        assert!(types.contains(&TaskType::LogicalConsistency));
    }

    #[test]
    fn test_tasks_sorted_by_descending_importance() {
        let decomposer = TaskDecomposer::new(DecomposeConfig::default());
        let ctx = ProblemContext::new(ContextType::Professional);
        let tasks = decomposer.decompose("Report body.", &ctx, &policy_for(&ctx));

        for pair in tasks.windows(2) {
            assert!(pair[0].importance >= pair[1].importance);
        }
    }

    #[test]
    fn test_overclaiming_raises_factual_importance() {
        let decomposer = TaskDecomposer::new(DecomposeConfig::default());
        let ctx = ProblemContext::new(ContextType::Professional).with_stakes(Stakes::Critical);
        let content = "This definitely works. It certainly always wins. Never fails. \
                       Results are guaranteed.";
        let tasks = decomposer.decompose(content, &ctx, &policy_for(&ctx));

        let factual = tasks
            .iter()
            .find(|t| t.task_type == TaskType::FactualVerification)
            .expect("factual task present");
        assert!(factual.importance >= 0.95);
        assert!(factual.importance <= 1.0);
    }

    #[test]
    fn test_factual_flag_adds_task_outside_professional() {
        let decomposer = TaskDecomposer::new(DecomposeConfig::default());
        let ctx = ProblemContext::new(ContextType::General).with_characteristics(
            ContentCharacteristics {
                requires_factual_accuracy: true,
                ..Default::default()
            },
        );
        let tasks = decomposer.decompose("The drug reduces risk.", &ctx, &policy_for(&ctx));
        assert!(task_types(&tasks).contains(&TaskType::FactualVerification));
    }
}
