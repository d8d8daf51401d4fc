//! Contrastive boundary synthesis.
//!
//! Tasks without an established methodology get a synthesized
//! boundary: a degenerate counter-resolution, the anti-patterns that
//! make it degenerate, and the readings the result therefore cannot
//! and can carry. Tasks with a known methodology pass through
//! untouched. The combined verdict says whether the final results
//! stay inside every boundary.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::BoundaryConfig;
use crate::task::{Stakes, TaskCategory, TaskResult, ValidationTask};

/// Synthesized limits on what an unknown task's result may mean.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Boundary {
    pub task_id: String,
    pub category: TaskCategory,
    /// The degenerate resolution this boundary contrasts against.
    pub counter_resolution: String,
    /// What makes the counter-resolution degenerate.
    pub anti_patterns: Vec<String>,
    /// Readings the result must never be given.
    pub cannot_mean: Vec<String>,
    /// Readings that remain in bounds.
    pub can_mean: Vec<String>,
    /// Extra constraints imposed by the stakes.
    pub constraints: Vec<String>,
    pub contrast_ratio: f64,
    pub boundary_confidence: f64,
}

/// A task whose methodology is established; synthesis leaves it alone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnownSolution {
    pub task_id: String,
    pub confidence: f64,
    pub rationale: String,
}

/// How the final results sit against the boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    WithinBounds,
    Questionable,
    BoundaryViolation,
}

impl Verdict {
    /// Stable string identifier
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::WithinBounds => "within_bounds",
            Verdict::Questionable => "questionable",
            Verdict::BoundaryViolation => "boundary_violation",
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Boundaries, pass-throughs, and the combined verdict.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoundaryReport {
    pub boundaries: Vec<Boundary>,
    pub known: Vec<KnownSolution>,
    pub verdict: Verdict,
}

/// Synthesizes boundaries for tasks without known methodology.
#[derive(Debug, Clone)]
pub struct ContrastiveBoundarySynthesizer {
    config: BoundaryConfig,
}

impl ContrastiveBoundarySynthesizer {
    pub fn new(config: BoundaryConfig) -> Self {
        Self { config }
    }

    /// Synthesize boundaries and judge the results against them.
    pub fn synthesize(
        &self,
        tasks: &[ValidationTask],
        results: &[TaskResult],
        stakes: Stakes,
    ) -> BoundaryReport {
        let by_task: HashMap<&str, &TaskResult> =
            results.iter().map(|r| (r.task_id.as_str(), r)).collect();

        let mut boundaries = Vec::new();
        let mut known = Vec::new();
        for task in tasks {
            if task.known_solution {
                let confidence = by_task
                    .get(task.id.as_str())
                    .map(|r| r.confidence)
                    .unwrap_or(0.0);
                known.push(KnownSolution {
                    task_id: task.id.clone(),
                    confidence,
                    rationale: format!("established {} methodology", task.task_type),
                });
            } else {
                boundaries.push(self.boundary_for(task, stakes));
            }
        }

        let verdict = combined_verdict(&boundaries, &known, &by_task);
        debug!(
            boundaries = boundaries.len(),
            known = known.len(),
            verdict = %verdict,
            "Boundary synthesis finished"
        );
        BoundaryReport {
            boundaries,
            known,
            verdict,
        }
    }

    fn boundary_for(&self, task: &ValidationTask, stakes: Stakes) -> Boundary {
        let category = task.task_type.category();
        let anti_patterns: Vec<String> = anti_pattern_catalog(category)
            .iter()
            .map(|p| p.to_string())
            .collect();
        let cannot_mean = anti_patterns
            .iter()
            .map(|p| format!("a result that {p}"))
            .collect();
        let can_mean: Vec<String> = positive_framings(category)
            .iter()
            .map(|p| p.to_string())
            .collect();
        let constraints = if stakes == Stakes::Critical {
            vec![
                "no unresolved blocking issues of any category".to_string(),
                "every asserted finding carries explicit support".to_string(),
            ]
        } else {
            Vec::new()
        };

        Boundary {
            task_id: task.id.clone(),
            category,
            counter_resolution: counter_resolution(category).to_string(),
            anti_patterns,
            cannot_mean,
            can_mean,
            constraints,
            contrast_ratio: self.config.contrast_ratio,
            boundary_confidence: self.config.boundary_confidence,
        }
    }
}

/// Worst verdict across all tasks.
///
/// A failed known solution or a boundary-tripping unknown result is a
/// violation. A result too weak to certify, or missing entirely, is
/// questionable rather than a failure.
fn combined_verdict(
    boundaries: &[Boundary],
    known: &[KnownSolution],
    by_task: &HashMap<&str, &TaskResult>,
) -> Verdict {
    let mut verdict = Verdict::WithinBounds;

    for solution in known {
        match by_task.get(solution.task_id.as_str()) {
            Some(result) if !result.success => return Verdict::BoundaryViolation,
            Some(_) => {}
            None => verdict = Verdict::Questionable,
        }
    }

    for boundary in boundaries {
        match by_task.get(boundary.task_id.as_str()) {
            Some(result) if result.unresolved_blockers() > 0 => {
                return Verdict::BoundaryViolation;
            }
            Some(result) if result.confidence < boundary.boundary_confidence => {
                verdict = Verdict::Questionable;
            }
            Some(_) => {}
            None => verdict = Verdict::Questionable,
        }
    }

    verdict
}

fn anti_pattern_catalog(category: TaskCategory) -> &'static [&'static str] {
    match category {
        TaskCategory::FactChecking => &[
            "asserts fabricated sources as support",
            "treats unverifiable claims as settled fact",
            "cites the content itself as its own evidence",
        ],
        TaskCategory::Mathematical => &[
            "mixes incompatible units in one computation",
            "reasons through a division by zero",
            "reads sampled statistics as exact truths",
        ],
        TaskCategory::Logical => &[
            "embraces a contradiction as acceptable",
            "accepts circular reasoning as support",
            "generalizes from a single instance",
        ],
        TaskCategory::Tone => &[
            "mismatches register against the expected audience",
            "reads mockery as professional critique",
        ],
        TaskCategory::General => &[
            "accepts the content wholesale without findings",
            "rejects the content wholesale without findings",
        ],
    }
}

fn positive_framings(category: TaskCategory) -> &'static [&'static str] {
    match category {
        TaskCategory::FactChecking => &[
            "claims checked against independent support",
            "unverifiable claims flagged rather than assumed",
        ],
        TaskCategory::Mathematical => &[
            "quantities compared in consistent units",
            "statistical claims read with their uncertainty",
        ],
        TaskCategory::Logical => &[
            "conclusions follow from stated premises",
            "contradictions surfaced as findings",
        ],
        TaskCategory::Tone => &[
            "register matched to audience and intent",
            "criticism kept specific and professional",
        ],
        TaskCategory::General => &[
            "acceptance grounded in concrete findings",
            "rejection grounded in concrete findings",
        ],
    }
}

fn counter_resolution(category: TaskCategory) -> &'static str {
    match category {
        TaskCategory::FactChecking => "every claim passes because none was checked",
        TaskCategory::Mathematical => "the numbers agree because nobody computed",
        TaskCategory::Logical => "the argument holds because objections were ignored",
        TaskCategory::Tone => "the tone fits because any tone fits",
        TaskCategory::General => "the content is fine because nothing was examined",
    }
}
