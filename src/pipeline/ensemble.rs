//! Ensemble selection.
//!
//! Keeps a small set of candidate readings that is both high quality
//! and spread out in confidence. Selection is greedy: seed with the
//! best candidate, then repeatedly take the candidate maximizing a
//! weighted blend of its own quality and its confidence distance from
//! the already-selected set. Ties go to the earlier candidate, so the
//! same input always yields the same ensemble.

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use crate::config::EnsembleConfig;
use crate::error::StageOpResult;

use super::{PassState, SolutionCandidate, StageId, StageResult};

/// How spread out the selected candidates are.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiversityMetrics {
    pub mean_confidence: f64,
    /// Mean absolute confidence difference over selected pairs.
    pub mean_pairwise_distance: f64,
    pub meets_threshold: bool,
}

/// The kept candidates plus how they score as a set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnsembleSelection {
    pub selected: Vec<SolutionCandidate>,
    pub diversity: DiversityMetrics,
    /// Mean quality of the selected candidates.
    pub ensemble_quality: f64,
}

/// Pick up to `max_candidates` readings from the pool.
pub fn select(candidates: &[SolutionCandidate], config: &EnsembleConfig) -> EnsembleSelection {
    if candidates.len() <= config.max_candidates {
        let selected = candidates.to_vec();
        return EnsembleSelection {
            diversity: diversity_of(&selected, config),
            ensemble_quality: mean_quality(&selected),
            selected,
        };
    }

    let mut remaining: Vec<&SolutionCandidate> = candidates.iter().collect();

    // Seed with the best candidate, earliest on ties
    let mut seed = 0;
    for (index, candidate) in remaining.iter().enumerate() {
        if candidate.quality > remaining[seed].quality {
            seed = index;
        }
    }
    let mut selected: Vec<SolutionCandidate> = vec![remaining.remove(seed).clone()];

    while selected.len() < config.max_candidates && !remaining.is_empty() {
        let mean_confidence =
            selected.iter().map(|c| c.confidence).sum::<f64>() / selected.len() as f64;
        let mut pick = 0;
        let mut pick_score = f64::MIN;
        for (index, candidate) in remaining.iter().enumerate() {
            let distance = (candidate.confidence - mean_confidence).abs();
            let score = config.quality_weight * candidate.quality
                + config.diversity_weight * distance;
            if score > pick_score {
                pick_score = score;
                pick = index;
            }
        }
        selected.push(remaining.remove(pick).clone());
    }

    EnsembleSelection {
        diversity: diversity_of(&selected, config),
        ensemble_quality: mean_quality(&selected),
        selected,
    }
}

/// Run selection as a pipeline stage.
pub(super) fn select_stage(
    config: &EnsembleConfig,
    state: &mut PassState,
) -> StageOpResult<StageResult> {
    if state.candidates.is_empty() {
        debug!("No candidates to select from");
        return Ok(
            StageResult::ok(StageId::EnsembleSelection, json!({"selected": 0, "from": 0}))
                .with_quality(0.0)
                .with_confidence(0.0),
        );
    }

    let selection = select(&state.candidates, config);
    let output = json!({
        "selected": selection.selected.len(),
        "from": state.candidates.len(),
        "ensemble_quality": selection.ensemble_quality,
        "mean_pairwise_distance": selection.diversity.mean_pairwise_distance,
        "meets_diversity_threshold": selection.diversity.meets_threshold,
    });
    let quality = selection.ensemble_quality;
    let confidence = selection.diversity.mean_confidence;

    debug!(
        selected = selection.selected.len(),
        from = state.candidates.len(),
        "Ensemble selected"
    );
    state.selection = Some(selection);
    state.steps_used += 1;
    Ok(StageResult::ok(StageId::EnsembleSelection, output)
        .with_quality(quality)
        .with_confidence(confidence)
        .with_resource("steps", 1.0))
}

fn mean_quality(selected: &[SolutionCandidate]) -> f64 {
    if selected.is_empty() {
        return 0.0;
    }
    selected.iter().map(|c| c.quality).sum::<f64>() / selected.len() as f64
}

fn diversity_of(selected: &[SolutionCandidate], config: &EnsembleConfig) -> DiversityMetrics {
    let mean_confidence = if selected.is_empty() {
        0.0
    } else {
        selected.iter().map(|c| c.confidence).sum::<f64>() / selected.len() as f64
    };

    let mut distance_sum = 0.0;
    let mut pairs = 0usize;
    for (index, a) in selected.iter().enumerate() {
        for b in &selected[index + 1..] {
            distance_sum += (a.confidence - b.confidence).abs();
            pairs += 1;
        }
    }
    let mean_pairwise_distance = if pairs == 0 {
        0.0
    } else {
        distance_sum / pairs as f64
    };

    DiversityMetrics {
        mean_confidence,
        mean_pairwise_distance,
        meets_threshold: mean_pairwise_distance >= config.diversity_threshold,
    }
}
