//! Staged validation pipeline.
//!
//! One pass runs the canonical stages in priority order:
//!
//! - `structuring`: split content into workable segments
//! - `normalization`: canonicalize whitespace and quoting
//! - `knowledge_fusion`: merge content signals with context expectations
//! - `reasoning`: fan task processing out across processors
//! - `candidate_generation`: draft alternative overall readings
//! - `candidate_scoring`: score each reading
//! - `ensemble_selection`: keep a small diverse set of readings
//! - `verification`: check the kept readings against hard criteria
//!
//! Stages degrade rather than abort: a failed or timed-out stage is
//! recorded as a failed result and the pass continues with whatever
//! state the surviving stages produced. A disabled stage leaves no
//! result at all.

mod ensemble;
mod stages;
mod verify;

pub use ensemble::{select, DiversityMetrics, EnsembleSelection};
pub use verify::{verify_candidate, CriterionOutcome};

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::{EnsembleConfig, PipelineConfig};
use crate::error::StageOpResult;
use crate::policy::ScoringPolicy;
use crate::processors::ProcessorRegistry;
use crate::task::{Issue, ProblemContext, TaskResult, ValidationTask};

/// Canonical stage identifiers, in default execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageId {
    Structuring,
    Normalization,
    KnowledgeFusion,
    Reasoning,
    CandidateGeneration,
    CandidateScoring,
    EnsembleSelection,
    Verification,
}

impl StageId {
    /// All stages in canonical order.
    pub const ALL: [StageId; 8] = [
        StageId::Structuring,
        StageId::Normalization,
        StageId::KnowledgeFusion,
        StageId::Reasoning,
        StageId::CandidateGeneration,
        StageId::CandidateScoring,
        StageId::EnsembleSelection,
        StageId::Verification,
    ];

    /// Stable string identifier
    pub fn as_str(&self) -> &'static str {
        match self {
            StageId::Structuring => "structuring",
            StageId::Normalization => "normalization",
            StageId::KnowledgeFusion => "knowledge_fusion",
            StageId::Reasoning => "reasoning",
            StageId::CandidateGeneration => "candidate_generation",
            StageId::CandidateScoring => "candidate_scoring",
            StageId::EnsembleSelection => "ensemble_selection",
            StageId::Verification => "verification",
        }
    }
}

impl std::fmt::Display for StageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for StageId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "structuring" => Ok(StageId::Structuring),
            "normalization" => Ok(StageId::Normalization),
            "knowledge_fusion" => Ok(StageId::KnowledgeFusion),
            "reasoning" => Ok(StageId::Reasoning),
            "candidate_generation" => Ok(StageId::CandidateGeneration),
            "candidate_scoring" => Ok(StageId::CandidateScoring),
            "ensemble_selection" => Ok(StageId::EnsembleSelection),
            "verification" => Ok(StageId::Verification),
            _ => Err(format!("Unknown stage: {s}")),
        }
    }
}

/// Execution settings for one stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageSettings {
    pub id: StageId,
    pub enabled: bool,
    /// Lower runs earlier.
    pub priority: u32,
    pub timeout_ms: u64,
}

/// The per-deployment stage lineup.
#[derive(Debug, Clone)]
pub struct StagePlan {
    stages: Vec<StageSettings>,
}

impl StagePlan {
    /// Build the canonical plan, applying configured disables.
    pub fn new(config: &PipelineConfig) -> Self {
        for name in &config.disabled_stages {
            if name.parse::<StageId>().is_err() {
                warn!(stage = %name, "Ignoring unknown stage in disabled list");
            }
        }
        let stages = StageId::ALL
            .iter()
            .enumerate()
            .map(|(position, id)| StageSettings {
                id: *id,
                enabled: !config.disabled_stages.iter().any(|name| name == id.as_str()),
                priority: (position as u32 + 1) * 10,
                timeout_ms: config.stage_timeout_ms,
            })
            .collect();
        Self { stages }
    }

    /// Stages sorted by priority
    pub fn ordered(&self) -> Vec<StageSettings> {
        let mut ordered = self.stages.clone();
        ordered.sort_by_key(|s| s.priority);
        ordered
    }

    pub fn is_enabled(&self, id: StageId) -> bool {
        self.stages
            .iter()
            .any(|s| s.id == id && s.enabled)
    }

    pub fn set_enabled(&mut self, id: StageId, enabled: bool) {
        if let Some(settings) = self.stages.iter_mut().find(|s| s.id == id) {
            settings.enabled = enabled;
        }
    }

    pub fn enabled_count(&self) -> usize {
        self.stages.iter().filter(|s| s.enabled).count()
    }

    /// Settings for every stage, in declaration order
    pub fn settings(&self) -> &[StageSettings] {
        &self.stages
    }
}

/// Outcome of one executed stage. Disabled stages never produce one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageResult {
    pub stage_id: StageId,
    pub success: bool,
    /// Stage-specific summary payload.
    pub output: serde_json::Value,
    pub quality_score: f64,
    pub confidence: f64,
    pub processing_time_ms: u64,
    /// Named counters for what the stage consumed, such as steps or
    /// tasks.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub resources_used: HashMap<String, f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StageResult {
    /// Successful result with a summary payload
    pub fn ok(stage_id: StageId, output: serde_json::Value) -> Self {
        Self {
            stage_id,
            success: true,
            output,
            quality_score: 1.0,
            confidence: 1.0,
            processing_time_ms: 0,
            resources_used: HashMap::new(),
            error: None,
        }
    }

    /// Failed result carrying the error text
    pub fn failed(stage_id: StageId, error: impl Into<String>) -> Self {
        Self {
            stage_id,
            success: false,
            output: serde_json::Value::Null,
            quality_score: 0.0,
            confidence: 0.0,
            processing_time_ms: 0,
            resources_used: HashMap::new(),
            error: Some(error.into()),
        }
    }

    pub fn with_quality(mut self, quality: f64) -> Self {
        self.quality_score = quality.clamp(0.0, 1.0);
        self
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence.clamp(0.0, 1.0);
        self
    }

    pub fn with_processing_time(mut self, ms: u64) -> Self {
        self.processing_time_ms = ms;
        self
    }

    pub fn with_resource(mut self, name: impl Into<String>, amount: f64) -> Self {
        self.resources_used.insert(name.into(), amount);
        self
    }
}

/// One overall reading of the task results.
///
/// Candidates differ in how they weigh the evidence; scoring,
/// selection, and verification then decide which readings stand.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolutionCandidate {
    pub id: String,
    /// Reading strategy, such as `balanced` or `strict`.
    pub label: String,
    pub assessment: String,
    pub quality: f64,
    pub confidence: f64,
    pub adequacy: f64,
    pub verification_score: f64,
    pub verified: bool,
    /// Findings attached during verification.
    pub issues: Vec<Issue>,
}

impl SolutionCandidate {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            label: label.into(),
            assessment: String::new(),
            quality: 0.0,
            confidence: 0.5,
            adequacy: 0.5,
            verification_score: 1.0,
            verified: false,
            issues: Vec::new(),
        }
    }

    pub fn with_assessment(mut self, assessment: impl Into<String>) -> Self {
        self.assessment = assessment.into();
        self
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence.clamp(0.0, 1.0);
        self
    }

    pub fn with_adequacy(mut self, adequacy: f64) -> Self {
        self.adequacy = adequacy.clamp(0.0, 1.0);
        self
    }

    pub fn with_quality(mut self, quality: f64) -> Self {
        self.quality = quality.clamp(0.0, 1.0);
        self
    }
}

/// Working set threaded through one pass.
#[derive(Debug, Default)]
pub(crate) struct PassState {
    pub tasks: Vec<ValidationTask>,
    /// Results by task id; seeded results count as already processed.
    pub results: HashMap<String, TaskResult>,
    /// Task ids processed in this pass, as opposed to seeded.
    pub processed: Vec<String>,
    pub stage_results: Vec<StageResult>,
    pub segments: Vec<String>,
    pub normalized: Option<String>,
    pub fusion_notes: Vec<String>,
    pub candidates: Vec<SolutionCandidate>,
    pub selection: Option<EnsembleSelection>,
    pub steps_used: u64,
}

impl PassState {
    fn new(tasks: Vec<ValidationTask>, prior: Vec<TaskResult>) -> Self {
        let mut results = HashMap::new();
        for result in prior {
            results.insert(result.task_id.clone(), result);
        }
        Self {
            tasks,
            results,
            ..Default::default()
        }
    }

    /// Content as later stages should see it.
    pub fn effective_content<'a>(&'a self, original: &'a str) -> &'a str {
        self.normalized.as_deref().unwrap_or(original)
    }

    fn into_outcome(mut self) -> PassOutcome {
        // Task order first, then any carried-over results
        let mut task_results = Vec::with_capacity(self.results.len());
        for task in &self.tasks {
            if let Some(result) = self.results.remove(&task.id) {
                task_results.push(result);
            }
        }
        let mut leftover: Vec<TaskResult> = self.results.into_values().collect();
        leftover.sort_by(|a, b| a.task_id.cmp(&b.task_id));
        task_results.extend(leftover);

        PassOutcome {
            stage_results: self.stage_results,
            task_results,
            tasks_processed: self.processed.len(),
            candidates: self.candidates,
            selection: self.selection,
            steps_used: self.steps_used,
        }
    }
}

/// Everything one pass produced.
#[derive(Debug)]
pub struct PassOutcome {
    /// One entry per executed stage, in execution order.
    pub stage_results: Vec<StageResult>,
    /// All task results visible after the pass, seeded ones included.
    pub task_results: Vec<TaskResult>,
    /// Tasks actually processed in this pass.
    pub tasks_processed: usize,
    pub candidates: Vec<SolutionCandidate>,
    pub selection: Option<EnsembleSelection>,
    pub steps_used: u64,
}

/// Executes passes over a fixed stage plan.
pub struct Pipeline {
    plan: StagePlan,
    registry: Arc<ProcessorRegistry>,
    ensemble: EnsembleConfig,
    max_concurrency: usize,
}

impl Pipeline {
    pub fn new(
        pipeline_config: &PipelineConfig,
        ensemble_config: &EnsembleConfig,
        registry: Arc<ProcessorRegistry>,
    ) -> Self {
        Self {
            plan: StagePlan::new(pipeline_config),
            registry,
            ensemble: ensemble_config.clone(),
            max_concurrency: pipeline_config.max_concurrency,
        }
    }

    pub fn plan(&self) -> &StagePlan {
        &self.plan
    }

    /// Run one full pass over the given tasks.
    ///
    /// `prior` carries results from earlier iterations; tasks with a
    /// seeded result are not reprocessed but stay visible to the
    /// candidate and verification stages.
    pub async fn run_pass(
        &self,
        content: Arc<str>,
        context: &ProblemContext,
        policy: &ScoringPolicy,
        tasks: Vec<ValidationTask>,
        prior: Vec<TaskResult>,
    ) -> PassOutcome {
        let mut state = PassState::new(tasks, prior);

        for settings in self.plan.ordered() {
            if !settings.enabled {
                debug!(stage = %settings.id, "Stage disabled, no result recorded");
                continue;
            }

            let started = Instant::now();
            let outcome = tokio::time::timeout(
                Duration::from_millis(settings.timeout_ms),
                self.execute_stage(settings.id, &content, context, policy, &mut state),
            )
            .await;
            let elapsed_ms = started.elapsed().as_millis() as u64;

            let result = match outcome {
                Ok(Ok(result)) => {
                    debug!(
                        stage = %settings.id,
                        elapsed_ms,
                        quality = format!("{:.2}", result.quality_score),
                        "Stage completed"
                    );
                    result.with_processing_time(elapsed_ms)
                }
                Ok(Err(e)) => {
                    warn!(stage = %settings.id, error = %e, "Stage failed, continuing degraded");
                    StageResult::failed(settings.id, e.to_string())
                        .with_processing_time(elapsed_ms)
                }
                Err(_) => {
                    warn!(
                        stage = %settings.id,
                        timeout_ms = settings.timeout_ms,
                        "Stage timed out, continuing degraded"
                    );
                    StageResult::failed(
                        settings.id,
                        format!("timed out after {}ms", settings.timeout_ms),
                    )
                    .with_processing_time(elapsed_ms)
                }
            };
            state.stage_results.push(result);
        }

        state.into_outcome()
    }

    async fn execute_stage(
        &self,
        id: StageId,
        content: &Arc<str>,
        context: &ProblemContext,
        policy: &ScoringPolicy,
        state: &mut PassState,
    ) -> StageOpResult<StageResult> {
        match id {
            StageId::Structuring => stages::structure(content, state),
            StageId::Normalization => stages::normalize(content, state),
            StageId::KnowledgeFusion => stages::fuse(content, context, state),
            StageId::Reasoning => {
                stages::reason(
                    &self.registry,
                    content,
                    context,
                    policy,
                    self.max_concurrency,
                    state,
                )
                .await
            }
            StageId::CandidateGeneration => stages::generate_candidates(state),
            StageId::CandidateScoring => stages::score_candidates(state),
            StageId::EnsembleSelection => ensemble::select_stage(&self.ensemble, state),
            StageId::Verification => verify::verify_stage(context, state),
        }
    }
}
