//! Core validation vocabulary shared across the crate.
//!
//! This module defines the problem context describing a piece of content,
//! the weighted validation tasks derived from it, and the immutable results
//! and issues produced by task processors.


use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Classification profile for the content under validation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextType {
    /// No specific profile; universal checks only.
    #[default]
    General,
    /// Business or workplace communication.
    Professional,
    /// Fiction, marketing copy, or other expressive writing.
    Creative,
    /// Engineering or scientific material.
    Technical,
    /// Scholarly writing with citation conventions.
    Academic,
}

impl std::fmt::Display for ContextType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContextType::General => write!(f, "general"),
            ContextType::Professional => write!(f, "professional"),
            ContextType::Creative => write!(f, "creative"),
            ContextType::Technical => write!(f, "technical"),
            ContextType::Academic => write!(f, "academic"),
        }
    }
}

impl std::str::FromStr for ContextType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "general" => Ok(ContextType::General),
            "professional" => Ok(ContextType::Professional),
            "creative" => Ok(ContextType::Creative),
            "technical" => Ok(ContextType::Technical),
            "academic" => Ok(ContextType::Academic),
            _ => Err(format!("Unknown context type: {}", s)),
        }
    }
}

/// How much is riding on this content being right.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stakes {
    Low,
    #[default]
    Medium,
    High,
    /// Errors carry serious consequences; refinement budgets expand.
    Critical,
}

impl std::fmt::Display for Stakes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stakes::Low => write!(f, "low"),
            Stakes::Medium => write!(f, "medium"),
            Stakes::High => write!(f, "high"),
            Stakes::Critical => write!(f, "critical"),
        }
    }
}

impl std::str::FromStr for Stakes {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low" => Ok(Stakes::Low),
            "medium" => Ok(Stakes::Medium),
            "high" => Ok(Stakes::High),
            "critical" => Ok(Stakes::Critical),
            _ => Err(format!("Unknown stakes level: {}", s)),
        }
    }
}

/// Content characteristics that gate extra checks and quality dimensions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentCharacteristics {
    /// Claims must be verifiable; factual checks become mandatory.
    pub requires_factual_accuracy: bool,
    /// Numeric or symbolic math is present.
    pub mathematical_content: bool,
    /// Register and formality are part of the contract.
    pub requires_professional_tone: bool,
    /// Domain terminology must be exact.
    pub requires_technical_accuracy: bool,
    /// The content touches decisions with downside risk.
    pub has_risk_factors: bool,
    /// Understatement is preferred over overclaiming.
    pub requires_conservatism: bool,
}

/// Immutable description of the validation problem.
///
/// Refinement never mutates a context; it derives a new one via
/// [`ProblemContext::refined_for`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProblemContext {
    /// Context profile driving task selection and scoring weights.
    pub context_type: ContextType,
    /// Free-form domain label (e.g., "medical", "finance").
    pub domain: String,
    /// Consequence level of errors.
    pub stakes: Stakes,
    /// Flags gating contextual checks.
    pub characteristics: ContentCharacteristics,
    /// Estimated problem complexity (0.0-1.0), scales budgets.
    pub estimated_complexity: f64,
    /// Optional caller metadata.
    pub metadata: Option<serde_json::Value>,
}

impl ProblemContext {
    /// Create a context with the given profile and neutral defaults
    pub fn new(context_type: ContextType) -> Self {
        Self {
            context_type,
            domain: String::new(),
            stakes: Stakes::default(),
            characteristics: ContentCharacteristics::default(),
            estimated_complexity: 0.5,
            metadata: None,
        }
    }

    /// Set the domain label
    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = domain.into();
        self
    }

    /// Set the stakes level
    pub fn with_stakes(mut self, stakes: Stakes) -> Self {
        self.stakes = stakes;
        self
    }

    /// Set the content characteristics
    pub fn with_characteristics(mut self, characteristics: ContentCharacteristics) -> Self {
        self.characteristics = characteristics;
        self
    }

    /// Set the estimated complexity
    pub fn with_complexity(mut self, complexity: f64) -> Self {
        self.estimated_complexity = complexity.clamp(0.0, 1.0);
        self
    }

    /// Set metadata
    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Derive a refinement context focused on the given target areas.
    ///
    /// The original context is left untouched; the derived copy records
    /// the targets in its metadata for processors to pick up.
    pub fn refined_for(&self, target_areas: &[String]) -> Self {
        let mut refined = self.clone();
        let mut map = match refined.metadata.take() {
            Some(serde_json::Value::Object(map)) => map,
            _ => serde_json::Map::new(),
        };
        map.insert(
            "refinement_targets".to_string(),
            serde_json::json!(target_areas),
        );
        refined.metadata = Some(serde_json::Value::Object(map));
        refined
    }

    /// Whether this context demands verifiable factual claims
    pub fn requires_factual_accuracy(&self) -> bool {
        self.characteristics.requires_factual_accuracy
            || matches!(
                self.context_type,
                ContextType::Professional | ContextType::Academic
            )
    }
}

impl Default for ProblemContext {
    /// General profile, medium stakes, no special characteristics
    fn default() -> Self {
        Self::new(ContextType::default())
    }
}

/// The kind of validation a task performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    /// Internal coherence of the argument.
    LogicalConsistency,
    /// Grammar, spelling, and readability.
    LinguisticQuality,
    /// Register fit for the audience.
    ToneAppropriateness,
    /// Verifiability of factual claims.
    FactualVerification,
    /// Document organization and flow.
    StructuralOrganization,
    /// Exactness of domain terminology.
    TerminologyPrecision,
    /// Dimensional and unit coherence.
    UnitConsistency,
    /// Presence and shape of citation support.
    CitationSupport,
    /// Soundness of described methodology.
    MethodologyCheck,
    /// Stability of narrative voice.
    VoiceConsistency,
    /// Plausibility of statistical claims.
    StatisticalClaims,
    /// Support for comparative claims.
    ComparativeClaims,
    /// Support for causal claims.
    CausalClaims,
}

/// Coarse analysis category used to pick anti-pattern catalogs
/// and group issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskCategory {
    FactChecking,
    Mathematical,
    Logical,
    Tone,
    General,
}

impl TaskType {
    /// Stable string identifier
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskType::LogicalConsistency => "logical_consistency",
            TaskType::LinguisticQuality => "linguistic_quality",
            TaskType::ToneAppropriateness => "tone_appropriateness",
            TaskType::FactualVerification => "factual_verification",
            TaskType::StructuralOrganization => "structural_organization",
            TaskType::TerminologyPrecision => "terminology_precision",
            TaskType::UnitConsistency => "unit_consistency",
            TaskType::CitationSupport => "citation_support",
            TaskType::MethodologyCheck => "methodology_check",
            TaskType::VoiceConsistency => "voice_consistency",
            TaskType::StatisticalClaims => "statistical_claims",
            TaskType::ComparativeClaims => "comparative_claims",
            TaskType::CausalClaims => "causal_claims",
        }
    }

    /// Coarse category for catalogs and coverage accounting
    pub fn category(&self) -> TaskCategory {
        match self {
            TaskType::FactualVerification
            | TaskType::CitationSupport
            | TaskType::ComparativeClaims
            | TaskType::CausalClaims => TaskCategory::FactChecking,
            TaskType::UnitConsistency | TaskType::StatisticalClaims => TaskCategory::Mathematical,
            TaskType::LogicalConsistency | TaskType::MethodologyCheck => TaskCategory::Logical,
            TaskType::ToneAppropriateness | TaskType::VoiceConsistency => TaskCategory::Tone,
            TaskType::LinguisticQuality
            | TaskType::StructuralOrganization
            | TaskType::TerminologyPrecision => TaskCategory::General,
        }
    }
}

impl std::fmt::Display for TaskType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for TaskType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "logical_consistency" => Ok(TaskType::LogicalConsistency),
            "linguistic_quality" => Ok(TaskType::LinguisticQuality),
            "tone_appropriateness" => Ok(TaskType::ToneAppropriateness),
            "factual_verification" => Ok(TaskType::FactualVerification),
            "structural_organization" => Ok(TaskType::StructuralOrganization),
            "terminology_precision" => Ok(TaskType::TerminologyPrecision),
            "unit_consistency" => Ok(TaskType::UnitConsistency),
            "citation_support" => Ok(TaskType::CitationSupport),
            "methodology_check" => Ok(TaskType::MethodologyCheck),
            "voice_consistency" => Ok(TaskType::VoiceConsistency),
            "statistical_claims" => Ok(TaskType::StatisticalClaims),
            "comparative_claims" => Ok(TaskType::ComparativeClaims),
            "causal_claims" => Ok(TaskType::CausalClaims),
            _ => Err(format!("Unknown task type: {}", s)),
        }
    }
}

/// A weighted unit of validation work.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationTask {
    /// Unique task identifier.
    pub id: String,
    /// What this task checks.
    pub task_type: TaskType,
    /// Human-readable description of the check.
    pub description: String,
    /// Relative importance within the session (0.0-1.0).
    pub importance: f64,
    /// Estimated effort to process (0.0-1.0).
    pub estimated_complexity: f64,
    /// Capabilities a processor must advertise to take this task.
    pub required_capabilities: Vec<String>,
    /// Task ids that must complete first.
    pub dependencies: Vec<String>,
    /// Whether a reusable context-independent strategy exists.
    ///
    /// Known tasks skip boundary synthesis and carry their strategy
    /// through as a known solution.
    pub known_solution: bool,
}

impl ValidationTask {
    /// Create a task with neutral weights
    pub fn new(task_type: TaskType, description: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            task_type,
            description: description.into(),
            importance: 0.5,
            estimated_complexity: 0.5,
            required_capabilities: Vec::new(),
            dependencies: Vec::new(),
            known_solution: false,
        }
    }

    /// Set importance
    pub fn with_importance(mut self, importance: f64) -> Self {
        self.importance = importance.clamp(0.0, 1.0);
        self
    }

    /// Set estimated complexity
    pub fn with_complexity(mut self, complexity: f64) -> Self {
        self.estimated_complexity = complexity.clamp(0.0, 1.0);
        self
    }

    /// Require a processor capability
    pub fn with_capability(mut self, capability: impl Into<String>) -> Self {
        self.required_capabilities.push(capability.into());
        self
    }

    /// Add a dependency on another task
    pub fn with_dependency(mut self, task_id: impl Into<String>) -> Self {
        self.dependencies.push(task_id.into());
        self
    }

    /// Mark as having a known reusable solution strategy
    pub fn as_known(mut self) -> Self {
        self.known_solution = true;
        self
    }
}

/// Severity of a detected issue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueSeverity {
    Info,
    #[default]
    Warning,
    Error,
    Critical,
}

impl IssueSeverity {
    /// Whether this severity blocks verification when unresolved
    pub fn is_blocking(&self) -> bool {
        matches!(self, IssueSeverity::Error | IssueSeverity::Critical)
    }
}

impl std::fmt::Display for IssueSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IssueSeverity::Info => write!(f, "info"),
            IssueSeverity::Warning => write!(f, "warning"),
            IssueSeverity::Error => write!(f, "error"),
            IssueSeverity::Critical => write!(f, "critical"),
        }
    }
}

impl std::str::FromStr for IssueSeverity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "info" => Ok(IssueSeverity::Info),
            "warning" => Ok(IssueSeverity::Warning),
            "error" => Ok(IssueSeverity::Error),
            "critical" => Ok(IssueSeverity::Critical),
            _ => Err(format!("Unknown issue severity: {}", s)),
        }
    }
}

/// Category of a detected issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueCategory {
    Logical,
    Factual,
    Linguistic,
    Structural,
    Tone,
    Mathematical,
    Compliance,
}

impl std::fmt::Display for IssueCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IssueCategory::Logical => write!(f, "logical"),
            IssueCategory::Factual => write!(f, "factual"),
            IssueCategory::Linguistic => write!(f, "linguistic"),
            IssueCategory::Structural => write!(f, "structural"),
            IssueCategory::Tone => write!(f, "tone"),
            IssueCategory::Mathematical => write!(f, "mathematical"),
            IssueCategory::Compliance => write!(f, "compliance"),
        }
    }
}

/// A concrete problem found in the content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    /// Unique issue identifier.
    pub id: String,
    /// What class of problem this is.
    pub category: IssueCategory,
    /// How serious it is.
    pub severity: IssueSeverity,
    /// Description of the problem.
    pub message: String,
    /// Detection confidence (0.0-1.0).
    pub confidence: f64,
    /// Offending text excerpt, when available.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,
    /// Suggested fix.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remediation: Option<String>,
    /// Supporting evidence for the finding.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evidence: Option<String>,
    /// Whether a later pass resolved this issue.
    pub resolved: bool,
}

impl Issue {
    /// Create a new issue
    pub fn new(
        category: IssueCategory,
        severity: IssueSeverity,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            category,
            severity,
            message: message.into(),
            confidence: 0.8,
            excerpt: None,
            remediation: None,
            evidence: None,
            resolved: false,
        }
    }

    /// Set detection confidence
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence.clamp(0.0, 1.0);
        self
    }

    /// Attach the offending excerpt
    pub fn with_excerpt(mut self, excerpt: impl Into<String>) -> Self {
        self.excerpt = Some(excerpt.into());
        self
    }

    /// Attach a suggested fix
    pub fn with_remediation(mut self, remediation: impl Into<String>) -> Self {
        self.remediation = Some(remediation.into());
        self
    }

    /// Attach supporting evidence
    pub fn with_evidence(mut self, evidence: impl Into<String>) -> Self {
        self.evidence = Some(evidence.into());
        self
    }

    /// Whether this issue still blocks verification
    pub fn is_unresolved_blocker(&self) -> bool {
        !self.resolved && self.severity.is_blocking()
    }
}

/// Immutable outcome of processing one task.
///
/// A refinement iteration supersedes a result by writing a new one;
/// it never edits the old record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskResult {
    /// The task this result answers.
    pub task_id: String,
    /// Task type, denormalized for reporting.
    pub task_type: TaskType,
    /// Whether processing completed normally.
    pub success: bool,
    /// How much this result contributes to overall adequacy (0.0-1.0).
    pub adequacy_contribution: f64,
    /// Importance weight carried over from the task.
    pub importance_weight: f64,
    /// Wall-clock processing time.
    pub processing_time_ms: u64,
    /// Processor confidence in the result (0.0-1.0).
    pub confidence: f64,
    /// Issues found while processing.
    pub issues: Vec<Issue>,
    /// Optional processor metadata.
    pub metadata: Option<serde_json::Value>,
}

impl TaskResult {
    /// Create a successful result shell for a task
    pub fn new(task_id: impl Into<String>, task_type: TaskType) -> Self {
        Self {
            task_id: task_id.into(),
            task_type,
            success: true,
            adequacy_contribution: 0.5,
            importance_weight: 0.5,
            processing_time_ms: 0,
            confidence: 0.5,
            issues: Vec::new(),
            metadata: None,
        }
    }

    /// Create a failed result carrying the failure as an issue
    pub fn failed(
        task_id: impl Into<String>,
        task_type: TaskType,
        message: impl Into<String>,
    ) -> Self {
        let message = message.into();
        Self {
            task_id: task_id.into(),
            task_type,
            success: false,
            adequacy_contribution: 0.0,
            importance_weight: 0.5,
            processing_time_ms: 0,
            confidence: 0.0,
            issues: vec![Issue::new(
                IssueCategory::Compliance,
                IssueSeverity::Error,
                message,
            )],
            metadata: None,
        }
    }

    /// Set the adequacy contribution
    pub fn with_adequacy(mut self, adequacy: f64) -> Self {
        self.adequacy_contribution = adequacy.clamp(0.0, 1.0);
        self
    }

    /// Set the importance weight
    pub fn with_importance_weight(mut self, weight: f64) -> Self {
        self.importance_weight = weight.clamp(0.0, 1.0);
        self
    }

    /// Set the confidence
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence.clamp(0.0, 1.0);
        self
    }

    /// Set processing time
    pub fn with_processing_time(mut self, ms: u64) -> Self {
        self.processing_time_ms = ms;
        self
    }

    /// Add an issue
    pub fn with_issue(mut self, issue: Issue) -> Self {
        self.issues.push(issue);
        self
    }

    /// Set metadata
    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Adequacy weighted by task importance
    pub fn weighted_adequacy(&self) -> f64 {
        self.adequacy_contribution * self.importance_weight
    }

    /// Count of unresolved blocking issues
    pub fn unresolved_blockers(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.is_unresolved_blocker())
            .count()
    }
}
